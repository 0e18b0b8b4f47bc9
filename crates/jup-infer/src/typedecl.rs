//! User type declarations.
//!
//! `type Shape(\a) = Circle(r: \a) | Rect(w: \a, h: \a)` declares the nominal
//! type `Shape(\a)` and, for every constructor, three kinds of generated
//! overloads: the constructor itself, a tag check `Circle?` and one getter
//! per field. All three are ordinary source overloads whose bodies are the
//! matching intrinsic expression, so they are resolved and instantiated like
//! user code.

use std::collections::{BTreeMap, BTreeSet};

use jup_ast::{
    CtorDecl, Expr, ExprKind, FnDecl, LocalRef, LocalSlot, Param, Span, Spanned, TypeAnnotation,
    TypeDecl,
};
use jup_diag::{Category, Diagnostic};
use jup_types::Type;

use crate::env::{CtorInfo, GlobalEnv, OverloadId, OverloadOrigin};
use crate::span_to_location;

fn invalid(message: String, span: Span) -> Diagnostic {
    Diagnostic::error(Category::InvalidTypeDecl, message).at(span_to_location(span))
}

impl GlobalEnv {
    /// Declare a user type and generate its constructor, tag-check and
    /// getter overloads.
    ///
    /// Nothing is registered unless the whole declaration is valid.
    pub fn register_type(&mut self, decl: &TypeDecl) -> Result<Vec<OverloadId>, Diagnostic> {
        check_names(self, decl)?;
        for ctor in &decl.ctors {
            for field in &ctor.fields {
                check_field(&field.annotation.node, &decl.params, field.annotation.span)?;
            }
        }

        // Fields are resolved against a scratch table that already knows the
        // new type, so recursive types work.
        let mut table = self.types.clone();
        table.declare(decl.name.clone(), Some(decl.params.len()));
        let mut vars = BTreeMap::new();
        let params: Vec<Type> = decl
            .params
            .iter()
            .map(|name| {
                let ty = self.fresh_named(name.clone());
                vars.insert(name.clone(), ty.clone());
                ty
            })
            .collect();
        let result = Type::concrete(decl.name.clone(), params);

        let mut infos = Vec::with_capacity(decl.ctors.len());
        for (tag, ctor) in decl.ctors.iter().enumerate() {
            let mut fields = Vec::with_capacity(ctor.fields.len());
            for field in &ctor.fields {
                let ty = table.resolve_annotation(&field.annotation, &mut self.supply, &mut vars)?;
                fields.push((field.name.clone(), ty));
            }
            infos.push(CtorInfo {
                name: ctor.name.clone(),
                type_name: decl.name.clone(),
                tag,
                fields,
                result: result.clone(),
            });
        }
        for info in infos {
            table.add_ctor(info);
        }
        self.types = table;
        log::debug!(
            "declared type `{}` with {} constructor(s)",
            decl.name,
            decl.ctors.len()
        );

        let subject = TypeAnnotation::applied(
            decl.name.clone(),
            decl.params.iter().map(TypeAnnotation::var).collect(),
        );
        let mut ids = Vec::new();
        for ctor in &decl.ctors {
            for generated in accessors(ctor, &subject) {
                ids.push(self.register_source(&generated, OverloadOrigin::Generated)?);
            }
        }
        Ok(ids)
    }
}

fn check_names(env: &GlobalEnv, decl: &TypeDecl) -> Result<(), Diagnostic> {
    if env.types.contains(&decl.name) {
        return Err(invalid(
            format!("type `{}` is already defined", decl.name),
            decl.span,
        ));
    }
    let mut params = BTreeSet::new();
    for param in &decl.params {
        if !params.insert(param.as_str()) {
            return Err(invalid(
                format!("type parameter `\\{param}` appears twice in `{}`", decl.name),
                decl.span,
            ));
        }
    }
    let mut ctors = BTreeSet::new();
    let mut fields = BTreeSet::new();
    for ctor in &decl.ctors {
        if !ctors.insert(ctor.name.as_str()) {
            return Err(invalid(
                format!(
                    "constructors must have distinct names; `{}` is repeated",
                    ctor.name
                ),
                ctor.span,
            ));
        }
        if env.types.ctor(&ctor.name).is_some() {
            return Err(invalid(
                format!("constructor `{}` is already defined", ctor.name),
                ctor.span,
            ));
        }
        for field in &ctor.fields {
            if !fields.insert(field.name.as_str()) {
                return Err(invalid(
                    format!(
                        "field `{}` appears more than once in type `{}`",
                        field.name, decl.name
                    ),
                    field.annotation.span,
                ));
            }
        }
    }
    Ok(())
}

/// Field types may only mention the declared parameters.
fn check_field(node: &TypeAnnotation, params: &[String], span: Span) -> Result<(), Diagnostic> {
    match node {
        TypeAnnotation::Var(name) if params.iter().any(|p| p == name) => Ok(()),
        TypeAnnotation::Var(name) => Err(invalid(format!("unbound type `\\{name}`"), span)),
        TypeAnnotation::Wildcard => Err(invalid(
            "field types cannot contain `_`".to_string(),
            span,
        )),
        TypeAnnotation::Named(_, args) => args
            .iter()
            .try_for_each(|arg| check_field(arg, params, span)),
    }
}

/// Constructor, tag check and getters of one constructor.
fn accessors(ctor: &CtorDecl, subject: &TypeAnnotation) -> Vec<FnDecl> {
    let span = ctor.span;
    let local = |name: &str, slot: u32| -> Box<Expr> {
        Box::new(Spanned::new(
            ExprKind::Local(LocalRef {
                name: name.to_string(),
                slot: LocalSlot(slot),
            }),
            span,
        ))
    };
    let subject_param = || Param {
        name: "a".to_string(),
        slot: LocalSlot(0),
        annotation: Some(Spanned::new(subject.clone(), span)),
        span,
    };

    let mut decls = Vec::with_capacity(ctor.fields.len() + 2);
    decls.push(FnDecl {
        name: ctor.name.clone(),
        params: ctor
            .fields
            .iter()
            .enumerate()
            .map(|(i, field)| Param {
                name: field.name.clone(),
                slot: LocalSlot(i as u32),
                annotation: Some(field.annotation.clone()),
                span: field.annotation.span,
            })
            .collect(),
        body: Spanned::new(
            ExprKind::Construct {
                ctor: ctor.name.clone(),
                args: ctor
                    .fields
                    .iter()
                    .enumerate()
                    .map(|(i, field)| *local(&field.name, i as u32))
                    .collect(),
            },
            span,
        ),
        span,
    });
    decls.push(FnDecl {
        name: format!("{}?", ctor.name),
        params: vec![subject_param()],
        body: Spanned::new(
            ExprKind::TagTest {
                ctor: ctor.name.clone(),
                value: local("a", 0),
            },
            span,
        ),
        span,
    });
    for (index, field) in ctor.fields.iter().enumerate() {
        decls.push(FnDecl {
            name: field.name.clone(),
            params: vec![subject_param()],
            body: Spanned::new(
                ExprKind::FieldGet {
                    ctor: ctor.name.clone(),
                    index,
                    value: local("a", 0),
                },
                span,
            ),
            span,
        });
    }
    decls
}
