//! Expression-level inference.
//!
//! A [`Session`] holds the state of one instantiation: the solution built so
//! far, the types of local slots, and the spans of overloaded references.
//! It is created for each (definition, signature) pair and dropped when the
//! instance is finished.

use std::collections::BTreeMap;

use jup_ast::{Expr, ExprKind, LambdaExpr, Lit, LocalSlot, SiteId, Span};
use jup_diag::{Category, Diagnostic};
use jup_types::{Type, TypeKind, display_types, freshen, freshen_with};

use crate::env::{CtorInfo, GlobalEnv, InstanceId, SourceBody};
use crate::span_to_location;
use crate::unify::{SiteSpans, Solution, UnifyFailure, unify};

/// Per-instantiation inference state.
#[derive(Debug, Default)]
pub struct Session {
    solution: Solution,
    locals: BTreeMap<LocalSlot, Type>,
    /// Slots bound in each open block, innermost last.
    scopes: Vec<Vec<LocalSlot>>,
    sites: SiteSpans,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_local(&mut self, slot: LocalSlot, ty: Type) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(slot);
        }
        self.locals.insert(slot, ty);
    }

    pub fn local(&self, slot: LocalSlot) -> Option<&Type> {
        self.locals.get(&slot)
    }

    fn enter_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    fn exit_scope(&mut self) {
        for slot in self.scopes.pop().unwrap_or_default() {
            self.locals.remove(&slot);
        }
    }

    pub fn solution(&self) -> &Solution {
        &self.solution
    }

    pub fn resolve(&self, env: &GlobalEnv, ty: &Type) -> Type {
        self.solution.resolve(&env.cells, ty)
    }

    /// Unify `left` with `right` and commit the result.
    ///
    /// Committing publishes any pending return cell this session has learned
    /// about to the global cell store.
    pub fn unify(
        &mut self,
        env: &mut GlobalEnv,
        left: &Type,
        right: &Type,
        span: Span,
    ) -> Result<(), Diagnostic> {
        let shown_left = self.resolve(env, left);
        let shown_right = self.resolve(env, right);
        let result = unify(
            env,
            &self.sites,
            &mut self.solution,
            std::slice::from_ref(left),
            std::slice::from_ref(right),
        );
        match result {
            Ok(()) => {
                env.commit_cells(&self.solution);
                Ok(())
            }
            Err(UnifyFailure::Fatal(diag)) => Err((*diag).or_at(span_to_location(span))),
            Err(UnifyFailure::InfiniteType { var, ty }) => {
                let shown = display_types(&[&var, &ty]);
                Err(Diagnostic::error(
                    Category::InfiniteType,
                    format!("infinite type: `{}` occurs in `{}`", shown[0], shown[1]),
                )
                .at(span_to_location(span)))
            }
            Err(UnifyFailure::Mismatch) => Err(mismatch(&shown_left, &shown_right, span)),
        }
    }

    pub fn into_resolutions(self) -> BTreeMap<SiteId, InstanceId> {
        self.solution.resolutions
    }
}

fn mismatch(left: &Type, right: &Type, span: Span) -> Diagnostic {
    let shown = display_types(&[left, right]);
    let diag = match left.kind() {
        TypeKind::Overloaded { name, .. } => Diagnostic::error(
            Category::NoMatchingOverload,
            format!("function `{name}` incompatible with type {}", shown[1]),
        ),
        _ => Diagnostic::error(
            Category::TypeMismatch,
            format!("incompatible types {} and {}", shown[0], shown[1]),
        ),
    };
    diag.at(span_to_location(span))
}

/// Infer the type of `expr`, extending the session's solution.
pub fn infer_expr(
    env: &mut GlobalEnv,
    session: &mut Session,
    expr: &Expr,
) -> Result<Type, Diagnostic> {
    let span = expr.span;
    match &expr.node {
        ExprKind::Lit(lit) => Ok(match lit {
            Lit::Int(_) => Type::int(),
            Lit::Real(_) => Type::real(),
            Lit::Str(_) => Type::str(),
            Lit::Bool(_) => Type::bool(),
        }),

        ExprKind::Local(local) => {
            let Some(ty) = session.local(local.slot) else {
                return Err(Diagnostic::error(
                    Category::UndefinedLocal,
                    format!("local `{}` is used before it is bound", local.name),
                )
                .at(span_to_location(span)));
            };
            let resolved = session.resolve(env, ty);
            Ok(freshen(&resolved, &mut env.supply))
        }

        ExprKind::Global(global) => global_ref(env, session, &global.name, global.site, span),

        ExprKind::Tuple(elems) => {
            let mut types = Vec::with_capacity(elems.len());
            for elem in elems {
                let ty = infer_expr(env, session, elem)?;
                // Forces a bare overloaded element to resolve now.
                let slot = env.fresh();
                session.unify(env, &ty, &slot, elem.span)?;
                types.push(session.resolve(env, &slot));
            }
            Ok(Type::tuple(types))
        }

        ExprKind::Call { func, args } => {
            let callee = match &func.node {
                // An undefined callee is reported at the whole call.
                ExprKind::Global(global) => {
                    global_ref(env, session, &global.name, global.site, span)?
                }
                _ => infer_expr(env, session, func)?,
            };
            let mut params = Vec::with_capacity(args.len());
            for arg in args {
                params.push(infer_expr(env, session, arg)?);
            }
            let ret = env.fresh();
            let model = Type::function(params, ret.clone());
            session.unify(env, &callee, &model, span)?;
            Ok(session.resolve(env, &ret))
        }

        ExprKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let cond = infer_expr(env, session, condition)?;
            session.unify(env, &cond, &Type::bool(), condition.span)?;
            let then_ty = infer_expr(env, session, then_branch)?;
            let else_ty = infer_expr(env, session, else_branch)?;
            session.unify(env, &then_ty, &else_ty, span)?;
            Ok(session.resolve(env, &then_ty))
        }

        ExprKind::Let {
            name,
            slot,
            annotation,
            value,
        } => {
            let value_ty = infer_expr(env, session, value)?;
            let declared = match annotation {
                Some(annotation) => env.types.resolve_annotation(
                    annotation,
                    &mut env.supply,
                    &mut BTreeMap::new(),
                )?,
                None => env.fresh(),
            };
            session.unify(env, &value_ty, &declared, span)?;
            let ty = session.resolve(env, &declared);
            if ty.contains_overloaded() {
                return Err(Diagnostic::error(
                    Category::InvalidOverloadedReturn,
                    format!("cannot bind `{name}` to an unresolved overloaded function"),
                )
                .at(span_to_location(span)));
            }
            session.bind_local(*slot, ty);
            Ok(Type::unit())
        }

        ExprKind::Assign { target, value } => {
            let target_ty = infer_expr(env, session, target)?;
            let value_ty = infer_expr(env, session, value)?;
            session.unify(env, &value_ty, &target_ty, span)?;
            Ok(Type::unit())
        }

        ExprKind::Lambda(lambda) => lambda_ref(env, session, lambda, span),

        ExprKind::Block(stmts) => {
            session.enter_scope();
            let mut last = Ok(Type::unit());
            for stmt in stmts {
                last = infer_expr(env, session, stmt);
                if last.is_err() {
                    break;
                }
            }
            session.exit_scope();
            last
        }

        ExprKind::Construct { ctor, args } => {
            let info = ctor_info(env, ctor, span)?;
            if args.len() != info.fields.len() {
                return Err(Diagnostic::error(
                    Category::TypeMismatch,
                    format!(
                        "constructor `{ctor}` takes {} field(s), found {}",
                        info.fields.len(),
                        args.len()
                    ),
                )
                .at(span_to_location(span)));
            }
            let mut mapping = BTreeMap::new();
            let result = freshen_with(&info.result, &mut env.supply, &mut mapping);
            for (arg, (_, field)) in args.iter().zip(&info.fields) {
                let field = freshen_with(field, &mut env.supply, &mut mapping);
                let arg_ty = infer_expr(env, session, arg)?;
                session.unify(env, &arg_ty, &field, arg.span)?;
            }
            Ok(session.resolve(env, &result))
        }

        ExprKind::TagTest { ctor, value } => {
            let info = ctor_info(env, ctor, span)?;
            let subject = freshen(&info.result, &mut env.supply);
            let value_ty = infer_expr(env, session, value)?;
            session.unify(env, &value_ty, &subject, value.span)?;
            Ok(Type::bool())
        }

        ExprKind::FieldGet { ctor, index, value } => {
            let info = ctor_info(env, ctor, span)?;
            let Some((_, field)) = info.fields.get(*index) else {
                return Err(Diagnostic::error(
                    Category::TypeMismatch,
                    format!("constructor `{ctor}` has no field {index}"),
                )
                .at(span_to_location(span)));
            };
            let mut mapping = BTreeMap::new();
            let subject = freshen_with(&info.result, &mut env.supply, &mut mapping);
            let field = freshen_with(field, &mut env.supply, &mut mapping);
            let value_ty = infer_expr(env, session, value)?;
            session.unify(env, &value_ty, &subject, value.span)?;
            Ok(session.resolve(env, &field))
        }
    }
}

fn global_ref(
    env: &GlobalEnv,
    session: &mut Session,
    name: &str,
    site: SiteId,
    span: Span,
) -> Result<Type, Diagnostic> {
    if !env.has_func(name) {
        return Err(Diagnostic::error(
            Category::UndefinedGlobal,
            format!("undefined global `{name}`"),
        )
        .at(span_to_location(span)));
    }
    session.sites.insert(site, span);
    Ok(Type::overloaded(name, site))
}

/// Lift a lambda to a synthetic global and reference it.
fn lambda_ref(
    env: &mut GlobalEnv,
    session: &mut Session,
    lambda: &LambdaExpr,
    span: Span,
) -> Result<Type, Diagnostic> {
    let mut captures = Vec::with_capacity(lambda.captures.len());
    for capture in &lambda.captures {
        let Some(ty) = session.local(capture.outer) else {
            return Err(Diagnostic::error(
                Category::UndefinedLocal,
                format!("captured local `{}` is not bound", capture.name),
            )
            .at(span_to_location(span)));
        };
        captures.push((capture.inner, session.resolve(env, ty)));
    }
    let signature = env.declared_signature(&lambda.params, span)?;
    let body = SourceBody {
        params: lambda.params.clone(),
        captures,
        body: (*lambda.body).clone(),
    };
    let name = env.register_lambda(signature, body, span);
    session.sites.insert(lambda.site, span);
    Ok(Type::overloaded(name, lambda.site))
}

fn ctor_info(env: &GlobalEnv, ctor: &str, span: Span) -> Result<CtorInfo, Diagnostic> {
    env.types.ctor(ctor).cloned().ok_or_else(|| {
        Diagnostic::error(
            Category::UndefinedGlobal,
            format!("undefined constructor `{ctor}`"),
        )
        .at(span_to_location(span))
    })
}
