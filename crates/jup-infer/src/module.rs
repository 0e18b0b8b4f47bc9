//! Module-level driver.
//!
//! Registers a module's declarations and instantiates every function whose
//! declared signature is already concrete. Each such instantiation is its
//! own failure domain: one bad function does not stop the others from being
//! checked, and all errors are reported together.

use jup_ast::{Expr, ExprKind, FnDecl, GlobalRef, Module, SiteId, Span, Spanned};
use jup_diag::{Category, Diagnostic, DiagnosticError};
use jup_types::Signature;

use crate::env::{GlobalEnv, InstanceId, OverloadId, OverloadOrigin};
use crate::instantiate::instantiate;

/// Name of the synthetic definition that calls the program's entry point.
pub const ENTRY: &str = "#entry";

/// Register every type declaration and function of `module`.
///
/// Returns the overloads created for the module's own functions.
pub fn register_module(
    env: &mut GlobalEnv,
    module: &Module,
) -> Result<Vec<OverloadId>, DiagnosticError> {
    let mut errors = Vec::new();
    let ids = register_all(env, module, &mut errors);
    if errors.is_empty() {
        Ok(ids)
    } else {
        Err(DiagnosticError::multiple(errors))
    }
}

fn register_all(
    env: &mut GlobalEnv,
    module: &Module,
    errors: &mut Vec<Diagnostic>,
) -> Vec<OverloadId> {
    for decl in &module.types {
        if let Err(diag) = env.register_type(decl) {
            errors.push(diag);
        }
    }
    let mut ids = Vec::with_capacity(module.functions.len());
    for decl in &module.functions {
        match env.register_function(decl) {
            Ok(id) => ids.push(id),
            Err(diag) => errors.push(diag),
        }
    }
    ids
}

/// Register `module` and instantiate each function with a fully concrete
/// declared signature.
///
/// Generic functions are only instantiated when something calls them.
pub fn check_module(
    env: &mut GlobalEnv,
    module: &Module,
) -> Result<Vec<InstanceId>, DiagnosticError> {
    let mut errors = Vec::new();
    let overloads = register_all(env, module, &mut errors);

    let mut instances = Vec::new();
    for id in overloads {
        let signature = env.overload(id).signature.clone();
        if !signature.is_ground() {
            continue;
        }
        match instantiate(env, id, signature) {
            Ok(instance) => instances.push(instance),
            Err(diag) => errors.push(diag),
        }
    }
    log::debug!(
        "checked module `{}`: {} instance(s), {} error(s)",
        module.name,
        instances.len(),
        errors.len()
    );

    if errors.is_empty() {
        Ok(instances)
    } else {
        Err(DiagnosticError::multiple(errors))
    }
}

/// Instantiate the synthetic `#entry` definition, whose body calls `main()`.
///
/// Calling this again returns the cached instance.
pub fn instantiate_entry(env: &mut GlobalEnv, main: &str) -> Result<InstanceId, Diagnostic> {
    if !env.has_func(main) {
        return Err(Diagnostic::error(
            Category::UndefinedGlobal,
            format!("entry point `{main}` is not defined"),
        ));
    }
    let existing = env.func(ENTRY).and_then(|func| func.overloads.first().copied());
    let overload = match existing {
        Some(id) => id,
        None => {
            let span = Span::synthetic();
            let callee: Expr = Spanned::new(
                ExprKind::Global(GlobalRef {
                    name: main.to_string(),
                    site: SiteId(0),
                }),
                span,
            );
            let decl = FnDecl {
                name: ENTRY.to_string(),
                params: Vec::new(),
                body: Spanned::new(
                    ExprKind::Call {
                        func: Box::new(callee),
                        args: Vec::new(),
                    },
                    span,
                ),
                span,
            };
            env.register_source(&decl, OverloadOrigin::Entry)?
        }
    };
    instantiate(env, overload, Signature::empty())
}
