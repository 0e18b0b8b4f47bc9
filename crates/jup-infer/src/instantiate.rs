//! Memoizing monomorphization driver.
//!
//! `instantiate` produces the instance of one overload for one concrete call
//! signature. Instances are cached per overload and keyed by
//! alpha-equivalent signatures. A new instance is recorded, with a fresh
//! return cell, before its body is inferred, so a recursive call finds it
//! pending and shares the cell instead of recursing forever.

use std::collections::BTreeMap;

use jup_ast::SiteId;
use jup_diag::{Category, Diagnostic};
use jup_types::{Signature, Type, freshen_with};

use crate::env::{GlobalEnv, InstanceId, InstanceState, OverloadBody, OverloadId, SourceBody};
use crate::expr::{Session, infer_expr};
use crate::span_to_location;
use crate::trace::InstantiateOutcome;
use crate::unify::{SiteSpans, Solution, unify};

/// Get or create the instance of `overload` for `signature`.
///
/// On error every instance created during this call, finished or not, is
/// marked failed and will be re-inferred from scratch by a later request.
pub fn instantiate(
    env: &mut GlobalEnv,
    overload: OverloadId,
    signature: Signature,
) -> Result<InstanceId, Diagnostic> {
    if let Some(id) = env.find_instance(overload, &signature) {
        log::debug!(
            "reusing instance of `{}` for {}",
            env.overload(overload).name,
            signature
        );
        let ret = env.instance(id).ret.clone();
        env.record_instantiate(overload, &signature, InstantiateOutcome::Cached, Some(&ret));
        return Ok(id);
    }
    match env.overload(overload).body.clone() {
        OverloadBody::Extern { ret, .. } => instantiate_extern(env, overload, signature, &ret),
        OverloadBody::Source(body) => instantiate_source(env, overload, signature, &body),
    }
}

/// Specialise a runtime-provided overload: match its declared parameters
/// against the call signature and read the return type off the result.
fn instantiate_extern(
    env: &mut GlobalEnv,
    overload: OverloadId,
    signature: Signature,
    declared_ret: &Type,
) -> Result<InstanceId, Diagnostic> {
    let declared = env.overload(overload).signature.clone();
    let name = env.overload(overload).name.clone();
    if declared.arity() != signature.arity() {
        return Err(extern_mismatch(&name, &signature));
    }

    let mut mapping = BTreeMap::new();
    let params: Vec<Type> = declared
        .param_types()
        .map(|ty| freshen_with(ty, &mut env.supply, &mut mapping))
        .collect();
    let ret = freshen_with(declared_ret, &mut env.supply, &mut mapping);
    let actual: Vec<Type> = signature.param_types().cloned().collect();

    let mut solution = Solution::default();
    if unify(env, &SiteSpans::new(), &mut solution, &params, &actual).is_err() {
        return Err(extern_mismatch(&name, &signature));
    }
    let ret = solution.resolve(&env.cells, &ret);

    let cell = env.supply.fresh_var().id;
    let id = env.push_instance(
        overload,
        signature.clone(),
        ret.clone(),
        cell,
        InstanceState::Finished,
    );
    env.record_instantiate(overload, &signature, InstantiateOutcome::Extern, Some(&ret));
    Ok(id)
}

fn extern_mismatch(name: &str, signature: &Signature) -> Diagnostic {
    Diagnostic::error(
        Category::TypeMismatch,
        format!("runtime function `{name}` cannot be called with {signature}"),
    )
    .at(span_to_location(signature.span))
}

fn instantiate_source(
    env: &mut GlobalEnv,
    overload: OverloadId,
    signature: Signature,
    body: &SourceBody,
) -> Result<InstanceId, Diagnostic> {
    let name = env.overload(overload).name.clone();
    log::debug!("instantiating `{name}` for {signature}");

    let cell = env.supply.fresh_var();
    let id = env.push_instance(
        overload,
        signature.clone(),
        Type::var(cell.clone()),
        cell.id,
        InstanceState::Pending,
    );
    env.record_instantiate(overload, &signature, InstantiateOutcome::Started, None);

    match infer_body(env, id, &name, &signature, body) {
        Ok((ret, resolutions)) => {
            log::debug!("`{name}` {signature} returns {ret}");
            env.record_instantiate(overload, &signature, InstantiateOutcome::Finished, Some(&ret));
            env.finish_instance(id, ret, resolutions);
            Ok(id)
        }
        Err(diag) => {
            log::debug!("instance of `{name}` for {signature} failed: {}", diag.message);
            env.record_instantiate(overload, &signature, InstantiateOutcome::Failed, None);
            env.fail_instances_from(id);
            Err(diag)
        }
    }
}

/// Infer an instance body in a fresh session.
///
/// Returns the resolved return type and the site resolutions of the body.
fn infer_body(
    env: &mut GlobalEnv,
    id: InstanceId,
    name: &str,
    signature: &Signature,
    body: &SourceBody,
) -> Result<(Type, BTreeMap<SiteId, InstanceId>), Diagnostic> {
    let mut session = Session::new();

    // The caller's variables stay the caller's: the body sees a renamed copy.
    let mut mapping = BTreeMap::new();
    for (param, (_, ty)) in body.params.iter().zip(&signature.params) {
        let ty = freshen_with(ty, &mut env.supply, &mut mapping);
        session.bind_local(param.slot, ty);
    }
    for (slot, ty) in &body.captures {
        session.bind_local(*slot, ty.clone());
    }

    let body_ty = infer_expr(env, &mut session, &body.body)?;
    let cell = env.instance(id).ret.clone();
    session.unify(env, &body_ty, &cell, body.body.span)?;

    let ret = session.resolve(env, &cell);
    if ret.contains_overloaded() {
        return Err(Diagnostic::error(
            Category::InvalidOverloadedReturn,
            format!("function `{name}` returns an unresolved overloaded function"),
        )
        .at(span_to_location(body.body.span)));
    }
    Ok((ret, session.into_resolutions()))
}
