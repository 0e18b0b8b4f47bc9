//! Overload resolution and specificity ranking.
//!
//! An overloaded reference `f` meeting a model type (usually
//! `Fn(args..., ret)`) is resolved by trying every overload of `f` on a copy
//! of the current solution. Survivors are ranked by how concretely they
//! match the model; the unique best one is instantiated for the call's
//! concrete signature and its function type is unified back into the model.

use jup_ast::{SiteId, Span};
use jup_diag::{Category, Diagnostic};
use jup_types::{Signature, Type, display_type};

use crate::env::{GlobalEnv, OverloadId};
use crate::instantiate::instantiate;
use crate::span_to_location;
use crate::trace::{ResolveOutcome, ResolveStep};
use crate::unify::{SiteSpans, Solution, UnifyFailure, unify};

/// An unresolved reference to a global at one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverloadRef {
    pub name: String,
    pub site: SiteId,
}

/// Which of two candidate types represents the model better.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Specificity {
    Same,
    Ambiguous,
    FirstBetter,
    SecondBetter,
}

/// Compare two candidate types against the model they both unify with.
///
/// A concrete type beats a variable. Two concrete types compare their
/// arguments position by position: one is better if it is better at some
/// position and never worse; mixed results (or any ambiguous position) make
/// them ambiguous. A variable in the model makes its position a tie.
pub fn compare(model: &Type, first: &Type, second: &Type) -> Specificity {
    if model.is_var() {
        return Specificity::Same;
    }
    match (first.is_var(), second.is_var()) {
        (true, true) => return Specificity::Same,
        (true, false) => return Specificity::SecondBetter,
        (false, true) => return Specificity::FirstBetter,
        (false, false) => {}
    }
    let (Some((_, model_args)), Some((_, first_args)), Some((_, second_args))) = (
        model.as_concrete(),
        first.as_concrete(),
        second.as_concrete(),
    ) else {
        return Specificity::Same;
    };

    let mut result = Specificity::Same;
    for ((m, a), b) in model_args.iter().zip(first_args).zip(second_args) {
        match compare(m, a, b) {
            Specificity::Same => {}
            Specificity::Ambiguous => return Specificity::Ambiguous,
            side if result == Specificity::Same => result = side,
            side if side != result => return Specificity::Ambiguous,
            _ => {}
        }
    }
    result
}

/// A candidate that unified with the model on its own trial solution.
struct Candidate {
    overload: OverloadId,
    /// Freshened declared type, before unification.
    ty: Type,
    solution: Solution,
}

/// Indices of the candidates no other candidate is strictly better than.
fn most_specific(model: &Type, candidates: &[Candidate]) -> Vec<usize> {
    (0..candidates.len())
        .filter(|&i| {
            !(0..candidates.len()).any(|j| {
                j != i
                    && compare(model, &candidates[j].ty, &candidates[i].ty)
                        == Specificity::FirstBetter
            })
        })
        .collect()
}

/// Resolve `reference` against `model`, unifying the remaining tails inside
/// each trial.
pub(crate) fn resolve(
    env: &mut GlobalEnv,
    sites: &SiteSpans,
    solution: &mut Solution,
    reference: &OverloadRef,
    model: &Type,
    left_tail: &[Type],
    right_tail: &[Type],
) -> Result<(), UnifyFailure> {
    let span = sites
        .get(&reference.site)
        .copied()
        .unwrap_or_else(Span::synthetic);
    let Some(func) = env.func(&reference.name) else {
        return Err(Diagnostic::error(
            Category::UndefinedGlobal,
            format!("undefined global `{}`", reference.name),
        )
        .at(span_to_location(span))
        .into());
    };
    let overloads = func.overloads.clone();

    let mut left = Vec::with_capacity(left_tail.len() + 1);
    left.push(model.clone());
    left.extend_from_slice(left_tail);

    let mut candidates = Vec::new();
    for overload in overloads {
        let ty = env.candidate_type(overload);
        let mut right = Vec::with_capacity(right_tail.len() + 1);
        right.push(ty.clone());
        right.extend_from_slice(right_tail);

        let mut trial = solution.clone();
        match unify(env, sites, &mut trial, &left, &right) {
            Ok(()) => {}
            Err(UnifyFailure::Fatal(diag)) => return Err(UnifyFailure::Fatal(diag)),
            Err(_) => continue,
        }

        // A parameter that is still a bare variable means the call does not
        // determine this overload's instance.
        let resolved = trial.resolve(&env.cells, &ty);
        let undetermined = resolved
            .as_function()
            .is_some_and(|(params, _)| params.iter().any(Type::is_var));
        if undetermined {
            continue;
        }
        candidates.push(Candidate {
            overload,
            ty,
            solution: trial,
        });
    }

    let best = most_specific(model, &candidates);
    record(env, reference, model, &candidates, &best);

    if candidates.is_empty() {
        return Err(UnifyFailure::Mismatch);
    }
    if best.len() > 1 {
        let mut diag = Diagnostic::error(
            Category::AmbiguousOverload,
            format!("ambiguous use of function '{}'", reference.name),
        )
        .at(span_to_location(span))
        .with_note(format!("given: {}", display_type(model)));
        for &i in &best {
            diag = diag.with_note(format!("  candidate: {}", display_type(&candidates[i].ty)));
        }
        return Err(diag.into());
    }

    let Some(winner) = best.first().map(|&i| candidates.swap_remove(i)) else {
        return Err(UnifyFailure::Mismatch);
    };
    *solution = winner.solution;

    let fn_type = solution.resolve(&env.cells, &winner.ty);
    let params: Vec<Type> = fn_type
        .as_function()
        .map(|(params, _)| params.to_vec())
        .unwrap_or_default();
    let names = env
        .overload(winner.overload)
        .signature
        .params
        .iter()
        .map(|(name, _)| name.clone());
    let signature = Signature::new(names.zip(params).collect(), span);

    let instance = instantiate(env, winner.overload, signature)?;
    let result_type = env.instance_fn_type(instance);

    unify(
        env,
        sites,
        solution,
        std::slice::from_ref(&result_type),
        std::slice::from_ref(model),
    )?;
    solution.subst.bind_site(reference.site, result_type);
    solution.resolutions.insert(reference.site, instance);
    Ok(())
}

fn record(
    env: &mut GlobalEnv,
    reference: &OverloadRef,
    model: &Type,
    candidates: &[Candidate],
    best: &[usize],
) {
    if !env.tracing() {
        return;
    }
    let outcome = match best.len() {
        0 => ResolveOutcome::NoMatch,
        1 => ResolveOutcome::Resolved,
        _ => ResolveOutcome::Ambiguous,
    };
    env.record_resolve(ResolveStep {
        function: reference.name.clone(),
        site: reference.site.0,
        model: display_type(model),
        survivors: candidates.iter().map(|c| display_type(&c.ty)).collect(),
        best: best.iter().map(|&i| display_type(&candidates[i].ty)).collect(),
        outcome,
    });
}
