//! Unification over ordered lists of types.
//!
//! Both lists are walked pairwise. At each position the current solution is
//! applied to both sides first, so bindings made earlier in the walk
//! constrain later positions. An overloaded reference on the left hands the
//! position, together with both remaining tails, to overload resolution.

use std::collections::BTreeMap;

use jup_ast::{SiteId, Span};
use jup_diag::Diagnostic;
use jup_types::{Substitution, Type, TypeKind};

use crate::env::{CellStore, GlobalEnv, InstanceId};
use crate::overload::{self, OverloadRef};
use crate::trace::UnifyAction;

/// Source spans of the overloaded references in one body, for diagnostics.
pub type SiteSpans = BTreeMap<SiteId, Span>;

/// A substitution together with the overload resolutions made under it.
///
/// Overload trials clone the whole solution, so a losing candidate can never
/// leave a binding or a site resolution behind.
#[derive(Debug, Clone, Default)]
pub struct Solution {
    pub subst: Substitution,
    pub resolutions: BTreeMap<SiteId, InstanceId>,
}

impl Solution {
    /// Apply the substitution, then the return cells it does not bind.
    pub fn resolve(&self, cells: &CellStore, ty: &Type) -> Type {
        let mut expanding = Vec::new();
        self.resolve_with(cells, ty, &mut expanding)
    }

    fn resolve_with(
        &self,
        cells: &CellStore,
        ty: &Type,
        expanding: &mut Vec<jup_types::TypeVarId>,
    ) -> Type {
        let ty = self.subst.apply(ty);
        if cells.is_empty() {
            return ty;
        }
        ty.map_leaves(&mut |leaf| {
            let var = leaf.as_var()?;
            if expanding.contains(&var.id) {
                return None;
            }
            let stored = cells.get(var.id)?;
            expanding.push(var.id);
            let resolved = self.resolve_with(cells, stored, expanding);
            expanding.pop();
            Some(resolved)
        })
    }
}

/// Why a unification did not go through.
#[derive(Debug)]
pub enum UnifyFailure {
    /// Structural mismatch, or no overload fits. Discards an overload trial.
    Mismatch,
    /// The occurs check rejected `var := ty`.
    InfiniteType { var: Type, ty: Type },
    /// An error that must abort inference (ambiguity, a failed instance).
    Fatal(Box<Diagnostic>),
}

impl From<Diagnostic> for UnifyFailure {
    fn from(diag: Diagnostic) -> Self {
        UnifyFailure::Fatal(Box::new(diag))
    }
}

/// Unify `left` with `right` pairwise, extending `solution`.
///
/// On failure `solution` may hold partial bindings; callers either discard
/// it (trials) or abort.
pub fn unify(
    env: &mut GlobalEnv,
    sites: &SiteSpans,
    solution: &mut Solution,
    left: &[Type],
    right: &[Type],
) -> Result<(), UnifyFailure> {
    for (i, (l, r)) in left.iter().zip(right).enumerate() {
        let mut t1 = solution.resolve(&env.cells, l);
        let mut t2 = solution.resolve(&env.cells, r);

        if let TypeKind::Overloaded { name, site } = t1.kind() {
            env.record_unify(UnifyAction::Overload, &t1, &t2);
            let reference = OverloadRef {
                name: name.clone(),
                site: *site,
            };
            return overload::resolve(
                env,
                sites,
                solution,
                &reference,
                &t2,
                &left[i + 1..],
                &right[i + 1..],
            );
        }

        if !t1.is_var() && t2.is_var() {
            std::mem::swap(&mut t1, &mut t2);
        }

        match t1.kind() {
            TypeKind::Var(var) => {
                if t2.as_var() == Some(var) {
                    env.record_unify(UnifyAction::Identity, &t1, &t2);
                    continue;
                }
                if env.options.occurs_check && t2.occurs(var.id) {
                    env.record_unify(UnifyAction::OccursCheck, &t1, &t2);
                    return Err(UnifyFailure::InfiniteType {
                        var: t1.clone(),
                        ty: t2,
                    });
                }
                env.record_unify(UnifyAction::Bind, &t1, &t2);
                solution.subst.bind_var(var.id, t2);
            }
            TypeKind::Concrete { name, args } => match t2.as_concrete() {
                Some((other, other_args))
                    if other == name.as_str() && other_args.len() == args.len() =>
                {
                    env.record_unify(UnifyAction::Decompose, &t1, &t2);
                    unify(env, sites, solution, args, other_args)?;
                }
                _ => {
                    env.record_unify(UnifyAction::Error, &t1, &t2);
                    return Err(UnifyFailure::Mismatch);
                }
            },
            _ => {
                env.record_unify(UnifyAction::Error, &t1, &t2);
                return Err(UnifyFailure::Mismatch);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InferOptions;
    use jup_types::TypeVarId;

    fn unify_pair(env: &mut GlobalEnv, solution: &mut Solution, a: &Type, b: &Type) -> bool {
        unify(
            env,
            &SiteSpans::new(),
            solution,
            std::slice::from_ref(a),
            std::slice::from_ref(b),
        )
        .is_ok()
    }

    #[test]
    fn ground_types_unify_without_bindings() {
        let mut env = GlobalEnv::new();
        let mut solution = Solution::default();
        let ty = Type::function(vec![Type::list(Type::int())], Type::tuple(vec![]));
        assert!(unify_pair(&mut env, &mut solution, &ty, &ty.clone()));
        assert!(solution.subst.is_empty());
    }

    #[test]
    fn variable_binds_to_concrete() {
        let mut env = GlobalEnv::new();
        let mut solution = Solution::default();
        let v = env.fresh();
        assert!(unify_pair(&mut env, &mut solution, &v, &Type::int()));
        assert_eq!(solution.resolve(&env.cells, &v), Type::int());
    }

    #[test]
    fn variable_on_the_right_is_bound() {
        let mut env = GlobalEnv::new();
        let mut solution = Solution::default();
        let v = env.fresh();
        let list = Type::list(Type::str());
        assert!(unify_pair(&mut env, &mut solution, &list, &v));
        assert_eq!(solution.resolve(&env.cells, &v), list);
    }

    #[test]
    fn same_variable_adds_no_rule() {
        let mut env = GlobalEnv::new();
        let mut solution = Solution::default();
        let v = env.fresh();
        assert!(unify_pair(&mut env, &mut solution, &v, &v.clone()));
        assert!(solution.subst.is_empty());
    }

    #[test]
    fn name_and_arity_mismatches_fail() {
        let mut env = GlobalEnv::new();
        let a = env.fresh();
        let b = env.fresh();
        assert!(!unify_pair(
            &mut env,
            &mut Solution::default(),
            &Type::int(),
            &Type::bool()
        ));
        assert!(!unify_pair(
            &mut env,
            &mut Solution::default(),
            &Type::tuple(vec![a.clone(), b]),
            &Type::tuple(vec![a])
        ));
    }

    #[test]
    fn earlier_bindings_constrain_later_positions() {
        let mut env = GlobalEnv::new();
        let mut solution = Solution::default();
        let v = env.fresh();
        let result = unify(
            &mut env,
            &SiteSpans::new(),
            &mut solution,
            &[v.clone(), v.clone()],
            &[Type::int(), Type::str()],
        );
        assert!(matches!(result, Err(UnifyFailure::Mismatch)));
    }

    #[test]
    fn cyclic_binding_is_accepted_without_occurs_check() {
        let mut env = GlobalEnv::new();
        let mut solution = Solution::default();
        let v = env.fresh();
        let list = Type::list(v.clone());
        assert!(unify_pair(&mut env, &mut solution, &v, &list));
        assert_eq!(solution.resolve(&env.cells, &v), list);
    }

    #[test]
    fn occurs_check_rejects_cyclic_binding() {
        let mut env = GlobalEnv::with_options(InferOptions::default().with_occurs_check(true));
        let mut solution = Solution::default();
        let v = env.fresh();
        let result = unify(
            &mut env,
            &SiteSpans::new(),
            &mut solution,
            std::slice::from_ref(&v),
            &[Type::list(v.clone())],
        );
        assert!(matches!(result, Err(UnifyFailure::InfiniteType { .. })));
    }

    #[test]
    fn wildcard_and_invalid_never_unify() {
        let mut env = GlobalEnv::new();
        assert!(!unify_pair(
            &mut env,
            &mut Solution::default(),
            &Type::wildcard(),
            &Type::int()
        ));
        assert!(!unify_pair(
            &mut env,
            &mut Solution::default(),
            &Type::invalid(),
            &Type::invalid()
        ));
    }

    #[test]
    fn resolve_reads_through_return_cells() {
        let mut env = GlobalEnv::new();
        let cell = env.fresh();
        let cell_id = cell.as_var().map(|v| v.id).unwrap_or(TypeVarId(0));
        env.cells.set(cell_id, Type::int());

        let solution = Solution::default();
        assert_eq!(
            solution.resolve(&env.cells, &Type::tuple(vec![cell.clone(), cell])),
            Type::tuple(vec![Type::int(), Type::int()])
        );
    }

    #[test]
    fn self_referencing_cell_resolves_once() {
        let mut env = GlobalEnv::new();
        let cell = env.fresh();
        let cell_id = cell.as_var().map(|v| v.id).unwrap_or(TypeVarId(0));
        env.cells.set(cell_id, Type::list(cell.clone()));

        let solution = Solution::default();
        assert_eq!(
            solution.resolve(&env.cells, &cell),
            Type::list(cell.clone())
        );
    }

    #[test]
    fn tracing_records_steps_only_when_enabled() {
        let mut quiet = GlobalEnv::new();
        let v = quiet.fresh();
        assert!(unify_pair(&mut quiet, &mut Solution::default(), &v, &Type::int()));
        assert!(quiet.trace().unify.is_empty());

        let mut traced = GlobalEnv::with_options(InferOptions::default().with_trace(true));
        let v = traced.fresh();
        let list = Type::list(v);
        assert!(unify_pair(
            &mut traced,
            &mut Solution::default(),
            &list,
            &Type::list(Type::int())
        ));
        let actions: Vec<UnifyAction> = traced.trace().unify.iter().map(|s| s.action).collect();
        assert_eq!(actions, vec![UnifyAction::Decompose, UnifyAction::Bind]);
        assert_eq!(traced.trace().unify[1].left, "\\a");
    }
}
