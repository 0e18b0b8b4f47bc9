//! Property tests for the unifier, specificity ranking and the instance
//! cache.
//!
//! 1. Unifying a ground type with itself adds no rules
//! 2. Ground types unify exactly when they are equal
//! 3. With the occurs check on, a successful unification makes both sides
//!    resolve to the same type
//! 4. `compare` is antisymmetric
//! 5. Instantiating at the same signature twice returns the cached instance

use proptest::prelude::*;

use jup_ast::{ExprKind, FileId, FnDecl, LocalRef, LocalSlot, Param, Span, Spanned};
use jup_types::{Signature, Type, TypeVar, TypeVarId};

use crate::env::GlobalEnv;
use crate::overload::{Specificity, compare};
use crate::unify::{SiteSpans, Solution, unify};
use crate::{InferOptions, instantiate};

fn var_type(id: u32) -> Type {
    Type::var(TypeVar {
        id: TypeVarId(id),
        name: None,
    })
}

fn arb_ground_type(depth: u32) -> BoxedStrategy<Type> {
    let leaf = prop_oneof![
        Just(Type::int()),
        Just(Type::real()),
        Just(Type::str()),
        Just(Type::bool()),
    ];
    if depth == 0 {
        return leaf.boxed();
    }
    let inner = arb_ground_type(depth - 1);
    prop_oneof![
        3 => leaf,
        1 => inner.clone().prop_map(Type::list),
        1 => prop::collection::vec(inner.clone(), 0..=3).prop_map(Type::tuple),
        1 => (prop::collection::vec(inner.clone(), 0..=2), inner)
            .prop_map(|(params, ret)| Type::function(params, ret)),
    ]
    .boxed()
}

fn arb_type(depth: u32) -> BoxedStrategy<Type> {
    let leaf = prop_oneof![
        3 => arb_ground_type(0),
        2 => (0u32..6).prop_map(var_type),
    ];
    if depth == 0 {
        return leaf.boxed();
    }
    let inner = arb_type(depth - 1);
    prop_oneof![
        3 => leaf,
        1 => inner.clone().prop_map(Type::list),
        1 => prop::collection::vec(inner.clone(), 1..=3).prop_map(Type::tuple),
        1 => (prop::collection::vec(inner.clone(), 0..=2), inner)
            .prop_map(|(params, ret)| Type::function(params, ret)),
    ]
    .boxed()
}

/// An environment whose supply starts past every generated variable id.
fn env_with(options: InferOptions) -> GlobalEnv {
    let mut env = GlobalEnv::with_options(options);
    for _ in 0..6 {
        env.fresh();
    }
    env
}

fn unify_one(env: &mut GlobalEnv, solution: &mut Solution, a: &Type, b: &Type) -> bool {
    unify(
        env,
        &SiteSpans::new(),
        solution,
        std::slice::from_ref(a),
        std::slice::from_ref(b),
    )
    .is_ok()
}

fn flip(result: Specificity) -> Specificity {
    match result {
        Specificity::FirstBetter => Specificity::SecondBetter,
        Specificity::SecondBetter => Specificity::FirstBetter,
        other => other,
    }
}

proptest! {
    #[test]
    fn ground_unification_is_reflexive(ty in arb_ground_type(3)) {
        let mut env = env_with(InferOptions::default());
        let mut solution = Solution::default();
        prop_assert!(unify_one(&mut env, &mut solution, &ty, &ty.clone()));
        prop_assert!(solution.subst.is_empty());
    }

    #[test]
    fn ground_types_unify_iff_equal(a in arb_ground_type(2), b in arb_ground_type(2)) {
        let mut env = env_with(InferOptions::default());
        let unified = unify_one(&mut env, &mut Solution::default(), &a, &b);
        prop_assert_eq!(unified, a == b);
    }

    #[test]
    fn unified_sides_resolve_equal(a in arb_type(3), b in arb_type(3)) {
        let mut env = env_with(InferOptions::default().with_occurs_check(true));
        let mut solution = Solution::default();
        if unify_one(&mut env, &mut solution, &a, &b) {
            prop_assert_eq!(
                solution.resolve(&env.cells, &a),
                solution.resolve(&env.cells, &b)
            );
        }
    }

    #[test]
    fn compare_is_antisymmetric(
        model in arb_type(2),
        first in arb_type(2),
        second in arb_type(2),
    ) {
        prop_assert_eq!(
            compare(&model, &first, &second),
            flip(compare(&model, &second, &first))
        );
    }

    #[test]
    fn identical_signatures_share_an_instance(ty in arb_ground_type(2)) {
        let span = Span::new(FileId(0), 0, 1);
        let mut env = GlobalEnv::new();
        let id = env
            .register_function(&FnDecl {
                name: "id".into(),
                params: vec![Param {
                    name: "x".into(),
                    slot: LocalSlot(0),
                    annotation: None,
                    span,
                }],
                body: Spanned::new(
                    ExprKind::Local(LocalRef {
                        name: "x".into(),
                        slot: LocalSlot(0),
                    }),
                    span,
                ),
                span,
            })
            .expect("registers");
        let signature = Signature::new(vec![("x".into(), ty.clone())], span);

        let first = instantiate(&mut env, id, signature.clone()).expect("first");
        let second = instantiate(&mut env, id, signature).expect("second");
        prop_assert_eq!(first, second);
        prop_assert_eq!(&env.instance(first).ret, &ty);
        prop_assert_eq!(env.overload(id).instances.len(), 1);
    }
}
