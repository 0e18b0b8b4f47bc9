//! Synthetic modules for benchmarking the inference engine.
//!
//! Each builder returns declarations that type-check; the benches measure
//! `check_module` over them at growing sizes.

use jup_ast::{
    Expr, ExprKind, FileId, FnDecl, GlobalRef, Lit, LocalRef, LocalSlot, Module, Param, SiteId,
    Span, Spanned, TypeAnnotation,
};
use jup_infer::GlobalEnv;
use jup_types::Type;

fn span() -> Span {
    Span::new(FileId(0), 0, 0)
}

fn expr(kind: ExprKind) -> Expr {
    Spanned::new(kind, span())
}

fn int(n: i64) -> Expr {
    expr(ExprKind::Lit(Lit::Int(n)))
}

fn arg(slot: u32) -> Expr {
    expr(ExprKind::Local(LocalRef {
        name: format!("x{slot}"),
        slot: LocalSlot(slot),
    }))
}

fn call(name: impl Into<String>, site: u32, args: Vec<Expr>) -> Expr {
    expr(ExprKind::Call {
        func: Box::new(expr(ExprKind::Global(GlobalRef {
            name: name.into(),
            site: SiteId(site),
        }))),
        args,
    })
}

fn int_param() -> Param {
    Param {
        name: "x0".into(),
        slot: LocalSlot(0),
        annotation: Some(Spanned::new(TypeAnnotation::named("Int"), span())),
        span: span(),
    }
}

fn func(name: impl Into<String>, params: Vec<Param>, body: Expr) -> FnDecl {
    FnDecl {
        name: name.into(),
        params,
        body,
        span: span(),
    }
}

fn module(name: &str, functions: Vec<FnDecl>) -> Module {
    Module {
        name: name.into(),
        types: Vec::new(),
        functions,
    }
}

/// Integer `add`, `sub` and `eq` as runtime functions.
pub fn prelude(env: &mut GlobalEnv) {
    for (name, internal, ret) in [
        ("add", "ju_int_add", Type::int()),
        ("sub", "ju_int_sub", Type::int()),
        ("eq", "ju_int_eq", Type::bool()),
    ] {
        let params = vec![("a".to_string(), Type::int()), ("b".to_string(), Type::int())];
        env.register_extern(name, params, ret, internal);
    }
}

/// `f0(x) = add(x, 0)` and `fi(x) = add(f{i-1}(x), i)`.
pub fn call_chain(length: usize) -> Module {
    let functions = (0..length)
        .map(|i| {
            let inner = if i == 0 {
                arg(0)
            } else {
                call(format!("f{}", i - 1), 0, vec![arg(0)])
            };
            func(
                format!("f{i}"),
                vec![int_param()],
                call("add", 1, vec![inner, int(i as i64)]),
            )
        })
        .collect();
    module("chain", functions)
}

/// `width` overloads of `pick` on `List(...List(Int))` of increasing depth,
/// one generic fallback, and a `main` calling each of them.
pub fn overload_fanout(width: usize) -> Module {
    let list_of = |depth: usize| {
        (0..depth).fold(TypeAnnotation::named("Int"), |inner, _| {
            TypeAnnotation::applied("List", vec![inner])
        })
    };

    let mut functions: Vec<FnDecl> = (0..width)
        .map(|depth| {
            let annotation = list_of(depth);
            let param = Param {
                annotation: Some(Spanned::new(annotation, span())),
                ..int_param()
            };
            func("pick", vec![param], int(depth as i64))
        })
        .collect();
    functions.push(func(
        "pick",
        vec![Param {
            annotation: None,
            ..int_param()
        }],
        int(-1),
    ));

    // Every reference in `main` needs its own site.
    let mut site = 0;
    let mut next_site = || {
        site += 1;
        site
    };
    let calls = (0..width)
        .map(|depth| {
            let value = (0..depth).fold(int(1), |inner, _| {
                call("single", next_site(), vec![inner])
            });
            call("pick", next_site(), vec![value])
        })
        .collect();
    functions.push(func("main", Vec::new(), expr(ExprKind::Tuple(calls))));
    module("fanout", functions)
}

/// The runtime `single(x: \a) -> List(\a)` used by [`overload_fanout`].
pub fn list_prelude(env: &mut GlobalEnv) {
    let a = env.fresh_named("a");
    env.register_extern(
        "single",
        vec![("x".to_string(), a.clone())],
        Type::list(a),
        "ju_list_single",
    );
}

/// `size` functions calling each other in a ring, each counting down to 0.
pub fn recursion_ring(size: usize) -> Module {
    let functions = (0..size)
        .map(|i| {
            let next = format!("r{}", (i + 1) % size);
            func(
                format!("r{i}"),
                vec![int_param()],
                expr(ExprKind::If {
                    condition: Box::new(call("eq", 0, vec![arg(0), int(0)])),
                    then_branch: Box::new(int(0)),
                    else_branch: Box::new(call(
                        next,
                        1,
                        vec![call("sub", 2, vec![arg(0), int(1)])],
                    )),
                }),
            )
        })
        .collect();
    module("ring", functions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jup_infer::check_module;

    #[test]
    fn call_chain_checks() {
        let mut env = GlobalEnv::new();
        prelude(&mut env);
        let instances = check_module(&mut env, &call_chain(8)).expect("chain checks");
        assert_eq!(instances.len(), 8);
    }

    #[test]
    fn overload_fanout_picks_each_depth() {
        let mut env = GlobalEnv::new();
        list_prelude(&mut env);
        let instances = check_module(&mut env, &overload_fanout(4)).expect("fanout checks");
        let main = *instances.last().expect("main instance");
        assert_eq!(env.instance(main).ret, Type::tuple(vec![Type::int(); 4]));
        // The generic fallback is never the best match.
        let generic = env.func("pick").expect("pick").overloads[4];
        assert!(env.overload(generic).instances.is_empty());
    }

    #[test]
    fn recursion_ring_checks() {
        let mut env = GlobalEnv::new();
        prelude(&mut env);
        let instances = check_module(&mut env, &recursion_ring(5)).expect("ring checks");
        assert_eq!(instances.len(), 5);
        assert!(instances.iter().all(|&id| env.instance(id).ret == Type::int()));
    }
}
