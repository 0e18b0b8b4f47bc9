//! Ordered substitutions over type variables and overload sites.

use jup_ast::SiteId;

use crate::{Signature, Type, TypeKind, TypeVarId};

/// Left-hand side of a substitution rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Binder {
    Var(TypeVarId),
    /// A resolved overload site; bound to the chosen instance's function type.
    Site(SiteId),
}

#[derive(Debug, Clone, PartialEq)]
struct Rule {
    binder: Binder,
    ty: Type,
}

/// Accumulated bindings produced by unification.
///
/// Rules are kept in the order they were added. A rule's right-hand side
/// may only be rewritten by rules added after it, which is what unification
/// produces (it resolves both operands before binding) and keeps `apply`
/// terminating even when the occurs check is off.
///
/// Cloning is the branch operation: overload trials work on a copy and the
/// caller adopts the winner's copy.
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    rules: Vec<Rule>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Add a rule. No occurs check is performed here.
    pub fn extend(&mut self, binder: Binder, ty: Type) {
        self.rules.push(Rule { binder, ty });
    }

    pub fn bind_var(&mut self, var: TypeVarId, ty: Type) {
        self.extend(Binder::Var(var), ty);
    }

    pub fn bind_site(&mut self, site: SiteId, ty: Type) {
        self.extend(Binder::Site(site), ty);
    }

    pub fn is_bound(&self, binder: Binder) -> bool {
        self.position(binder, 0).is_some()
    }

    fn position(&self, binder: Binder, from: usize) -> Option<usize> {
        self.rules
            .iter()
            .skip(from)
            .position(|rule| rule.binder == binder)
            .map(|i| i + from)
    }

    /// Apply this substitution to a type, replacing all bound variables and
    /// resolved sites. Returns the input node when nothing changed.
    pub fn apply(&self, ty: &Type) -> Type {
        self.apply_from(ty, 0)
    }

    fn apply_from(&self, ty: &Type, from: usize) -> Type {
        if from >= self.rules.len() {
            return ty.clone();
        }
        ty.map_leaves(&mut |leaf| {
            let binder = match leaf.kind() {
                TypeKind::Var(v) => Binder::Var(v.id),
                TypeKind::Overloaded { site, .. } => Binder::Site(*site),
                _ => return None,
            };
            let i = self.position(binder, from)?;
            Some(self.apply_from(&self.rules[i].ty, i + 1))
        })
    }

    /// Apply to every parameter type of a signature, keeping names and span.
    pub fn apply_signature(&self, sig: &Signature) -> Signature {
        Signature {
            params: sig
                .params
                .iter()
                .map(|(name, ty)| (name.clone(), self.apply(ty)))
                .collect(),
            span: sig.span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VarSupply;
    use jup_ast::Span;

    #[test]
    fn substitution_apply_basic() {
        let mut supply = VarSupply::new();
        let a = supply.fresh_var();
        let mut subst = Substitution::new();
        subst.bind_var(a.id, Type::int());

        assert_eq!(subst.apply(&Type::var(a)), Type::int());
    }

    #[test]
    fn substitution_apply_nested() {
        let mut supply = VarSupply::new();
        let a = supply.fresh_var();
        let mut subst = Substitution::new();
        subst.bind_var(a.id, Type::int());

        let ty = Type::list(Type::var(a));
        assert_eq!(subst.apply(&ty), Type::list(Type::int()));
    }

    #[test]
    fn substitution_apply_chain() {
        let mut supply = VarSupply::new();
        let a = supply.fresh_var();
        let b = supply.fresh_var();
        let mut subst = Substitution::new();
        subst.bind_var(a.id, Type::list(Type::var(b.clone())));
        subst.bind_var(b.id, Type::str());

        assert_eq!(subst.apply(&Type::var(a)), Type::list(Type::str()));
    }

    #[test]
    fn substitution_apply_unchanged_returns_same_node() {
        let mut supply = VarSupply::new();
        let a = supply.fresh_var();
        let b = supply.fresh();
        let mut subst = Substitution::new();
        subst.bind_var(a.id, Type::int());

        let ty = Type::tuple(vec![b, Type::list(Type::bool())]);
        assert!(subst.apply(&ty).ptr_eq(&ty));
    }

    #[test]
    fn substitution_self_reference_terminates() {
        let mut supply = VarSupply::new();
        let a = supply.fresh_var();
        let mut subst = Substitution::new();
        subst.bind_var(a.id, Type::list(Type::var(a.clone())));

        assert_eq!(
            subst.apply(&Type::var(a.clone())),
            Type::list(Type::var(a))
        );
    }

    #[test]
    fn substitution_resolves_sites() {
        let mut subst = Substitution::new();
        let resolved = Type::function(vec![Type::int()], Type::int());
        subst.bind_site(SiteId(4), resolved.clone());

        let ty = Type::tuple(vec![Type::overloaded("inc", SiteId(4))]);
        assert_eq!(subst.apply(&ty), Type::tuple(vec![resolved]));
        assert!(subst.is_bound(Binder::Site(SiteId(4))));
        assert!(!subst.is_bound(Binder::Site(SiteId(5))));
    }

    #[test]
    fn substitution_clone_is_independent() {
        let mut supply = VarSupply::new();
        let a = supply.fresh_var();
        let base = Substitution::new();
        let mut branch = base.clone();
        branch.bind_var(a.id, Type::int());

        assert!(base.is_empty());
        assert_eq!(branch.len(), 1);
        assert_eq!(base.apply(&Type::var(a.clone())), Type::var(a));
    }

    #[test]
    fn substitution_apply_signature_keeps_names() {
        let mut supply = VarSupply::new();
        let a = supply.fresh_var();
        let mut subst = Substitution::new();
        subst.bind_var(a.id, Type::real());
        let sig = Signature::new(
            vec![("x".into(), Type::var(a)), ("n".into(), Type::int())],
            Span::synthetic(),
        );

        let applied = subst.apply_signature(&sig);
        assert_eq!(applied.params[0], ("x".to_string(), Type::real()));
        assert_eq!(applied.params[1], ("n".to_string(), Type::int()));
    }
}
