//! Type representations for Jupiter.
//!
//! This crate defines the semantic types used by the unifier, the overload
//! resolver and the instantiation driver. These are distinct from syntactic
//! type annotations (which live in `jup-ast`).
//!
//! Types are immutable trees of reference-counted nodes. Rewriting a type
//! (substitution, freshening) rebuilds only the nodes whose children changed
//! and shares everything else with the input.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use jup_ast::{SiteId, Span};

mod subst;

pub use subst::{Binder, Substitution};

/// Name of the concrete type used for function types: `Fn(params..., ret)`.
pub const FN: &str = "Fn";
/// Name of the concrete type used for tuples; the empty tuple is unit.
pub const TUPLE: &str = "Tuple";
pub const LIST: &str = "List";
pub const INT: &str = "Int";
pub const REAL: &str = "Real";
pub const STR: &str = "Str";
pub const BOOL: &str = "Bool";

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Unique identifier for a type variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVarId(pub u32);

/// A type variable. Identity is the id; the name is only for display.
#[derive(Debug, Clone)]
pub struct TypeVar {
    pub id: TypeVarId,
    pub name: Option<String>,
}

impl PartialEq for TypeVar {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeVar {}

/// Hands out type variables with unique ids.
#[derive(Debug, Clone, Default)]
pub struct VarSupply {
    next: u32,
}

impl VarSupply {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start numbering at `next` (for tests that want stable ids).
    pub fn starting_at(next: u32) -> Self {
        Self { next }
    }

    pub fn fresh_var(&mut self) -> TypeVar {
        let id = TypeVarId(self.next);
        self.next += 1;
        TypeVar { id, name: None }
    }

    pub fn fresh_named_var(&mut self, name: impl Into<String>) -> TypeVar {
        let mut var = self.fresh_var();
        var.name = Some(name.into());
        var
    }

    pub fn fresh(&mut self) -> Type {
        Type::var(self.fresh_var())
    }

    pub fn issued(&self) -> u32 {
        self.next
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// Named type with ordered arguments: `Int`, `List(Str)`, `Fn(Int, Bool)`.
    Concrete { name: String, args: Vec<Type> },
    /// Inference variable.
    Var(TypeVar),
    /// Unresolved reference to the global `name` at `site`.
    ///
    /// Only ever appears as the left operand of a unification step; the
    /// unifier hands it to overload resolution.
    Overloaded { name: String, site: SiteId },
    Wildcard,
    Invalid,
}

/// A shared, immutable semantic type.
#[derive(Clone)]
pub struct Type(Rc<TypeKind>);

impl Type {
    pub fn new(kind: TypeKind) -> Self {
        Type(Rc::new(kind))
    }

    pub fn concrete(name: impl Into<String>, args: Vec<Type>) -> Self {
        Type::new(TypeKind::Concrete {
            name: name.into(),
            args,
        })
    }

    /// Nullary concrete type such as `Int`.
    pub fn named(name: impl Into<String>) -> Self {
        Type::concrete(name, Vec::new())
    }

    pub fn var(var: TypeVar) -> Self {
        Type::new(TypeKind::Var(var))
    }

    pub fn overloaded(name: impl Into<String>, site: SiteId) -> Self {
        Type::new(TypeKind::Overloaded {
            name: name.into(),
            site,
        })
    }

    pub fn wildcard() -> Self {
        Type::new(TypeKind::Wildcard)
    }

    pub fn invalid() -> Self {
        Type::new(TypeKind::Invalid)
    }

    /// The empty tuple.
    pub fn unit() -> Self {
        Type::named(TUPLE)
    }

    pub fn int() -> Self {
        Type::named(INT)
    }

    pub fn real() -> Self {
        Type::named(REAL)
    }

    pub fn str() -> Self {
        Type::named(STR)
    }

    pub fn bool() -> Self {
        Type::named(BOOL)
    }

    pub fn list(elem: Type) -> Self {
        Type::concrete(LIST, vec![elem])
    }

    pub fn tuple(elems: Vec<Type>) -> Self {
        Type::concrete(TUPLE, elems)
    }

    /// `Fn(params..., ret)`.
    pub fn function(params: Vec<Type>, ret: Type) -> Self {
        let mut args = params;
        args.push(ret);
        Type::concrete(FN, args)
    }

    pub fn kind(&self) -> &TypeKind {
        &self.0
    }

    /// True if both handles point at the same node.
    pub fn ptr_eq(&self, other: &Type) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn as_var(&self) -> Option<&TypeVar> {
        match self.kind() {
            TypeKind::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_var(&self) -> bool {
        matches!(self.kind(), TypeKind::Var(_))
    }

    pub fn is_overloaded(&self) -> bool {
        matches!(self.kind(), TypeKind::Overloaded { .. })
    }

    pub fn is_unit(&self) -> bool {
        matches!(self.kind(), TypeKind::Concrete { name, args } if name == TUPLE && args.is_empty())
    }

    /// Name and arguments of a concrete type.
    pub fn as_concrete(&self) -> Option<(&str, &[Type])> {
        match self.kind() {
            TypeKind::Concrete { name, args } => Some((name.as_str(), args.as_slice())),
            _ => None,
        }
    }

    /// Parameters and return type of a function type.
    pub fn as_function(&self) -> Option<(&[Type], &Type)> {
        match self.as_concrete() {
            Some((FN, args)) => args.split_last().map(|(ret, params)| (params, ret)),
            _ => None,
        }
    }

    /// Does a type variable occur anywhere in this type?
    pub fn contains_var(&self) -> bool {
        match self.kind() {
            TypeKind::Var(_) => true,
            TypeKind::Concrete { args, .. } => args.iter().any(Type::contains_var),
            _ => false,
        }
    }

    /// Does an overloaded placeholder occur anywhere in this type?
    pub fn contains_overloaded(&self) -> bool {
        match self.kind() {
            TypeKind::Overloaded { .. } => true,
            TypeKind::Concrete { args, .. } => args.iter().any(Type::contains_overloaded),
            _ => false,
        }
    }

    /// Does `var` occur in this type?
    pub fn occurs(&self, var: TypeVarId) -> bool {
        match self.kind() {
            TypeKind::Var(v) => v.id == var,
            TypeKind::Concrete { args, .. } => args.iter().any(|arg| arg.occurs(var)),
            _ => false,
        }
    }

    /// Structural equality where any two variables match each other.
    pub fn alpha_equivalent(&self, other: &Type) -> bool {
        match (self.kind(), other.kind()) {
            (TypeKind::Var(_), TypeKind::Var(_)) => true,
            (
                TypeKind::Concrete { name: n1, args: a1 },
                TypeKind::Concrete { name: n2, args: a2 },
            ) => {
                n1 == n2
                    && a1.len() == a2.len()
                    && a1.iter().zip(a2).all(|(x, y)| x.alpha_equivalent(y))
            }
            _ => false,
        }
    }

    /// Rebuild this type bottom-up, replacing leaves through `leaf`.
    ///
    /// Nodes whose children all come back pointer-equal are returned as-is.
    pub fn map_leaves(&self, leaf: &mut impl FnMut(&Type) -> Option<Type>) -> Type {
        match self.kind() {
            TypeKind::Concrete { name, args } if !args.is_empty() => {
                let mut changed = false;
                let new_args: Vec<Type> = args
                    .iter()
                    .map(|arg| {
                        let mapped = arg.map_leaves(leaf);
                        if !mapped.ptr_eq(arg) {
                            changed = true;
                        }
                        mapped
                    })
                    .collect();
                if changed {
                    Type::concrete(name.clone(), new_args)
                } else {
                    self.clone()
                }
            }
            TypeKind::Concrete { .. } => self.clone(),
            _ => leaf(self).unwrap_or_else(|| self.clone()),
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0 == other.0
    }
}

impl Eq for Type {}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type(f, self, &|var| match &var.name {
            Some(name) => name.clone(),
            None => format!("t{}", var.id.0),
        })
    }
}

fn write_type(
    f: &mut impl fmt::Write,
    ty: &Type,
    var_name: &dyn Fn(&TypeVar) -> String,
) -> fmt::Result {
    match ty.kind() {
        TypeKind::Concrete { name, args } => {
            write!(f, "{name}")?;
            if !args.is_empty() {
                write!(f, "(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_type(f, arg, var_name)?;
                }
                write!(f, ")")?;
            }
            Ok(())
        }
        TypeKind::Var(var) => write!(f, "\\{}", var_name(var)),
        TypeKind::Overloaded { .. } => write!(f, "<overload>"),
        TypeKind::Wildcard => write!(f, "_"),
        TypeKind::Invalid => write!(f, "??"),
    }
}

// ---------------------------------------------------------------------------
// Free variables, freshening, display
// ---------------------------------------------------------------------------

/// Collect all type variables in a type.
pub fn free_type_vars(ty: &Type) -> BTreeSet<TypeVarId> {
    let mut vars = BTreeSet::new();
    collect_free_type_vars(ty, &mut vars);
    vars
}

fn collect_free_type_vars(ty: &Type, vars: &mut BTreeSet<TypeVarId>) {
    match ty.kind() {
        TypeKind::Var(v) => {
            vars.insert(v.id);
        }
        TypeKind::Concrete { args, .. } => {
            for arg in args {
                collect_free_type_vars(arg, vars);
            }
        }
        _ => {}
    }
}

/// Replace every variable with a fresh one, consistently within `mapping`.
///
/// Share `mapping` across several calls to freshen related types (the
/// parameters of one signature) with the same renaming.
pub fn freshen_with(
    ty: &Type,
    supply: &mut VarSupply,
    mapping: &mut BTreeMap<TypeVarId, Type>,
) -> Type {
    ty.map_leaves(&mut |leaf| {
        let var = leaf.as_var()?;
        let fresh = mapping.entry(var.id).or_insert_with(|| {
            let mut fresh = supply.fresh_var();
            fresh.name = var.name.clone();
            Type::var(fresh)
        });
        Some(fresh.clone())
    })
}

/// Replace every variable with a fresh one.
pub fn freshen(ty: &Type, supply: &mut VarSupply) -> Type {
    freshen_with(ty, supply, &mut BTreeMap::new())
}

fn alphabetic_var_name(index: usize) -> String {
    let letter = (b'a' + (index % 26) as u8) as char;
    let suffix = index / 26;
    if suffix == 0 {
        letter.to_string()
    } else {
        format!("{letter}{suffix}")
    }
}

/// Display several types with one shared variable namespace.
///
/// Variables are renamed `\a`, `\b`, ... in id order so messages never show
/// internal ids, and the same variable reads the same in every output.
pub fn display_types(types: &[&Type]) -> Vec<String> {
    let mut vars = BTreeSet::new();
    for ty in types {
        collect_free_type_vars(ty, &mut vars);
    }
    let mapping: BTreeMap<TypeVarId, String> = vars
        .into_iter()
        .enumerate()
        .map(|(i, var)| (var, alphabetic_var_name(i)))
        .collect();
    types
        .iter()
        .map(|ty| {
            let mut out = String::new();
            // Writing into a String cannot fail.
            let _ = write_type(&mut out, ty, &|var| {
                mapping
                    .get(&var.id)
                    .cloned()
                    .unwrap_or_else(|| format!("t{}", var.id.0))
            });
            out
        })
        .collect()
}

pub fn display_type(ty: &Type) -> String {
    display_types(&[ty]).remove(0)
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

/// Ordered, named parameter types of a function plus where they were written.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub params: Vec<(String, Type)>,
    pub span: Span,
}

impl Signature {
    pub fn new(params: Vec<(String, Type)>, span: Span) -> Self {
        Self { params, span }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Span::synthetic())
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn param_types(&self) -> impl Iterator<Item = &Type> {
        self.params.iter().map(|(_, ty)| ty)
    }

    /// `Fn(params..., ret)` for this signature.
    pub fn fn_type(&self, ret: Type) -> Type {
        Type::function(self.param_types().cloned().collect(), ret)
    }

    /// Equal arity and pairwise alpha-equivalent parameter types.
    pub fn alpha_equivalent(&self, other: &Signature) -> bool {
        self.arity() == other.arity()
            && self
                .param_types()
                .zip(other.param_types())
                .all(|(a, b)| a.alpha_equivalent(b))
    }

    /// True if no parameter type mentions a variable.
    pub fn is_ground(&self) -> bool {
        !self.param_types().any(Type::contains_var)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types: Vec<&Type> = self.param_types().collect();
        let rendered = display_types(&types);
        write!(f, "(")?;
        for (i, ((name, _), ty)) in self.params.iter().zip(rendered).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {ty}")?;
        }
        write!(f, ")")
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn var(supply: &mut VarSupply) -> Type {
        supply.fresh()
    }

    #[test]
    fn unit_is_empty_tuple() {
        assert_eq!(Type::unit(), Type::tuple(Vec::new()));
        assert!(Type::unit().is_unit());
        assert!(!Type::int().is_unit());
    }

    #[test]
    fn variables_compare_by_identity() {
        let mut supply = VarSupply::new();
        let a = supply.fresh_named_var("a");
        let b = supply.fresh_named_var("a");
        assert_ne!(Type::var(a.clone()), Type::var(b));
        assert_eq!(Type::var(a.clone()), Type::var(a));
    }

    #[test]
    fn function_type_splits_params_and_return() {
        let f = Type::function(vec![Type::int(), Type::str()], Type::bool());
        let (params, ret) = f.as_function().expect("function type");
        assert_eq!(params, &[Type::int(), Type::str()]);
        assert_eq!(ret, &Type::bool());
        assert!(Type::int().as_function().is_none());
    }

    #[test]
    fn display_matches_source_syntax() {
        let mut supply = VarSupply::new();
        let a = Type::var(supply.fresh_named_var("a"));
        let ty = Type::function(vec![Type::list(a), Type::int()], Type::unit());
        assert_eq!(ty.to_string(), "Fn(List(\\a), Int, Tuple)");
        assert_eq!(Type::wildcard().to_string(), "_");
        assert_eq!(Type::overloaded("f", SiteId(0)).to_string(), "<overload>");
    }

    #[test]
    fn display_types_shares_variable_names() {
        let mut supply = VarSupply::starting_at(40);
        let x = var(&mut supply);
        let y = var(&mut supply);
        let left = Type::function(vec![x.clone()], y.clone());
        let right = Type::list(y);
        assert_eq!(
            display_types(&[&left, &right]),
            vec!["Fn(\\a, \\b)".to_string(), "List(\\b)".to_string()]
        );
    }

    #[test]
    fn alpha_equivalence_ignores_variable_identity() {
        let mut supply = VarSupply::new();
        let a = var(&mut supply);
        let b = var(&mut supply);
        assert!(Type::list(a.clone()).alpha_equivalent(&Type::list(b)));
        assert!(!Type::list(a.clone()).alpha_equivalent(&Type::list(Type::int())));
        assert!(!Type::tuple(vec![a.clone()]).alpha_equivalent(&Type::tuple(vec![a.clone(), a])));
    }

    #[test]
    fn signature_alpha_equivalence_checks_arity() {
        let one = Signature::new(vec![("x".into(), Type::int())], Span::synthetic());
        let other = Signature::new(vec![("y".into(), Type::int())], Span::synthetic());
        let two = Signature::new(
            vec![("x".into(), Type::int()), ("y".into(), Type::int())],
            Span::synthetic(),
        );
        assert!(one.alpha_equivalent(&other));
        assert!(!one.alpha_equivalent(&two));
    }

    #[test]
    fn freshen_renames_consistently_and_shares_ground_nodes() {
        let mut supply = VarSupply::new();
        let a = var(&mut supply);
        let ground = Type::list(Type::int());
        let ty = Type::function(vec![a.clone(), ground.clone()], a.clone());

        let fresh = freshen(&ty, &mut supply);
        let (params, ret) = fresh.as_function().expect("function type");
        assert_ne!(params[0], a);
        assert_eq!(&params[0], ret);
        assert!(params[1].ptr_eq(&ground));
    }

    #[test]
    fn freshen_leaves_ground_types_untouched() {
        let mut supply = VarSupply::new();
        let ty = Type::tuple(vec![Type::int(), Type::list(Type::str())]);
        assert!(freshen(&ty, &mut supply).ptr_eq(&ty));
    }

    #[test]
    fn occurs_and_contains() {
        let mut supply = VarSupply::new();
        let a = supply.fresh_var();
        let ty = Type::list(Type::var(a.clone()));
        assert!(ty.occurs(a.id));
        assert!(ty.contains_var());
        assert!(!Type::list(Type::int()).contains_var());
        assert!(Type::tuple(vec![Type::overloaded("g", SiteId(3))]).contains_overloaded());
    }

    #[test]
    fn signature_display_names_variables() {
        let mut supply = VarSupply::starting_at(7);
        let sig = Signature::new(
            vec![("x".into(), Type::int()), ("y".into(), supply.fresh())],
            Span::synthetic(),
        );
        assert_eq!(sig.to_string(), "(x: Int, y: \\a)");
    }
}
