//! Scope-resolved expression trees and declarations for Jupiter.
//!
//! These nodes are produced by the desugaring pass: every identifier has
//! already been resolved to either a local slot or a global name, and sugar
//! (infix operators, member calls, loops) has been lowered to calls. Every
//! node carries a [`Span`] for diagnostics.

/// Identifies a source file in the compilation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// A byte offset range within a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub file: FileId,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(file: FileId, start: u32, end: u32) -> Self {
        Self { file, start, end }
    }

    /// Create a span that covers both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        debug_assert_eq!(
            self.file, other.file,
            "cannot merge spans from different files"
        );
        Span {
            file: self.file,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// A synthetic span for compiler-generated nodes.
    pub fn synthetic() -> Self {
        Self {
            file: FileId(u32::MAX),
            start: 0,
            end: 0,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.file == FileId(u32::MAX)
    }
}

/// A value paired with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            node: f(self.node),
            span: self.span,
        }
    }
}

// ---------------------------------------------------------------------------
// Handles assigned by the desugaring pass
// ---------------------------------------------------------------------------

/// Index of a local variable within one function body.
///
/// Slots are unique per function (nested blocks draw from the same counter),
/// so a slot identifies its binding without any scope bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalSlot(pub u32);

/// Handle of one global reference site within a function body.
///
/// The type engine reports, per instance, which overload instance every
/// site resolved to; the code generator uses that to emit direct calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteId(pub u32);

// ---------------------------------------------------------------------------
// Literal values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Int(i64),
    Real(f64),
    Str(String),
    Bool(bool),
}

// ---------------------------------------------------------------------------
// Type annotations
// ---------------------------------------------------------------------------

/// Syntactic type as written in a signature or `let`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeAnnotation {
    /// `Int`, `List(a)`, `Tuple(Int, Str)`, `Fn(Int, Bool)`.
    Named(String, Vec<TypeAnnotation>),
    /// `\a`: a type variable, shared by name within one signature.
    Var(String),
    /// `_`: let the engine pick a fresh variable.
    Wildcard,
}

impl TypeAnnotation {
    pub fn named(name: impl Into<String>) -> Self {
        TypeAnnotation::Named(name.into(), Vec::new())
    }

    pub fn applied(name: impl Into<String>, args: Vec<TypeAnnotation>) -> Self {
        TypeAnnotation::Named(name.into(), args)
    }

    pub fn var(name: impl Into<String>) -> Self {
        TypeAnnotation::Var(name.into())
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

pub type Expr = Spanned<ExprKind>;

/// Reference to a local slot.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalRef {
    pub name: String,
    pub slot: LocalSlot,
}

/// Reference to a global (possibly overloaded) function by name.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalRef {
    pub name: String,
    pub site: SiteId,
}

/// A function or lambda parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub slot: LocalSlot,
    pub annotation: Option<Spanned<TypeAnnotation>>,
    pub span: Span,
}

/// A local of the enclosing function captured by a lambda.
///
/// `outer` is the slot in the enclosing body, `inner` the slot the lambda
/// body uses to read it.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub name: String,
    pub outer: LocalSlot,
    pub inner: LocalSlot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LambdaExpr {
    pub params: Vec<Param>,
    pub captures: Vec<Capture>,
    pub body: Box<Expr>,
    /// Site handle under which the lifted lambda is referenced.
    pub site: SiteId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Literal value.
    Lit(Lit),

    /// Reference to a local slot.
    Local(LocalRef),

    /// Reference to a global function; resolved by overload resolution.
    Global(GlobalRef),

    /// Tuple construction: `(a, b, c)`.
    Tuple(Vec<Expr>),

    /// Function application: `func(args)`.
    Call { func: Box<Expr>, args: Vec<Expr> },

    /// `if condition then_branch else else_branch`.
    If {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// `let name: annotation = value`, scoped to the rest of the block.
    Let {
        name: String,
        slot: LocalSlot,
        annotation: Option<Spanned<TypeAnnotation>>,
        value: Box<Expr>,
    },

    /// `target = value`.
    Assign { target: Box<Expr>, value: Box<Expr> },

    /// Anonymous function with explicit captures.
    Lambda(LambdaExpr),

    /// `{ stmt; stmt; ... }`.
    Block(Vec<Expr>),

    /// Build a value of a user type with constructor `ctor`.
    Construct { ctor: String, args: Vec<Expr> },

    /// Test whether `value` was built with constructor `ctor`.
    TagTest { ctor: String, value: Box<Expr> },

    /// Read field `index` of a value built with constructor `ctor`.
    FieldGet {
        ctor: String,
        index: usize,
        value: Box<Expr>,
    },
}

impl ExprKind {
    /// Short lowercase name of the node kind, used in traces.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ExprKind::Lit(_) => "literal",
            ExprKind::Local(_) => "local",
            ExprKind::Global(_) => "global",
            ExprKind::Tuple(_) => "tuple",
            ExprKind::Call { .. } => "call",
            ExprKind::If { .. } => "if",
            ExprKind::Let { .. } => "let",
            ExprKind::Assign { .. } => "assign",
            ExprKind::Lambda(_) => "lambda",
            ExprKind::Block(_) => "block",
            ExprKind::Construct { .. } => "construct",
            ExprKind::TagTest { .. } => "tag_test",
            ExprKind::FieldGet { .. } => "field_get",
        }
    }
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// A top-level function. Several declarations may share a name (overloads).
#[derive(Debug, Clone, PartialEq)]
pub struct FnDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Expr,
    pub span: Span,
}

/// A field of a data constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub annotation: Spanned<TypeAnnotation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CtorDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
    pub span: Span,
}

/// `type Name(\a, ...) = Ctor(field: T, ...) | ...`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: String,
    pub params: Vec<String>,
    pub ctors: Vec<CtorDecl>,
    pub span: Span,
}

/// All declarations of one source module after desugaring.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub name: String,
    pub types: Vec<TypeDecl>,
    pub functions: Vec<FnDecl>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_covers_both_spans() {
        let a = Span::new(FileId(0), 4, 9);
        let b = Span::new(FileId(0), 1, 6);
        assert_eq!(a.merge(b), Span::new(FileId(0), 1, 9));
    }

    #[test]
    fn synthetic_span_is_recognised() {
        assert!(Span::synthetic().is_synthetic());
        assert!(!Span::new(FileId(0), 0, 0).is_synthetic());
    }

    #[test]
    fn spanned_map_keeps_location() {
        let span = Span::new(FileId(2), 3, 7);
        let mapped = Spanned::new(3, span).map(|n| n * 2);
        assert_eq!(mapped.node, 6);
        assert_eq!(mapped.span, span);
    }

    #[test]
    fn kind_names_are_stable() {
        let call = ExprKind::Call {
            func: Box::new(Spanned::new(
                ExprKind::Global(GlobalRef {
                    name: "f".into(),
                    site: SiteId(0),
                }),
                Span::synthetic(),
            )),
            args: Vec::new(),
        };
        assert_eq!(call.kind_name(), "call");
        assert_eq!(ExprKind::Block(Vec::new()).kind_name(), "block");
    }
}
