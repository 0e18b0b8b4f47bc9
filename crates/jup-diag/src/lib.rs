//! Error reporting and diagnostics for the Jupiter type engine.
//!
//! Diagnostics are created by `jup-infer` and rendered here for display.
//! Messages never expose inference variable ids: types are rendered with
//! joint `\a`, `\b`, ... naming before they reach a diagnostic.

use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Diagnostic categories
// ---------------------------------------------------------------------------

/// Broad category for diagnostics. Used for filtering and grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Two types could not be unified.
    TypeMismatch,
    /// Reference to a global name with no definition.
    UndefinedGlobal,
    /// No overload of a global accepts the call.
    NoMatchingOverload,
    /// Several overloads fit the call equally well.
    AmbiguousOverload,
    /// An unresolved overload escaped into a return type or `let`.
    InvalidOverloadedReturn,
    /// A type was applied to the wrong number of arguments.
    MalformedTypeArity,
    /// An annotation names a type that does not exist.
    UndefinedType,
    /// A type declaration is malformed.
    InvalidTypeDecl,
    /// A variable would have to contain itself (occurs check).
    InfiniteType,
    /// A local slot was read before anything bound it.
    UndefinedLocal,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::TypeMismatch,
        Category::UndefinedGlobal,
        Category::NoMatchingOverload,
        Category::AmbiguousOverload,
        Category::InvalidOverloadedReturn,
        Category::MalformedTypeArity,
        Category::UndefinedType,
        Category::InvalidTypeDecl,
        Category::InfiniteType,
        Category::UndefinedLocal,
    ];

    pub fn all() -> &'static [Category] {
        &Self::ALL
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::TypeMismatch => "type_mismatch",
            Category::UndefinedGlobal => "undefined_global",
            Category::NoMatchingOverload => "no_matching_overload",
            Category::AmbiguousOverload => "ambiguous_overload",
            Category::InvalidOverloadedReturn => "invalid_overloaded_return",
            Category::MalformedTypeArity => "malformed_type_arity",
            Category::UndefinedType => "undefined_type",
            Category::InvalidTypeDecl => "invalid_type_decl",
            Category::InfiniteType => "infinite_type",
            Category::UndefinedLocal => "undefined_local",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Category::TypeMismatch => "E0001",
            Category::UndefinedGlobal => "E0002",
            Category::NoMatchingOverload => "E0003",
            Category::AmbiguousOverload => "E0004",
            Category::InvalidOverloadedReturn => "E0005",
            Category::MalformedTypeArity => "E0006",
            Category::UndefinedType => "E0007",
            Category::InvalidTypeDecl => "E0008",
            Category::InfiniteType => "E0009",
            Category::UndefinedLocal => "E0010",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Category::TypeMismatch => "Expression type does not match expected type.",
            Category::UndefinedGlobal => "A referenced global function is not defined.",
            Category::NoMatchingOverload => {
                "No overload of the called function accepts the given argument types."
            }
            Category::AmbiguousOverload => {
                "More than one overload matches the call and none is more specific."
            }
            Category::InvalidOverloadedReturn => {
                "An overloaded function reference was used where a concrete value is required."
            }
            Category::MalformedTypeArity => {
                "A type constructor was given the wrong number of arguments."
            }
            Category::UndefinedType => "A type annotation names an unknown type.",
            Category::InvalidTypeDecl => "A type declaration is malformed.",
            Category::InfiniteType => "A type variable would have to contain itself.",
            Category::UndefinedLocal => "A local variable is used before it is bound.",
        }
    }
}

// ---------------------------------------------------------------------------
// Source locations (independent of jup-ast's Span)
// ---------------------------------------------------------------------------

/// A source location for diagnostics, in byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLocation {
    pub file_id: u32,
    pub start: u32,
    pub end: u32,
}

// ---------------------------------------------------------------------------
// Diagnostic
// ---------------------------------------------------------------------------

/// A structured diagnostic message.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// Stable diagnostic code (e.g. E0001).
    pub code: String,
    pub category: Category,
    /// Primary message: what went wrong.
    pub message: String,
    /// Where it went wrong.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    /// Extra lines printed under the message, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(category: Category, message: impl Into<String>) -> Self {
        Self {
            code: category.code().to_string(),
            category,
            message: message.into(),
            location: None,
            notes: Vec::new(),
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Set the location unless one is already present.
    pub fn or_at(mut self, location: SourceLocation) -> Self {
        self.location.get_or_insert(location);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error[{}]: {}", self.code, self.message)?;
        for note in &self.notes {
            write!(f, "\n{note}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error type for crates that produce diagnostics
// ---------------------------------------------------------------------------

/// Error type wrapping one or more diagnostics.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", .0.first().map(|d| d.to_string()).unwrap_or_default())]
pub struct DiagnosticError(pub Vec<Diagnostic>);

impl DiagnosticError {
    pub fn single(diag: Diagnostic) -> Self {
        Self(vec![diag])
    }

    pub fn multiple(diags: Vec<Diagnostic>) -> Self {
        Self(diags)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.0
    }
}

impl From<Diagnostic> for DiagnosticError {
    fn from(diag: Diagnostic) -> Self {
        Self::single(diag)
    }
}
