//! Overload-resolving, monomorphizing type inference for Jupiter.
//!
//! This crate implements:
//! - Substitution-based unification over ordered type lists
//! - Ad-hoc overload resolution with specificity ranking
//! - A memoizing instantiation driver that produces one monomorphic
//!   instance per (definition, call signature), tolerating (mutual)
//!   recursion through shared return cells
//! - Expression-level inference over scope-resolved bodies
//!
//! Inference for one instance is entered through [`instantiate::instantiate`];
//! inferring its body calls back into the driver for every overloaded call,
//! so "infer expression" and "instantiate overload" recurse into each other.
//! All global state is threaded explicitly as `&mut GlobalEnv`.

pub mod env;
pub mod expr;
pub mod infodata;
pub mod instantiate;
pub mod module;
pub mod overload;
pub mod trace;
pub mod typedecl;
pub mod unify;

use jup_ast::Span;

// Re-export for convenience.
pub use env::{
    CompileUnit, FuncInstance, GlobalEnv, GlobalFunc, InstanceId, InstanceState, Overload,
    OverloadBody, OverloadId, OverloadOrigin, UnitId, UnitTable,
};
pub use instantiate::instantiate;
pub use jup_diag::{Category, Diagnostic, DiagnosticError, SourceLocation};
pub use module::{check_module, instantiate_entry, register_module};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Knobs for one type-checking run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferOptions {
    /// Reject bindings `a := T` where `a` occurs in `T`.
    ///
    /// Off by default: inference then accepts (and never loops on)
    /// cyclic bindings.
    pub occurs_check: bool,
    /// Record unification, resolution and instantiation steps in
    /// [`GlobalEnv::trace`].
    pub trace: bool,
    /// Prefix for generated compile unit names (`<prefix>fn_u<N>`).
    pub unit_prefix: String,
}

impl Default for InferOptions {
    fn default() -> Self {
        Self {
            occurs_check: false,
            trace: false,
            unit_prefix: String::new(),
        }
    }
}

impl InferOptions {
    pub fn with_occurs_check(mut self, enabled: bool) -> Self {
        self.occurs_check = enabled;
        self
    }

    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }

    pub fn with_unit_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.unit_prefix = prefix.into();
        self
    }
}

pub(crate) fn span_to_location(span: Span) -> SourceLocation {
    SourceLocation {
        file_id: span.file.0,
        start: span.start,
        end: span.end,
    }
}


#[cfg(test)]
mod prop_tests;
