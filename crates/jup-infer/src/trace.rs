//! Step-by-step traces of unification, overload resolution and
//! instantiation.
//!
//! Recording is opt-in through `InferOptions::trace`; with it off nothing is
//! formatted or stored. Every step is `Serialize` so tooling can dump a run
//! as JSON.

use serde::Serialize;

/// Everything recorded during one run, in order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Trace {
    pub unify: Vec<UnifyStep>,
    pub resolve: Vec<ResolveStep>,
    pub instantiate: Vec<InstantiateStep>,
}

impl Trace {
    pub fn is_empty(&self) -> bool {
        self.unify.is_empty() && self.resolve.is_empty() && self.instantiate.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Unification trace
// ---------------------------------------------------------------------------

/// A single step in a unification trace.
#[derive(Debug, Clone, Serialize)]
pub struct UnifyStep {
    pub step: usize,
    pub action: UnifyAction,
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnifyAction {
    /// Same variable on both sides.
    Identity,
    /// Same constructor; recurse into the arguments.
    Decompose,
    /// Variable bound to the other side.
    Bind,
    /// Left side is an overloaded reference; handed to the resolver.
    Overload,
    /// Occurs check fired.
    OccursCheck,
    /// Mismatch.
    Error,
}

// ---------------------------------------------------------------------------
// Overload resolution trace
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ResolveStep {
    pub function: String,
    pub site: u32,
    /// The type the reference had to match.
    pub model: String,
    /// Every candidate that unified with the model.
    pub survivors: Vec<String>,
    /// Candidates left after specificity ranking.
    pub best: Vec<String>,
    pub outcome: ResolveOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveOutcome {
    Resolved,
    NoMatch,
    Ambiguous,
}

// ---------------------------------------------------------------------------
// Instantiation trace
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct InstantiateStep {
    pub function: String,
    pub signature: String,
    pub outcome: InstantiateOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ret: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstantiateOutcome {
    /// An alpha-equivalent instance already existed.
    Cached,
    /// A runtime-provided overload was specialised.
    Extern,
    /// A new instance was created and its body entered.
    Started,
    Finished,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_serialize_in_snake_case() {
        let step = InstantiateStep {
            function: "fact".into(),
            signature: "(n: Int)".into(),
            outcome: InstantiateOutcome::Started,
            ret: None,
        };
        let json = serde_json::to_value(&step).expect("serialize step");
        assert_eq!(json["outcome"], "started");
        assert!(json.get("ret").is_none());

        let action = serde_json::to_value(UnifyAction::OccursCheck).expect("serialize action");
        assert_eq!(action, "occurs_check");
    }

    #[test]
    fn default_trace_is_empty() {
        assert!(Trace::default().is_empty());
    }
}
