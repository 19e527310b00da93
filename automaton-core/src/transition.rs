//! Transition templates and submitted events.

use crate::node::NodeId;
use automaton_patch::PatchOperation;
use serde::{Deserialize, Serialize};

/// An edge of the machine graph.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionTemplate {
    /// Transition ID, unique within a machine.
    pub id: String,

    /// Human readable name.
    pub name: String,

    /// Source node type.
    pub from_type: String,

    /// Target node type; `None` for resolve transitions.
    pub to_type: Option<String>,

    /// Operation an event must carry for this transition to fire.
    pub guard: PatchOperation,

    /// A self-loop mints a fresh instance instead of retrying in place.
    pub mint_new_instance_on_self_loop: bool,

    /// Terminates the branch.
    pub is_resolve: bool,

    /// Bound on in-place retries; `None` is unbounded.
    pub max_retry: Option<u32>,
}

impl TransitionTemplate {
    pub fn new(
        id: impl Into<String>,
        from_type: impl Into<String>,
        to_type: impl Into<String>,
        guard: PatchOperation,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            from_type: from_type.into(),
            to_type: Some(to_type.into()),
            guard,
            mint_new_instance_on_self_loop: false,
            is_resolve: false,
            max_retry: None,
        }
    }

    /// Creates a resolve transition (no target).
    pub fn resolving(
        id: impl Into<String>,
        from_type: impl Into<String>,
        guard: PatchOperation,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            from_type: from_type.into(),
            to_type: None,
            guard,
            mint_new_instance_on_self_loop: false,
            is_resolve: true,
            max_retry: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn minting(mut self) -> Self {
        self.mint_new_instance_on_self_loop = true;
        self
    }

    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = Some(max_retry);
        self
    }

    /// Returns true if source and target are the same node type.
    pub fn is_self_loop(&self) -> bool {
        self.to_type.as_deref() == Some(self.from_type.as_str())
    }

    /// Returns true if `event` selects this transition for a node of `node_type`.
    pub fn matches(&self, node_type: &str, event: &Event) -> bool {
        self.id == event.transition_id
            && self.from_type == node_type
            && self.guard == event.guard_operation
    }
}

/// An event submitted against one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Transition to fire.
    pub transition_id: String,

    /// Candidate the event acts on.
    #[serde(rename = "candidateNodeId", alias = "nodeId")]
    pub candidate_id: NodeId,

    /// Operation compared against the transition guard.
    #[serde(alias = "matchCondition")]
    pub guard_operation: PatchOperation,
}

impl Event {
    pub fn new(
        transition_id: impl Into<String>,
        candidate_id: NodeId,
        guard_operation: PatchOperation,
    ) -> Self {
        Self {
            transition_id: transition_id.into(),
            candidate_id,
            guard_operation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn completed() -> PatchOperation {
        PatchOperation::replace("/state", "COMPLETED").unwrap()
    }

    #[test]
    fn test_self_loop() {
        let retry = TransitionTemplate::new("retry", "Pickup", "Pickup", completed());
        let forward = TransitionTemplate::new("deliver", "Pickup", "Delivery", completed());
        let done = TransitionTemplate::resolving("done", "Delivery", completed());

        assert!(retry.is_self_loop());
        assert!(!forward.is_self_loop());
        assert!(!done.is_self_loop());
        assert!(done.is_resolve);
    }

    #[test]
    fn test_matches_requires_id_type_and_guard() {
        let t = TransitionTemplate::new("deliver", "Pickup", "Delivery", completed());
        let id = NodeId::new("n-1");

        assert!(t.matches("Pickup", &Event::new("deliver", id.clone(), completed())));
        assert!(!t.matches("Delivery", &Event::new("deliver", id.clone(), completed())));
        assert!(!t.matches("Pickup", &Event::new("other", id.clone(), completed())));

        let failed = PatchOperation::replace("/state", "FAILED").unwrap();
        assert!(!t.matches("Pickup", &Event::new("deliver", id, failed)));
    }

    #[test]
    fn test_event_wire_shape() {
        let event: Event = serde_json::from_value(json!({
            "transitionId": "deliver",
            "candidateNodeId": "n-1",
            "guardOperation": {"op": "replace", "path": "/state", "value": "COMPLETED"}
        }))
        .unwrap();

        assert_eq!(event.transition_id, "deliver");
        assert_eq!(event.candidate_id.as_str(), "n-1");
        assert_eq!(event.guard_operation, completed());
    }
}
