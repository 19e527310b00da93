//! Transition history and provenance.
//!
//! Every transition that replaces a node records `previous -> current`;
//! a resolve records `previous -> (none)`. In-place retries record nothing.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One recorded step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Consumed node.
    pub from: NodeId,

    /// Transition that consumed it.
    pub transition_id: String,

    /// Successor, or `None` if the branch resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NodeId>,
}

impl HistoryEntry {
    pub fn is_terminal(&self) -> bool {
        self.to.is_none()
    }
}

/// Ordered record of transitions taken.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_step(&mut self, from: &NodeId, transition_id: &str, to: &NodeId) {
        self.entries.push(HistoryEntry {
            from: from.clone(),
            transition_id: transition_id.to_string(),
            to: Some(to.clone()),
        });
    }

    pub(crate) fn record_resolve(&mut self, from: &NodeId, transition_id: &str) {
        self.entries.push(HistoryEntry {
            from: from.clone(),
            transition_id: transition_id.to_string(),
            to: None,
        });
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Successors recorded for `id`, in order.
    pub fn successors(&self, id: &NodeId) -> Vec<&NodeId> {
        self.entries
            .iter()
            .filter(|e| &e.from == id)
            .filter_map(|e| e.to.as_ref())
            .collect()
    }

    /// The node `id` was created from, if any.
    pub fn predecessor(&self, id: &NodeId) -> Option<&NodeId> {
        self.entries
            .iter()
            .find(|e| e.to.as_ref() == Some(id))
            .map(|e| &e.from)
    }

    /// Returns true if a resolve was recorded for `id`.
    pub fn is_resolved(&self, id: &NodeId) -> bool {
        self.entries.iter().any(|e| &e.from == id && e.is_terminal())
    }

    /// The chain of nodes leading to `id`, oldest first, ending with `id`.
    pub fn lineage(&self, id: &NodeId) -> Vec<NodeId> {
        let mut chain = vec![id.clone()];
        let mut seen = BTreeSet::from([id]);
        let mut current = id;
        while let Some(prev) = self.predecessor(current) {
            // Stops on a cycle; consistent histories never contain one.
            if !seen.insert(prev) {
                break;
            }
            chain.push(prev.clone());
            current = prev;
        }
        chain.reverse();
        chain
    }

    /// Groups successors by predecessor: `previous -> [next...]`.
    /// Resolved nodes map to their (possibly empty) successor list.
    pub fn as_map(&self) -> BTreeMap<NodeId, Vec<NodeId>> {
        let mut map: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for entry in &self.entries {
            let next = map.entry(entry.from.clone()).or_default();
            if let Some(to) = &entry.to {
                next.push(to.clone());
            }
        }
        map
    }
}
