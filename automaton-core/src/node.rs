//! Node templates and node instances.

use automaton_patch::Payload;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a node instance.
///
/// Generated by the runtime; unique within one runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Static description of a node type.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTemplate {
    /// Node type, unique within a machine.
    pub node_type: String,

    /// May seed the initial candidate set.
    pub is_entry: bool,

    /// Marks a terminal node type.
    pub is_resolve: bool,

    /// Several live candidates of this type may coexist.
    pub allow_duplicate_instance: bool,

    /// Payload given to fresh instances.
    pub default_payload: Payload,
}

impl NodeTemplate {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            is_entry: false,
            is_resolve: false,
            allow_duplicate_instance: false,
            default_payload: Payload::Null,
        }
    }

    pub fn entry(mut self) -> Self {
        self.is_entry = true;
        self
    }

    pub fn resolve(mut self) -> Self {
        self.is_resolve = true;
        self
    }

    pub fn allow_duplicates(mut self) -> Self {
        self.allow_duplicate_instance = true;
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.default_payload = payload;
        self
    }

    /// Creates a fresh instance of this template.
    pub(crate) fn instantiate(&self, id: NodeId) -> NodeInstance {
        NodeInstance {
            id,
            node_type: self.node_type.clone(),
            payload: self.default_payload.clone(),
        }
    }
}

/// A live node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInstance {
    /// Unique instance ID.
    pub id: NodeId,

    /// Type of the template this instance was created from.
    pub node_type: String,

    /// Instance data.
    pub payload: Payload,
}

impl NodeInstance {
    /// Copies this instance under a new identity.
    pub(crate) fn mint(&self, id: NodeId) -> Self {
        Self {
            id,
            node_type: self.node_type.clone(),
            payload: self.payload.clone(),
        }
    }
}
