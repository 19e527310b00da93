//! Machine definition documents.
//!
//! The document format, in JSON:
//!
//! ```json
//! {
//!   "name": "ClassifiedDelivery",
//!   "variant": "default",
//!   "isForest": false,
//!   "nodes": [
//!     {"type": "Pickup", "isEntryNode": true, "payload": {"state": "IN_PROGRESS"}},
//!     {"type": "Delivery", "payload": {"state": "IN_PROGRESS"}},
//!     {"type": "ReturnToWarehouseDelivery", "isResolveNode": true}
//!   ],
//!   "events": [
//!     {
//!       "id": "pickup-completed", "name": "PickupCompleted",
//!       "from": "Pickup", "to": "Delivery",
//!       "matchCondition": {"op": "replace", "path": "/state", "value": "COMPLETED"}
//!     },
//!     {
//!       "id": "pickup-failed", "from": "Pickup", "target": "Pickup",
//!       "matchCondition": {"op": "replace", "path": "/state", "value": "FAILED"},
//!       "createNewTarget": true
//!     }
//!   ]
//! }
//! ```
//!
//! `transitions` is accepted for `events`, `target` for `to` and `event` for
//! `name`. A `maxEventRetry` of 0 (the default) means unbounded.

use automaton_patch::{PatchOperation, Payload};
use serde::{Deserialize, Serialize};

fn default_variant() -> String {
    "default".to_string()
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// Raw machine definition as stored/transmitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineDocument {
    pub name: String,

    #[serde(default = "default_variant")]
    pub variant: String,

    #[serde(default)]
    pub is_forest: bool,

    #[serde(default)]
    pub nodes: Vec<NodeDocument>,

    #[serde(default, alias = "transitions")]
    pub events: Vec<TransitionDocument>,
}

/// A node entry of a machine document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDocument {
    #[serde(rename = "type")]
    pub node_type: String,

    #[serde(default)]
    pub is_entry_node: bool,

    #[serde(default)]
    pub is_resolve_node: bool,

    #[serde(default)]
    pub is_duplicate_allowed: bool,

    #[serde(default)]
    pub payload: Payload,
}

/// A transition entry of a machine document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionDocument {
    #[serde(default)]
    pub id: String,

    #[serde(default, alias = "event")]
    pub name: String,

    pub from: String,

    #[serde(default, alias = "target", skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    pub match_condition: PatchOperation,

    #[serde(default)]
    pub create_new_target: bool,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_event_retry: u32,

    #[serde(default)]
    pub is_resolve_event: bool,
}
