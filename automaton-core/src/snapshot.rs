//! Runtime snapshots.
//!
//! A snapshot is plain data: enough to rebuild a runtime against the same
//! definition without replaying events.

use crate::config::EngineConfig;
use crate::definition::MachineDefinition;
use crate::error::{CoreError, RuntimeError};
use crate::history::History;
use crate::node::{NodeId, NodeInstance};
use crate::runtime::MachineRuntime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// In-place retry count of one `(node, transition)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryCount {
    pub node_id: NodeId,
    pub transition_id: String,
    pub attempts: u32,
}

/// Snapshot of a runtime at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Machine name.
    pub name: String,

    /// Machine variant.
    pub variant: String,

    /// Definition checksum at snapshot time.
    pub checksum: String,

    pub is_initialized: bool,

    pub is_resolved: bool,

    /// Live candidates, ordered by identity.
    pub candidates: Vec<NodeInstance>,

    /// Transition history.
    pub history: History,

    /// Every instance that ever existed, ordered by identity.
    pub instances: Vec<NodeInstance>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retry_counts: Vec<RetryCount>,
}

impl Snapshot {
    /// Returns true if the snapshot was taken against a definition with the
    /// same name and variant.
    pub fn matches(&self, definition: &MachineDefinition) -> bool {
        self.name == definition.name && self.variant == definition.variant
    }

    /// Checks that the snapshot is internally consistent with `definition`.
    ///
    /// Every candidate and every id named by the history or the retry counts
    /// must be a registered instance of a declared node type.
    pub fn validate(&self, definition: &MachineDefinition) -> Result<(), RuntimeError> {
        let invalid = |reason: String| Err(RuntimeError::InvalidSnapshot { reason });

        let mut registered = BTreeSet::new();
        for instance in &self.instances {
            if !registered.insert(&instance.id) {
                return invalid(format!("instance {} appears twice", instance.id));
            }
            if definition.node(&instance.node_type).is_none() {
                return invalid(format!(
                    "instance {} has undeclared node type '{}'",
                    instance.id, instance.node_type
                ));
            }
        }

        let mut live = BTreeSet::new();
        for candidate in &self.candidates {
            if !live.insert(&candidate.id) {
                return invalid(format!("candidate {} appears twice", candidate.id));
            }
            if !registered.contains(&candidate.id) {
                return invalid(format!("candidate {} is not a registered instance", candidate.id));
            }
            if definition.node(&candidate.node_type).is_none() {
                return invalid(format!(
                    "candidate {} has undeclared node type '{}'",
                    candidate.id, candidate.node_type
                ));
            }
        }

        for entry in self.history.entries() {
            if !registered.contains(&entry.from) {
                return invalid(format!("history names unregistered node {}", entry.from));
            }
            if let Some(to) = &entry.to {
                if !registered.contains(to) {
                    return invalid(format!("history names unregistered node {}", to));
                }
                if to == &entry.from {
                    return invalid(format!("history maps {} to itself", to));
                }
            }
        }

        for retry in &self.retry_counts {
            if !registered.contains(&retry.node_id) {
                return invalid(format!(
                    "retry count names unregistered node {}",
                    retry.node_id
                ));
            }
        }

        Ok(())
    }

    /// Encodes the snapshot as JSON.
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Encodes the snapshot as indented JSON.
    pub fn to_json_pretty(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decodes a snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl MachineRuntime {
    /// Captures the runtime state. Does not modify the runtime.
    pub fn save(&self) -> Snapshot {
        Snapshot {
            name: self.definition.name.clone(),
            variant: self.definition.variant.clone(),
            checksum: self.definition.checksum.clone(),
            is_initialized: self.is_initialized,
            is_resolved: self.is_resolved,
            candidates: self.candidates.values().cloned().collect(),
            history: self.history.clone(),
            instances: self.registry.values().cloned().collect(),
            retry_counts: self
                .retry_counts
                .iter()
                .map(|((node_id, transition_id), attempts)| RetryCount {
                    node_id: node_id.clone(),
                    transition_id: transition_id.clone(),
                    attempts: *attempts,
                })
                .collect(),
        }
    }

    /// Rebuilds a runtime from a snapshot with the default configuration.
    pub fn restore(
        definition: Arc<MachineDefinition>,
        snapshot: &Snapshot,
    ) -> Result<Self, RuntimeError> {
        Self::restore_with_config(definition, snapshot, EngineConfig::default())
    }

    /// Rebuilds a runtime from a snapshot.
    pub fn restore_with_config(
        definition: Arc<MachineDefinition>,
        snapshot: &Snapshot,
        config: EngineConfig,
    ) -> Result<Self, RuntimeError> {
        if !snapshot.matches(&definition) {
            return Err(RuntimeError::DefinitionMismatch {
                expected: format!("{}/{}", snapshot.name, snapshot.variant),
                actual: definition.label(),
            });
        }

        if !snapshot.is_initialized {
            return Err(RuntimeError::NotInitialized);
        }

        snapshot.validate(&definition)?;

        if snapshot.checksum != definition.checksum {
            tracing::warn!(
                machine = %definition.label(),
                snapshot_checksum = %snapshot.checksum,
                definition_checksum = %definition.checksum,
                "restoring snapshot against a changed definition"
            );
        }

        let mut runtime = Self::with_config(definition, config);
        runtime.is_initialized = true;
        runtime.is_resolved = snapshot.is_resolved;
        runtime.history = snapshot.history.clone();
        runtime.candidates = snapshot
            .candidates
            .iter()
            .map(|n| (n.id.clone(), n.clone()))
            .collect();
        runtime.registry = snapshot
            .instances
            .iter()
            .map(|n| (n.id.clone(), n.clone()))
            .collect();
        runtime.retry_counts = snapshot
            .retry_counts
            .iter()
            .map(|r| ((r.node_id.clone(), r.transition_id.clone()), r.attempts))
            .collect();

        tracing::info!(
            machine = %runtime.definition.label(),
            candidates = runtime.candidates.len(),
            instances = runtime.registry.len(),
            "restored runtime from snapshot"
        );

        Ok(runtime)
    }
}
