//! Automaton engine - hosts definitions and the runtimes built from them.

use crate::config::EngineConfig;
use crate::definition::MachineDefinition;
use crate::error::CoreError;
use crate::node::{NodeId, NodeInstance};
use crate::runtime::{ExecuteOutcome, MachineRuntime};
use crate::snapshot::Snapshot;
use crate::transition::{Event, TransitionTemplate};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Multi-runtime host.
///
/// Definitions are shared read-only between runtimes. Each runtime sits
/// behind its own mutex, so events for one runtime are serialized while
/// independent runtimes proceed in parallel.
pub struct AutomatonEngine {
    /// Machine definitions indexed by (name, variant).
    definitions: DashMap<(String, String), Arc<MachineDefinition>>,

    /// Runtimes indexed by caller-supplied id.
    runtimes: DashMap<String, Mutex<MachineRuntime>>,

    config: EngineConfig,
}

impl AutomatonEngine {
    /// Creates an engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an engine whose runtimes use `config`.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            definitions: DashMap::new(),
            runtimes: DashMap::new(),
            config,
        }
    }

    /// Configuration handed to new runtimes.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Machine Definition Management
    // =========================================================================

    /// Registers a machine definition.
    ///
    /// Returns the checksum and whether the definition was newly stored.
    /// Registering an identical definition again is a no-op.
    pub fn put_machine(&self, definition: MachineDefinition) -> Result<(String, bool), CoreError> {
        let key = (definition.name.clone(), definition.variant.clone());

        match self.definitions.entry(key) {
            Entry::Occupied(existing) => {
                if existing.get().checksum == definition.checksum {
                    Ok((definition.checksum, false))
                } else {
                    Err(CoreError::MachineExists {
                        machine: definition.name,
                        variant: definition.variant,
                    })
                }
            }
            Entry::Vacant(slot) => {
                let checksum = definition.checksum.clone();
                tracing::info!(
                    machine = %definition.label(),
                    checksum = %checksum,
                    "registered machine"
                );
                slot.insert(Arc::new(definition));
                Ok((checksum, true))
            }
        }
    }

    /// Parses, validates and registers a JSON machine document.
    pub fn put_machine_json(
        &self,
        document: &serde_json::Value,
    ) -> Result<(String, bool), CoreError> {
        self.put_machine(MachineDefinition::from_json(document)?)
    }

    /// Gets a machine definition.
    pub fn get_machine(
        &self,
        name: &str,
        variant: &str,
    ) -> Result<Arc<MachineDefinition>, CoreError> {
        self.definitions
            .get(&(name.to_string(), variant.to_string()))
            .map(|r| r.clone())
            .ok_or_else(|| CoreError::MachineNotFound {
                machine: name.to_string(),
                variant: variant.to_string(),
            })
    }

    /// Lists all machines and their variants.
    pub fn list_machines(&self) -> HashMap<String, Vec<String>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for entry in self.definitions.iter() {
            let (name, variant) = entry.key();
            result.entry(name.clone()).or_default().push(variant.clone());
        }
        for variants in result.values_mut() {
            variants.sort();
        }
        result
    }

    // =========================================================================
    // Runtime Management
    // =========================================================================

    /// Creates and initiates a runtime.
    ///
    /// Without `start_type`, a forest machine seeds every entry node when
    /// `seed_all_entries` is set; otherwise the first entry node is used.
    pub fn create_runtime(
        &self,
        runtime_id: &str,
        name: &str,
        variant: &str,
        start_type: Option<&str>,
    ) -> Result<Vec<NodeId>, CoreError> {
        if self.runtimes.contains_key(runtime_id) {
            return Err(CoreError::RuntimeExists {
                runtime_id: runtime_id.to_string(),
            });
        }

        let definition = self.get_machine(name, variant)?;
        let seed_all = start_type.is_none() && definition.is_forest && self.config.seed_all_entries;

        let mut runtime = MachineRuntime::with_config(definition, self.config.clone());
        let seeded = if seed_all {
            runtime.initiate_forest()?
        } else {
            vec![runtime.initiate(start_type)?]
        };

        match self.runtimes.entry(runtime_id.to_string()) {
            Entry::Occupied(_) => Err(CoreError::RuntimeExists {
                runtime_id: runtime_id.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(Mutex::new(runtime));
                Ok(seeded)
            }
        }
    }

    /// Runs `f` with exclusive access to a runtime.
    fn with_runtime<T>(
        &self,
        runtime_id: &str,
        f: impl FnOnce(&mut MachineRuntime) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let entry = self
            .runtimes
            .get(runtime_id)
            .ok_or_else(|| CoreError::RuntimeNotFound {
                runtime_id: runtime_id.to_string(),
            })?;
        let mut runtime = entry.lock();
        f(&mut runtime)
    }

    /// Live candidates of a runtime, ordered by identity.
    pub fn candidates(&self, runtime_id: &str) -> Result<Vec<NodeInstance>, CoreError> {
        self.with_runtime(runtime_id, |rt| Ok(rt.candidates().cloned().collect()))
    }

    /// Transitions available to one candidate.
    pub fn get_events(
        &self,
        runtime_id: &str,
        candidate_id: &NodeId,
    ) -> Result<Vec<TransitionTemplate>, CoreError> {
        self.with_runtime(runtime_id, |rt| {
            Ok(rt
                .get_events(candidate_id)?
                .into_iter()
                .cloned()
                .collect())
        })
    }

    /// Executes an event against a runtime.
    pub fn execute_event(
        &self,
        runtime_id: &str,
        event: &Event,
    ) -> Result<ExecuteOutcome, CoreError> {
        self.with_runtime(runtime_id, |rt| Ok(rt.execute_event(event)?))
    }

    /// Captures a runtime's state.
    pub fn snapshot(&self, runtime_id: &str) -> Result<Snapshot, CoreError> {
        self.with_runtime(runtime_id, |rt| Ok(rt.save()))
    }

    /// Rebuilds a runtime from a snapshot under a new id.
    ///
    /// The snapshot's machine must be registered.
    pub fn restore_runtime(&self, runtime_id: &str, snapshot: &Snapshot) -> Result<(), CoreError> {
        let definition = self.get_machine(&snapshot.name, &snapshot.variant)?;
        let runtime = MachineRuntime::restore_with_config(definition, snapshot, self.config.clone())?;

        match self.runtimes.entry(runtime_id.to_string()) {
            Entry::Occupied(_) => Err(CoreError::RuntimeExists {
                runtime_id: runtime_id.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(Mutex::new(runtime));
                Ok(())
            }
        }
    }

    /// Removes a runtime, returning its final snapshot.
    pub fn remove_runtime(&self, runtime_id: &str) -> Result<Snapshot, CoreError> {
        let (_, runtime) =
            self.runtimes
                .remove(runtime_id)
                .ok_or_else(|| CoreError::RuntimeNotFound {
                    runtime_id: runtime_id.to_string(),
                })?;
        tracing::debug!(runtime = %runtime_id, "removed runtime");
        Ok(runtime.into_inner().save())
    }

    /// Returns true once every branch of the runtime has resolved.
    pub fn is_resolved(&self, runtime_id: &str) -> Result<bool, CoreError> {
        self.with_runtime(runtime_id, |rt| Ok(rt.is_resolved()))
    }

    /// Runtime ids, sorted.
    pub fn runtime_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.runtimes.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn runtime_count(&self) -> usize {
        self.runtimes.len()
    }
}

impl Default for AutomatonEngine {
    fn default() -> Self {
        Self::new()
    }
}
