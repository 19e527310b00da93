//! Machine runtime - the candidate set and the transition algorithm.
//!
//! A runtime owns the live frontier of one workflow: the candidate nodes
//! awaiting a transition, every node instance that ever existed, and the
//! history linking them. Runtimes are synchronous; callers sharing one across
//! threads must serialize access (see [`crate::engine::AutomatonEngine`]).

use crate::config::{EngineConfig, PayloadPolicy};
use crate::definition::MachineDefinition;
use crate::error::RuntimeError;
use crate::history::History;
use crate::node::{NodeId, NodeInstance, NodeTemplate};
use crate::transition::{Event, TransitionTemplate};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Result of executing an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// The candidate was no longer live; nothing changed.
    Ignored,
    /// `previous` was replaced by `current`.
    Advanced { previous: NodeId, current: NodeId },
    /// The candidate stayed in place; `attempt` counts in-place retries.
    Retried { instance: NodeId, attempt: u32 },
    /// The branch ending in `previous` resolved.
    Resolved { previous: NodeId },
}

/// What a matched transition will do, decided before anything is mutated.
enum Step<'a> {
    Resolve,
    Mint,
    Retry { attempt: u32 },
    Advance { target: &'a NodeTemplate },
}

/// A live machine.
#[derive(Debug, Clone)]
pub struct MachineRuntime {
    pub(crate) definition: Arc<MachineDefinition>,
    pub(crate) config: EngineConfig,
    pub(crate) candidates: BTreeMap<NodeId, NodeInstance>,
    pub(crate) history: History,
    pub(crate) registry: BTreeMap<NodeId, NodeInstance>,
    pub(crate) retry_counts: BTreeMap<(NodeId, String), u32>,
    pub(crate) is_initialized: bool,
    pub(crate) is_resolved: bool,
}

impl MachineRuntime {
    /// Creates an uninitialized runtime with the default configuration.
    pub fn new(definition: Arc<MachineDefinition>) -> Self {
        Self::with_config(definition, EngineConfig::default())
    }

    /// Creates an uninitialized runtime.
    pub fn with_config(definition: Arc<MachineDefinition>, config: EngineConfig) -> Self {
        Self {
            definition,
            config,
            candidates: BTreeMap::new(),
            history: History::new(),
            registry: BTreeMap::new(),
            retry_counts: BTreeMap::new(),
            is_initialized: false,
            is_resolved: false,
        }
    }

    /// Creates a runtime and initiates it from `start_type`.
    pub fn start(
        definition: Arc<MachineDefinition>,
        start_type: Option<&str>,
    ) -> Result<Self, RuntimeError> {
        let mut runtime = Self::new(definition);
        runtime.initiate(start_type)?;
        Ok(runtime)
    }

    /// Seeds the candidate set with one instance of an entry node.
    ///
    /// Without `start_type` the first declared entry node is used.
    pub fn initiate(&mut self, start_type: Option<&str>) -> Result<NodeId, RuntimeError> {
        if self.is_initialized {
            return Err(RuntimeError::AlreadyInitialized);
        }

        let definition = Arc::clone(&self.definition);
        let template = match start_type {
            Some(start) => definition
                .entry_nodes()
                .find(|n| n.node_type == start)
                .ok_or_else(|| RuntimeError::NoSuchStartType {
                    start_type: start.to_string(),
                })?,
            // Loading rejects definitions without an entry node.
            None => definition
                .entry_nodes()
                .next()
                .ok_or_else(|| RuntimeError::NoEntryNode {
                    machine: definition.label(),
                })?,
        };

        let id = self.seed(template);
        self.is_initialized = true;

        tracing::info!(
            machine = %definition.label(),
            node = %id,
            node_type = %template.node_type,
            "initiated runtime"
        );

        Ok(id)
    }

    /// Seeds one instance per entry node, in declared order.
    pub fn initiate_forest(&mut self) -> Result<Vec<NodeId>, RuntimeError> {
        if self.is_initialized {
            return Err(RuntimeError::AlreadyInitialized);
        }

        let definition = Arc::clone(&self.definition);
        let ids: Vec<NodeId> = definition.entry_nodes().map(|t| self.seed(t)).collect();
        self.is_initialized = true;

        tracing::info!(
            machine = %definition.label(),
            branches = ids.len(),
            "initiated forest runtime"
        );

        Ok(ids)
    }

    fn seed(&mut self, template: &NodeTemplate) -> NodeId {
        let instance = template.instantiate(self.fresh_id());
        let id = instance.id.clone();
        self.registry.insert(id.clone(), instance.clone());
        self.candidates.insert(id.clone(), instance);
        id
    }

    fn fresh_id(&self) -> NodeId {
        self.config
            .identity
            .fresh(self.registry.len(), |id| {
                self.registry.contains_key(id) || self.candidates.contains_key(id)
            })
    }

    /// Returns the transitions available to a candidate, in declared order.
    pub fn get_events(&self, candidate_id: &NodeId) -> Result<Vec<&TransitionTemplate>, RuntimeError> {
        let candidate =
            self.candidates
                .get(candidate_id)
                .ok_or_else(|| RuntimeError::UnknownCandidate {
                    candidate_id: candidate_id.to_string(),
                })?;

        Ok(self
            .definition
            .transitions_from(&candidate.node_type)
            .collect())
    }

    /// Executes an event against one candidate.
    ///
    /// An event for a candidate that is no longer live is ignored. Every
    /// other failure leaves the runtime unchanged.
    pub fn execute_event(&mut self, event: &Event) -> Result<ExecuteOutcome, RuntimeError> {
        if event.transition_id.is_empty() {
            return Err(RuntimeError::InvalidEvent {
                reason: "empty transition id".to_string(),
            });
        }

        if self.candidates.is_empty() {
            return Err(RuntimeError::NotInitialized);
        }

        let Some(candidate) = self.candidates.get(&event.candidate_id) else {
            tracing::warn!(
                candidate = %event.candidate_id,
                transition = %event.transition_id,
                "ignoring event for stale candidate"
            );
            return Ok(ExecuteOutcome::Ignored);
        };

        let definition = Arc::clone(&self.definition);
        let template = definition
            .transitions()
            .iter()
            .find(|t| t.matches(&candidate.node_type, event))
            .ok_or_else(|| RuntimeError::NoMatchingTransition {
                transition_id: event.transition_id.clone(),
                node_type: candidate.node_type.clone(),
            })?;

        let payload = match self.config.payload_policy {
            PayloadPolicy::Apply => template
                .guard
                .applied_to(&candidate.payload)
                .map_err(|source| RuntimeError::PatchFailed {
                    candidate_id: candidate.id.to_string(),
                    source,
                })?,
            PayloadPolicy::MatchOnly => candidate.payload.clone(),
        };

        let step = self.plan(template, candidate, &definition)?;

        // Everything below is infallible.
        let Some(mut previous) = self.candidates.remove(&event.candidate_id) else {
            return Ok(ExecuteOutcome::Ignored);
        };
        previous.payload = payload;

        let outcome = match step {
            Step::Resolve => {
                let id = previous.id.clone();
                self.history.record_resolve(&id, &template.id);
                self.registry.insert(id.clone(), previous);
                if self.candidates.is_empty() {
                    self.is_resolved = true;
                }
                ExecuteOutcome::Resolved { previous: id }
            }
            Step::Mint => {
                let current = previous.mint(self.fresh_id());
                self.advance(previous, current, template)
            }
            Step::Retry { attempt } => {
                let id = previous.id.clone();
                self.retry_counts
                    .insert((id.clone(), template.id.clone()), attempt);
                self.registry.insert(id.clone(), previous.clone());
                self.candidates.insert(id.clone(), previous);
                ExecuteOutcome::Retried {
                    instance: id,
                    attempt,
                }
            }
            Step::Advance { target } => {
                let current = target.instantiate(self.fresh_id());
                self.advance(previous, current, template)
            }
        };

        tracing::debug!(
            machine = %definition.label(),
            transition = %template.id,
            outcome = ?outcome,
            candidates = self.candidates.len(),
            "executed event"
        );

        Ok(outcome)
    }

    /// Decides what `template` does to `candidate` without mutating anything.
    fn plan<'d>(
        &self,
        template: &TransitionTemplate,
        candidate: &NodeInstance,
        definition: &'d MachineDefinition,
    ) -> Result<Step<'d>, RuntimeError> {
        if template.is_resolve {
            return Ok(Step::Resolve);
        }

        if template.is_self_loop() {
            if template.mint_new_instance_on_self_loop {
                return Ok(Step::Mint);
            }

            let attempt = self.retry_count(&candidate.id, &template.id) + 1;
            if let Some(max_retry) = template.max_retry.or(self.config.default_max_retry) {
                if attempt > max_retry {
                    return Err(RuntimeError::RetryLimitExceeded {
                        transition_id: template.id.clone(),
                        candidate_id: candidate.id.to_string(),
                        attempts: attempt,
                        max_retry,
                    });
                }
            }
            return Ok(Step::Retry { attempt });
        }

        let to_type = template.to_type.as_deref().unwrap_or_default();
        let target = definition
            .node(to_type)
            .ok_or_else(|| RuntimeError::UnknownTargetType {
                transition_id: template.id.clone(),
                to_type: to_type.to_string(),
            })?;

        if !target.allow_duplicate_instance
            && self
                .candidates
                .values()
                .any(|c| c.node_type == target.node_type && c.id != candidate.id)
        {
            return Err(RuntimeError::DuplicateInstance {
                node_type: target.node_type.clone(),
            });
        }

        Ok(Step::Advance { target })
    }

    fn advance(
        &mut self,
        previous: NodeInstance,
        current: NodeInstance,
        template: &TransitionTemplate,
    ) -> ExecuteOutcome {
        let previous_id = previous.id.clone();
        let current_id = current.id.clone();

        self.history
            .record_step(&previous_id, &template.id, &current_id);
        self.registry.insert(previous_id.clone(), previous);
        self.registry.insert(current_id.clone(), current.clone());
        self.candidates.insert(current_id.clone(), current);

        ExecuteOutcome::Advanced {
            previous: previous_id,
            current: current_id,
        }
    }

    /// Returns the definition this runtime executes.
    pub fn definition(&self) -> &Arc<MachineDefinition> {
        &self.definition
    }

    /// Returns the configuration the runtime was created with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Live candidates, ordered by identity.
    pub fn candidates(&self) -> impl Iterator<Item = &NodeInstance> {
        self.candidates.values()
    }

    /// Looks up a live candidate.
    pub fn candidate(&self, id: &NodeId) -> Option<&NodeInstance> {
        self.candidates.get(id)
    }

    /// Live candidate ids, ordered.
    pub fn candidate_ids(&self) -> Vec<NodeId> {
        self.candidates.keys().cloned().collect()
    }

    /// Number of live candidates.
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Returns the transition history.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Looks up any instance that ever existed in this runtime.
    pub fn instance(&self, id: &NodeId) -> Option<&NodeInstance> {
        self.registry.get(id)
    }

    /// Every instance that ever existed, ordered by identity.
    pub fn instances(&self) -> impl Iterator<Item = &NodeInstance> {
        self.registry.values()
    }

    /// In-place retries recorded for `(id, transition_id)`.
    pub fn retry_count(&self, id: &NodeId, transition_id: &str) -> u32 {
        self.retry_counts
            .get(&(id.clone(), transition_id.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// True once the candidate set has been seeded.
    pub fn is_initialized(&self) -> bool {
        self.is_initialized
    }

    /// True once every branch has resolved.
    pub fn is_resolved(&self) -> bool {
        self.is_resolved
    }
}
