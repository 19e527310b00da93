//! # automaton-core
//!
//! Data-driven workflow automaton.
//!
//! This crate provides:
//! - Machine definition loading and validation (JSON, YAML or templates)
//! - A runtime that advances a set of candidate nodes through guarded transitions
//! - Provenance history, retry accounting and snapshots
//! - An engine hosting many runtimes over shared definitions

pub mod config;
pub mod definition;
pub mod document;
pub mod engine;
pub mod error;
pub mod history;
pub mod identity;
pub mod node;
pub mod runtime;
pub mod snapshot;
pub mod transition;

pub use automaton_patch::{OpKind, Payload, PatchError, PatchOperation};
pub use config::{ConfigError, EngineConfig, PayloadPolicy};
pub use definition::MachineDefinition;
pub use document::{MachineDocument, NodeDocument, TransitionDocument};
pub use engine::AutomatonEngine;
pub use error::{CoreError, DefinitionError, RuntimeError};
pub use history::{History, HistoryEntry};
pub use identity::{IdStrategy, IdentityConfig};
pub use node::{NodeId, NodeInstance, NodeTemplate};
pub use runtime::{ExecuteOutcome, MachineRuntime};
pub use snapshot::{RetryCount, Snapshot};
pub use transition::{Event, TransitionTemplate};
