//! # automaton-patch
//!
//! Patch operations for automaton.
//!
//! This crate provides:
//! - A closed set of JSON Patch operations (add, remove, replace, move, copy, test)
//! - Structural equality for guard matching
//! - Atomic application of an operation to a payload

pub mod error;
pub mod operation;

pub use error::PatchError;
pub use operation::{OpKind, PatchOperation};

/// Structured node payload.
///
/// Maps keep document order (`serde_json` is built with `preserve_order`).
pub type Payload = serde_json::Value;
