//! Patch error types.

use crate::operation::OpKind;
use thiserror::Error;

/// Errors from building or applying patch operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("invalid patch operation: {reason}")]
    InvalidOperation { reason: String },

    #[error("{op} at '{path}' failed: {reason}")]
    Failed {
        op: OpKind,
        path: String,
        reason: String,
    },
}
