//! Core error types.

use automaton_patch::PatchError;
use thiserror::Error;

/// Errors raised while validating a machine definition.
///
/// Checks run in a fixed order and the first failure is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("duplicate node type '{node_type}'")]
    DuplicateNodeType { node_type: String },

    #[error("no entry node declared")]
    NoEntryNode,

    #[error("no resolve node declared")]
    NoResolveNode,

    #[error("multiple entry nodes ({entries:?}) but machine is not a forest")]
    MultipleEntryNodesNotAllowed { entries: Vec<String> },

    #[error("duplicate transition id '{transition_id}'")]
    DuplicateTransitionId { transition_id: String },

    #[error("resolve transition '{transition_id}' has non-empty target '{target}'")]
    ResolveTransitionHasTarget {
        transition_id: String,
        target: String,
    },

    #[error("transition with empty id (from '{from_type}')")]
    EmptyTransitionId { from_type: String },

    #[error("transition '{transition_id}' source '{from_type}' is not a declared node")]
    UnknownSourceType {
        transition_id: String,
        from_type: String,
    },

    #[error("transition '{transition_id}' has no target and is not a resolve transition")]
    MissingTarget { transition_id: String },

    #[error("transition '{transition_id}' target '{to_type}' is not a declared node")]
    UnknownTargetType {
        transition_id: String,
        to_type: String,
    },
}

/// Errors from operating a machine runtime.
///
/// None of these leave the runtime partially updated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("runtime already initialized")]
    AlreadyInitialized,

    #[error("runtime not initialized or already resolved")]
    NotInitialized,

    #[error("no entry node of type '{start_type}'")]
    NoSuchStartType { start_type: String },

    #[error("definition '{machine}' declares no entry node")]
    NoEntryNode { machine: String },

    #[error("invalid event: {reason}")]
    InvalidEvent { reason: String },

    #[error("unknown candidate: {candidate_id}")]
    UnknownCandidate { candidate_id: String },

    #[error("no transition '{transition_id}' from '{node_type}' matches the guard operation")]
    NoMatchingTransition {
        transition_id: String,
        node_type: String,
    },

    #[error("transition '{transition_id}' targets unknown node type '{to_type}'")]
    UnknownTargetType {
        transition_id: String,
        to_type: String,
    },

    #[error("retry limit exceeded for transition '{transition_id}' on {candidate_id}: {attempts} > {max_retry}")]
    RetryLimitExceeded {
        transition_id: String,
        candidate_id: String,
        attempts: u32,
        max_retry: u32,
    },

    #[error("node type '{node_type}' already has a live candidate and does not allow duplicates")]
    DuplicateInstance { node_type: String },

    #[error("guard operation could not be applied to {candidate_id}: {source}")]
    PatchFailed {
        candidate_id: String,
        #[source]
        source: PatchError,
    },

    #[error("definition mismatch: snapshot is {expected}, definition is {actual}")]
    DefinitionMismatch { expected: String, actual: String },

    #[error("invalid snapshot: {reason}")]
    InvalidSnapshot { reason: String },
}

/// Top-level error for the automaton engine.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid machine definition: {0}")]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("machine not found: {machine}/{variant}")]
    MachineNotFound { machine: String, variant: String },

    #[error("machine already exists with different content: {machine}/{variant}")]
    MachineExists { machine: String, variant: String },

    #[error("runtime not found: {runtime_id}")]
    RuntimeNotFound { runtime_id: String },

    #[error("runtime already exists: {runtime_id}")]
    RuntimeExists { runtime_id: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Returns an error code suitable for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::Definition(_) => "INVALID_DEFINITION",
            CoreError::Runtime(e) => e.error_code(),
            CoreError::MachineNotFound { .. } => "MACHINE_NOT_FOUND",
            CoreError::MachineExists { .. } => "MACHINE_EXISTS",
            CoreError::RuntimeNotFound { .. } => "RUNTIME_NOT_FOUND",
            CoreError::RuntimeExists { .. } => "RUNTIME_EXISTS",
            CoreError::Json(_) | CoreError::Yaml(_) => "BAD_REQUEST",
            CoreError::Io(_) => "IO_ERROR",
        }
    }
}

impl RuntimeError {
    /// Returns an error code suitable for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            RuntimeError::AlreadyInitialized => "ALREADY_INITIALIZED",
            RuntimeError::NotInitialized => "NOT_INITIALIZED",
            RuntimeError::NoSuchStartType { .. } => "NO_SUCH_START_TYPE",
            RuntimeError::NoEntryNode { .. } => "NO_ENTRY_NODE",
            RuntimeError::InvalidEvent { .. } => "INVALID_EVENT",
            RuntimeError::UnknownCandidate { .. } => "UNKNOWN_CANDIDATE",
            RuntimeError::NoMatchingTransition { .. } => "NO_MATCHING_TRANSITION",
            RuntimeError::UnknownTargetType { .. } => "UNKNOWN_TARGET_TYPE",
            RuntimeError::RetryLimitExceeded { .. } => "RETRY_LIMIT_EXCEEDED",
            RuntimeError::DuplicateInstance { .. } => "DUPLICATE_INSTANCE",
            RuntimeError::PatchFailed { .. } => "PATCH_FAILED",
            RuntimeError::DefinitionMismatch { .. } => "DEFINITION_MISMATCH",
            RuntimeError::InvalidSnapshot { .. } => "INVALID_SNAPSHOT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = CoreError::from(RuntimeError::NotInitialized);
        assert_eq!(err.error_code(), "NOT_INITIALIZED");
        assert_eq!(err.to_string(), "runtime not initialized or already resolved");

        let err = CoreError::from(DefinitionError::NoEntryNode);
        assert_eq!(err.error_code(), "INVALID_DEFINITION");
        assert_eq!(
            err.to_string(),
            "invalid machine definition: no entry node declared"
        );
    }
}
