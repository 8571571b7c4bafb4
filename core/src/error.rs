//! Error taxonomy for the operation manager and array orchestrator.

use thiserror::Error;

/// Errors surfaced by the operation manager, executors, and array orchestrator.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("operation '{0}' not found")]
    NotFound(String),

    #[error("no executor registered for operation type '{0}'")]
    NoExecutor(String),

    #[error("conflicts with active operation '{id}' ({operation_type})")]
    ConflictingOperation { id: String, operation_type: String },

    #[error("at capacity: {active} active operations (max {max})")]
    Capacity { active: usize, max: usize },

    #[error("operation is not cancellable")]
    NotCancellable,

    #[error("operation already in a terminal state")]
    AlreadyTerminal,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("external collaborator error: {0}")]
    External(#[from] anyhow::Error),

    #[error("operation cancelled")]
    Cancelled,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AgentError>;
