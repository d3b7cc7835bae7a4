//! Core error types for the weft durable-execution worker
//!
//! This module contains error types shared by every crate in the workspace.
//! Failures that terminate a *workflow* (application errors, cancellation,
//! determinism violations) are not represented here; those live with the
//! runtime because they become `fail_workflow_execution` commands rather
//! than host-visible errors.

/// Core error type for host-facing runtime operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An operation was invoked out of order (e.g. `activate` before
    /// `init_runtime`, or a completion consumed twice)
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A decoded message or loaded module violated shape expectations
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Wire decoding error
    #[error("decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Shorthand for an [`CoreError::IllegalState`] with a formatted message.
    pub fn illegal_state(msg: impl Into<String>) -> Self {
        Self::IllegalState(msg.into())
    }

    /// Shorthand for a [`CoreError::TypeMismatch`] with a formatted message.
    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        Self::TypeMismatch(msg.into())
    }
}

/// Result type alias for core operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;
