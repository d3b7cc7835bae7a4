//! Workflow-terminating failure types.
//!
//! A [`WorkflowFailure`] is what workflow code returns or propagates with
//! `?`. It never reaches the host as an error: the dispatcher converts it
//! into a `fail_workflow_execution` command and the run is over.

use weft_core::protocol::Failure;

/// Category of a workflow failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// User code failed; `non_retryable` marks permanent failures.
    Application { non_retryable: bool },
    /// The workflow or one of its scopes was cancelled.
    Cancelled,
    /// User code observed something that cannot replay identically.
    DeterminismViolation,
}

/// Failure raised by or delivered to workflow code.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{failure_type}: {message}")]
pub struct WorkflowFailure {
    pub message: String,
    pub kind: FailureKind,
    /// Category label carried on the wire, e.g. `ApplicationFailure`,
    /// `ReferenceError`, `CancelledFailure`.
    pub failure_type: String,
    pub stack: Option<String>,
}

impl WorkflowFailure {
    /// A retryable application failure.
    pub fn application(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: FailureKind::Application {
                non_retryable: false,
            },
            failure_type: "ApplicationFailure".to_string(),
            stack: None,
        }
    }

    /// A permanent application failure with an explicit category label.
    pub fn non_retryable(message: impl Into<String>, failure_type: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: FailureKind::Application {
                non_retryable: true,
            },
            failure_type: failure_type.into(),
            stack: None,
        }
    }

    /// The failure used when a workflow type cannot be resolved at init:
    /// non-retryable, categorized `ReferenceError`, stack stripped to one
    /// line.
    pub fn reference_error(message: impl Into<String>) -> Self {
        let message = message.into();
        let stack = format!("ReferenceError: {message}");
        Self {
            message,
            kind: FailureKind::Application {
                non_retryable: true,
            },
            failure_type: "ReferenceError".to_string(),
            stack: Some(stack),
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: FailureKind::Cancelled,
            failure_type: "CancelledFailure".to_string(),
            stack: None,
        }
    }

    pub fn determinism_violation(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: FailureKind::DeterminismViolation,
            failure_type: "DeterminismViolationError".to_string(),
            stack: None,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        self.kind == FailureKind::Cancelled
    }

    pub fn is_non_retryable(&self) -> bool {
        !matches!(
            self.kind,
            FailureKind::Application {
                non_retryable: false
            }
        )
    }

    /// Convert into the wire representation.
    pub fn to_proto(&self) -> Failure {
        Failure {
            message: self.message.clone(),
            failure_type: self.failure_type.clone(),
            stack_trace: self.stack.clone().unwrap_or_default(),
            non_retryable: self.is_non_retryable(),
        }
    }

    /// Convert a wire failure delivered in a resolution job back into the
    /// runtime representation.
    pub fn from_proto(failure: Failure) -> Self {
        let kind = match failure.failure_type.as_str() {
            "CancelledFailure" => FailureKind::Cancelled,
            "DeterminismViolationError" => FailureKind::DeterminismViolation,
            _ => FailureKind::Application {
                non_retryable: failure.non_retryable,
            },
        };
        Self {
            message: failure.message,
            kind,
            failure_type: failure.failure_type,
            stack: if failure.stack_trace.is_empty() {
                None
            } else {
                Some(failure.stack_trace)
            },
        }
    }
}

impl From<weft_core::CoreError> for WorkflowFailure {
    fn from(err: weft_core::CoreError) -> Self {
        let failure_type = match &err {
            weft_core::CoreError::IllegalState(_) => "IllegalStateError",
            weft_core::CoreError::TypeMismatch(_) => "TypeError",
            _ => "ApplicationFailure",
        };
        Self::non_retryable(err.to_string(), failure_type)
    }
}
