// Error types for workflow orchestration

use conductor_abstraction::{SpecialistError, Stage, Transition};
use thiserror::Error;

use crate::retry::RetryableError;
use crate::state::WorkflowState;

/// Result type for orchestration operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

/// Failure of a single stage attempt.
#[derive(Debug, Error)]
pub enum StageError {
    /// The specialist returned an error.
    #[error(transparent)]
    Specialist(#[from] SpecialistError),

    /// The specialist returned `success = false`.
    #[error("Specialist reported failure: {0}")]
    Reported(String),

    /// The attempt exceeded the per-stage deadline.
    #[error("Stage attempt timed out after {0}ms")]
    TimedOut(u64),

    /// The specialist task panicked or was aborted.
    #[error("Specialist task aborted: {0}")]
    Aborted(String),

    /// The run was cancelled while the attempt was in flight.
    #[error("Stage execution cancelled")]
    Cancelled,
}

impl RetryableError for StageError {
    fn is_retryable(&self) -> bool {
        !matches!(self, StageError::Cancelled)
    }
}

/// Orchestration errors
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// A stage failed and its retries are exhausted.
    #[error("Stage '{stage}' failed after {attempts} attempt(s): {source}")]
    StageFailed {
        /// Stage that failed
        stage: Stage,
        /// Attempts made, including the first
        attempts: u32,
        /// Error from the last attempt
        source: StageError,
    },

    /// The quality gate rejected the quality stage output.
    #[error("Quality gate failed: {}", .violations.join("; "))]
    QualityGate {
        /// Reasons the gate failed
        violations: Vec<String>,
    },

    /// Handoff validation failed in enforce mode.
    #[error("Handoff '{transition}' rejected: {}", .issues.join("; "))]
    HandoffRejected {
        /// Transition that was validated
        transition: Transition,
        /// Validation issues
        issues: Vec<String>,
    },

    /// A run with the same workflow id is still in flight.
    #[error("Workflow '{0}' is already running")]
    DuplicateRun(String),

    /// The state machine refused a transition.
    #[error("Invalid workflow state transition from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: WorkflowState,
        /// Requested state
        to: WorkflowState,
    },

    /// The run was cancelled by the caller.
    #[error("Workflow cancelled {0}")]
    Cancelled(String),
}
