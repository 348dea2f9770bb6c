//! Workflow run state machine.

use conductor_abstraction::Stage;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{OrchestrationError, Result};

/// State of a workflow run.
///
/// `Pending` is initial; `Completed` and `Failed` are terminal. Running states
/// only move forward in stage order, so a skipped stage is simply jumped over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Run accepted, no stage started.
    Pending,
    /// Content stage executing.
    ContentRunning,
    /// Design stage executing.
    DesignRunning,
    /// Quality stage executing.
    QualityRunning,
    /// Delivery stage executing.
    DeliveryRunning,
    /// Every non-skipped stage succeeded.
    Completed,
    /// The run was abandoned.
    Failed,
}

impl WorkflowState {
    /// The running state for `stage`.
    pub fn running(stage: Stage) -> Self {
        match stage {
            Stage::Content => WorkflowState::ContentRunning,
            Stage::Design => WorkflowState::DesignRunning,
            Stage::Quality => WorkflowState::QualityRunning,
            Stage::Delivery => WorkflowState::DeliveryRunning,
        }
    }

    /// The stage executing in this state, if any.
    pub fn stage(self) -> Option<Stage> {
        match self {
            WorkflowState::ContentRunning => Some(Stage::Content),
            WorkflowState::DesignRunning => Some(Stage::Design),
            WorkflowState::QualityRunning => Some(Stage::Quality),
            WorkflowState::DeliveryRunning => Some(Stage::Delivery),
            WorkflowState::Pending | WorkflowState::Completed | WorkflowState::Failed => None,
        }
    }

    /// Returns true for `Completed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowState::Completed | WorkflowState::Failed)
    }

    /// Returns true if the state machine allows moving to `next`.
    pub fn can_transition_to(self, next: WorkflowState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            WorkflowState::Pending => false,
            WorkflowState::Completed | WorkflowState::Failed => true,
            running => match (self.stage(), running.stage()) {
                (None, Some(_)) => true,
                (Some(current), Some(target)) => target > current,
                _ => false,
            },
        }
    }

    /// Moves to `next`, or reports the illegal transition.
    pub fn transition_to(self, next: WorkflowState) -> Result<WorkflowState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(OrchestrationError::InvalidTransition { from: self, to: next })
        }
    }

    /// Stable snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowState::Pending => "pending",
            WorkflowState::ContentRunning => "content_running",
            WorkflowState::DesignRunning => "design_running",
            WorkflowState::QualityRunning => "quality_running",
            WorkflowState::DeliveryRunning => "delivery_running",
            WorkflowState::Completed => "completed",
            WorkflowState::Failed => "failed",
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
