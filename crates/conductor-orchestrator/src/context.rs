//! Per-call run context threaded through the coordinator.

use conductor_abstraction::{HandoffData, SpecialistOutput, Stage, StageInput};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::error::Result;
use crate::handoff::ValidationReport;
use crate::quality_gate::GateVerdict;
use crate::state::WorkflowState;
use crate::tracker::ExecutionTracker;
use crate::types::WorkflowExecutionInput;

/// Everything one run accumulates. Owned by a single `execute_workflow` call.
#[derive(Debug)]
pub(crate) struct WorkflowRunContext {
    pub(crate) workflow_id: String,
    pub(crate) state: WorkflowState,
    pub(crate) started: Instant,
    pub(crate) tracker: ExecutionTracker,
    pub(crate) agent_results: BTreeMap<Stage, SpecialistOutput>,
    /// Rolling merged payload handed to the next stage.
    pub(crate) handoff: HandoffData,
    pub(crate) handoff_reports: Vec<ValidationReport>,
    pub(crate) quality_verdict: Option<GateVerdict>,
    /// Coordinator notes surfaced as recommendations.
    pub(crate) notes: Vec<String>,
}

impl WorkflowRunContext {
    pub(crate) fn new(input: &WorkflowExecutionInput) -> Self {
        Self {
            workflow_id: input.workflow_id.clone(),
            state: WorkflowState::Pending,
            started: Instant::now(),
            tracker: ExecutionTracker::new(input.workflow_id.clone()),
            agent_results: BTreeMap::new(),
            handoff: input.initial_handoff.clone().unwrap_or_default(),
            handoff_reports: Vec::new(),
            quality_verdict: None,
            notes: Vec::new(),
        }
    }

    /// Moves the state machine forward.
    pub(crate) fn advance(&mut self, next: WorkflowState) -> Result<()> {
        self.state = self.state.transition_to(next)?;
        Ok(())
    }

    /// Moves to `Failed` unless the run already ended.
    pub(crate) fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = WorkflowState::Failed;
        }
    }

    /// Builds the request for `stage` from the brief and the current handoff.
    pub(crate) fn stage_input(&self, stage: Stage, input: &WorkflowExecutionInput) -> StageInput {
        let config = &input.execution_config;
        StageInput {
            workflow_id: self.workflow_id.clone(),
            stage,
            brief: input.campaign_brief.clone(),
            handoff: self.handoff.clone(),
            quality_requirements: if stage == Stage::Quality {
                config.quality_requirements.clone()
            } else {
                None
            },
            deployment_target: if stage == Stage::Delivery {
                config.deployment_target.clone()
            } else {
                None
            },
        }
    }

    pub(crate) fn handoff_issue_count(&self) -> usize {
        self.handoff_reports.iter().map(|report| report.issues.len()).sum()
    }

    pub(crate) fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}
