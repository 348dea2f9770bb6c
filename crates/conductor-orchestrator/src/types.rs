//! Request and result types of the workflow API.

use conductor_abstraction::{CampaignBrief, HandoffData, QualityReport, SpecialistOutput, Stage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::ExecutionConfig;
use crate::state::WorkflowState;
use crate::tracker::HandoffExecution;

/// Request to run the pipeline once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecutionInput {
    /// Run identifier, unique among in-flight runs.
    pub workflow_id: String,
    /// Campaign brief shared by every stage.
    pub campaign_brief: CampaignBrief,
    /// Skips, retry policy, gates and deadlines.
    #[serde(default)]
    pub execution_config: ExecutionConfig,
    /// Payload seeding the content stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_handoff: Option<HandoffData>,
}

impl WorkflowExecutionInput {
    /// Creates a request with the default configuration.
    pub fn new(workflow_id: impl Into<String>, campaign_brief: CampaignBrief) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            campaign_brief,
            execution_config: ExecutionConfig::default(),
            initial_handoff: None,
        }
    }

    /// Replaces the execution configuration.
    #[must_use]
    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.execution_config = config;
        self
    }

    /// Seeds the content stage with a payload.
    #[must_use]
    pub fn with_initial_handoff(mut self, handoff: HandoffData) -> Self {
        self.initial_handoff = Some(handoff);
        self
    }
}

/// Headline figures of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    /// Stages attempted, in order, including a stage that failed.
    pub agents_executed: Vec<Stage>,
    /// Wall-clock time of the whole run.
    pub total_execution_time_ms: u64,
    /// Mean of the confidence figures reported by the stages, 0 when none.
    pub overall_confidence: f64,
    /// Score reported by the quality stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    /// Efficiency score, 0 to 100.
    pub workflow_efficiency: u32,
    /// Quality issues of any severity.
    pub issues_found: usize,
    /// Quality issues with critical severity.
    pub critical_issues: usize,
    /// Handoff validation issues.
    pub handoff_issues: usize,
}

/// Deliverables pulled out of the stage results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalArtifacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_package: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_package: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_report: Option<QualityReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_package: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_target: Option<String>,
}

/// Handoff timing and size figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandoffAnalytics {
    /// Execution records in the run.
    pub total_handoffs: usize,
    /// Records with an end time.
    pub completed_handoffs: usize,
    /// Mean duration of the completed records.
    pub average_handoff_time_ms: f64,
    /// Serialized size of every produced handoff payload.
    pub data_transfer_bytes: u64,
    /// Slow or retry-heavy stages.
    pub bottlenecks: Vec<String>,
}

/// Result of one run, built on both the success and the failure path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecutionOutput {
    pub success: bool,
    pub workflow_id: String,
    /// Terminal state of the run.
    pub state: WorkflowState,
    pub execution_summary: ExecutionSummary,
    /// Output of every stage that returned one, keyed by stage.
    pub agent_results: BTreeMap<Stage, SpecialistOutput>,
    pub final_artifacts: FinalArtifacts,
    pub handoff_analytics: HandoffAnalytics,
    /// Full audit trail of the run.
    pub execution_history: Vec<HandoffExecution>,
    pub recommendations: Vec<String>,
    /// Message of the error that ended the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowExecutionOutput {
    /// Execution record of `stage`, if it ran.
    pub fn execution(&self, stage: Stage) -> Option<&HandoffExecution> {
        self.execution_history.iter().rev().find(|record| record.agent_id == stage)
    }
}

/// Indicative performance figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceProfile {
    /// Typical end-to-end duration of a four-stage run.
    pub typical_workflow_duration_ms: u64,
    /// Default deadline per stage attempt.
    pub default_stage_timeout_ms: u64,
    /// Default retries per stage.
    pub default_max_retries: u32,
    /// Stages run one after another within a run.
    pub parallel_stages: bool,
}

/// Static description of what the coordinator manages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorCapabilities {
    pub name: String,
    pub version: String,
    /// Stages in execution order.
    pub managed_stages: Vec<Stage>,
    /// Supported features.
    pub features: Vec<String>,
    pub performance: PerformanceProfile,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_input_deserializes_with_default_config() {
        let input: WorkflowExecutionInput = serde_json::from_value(json!({
            "workflow_id": "wf-42",
            "campaign_brief": {"topic": "Summer newsletter"}
        }))
        .unwrap();

        assert_eq!(input.workflow_id, "wf-42");
        assert_eq!(input.execution_config, ExecutionConfig::default());
        assert!(input.initial_handoff.is_none());
    }

    #[test]
    fn test_agent_results_keyed_by_stage_name() {
        let mut agent_results = BTreeMap::new();
        agent_results.insert(Stage::Design, SpecialistOutput::success(HandoffData::new()));
        agent_results.insert(Stage::Content, SpecialistOutput::success(HandoffData::new()));

        let output = WorkflowExecutionOutput {
            success: true,
            workflow_id: "wf-1".to_string(),
            state: WorkflowState::Completed,
            execution_summary: ExecutionSummary::default(),
            agent_results,
            final_artifacts: FinalArtifacts::default(),
            handoff_analytics: HandoffAnalytics::default(),
            execution_history: Vec::new(),
            recommendations: Vec::new(),
            error: None,
        };

        let value = serde_json::to_value(&output).unwrap();
        let keys: Vec<&String> = value["agent_results"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["content", "design"]);
        assert_eq!(value["state"], json!("completed"));
        assert!(value.get("error").is_none());
    }
}
