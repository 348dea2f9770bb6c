//! Specialist abstraction layer for Conductor.
//!
//! This crate defines the contract between the workflow orchestrator and the
//! four stage specialists (content, design, quality, delivery): the request a
//! specialist receives, the output it returns and the payload it hands on.

pub mod handoff;
pub mod output;
pub mod stage;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use handoff::HandoffData;
pub use output::{
    ComplianceStatus, IssueSeverity, QualityIssue, QualityReport, SpecialistOutput,
    StageAnalytics,
};
pub use stage::{Stage, Transition, UnknownStage};

/// Represents an error that can occur when a specialist executes a stage.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialistError {
    /// The request to the backing service failed (network, transport).
    #[error("Request Error: {0}")]
    RequestError(String),

    /// The stage input was unusable.
    #[error("Invalid Input: {0}")]
    InvalidInput(String),

    /// The backing service answered with an error (rate limit, bad response).
    #[error("Backend Error: {0}")]
    BackendError(String),

    /// Other unexpected errors.
    #[error("Other Specialist Error: {0}")]
    Other(String),
}

/// Campaign brief shared by every stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignBrief {
    /// What the campaign is about.
    pub topic: String,
    /// Newsletter, promotion, announcement, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_type: Option<String>,
    /// Intended readers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    /// Distribution route (email, web, social).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// Any other brief attribute.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CampaignBrief {
    /// Creates a brief for a topic.
    pub fn new(topic: impl Into<String>) -> Self {
        Self { topic: topic.into(), ..Self::default() }
    }

    /// Sets the campaign type.
    #[must_use]
    pub fn with_campaign_type(mut self, campaign_type: impl Into<String>) -> Self {
        self.campaign_type = Some(campaign_type.into());
        self
    }

    /// Sets the target audience.
    #[must_use]
    pub fn with_target_audience(mut self, audience: impl Into<String>) -> Self {
        self.target_audience = Some(audience.into());
        self
    }

    /// Sets the distribution route.
    #[must_use]
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }
}

fn default_min_quality_score() -> f64 {
    70.0
}

/// Thresholds the quality stage output has to meet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityRequirements {
    /// Lowest acceptable overall score.
    #[serde(default = "default_min_quality_score")]
    pub min_quality_score: f64,
    /// Compliance verdict the quality stage must report, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_compliance: Option<ComplianceStatus>,
    /// Continue past a failed gate instead of aborting.
    #[serde(default)]
    pub auto_fix_issues: bool,
}

impl Default for QualityRequirements {
    fn default() -> Self {
        Self {
            min_quality_score: default_min_quality_score(),
            required_compliance: None,
            auto_fix_issues: false,
        }
    }
}

/// Request handed to a specialist for one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageInput {
    /// Workflow run this request belongs to.
    pub workflow_id: String,
    /// Stage being executed.
    pub stage: Stage,
    /// Stage-independent campaign fields.
    pub brief: CampaignBrief,
    /// Payload accumulated from the earlier stages.
    pub handoff: HandoffData,
    /// Gate thresholds, set for the quality stage only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_requirements: Option<QualityRequirements>,
    /// Deployment target, set for the delivery stage only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_target: Option<String>,
}

/// A trait for the external collaborators that perform the work of a stage.
///
/// All specialists must be `Send + Sync` so that independent workflow runs can
/// share them.
#[async_trait]
pub trait Specialist: Send + Sync {
    /// Returns the unique ID of the specialist.
    fn id(&self) -> &str;

    /// Returns a description of what the specialist produces.
    fn description(&self) -> &str;

    /// Executes one stage.
    ///
    /// # Errors
    /// Returns a `SpecialistError` if the stage could not be executed.
    async fn execute(&self, input: &StageInput) -> Result<SpecialistOutput, SpecialistError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoSpecialist;

    #[async_trait]
    impl Specialist for EchoSpecialist {
        fn id(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes the topic into the content package"
        }

        async fn execute(&self, input: &StageInput) -> Result<SpecialistOutput, SpecialistError> {
            if input.brief.topic.is_empty() {
                return Err(SpecialistError::InvalidInput("empty topic".to_string()));
            }
            Ok(SpecialistOutput::success(
                HandoffData::new().with_content_package(json!(input.brief.topic)),
            ))
        }
    }

    fn input(topic: &str) -> StageInput {
        StageInput {
            workflow_id: "wf-1".to_string(),
            stage: Stage::Content,
            brief: CampaignBrief::new(topic),
            handoff: HandoffData::new(),
            quality_requirements: None,
            deployment_target: None,
        }
    }

    #[tokio::test]
    async fn test_specialist_trait_object() {
        let specialist: Box<dyn Specialist> = Box::new(EchoSpecialist);
        let output = specialist.execute(&input("Spring sale")).await.unwrap();
        assert_eq!(output.handoff_data.content_package, Some(json!("Spring sale")));

        let err = specialist.execute(&input("")).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid Input: empty topic");
    }

    #[test]
    fn test_brief_extra_fields() {
        let brief: CampaignBrief = serde_json::from_value(json!({
            "topic": "Autumn launch",
            "route": "email",
            "region": "EMEA"
        }))
        .unwrap();
        assert_eq!(brief.route.as_deref(), Some("email"));
        assert_eq!(brief.extra.get("region"), Some(&json!("EMEA")));
    }

    #[test]
    fn test_quality_requirements_defaults() {
        let requirements: QualityRequirements = serde_json::from_value(json!({})).unwrap();
        assert!((requirements.min_quality_score - 70.0).abs() < f64::EPSILON);
        assert!(requirements.required_compliance.is_none());
        assert!(!requirements.auto_fix_issues);
    }
}
