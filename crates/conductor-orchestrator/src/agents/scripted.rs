//! Deterministic specialist with scripted failures.

use async_trait::async_trait;
use conductor_abstraction::{
    ComplianceStatus, HandoffData, IssueSeverity, QualityIssue, QualityReport, Specialist,
    SpecialistError, SpecialistOutput, Stage, StageInput,
};
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureStyle {
    /// Return `Err(SpecialistError::RequestError)`.
    Error,
    /// Return `Ok` with `success = false`.
    Reported,
}

/// A specialist that returns canned output for its stage.
///
/// Failures are scripted by attempt number: `failing_first(2)` fails the first
/// two calls and succeeds from the third on. The attempt counter is shared
/// across runs.
#[derive(Debug)]
pub struct ScriptedSpecialist {
    id: String,
    description: String,
    stage: Stage,
    output: Option<SpecialistOutput>,
    fail_first: u32,
    failure_style: FailureStyle,
    delay: Option<Duration>,
    attempts: AtomicU32,
}

impl ScriptedSpecialist {
    /// Creates a specialist for `stage` that always succeeds.
    #[must_use]
    pub fn new(stage: Stage) -> Self {
        Self {
            id: format!("scripted-{stage}"),
            description: format!("Scripted {stage} specialist"),
            stage,
            output: None,
            fail_first: 0,
            failure_style: FailureStyle::Error,
            delay: None,
            attempts: AtomicU32::new(0),
        }
    }

    /// Returns `output` instead of the stage default on success.
    #[must_use]
    pub fn with_output(mut self, output: SpecialistOutput) -> Self {
        self.output = Some(output);
        self
    }

    /// Fails the first `attempts` calls.
    #[must_use]
    pub fn failing_first(mut self, attempts: u32) -> Self {
        self.fail_first = attempts;
        self
    }

    /// Fails every call.
    #[must_use]
    pub fn always_failing(self) -> Self {
        self.failing_first(u32::MAX)
    }

    /// Scripted failures return `success = false` instead of an error.
    #[must_use]
    pub fn reporting_failure(mut self) -> Self {
        self.failure_style = FailureStyle::Reported;
        self
    }

    /// Sleeps for `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Stage this specialist serves.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Number of calls received so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Specialist for ScriptedSpecialist {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, input: &StageInput) -> Result<SpecialistOutput, SpecialistError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        debug!(
            specialist = %self.id,
            workflow_id = %input.workflow_id,
            attempt,
            "Scripted specialist executing"
        );

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if input.stage != self.stage {
            return Err(SpecialistError::InvalidInput(format!(
                "{} cannot execute the {} stage",
                self.id, input.stage
            )));
        }

        if attempt <= self.fail_first {
            let reason = format!("scripted failure on attempt {attempt}");
            return match self.failure_style {
                FailureStyle::Error => Err(SpecialistError::RequestError(reason)),
                FailureStyle::Reported => Ok(SpecialistOutput::failure(reason)),
            };
        }

        Ok(self.output.clone().unwrap_or_else(|| default_output(self.stage, input)))
    }
}

/// Canned output satisfying the handoff contract of each stage.
fn default_output(stage: Stage, input: &StageInput) -> SpecialistOutput {
    let topic = &input.brief.topic;
    match stage {
        Stage::Content => SpecialistOutput::success(
            HandoffData::new()
                .with_content_package(json!({
                    "headline": topic,
                    "subject_line": format!("{topic}: what's new"),
                    "body": format!("Everything you need to know about {topic}."),
                    "call_to_action": "Read more",
                }))
                .with_design_requirements(json!({
                    "layout": "single-column",
                    "sections": ["hero", "body", "cta"],
                    "audience": input.brief.target_audience,
                }))
                .with_brand_guidelines(json!({
                    "palette": ["#1B3A57", "#F2A541"],
                    "tone": "friendly",
                    "font_family": "Helvetica",
                })),
        )
        .with_confidence(0.9),
        Stage::Design => SpecialistOutput::success(HandoffData::new().with_design_package(json!({
            "template": "newsletter-classic",
            "html": format!("<html><body><h1>{topic}</h1></body></html>"),
            "images": ["hero.jpg"],
        })))
        .with_confidence(0.85),
        Stage::Quality => SpecialistOutput::success(
            HandoffData::new()
                .with_quality_package(json!({"checks_run": 12, "checks_passed": 11}))
                .with_quality_score(92.0),
        )
        .with_quality_report(QualityReport {
            overall_score: 92.0,
            issues: vec![QualityIssue::new(
                IssueSeverity::Low,
                "accessibility",
                "Hero image alt text could be more descriptive",
            )],
        })
        .with_compliance(ComplianceStatus::Compliant)
        .with_confidence(0.88)
        .with_recommendation("Tighten the hero image alt text"),
        Stage::Delivery => {
            let target = input.deployment_target.as_deref().unwrap_or("local");
            SpecialistOutput::success(HandoffData::new().with_field(
                "delivery_package",
                json!({"files": ["campaign.html", "campaign.txt"], "target": target}),
            ))
            .with_artifact("html_file", json!(format!("{}/campaign.html", input.workflow_id)))
            .with_efficiency(0.95)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_abstraction::CampaignBrief;

    fn input(stage: Stage) -> StageInput {
        StageInput {
            workflow_id: "wf-scripted".to_string(),
            stage,
            brief: CampaignBrief::new("Spring sale"),
            handoff: HandoffData::new(),
            quality_requirements: None,
            deployment_target: Some("s3://bucket".to_string()),
        }
    }

    #[tokio::test]
    async fn test_default_outputs_per_stage() {
        let content = ScriptedSpecialist::new(Stage::Content).execute(&input(Stage::Content)).await.unwrap();
        assert!(content.handoff_data.has_field("brand_guidelines"));
        assert_eq!(content.handoff_data.content_package.unwrap()["headline"], json!("Spring sale"));

        let quality = ScriptedSpecialist::new(Stage::Quality).execute(&input(Stage::Quality)).await.unwrap();
        assert_eq!(quality.handoff_data.quality_score, Some(92.0));
        assert_eq!(quality.compliance_status, Some(ComplianceStatus::Compliant));

        let delivery =
            ScriptedSpecialist::new(Stage::Delivery).execute(&input(Stage::Delivery)).await.unwrap();
        assert_eq!(
            delivery.handoff_data.field("delivery_package").unwrap()["target"],
            json!("s3://bucket")
        );
    }

    #[tokio::test]
    async fn test_failing_first() {
        let specialist = ScriptedSpecialist::new(Stage::Design).failing_first(2);
        for _ in 0..2 {
            let err = specialist.execute(&input(Stage::Design)).await.unwrap_err();
            assert!(matches!(err, SpecialistError::RequestError(_)));
        }
        assert!(specialist.execute(&input(Stage::Design)).await.unwrap().success);
        assert_eq!(specialist.attempts(), 3);
    }

    #[tokio::test]
    async fn test_reporting_failure() {
        let specialist = ScriptedSpecialist::new(Stage::Design).always_failing().reporting_failure();
        let output = specialist.execute(&input(Stage::Design)).await.unwrap();
        assert!(!output.success);
        assert_eq!(output.error.as_deref(), Some("scripted failure on attempt 1"));
    }

    #[tokio::test]
    async fn test_wrong_stage_rejected() {
        let specialist = ScriptedSpecialist::new(Stage::Content);
        let err = specialist.execute(&input(Stage::Delivery)).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid Input: scripted-content cannot execute the delivery stage"
        );
    }

    #[tokio::test]
    async fn test_custom_output() {
        let custom = SpecialistOutput::success(HandoffData::new().with_field("k", json!(1)));
        let specialist = ScriptedSpecialist::new(Stage::Content).with_output(custom.clone());
        assert_eq!(specialist.execute(&input(Stage::Content)).await.unwrap(), custom);
    }
}
