//! What a specialist returns to the orchestrator.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::handoff::HandoffData;

/// Severity of a quality issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    /// Cosmetic.
    Low,
    /// Should be fixed before the next campaign.
    Medium,
    /// Should be fixed before delivery.
    High,
    /// Blocks delivery.
    Critical,
}

/// Compliance verdict reported by the quality stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    /// Meets every rule checked.
    Compliant,
    /// A human should look before release.
    NeedsReview,
    /// Breaks at least one rule.
    NonCompliant,
}

impl ComplianceStatus {
    /// Wire name of the verdict.
    pub fn as_str(self) -> &'static str {
        match self {
            ComplianceStatus::Compliant => "compliant",
            ComplianceStatus::NeedsReview => "needs_review",
            ComplianceStatus::NonCompliant => "non_compliant",
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding from the quality stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    /// How serious the finding is.
    pub severity: IssueSeverity,
    /// Area the finding belongs to (accessibility, markup, brand, ...).
    #[serde(default)]
    pub category: String,
    /// Human-readable description.
    pub description: String,
}

impl QualityIssue {
    /// Creates a new issue.
    pub fn new(
        severity: IssueSeverity,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self { severity, category: category.into(), description: description.into() }
    }
}

/// Report produced by the quality stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Overall score, 0 to 100.
    pub overall_score: f64,
    /// Findings, in the order the specialist reported them.
    #[serde(default)]
    pub issues: Vec<QualityIssue>,
}

impl QualityReport {
    /// Number of issues with `critical` severity.
    pub fn critical_issue_count(&self) -> usize {
        self.issues.iter().filter(|issue| issue.severity == IssueSeverity::Critical).count()
    }
}

/// Self-reported metrics a specialist attaches to its output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageAnalytics {
    /// Confidence in the produced work, 0 to 1 (content, design, quality).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    /// Efficiency of the run, 0 to 1 (delivery).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_efficiency: Option<f64>,
    /// Any other metric the specialist reports.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of one specialist invocation.
///
/// `success = false` is treated the same as an error return: the attempt
/// failed and may be retried.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecialistOutput {
    /// Whether the specialist considers the stage done.
    pub success: bool,
    /// Failure reason when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Payload for the following stages.
    #[serde(default)]
    pub handoff_data: HandoffData,
    /// Free-text notes surfaced in the workflow recommendations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
    /// Self-reported metrics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics: Option<StageAnalytics>,
    /// Quality findings (quality stage only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_report: Option<QualityReport>,
    /// Compliance verdict (quality stage only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_status: Option<ComplianceStatus>,
    /// Finished artifacts (files, URLs, packages) keyed by name.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub artifacts: Map<String, Value>,
}

impl SpecialistOutput {
    /// Creates a successful output carrying `handoff_data`.
    pub fn success(handoff_data: HandoffData) -> Self {
        Self { success: true, handoff_data, ..Self::default() }
    }

    /// Creates a failed output with a reason.
    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()), ..Self::default() }
    }

    /// Attaches a confidence score.
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.analytics.get_or_insert_with(StageAnalytics::default).confidence_score =
            Some(confidence);
        self
    }

    /// Attaches an efficiency figure.
    #[must_use]
    pub fn with_efficiency(mut self, efficiency: f64) -> Self {
        self.analytics.get_or_insert_with(StageAnalytics::default).agent_efficiency =
            Some(efficiency);
        self
    }

    /// Attaches a quality report.
    #[must_use]
    pub fn with_quality_report(mut self, report: QualityReport) -> Self {
        self.quality_report = Some(report);
        self
    }

    /// Attaches a compliance verdict.
    #[must_use]
    pub fn with_compliance(mut self, status: ComplianceStatus) -> Self {
        self.compliance_status = Some(status);
        self
    }

    /// Adds a note.
    #[must_use]
    pub fn with_recommendation(mut self, note: impl Into<String>) -> Self {
        self.recommendations.push(note.into());
        self
    }

    /// Adds a named artifact.
    #[must_use]
    pub fn with_artifact(mut self, name: impl Into<String>, value: Value) -> Self {
        self.artifacts.insert(name.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_critical_issue_count() {
        let report = QualityReport {
            overall_score: 64.0,
            issues: vec![
                QualityIssue::new(IssueSeverity::Critical, "markup", "Unclosed table"),
                QualityIssue::new(IssueSeverity::Low, "copy", "Double space"),
                QualityIssue::new(IssueSeverity::Critical, "links", "Broken CTA"),
            ],
        };
        assert_eq!(report.critical_issue_count(), 2);
    }

    #[test]
    fn test_builders() {
        let output = SpecialistOutput::success(HandoffData::new())
            .with_confidence(0.9)
            .with_efficiency(0.8)
            .with_recommendation("Shorten subject line")
            .with_artifact("html", json!("<html></html>"));

        assert!(output.success);
        let analytics = output.analytics.unwrap();
        assert_eq!(analytics.confidence_score, Some(0.9));
        assert_eq!(analytics.agent_efficiency, Some(0.8));
        assert_eq!(output.recommendations, vec!["Shorten subject line".to_string()]);
        assert!(output.artifacts.contains_key("html"));
    }

    #[test]
    fn test_output_deserializes_with_defaults() {
        let output: SpecialistOutput = serde_json::from_value(json!({
            "success": false,
            "error": "backend unavailable"
        }))
        .unwrap();

        assert!(!output.success);
        assert_eq!(output.error.as_deref(), Some("backend unavailable"));
        assert!(output.handoff_data.is_empty());
    }

    #[test]
    fn test_compliance_status_wire_names() {
        let json = serde_json::to_string(&ComplianceStatus::NeedsReview).unwrap();
        assert_eq!(json, "\"needs_review\"");
        assert_eq!(ComplianceStatus::NeedsReview.to_string(), "needs_review");
    }
}
