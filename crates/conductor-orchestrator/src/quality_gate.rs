//! Pass/fail check applied to the quality stage output.

use conductor_abstraction::{QualityRequirements, SpecialistOutput};
use serde::{Deserialize, Serialize};

/// Result of a gate evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateVerdict {
    /// True when every requirement is met.
    pub passed: bool,
    /// Score the gate evaluated, if one was reported.
    pub score: Option<f64>,
    /// Reasons the gate failed, empty on a pass.
    pub violations: Vec<String>,
}

/// Evaluates quality stage output against [`QualityRequirements`].
#[derive(Debug, Clone)]
pub struct QualityGate {
    requirements: QualityRequirements,
}

impl QualityGate {
    /// Creates a gate for the given thresholds.
    pub fn new(requirements: QualityRequirements) -> Self {
        Self { requirements }
    }

    /// The thresholds in use.
    pub fn requirements(&self) -> &QualityRequirements {
        &self.requirements
    }

    /// Checks minimum score, required compliance and critical issues.
    ///
    /// The score comes from the quality report, falling back to the handoff
    /// `quality_score`. A missing score fails the gate.
    pub fn evaluate(&self, output: &SpecialistOutput) -> GateVerdict {
        let mut violations = Vec::new();

        let score = output
            .quality_report
            .as_ref()
            .map(|report| report.overall_score)
            .or(output.handoff_data.quality_score);

        match score {
            None => violations.push("No quality score reported".to_string()),
            Some(value) if !value.is_finite() => {
                violations.push(format!("Quality score {value} is not a number"));
            }
            Some(value) if value < self.requirements.min_quality_score => {
                violations.push(format!(
                    "Quality score {} is below the minimum of {}",
                    value, self.requirements.min_quality_score
                ));
            }
            Some(_) => {}
        }

        if let Some(required) = self.requirements.required_compliance {
            match output.compliance_status {
                Some(actual) if actual == required => {}
                Some(actual) => violations.push(format!(
                    "Compliance status {actual} does not meet required {required}"
                )),
                None => violations
                    .push(format!("Compliance status not reported, {required} required")),
            }
        }

        let critical = output.quality_report.as_ref().map_or(0, |r| r.critical_issue_count());
        if critical > 0 {
            violations.push(format!("{critical} critical issue(s) found"));
        }

        GateVerdict { passed: violations.is_empty(), score, violations }
    }
}
