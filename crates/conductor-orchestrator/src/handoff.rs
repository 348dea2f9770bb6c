//! Handoff validation and merging between stages.
//!
//! Validation checks the handful of keys the orchestrator depends on for each
//! transition and reports issues without failing. Whether an issue blocks the
//! run is decided by the caller through [`ValidationMode`].

use conductor_abstraction::{HandoffData, Transition};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Longest string kept by [`HandoffMerger::optimize`], in characters.
pub const MAX_TEXT_LEN: usize = 50_000;

/// Longest array kept by [`HandoffMerger::optimize`].
pub const MAX_ARRAY_LEN: usize = 100;

/// Most recent payloads kept in `workflow_history`.
pub const MAX_HISTORY_LEN: usize = 100;

/// Lowest quality score accepted on the `quality_to_delivery` transition.
pub const MIN_DELIVERY_QUALITY_SCORE: f64 = 70.0;

/// How strictly handoff validation issues are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Validation is skipped.
    Off,
    /// Issues are logged and surfaced as recommendations.
    #[default]
    Warn,
    /// Issues abort the run.
    Enforce,
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValidationMode::Off => "off",
            ValidationMode::Warn => "warn",
            ValidationMode::Enforce => "enforce",
        })
    }
}

/// Outcome of validating one handoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Transition that was checked.
    pub transition: Transition,
    /// True when no issue was found.
    pub valid: bool,
    /// Human-readable issues.
    pub issues: Vec<String>,
}

/// Checks handoff payloads against the per-transition contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandoffValidator;

impl HandoffValidator {
    /// Creates a validator.
    pub fn new() -> Self {
        Self
    }

    /// Keys that must be present (and not null) for `transition`.
    pub fn required_fields(transition: Transition) -> &'static [&'static str] {
        match transition {
            Transition::ContentToDesign => {
                &["content_package", "design_requirements", "brand_guidelines"]
            }
            Transition::DesignToQuality => &["design_package", "content_package"],
            Transition::QualityToDelivery => &["quality_package", "quality_score"],
        }
    }

    /// Validates `payload` for `transition`. Never fails; problems are reported.
    pub fn validate(&self, payload: &HandoffData, transition: Transition) -> ValidationReport {
        let mut issues: Vec<String> = Self::required_fields(transition)
            .iter()
            .filter(|field| !payload.has_field(field))
            .map(|field| format!("Missing required field '{field}' for {transition}"))
            .collect();

        if transition == Transition::QualityToDelivery {
            if let Some(score) = payload.quality_score {
                if !score.is_finite() {
                    issues.push(format!("Quality score {score} is not a number"));
                } else if score < MIN_DELIVERY_QUALITY_SCORE {
                    issues.push(format!(
                        "Quality score {score} is below the delivery threshold of {MIN_DELIVERY_QUALITY_SCORE}"
                    ));
                }
            }
        }

        ValidationReport { transition, valid: issues.is_empty(), issues }
    }
}

/// Combines handoff payloads and bounds their size.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandoffMerger;

impl HandoffMerger {
    /// Creates a merger.
    pub fn new() -> Self {
        Self
    }

    /// Merges `incoming` over `existing`.
    ///
    /// Non-null typed fields and `extra` keys of `incoming` win; a `null` in
    /// `incoming` never clears an existing value. A snapshot of `incoming` without its own history is appended to
    /// `workflow_history`.
    pub fn merge(&self, existing: &HandoffData, incoming: &HandoffData) -> HandoffData {
        let mut combined = existing.clone();

        override_value(&mut combined.content_package, incoming.content_package.as_ref());
        override_value(&mut combined.design_requirements, incoming.design_requirements.as_ref());
        override_value(&mut combined.brand_guidelines, incoming.brand_guidelines.as_ref());
        override_value(&mut combined.design_package, incoming.design_package.as_ref());
        override_value(&mut combined.quality_package, incoming.quality_package.as_ref());
        if incoming.quality_score.is_some() {
            combined.quality_score = incoming.quality_score;
        }

        for (key, value) in incoming.extra.iter().filter(|(_, v)| !v.is_null()) {
            combined.extra.insert(key.clone(), value.clone());
        }
        combined.truncated |= incoming.truncated;

        let snapshot = serde_json::to_value(incoming.without_history())
            .unwrap_or_else(|_| Value::Object(Map::new()));
        combined.workflow_history.push(snapshot);
        cap_history(&mut combined.workflow_history);

        combined
    }

    /// Cuts oversized strings and arrays, setting `truncated` when anything changed.
    pub fn optimize(&self, payload: &HandoffData) -> HandoffData {
        let mut optimized = payload.clone();
        let mut cut = false;

        for field in [
            &mut optimized.content_package,
            &mut optimized.design_requirements,
            &mut optimized.brand_guidelines,
            &mut optimized.design_package,
            &mut optimized.quality_package,
        ]
        .into_iter()
        .flatten()
        {
            cut |= truncate_value(field);
        }
        for value in optimized.extra.values_mut() {
            cut |= truncate_value(value);
        }
        for entry in &mut optimized.workflow_history {
            cut |= truncate_value(entry);
        }
        cut |= cap_history(&mut optimized.workflow_history);

        optimized.truncated |= cut;
        optimized
    }
}

/// Drops the oldest history entries beyond `MAX_HISTORY_LEN`. Returns true if any were dropped.
fn cap_history(history: &mut Vec<Value>) -> bool {
    if history.len() <= MAX_HISTORY_LEN {
        return false;
    }
    let excess = history.len() - MAX_HISTORY_LEN;
    history.drain(..excess);
    true
}

fn override_value(target: &mut Option<Value>, incoming: Option<&Value>) {
    if let Some(value) = incoming.filter(|v| !v.is_null()) {
        *target = Some(value.clone());
    }
}

/// Recursively truncates `value` in place. Returns true if anything was cut.
fn truncate_value(value: &mut Value) -> bool {
    match value {
        Value::String(text) => {
            if text.chars().count() > MAX_TEXT_LEN {
                *text = text.chars().take(MAX_TEXT_LEN).collect();
                true
            } else {
                false
            }
        }
        Value::Array(items) => {
            let mut cut = items.len() > MAX_ARRAY_LEN;
            items.truncate(MAX_ARRAY_LEN);
            for item in items.iter_mut() {
                cut |= truncate_value(item);
            }
            cut
        }
        Value::Object(map) => {
            let mut cut = false;
            for item in map.values_mut() {
                cut |= truncate_value(item);
            }
            cut
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complete_content_handoff() -> HandoffData {
        HandoffData::new()
            .with_content_package(json!({"headline": "Spring sale"}))
            .with_design_requirements(json!({"layout": "single-column"}))
            .with_brand_guidelines(json!({"palette": ["#003366"]}))
    }

    #[test]
    fn test_validate_complete_payload() {
        let report = HandoffValidator::new()
            .validate(&complete_content_handoff(), Transition::ContentToDesign);
        assert!(report.valid);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_validate_reports_missing_and_null_fields() {
        let payload = HandoffData::new()
            .with_content_package(json!("copy"))
            .with_brand_guidelines(Value::Null);
        let report = HandoffValidator::new().validate(&payload, Transition::ContentToDesign);

        assert!(!report.valid);
        assert_eq!(
            report.issues,
            vec![
                "Missing required field 'design_requirements' for content_to_design".to_string(),
                "Missing required field 'brand_guidelines' for content_to_design".to_string(),
            ]
        );
    }

    #[test]
    fn test_validate_low_quality_score_flagged() {
        let payload =
            HandoffData::new().with_quality_package(json!({"checks": 12})).with_quality_score(65.0);
        let report = HandoffValidator::new().validate(&payload, Transition::QualityToDelivery);

        assert!(!report.valid);
        assert_eq!(
            report.issues,
            vec!["Quality score 65 is below the delivery threshold of 70".to_string()]
        );
    }

    #[test]
    fn test_validate_missing_quality_score() {
        let payload = HandoffData::new().with_quality_package(json!({}));
        let report = HandoffValidator::new().validate(&payload, Transition::QualityToDelivery);
        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].contains("quality_score"));
    }

    #[test]
    fn test_merge_overrides_and_records_history() {
        let existing = complete_content_handoff().with_field("locale", json!("en-GB"));
        let incoming = HandoffData::new()
            .with_design_package(json!({"html": "<table></table>"}))
            .with_content_package(Value::Null)
            .with_field("locale", json!("en-US"));

        let merged = HandoffMerger::new().merge(&existing, &incoming);

        assert_eq!(merged.content_package, existing.content_package);
        assert_eq!(merged.design_package, incoming.design_package);
        assert_eq!(merged.extra.get("locale"), Some(&json!("en-US")));
        assert_eq!(merged.workflow_history.len(), 1);
        assert!(merged.workflow_history[0].get("workflow_history").is_none());
    }

    #[test]
    fn test_merge_is_idempotent_apart_from_history() {
        let merger = HandoffMerger::new();
        let a = complete_content_handoff();
        let b = HandoffData::new()
            .with_design_package(json!("layout"))
            .with_quality_score(88.0)
            .with_field("channel", json!("email"));

        let once = merger.merge(&a, &b);
        let twice = merger.merge(&once, &b);

        assert_eq!(twice.without_history(), once.without_history());
        assert_eq!(twice.workflow_history.len(), once.workflow_history.len() + 1);
    }

    #[test]
    fn test_merge_history_is_bounded() {
        let merger = HandoffMerger::new();
        let incoming = HandoffData::new().with_field("step", json!(1));
        let mut payload = HandoffData::new();
        for _ in 0..(MAX_HISTORY_LEN + 5) {
            payload = merger.merge(&payload, &incoming);
        }
        assert_eq!(payload.workflow_history.len(), MAX_HISTORY_LEN);
    }

    #[test]
    fn test_merge_null_never_clears_existing() {
        let existing = complete_content_handoff().with_field("locale", json!("en-GB"));
        let incoming = HandoffData::new()
            .with_brand_guidelines(Value::Null)
            .with_field("locale", Value::Null)
            .with_field("channel", Value::Null);

        let merged = HandoffMerger::new().merge(&existing, &incoming);

        assert_eq!(merged.brand_guidelines, existing.brand_guidelines);
        assert_eq!(merged.extra.get("locale"), Some(&json!("en-GB")));
        assert!(!merged.extra.contains_key("channel"));
    }

    #[test]
    fn test_optimize_keeps_newest_history() {
        let mut payload = HandoffData::new();
        payload.workflow_history = (0..MAX_HISTORY_LEN + 20).map(|i| json!({"step": i})).collect();

        let optimized = HandoffMerger::new().optimize(&payload);

        assert!(optimized.truncated);
        assert_eq!(optimized.workflow_history.len(), MAX_HISTORY_LEN);
        assert_eq!(optimized.workflow_history[0], json!({"step": 20}));
        assert_eq!(
            optimized.workflow_history.last(),
            Some(&json!({"step": MAX_HISTORY_LEN + 19}))
        );
    }

    #[test]
    fn test_optimize_truncates_nested_values() {
        let long_text = "x".repeat(MAX_TEXT_LEN + 10);
        let payload = HandoffData::new()
            .with_content_package(json!({"body": long_text, "tags": (0..150).collect::<Vec<_>>()}));

        let optimized = HandoffMerger::new().optimize(&payload);
        let package = optimized.content_package.unwrap();

        assert!(optimized.truncated);
        assert_eq!(package["body"].as_str().unwrap().len(), MAX_TEXT_LEN);
        assert_eq!(package["tags"].as_array().unwrap().len(), MAX_ARRAY_LEN);
    }

    #[test]
    fn test_optimize_leaves_small_payloads_alone() {
        let payload = complete_content_handoff();
        let optimized = HandoffMerger::new().optimize(&payload);
        assert_eq!(optimized, payload);
        assert!(!optimized.truncated);
    }

    #[test]
    fn test_validation_mode_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: ValidationMode,
        }
        let wrapper: Wrapper = toml::from_str("mode = \"enforce\"").unwrap();
        assert_eq!(wrapper.mode, ValidationMode::Enforce);
        assert_eq!(ValidationMode::default(), ValidationMode::Warn);
    }
}
