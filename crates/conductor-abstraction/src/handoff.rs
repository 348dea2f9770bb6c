//! Handoff payload passed from one stage to the next.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload a stage produces for the stages after it.
///
/// The fields the orchestrator checks are typed; everything else a specialist
/// wants to pass along goes into `extra`, which is flattened on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandoffData {
    /// Copy produced by the content stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_package: Option<Value>,
    /// Layout and asset requirements for the design stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_requirements: Option<Value>,
    /// Brand rules (palette, tone, typography).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_guidelines: Option<Value>,
    /// Rendered design produced by the design stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_package: Option<Value>,
    /// Review output produced by the quality stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_package: Option<Value>,
    /// Numeric quality score, 0 to 100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    /// Every payload merged into this one, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workflow_history: Vec<Value>,
    /// Set when oversized values were cut down.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
    /// Domain-specific fields the orchestrator does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HandoffData {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the content package.
    #[must_use]
    pub fn with_content_package(mut self, value: Value) -> Self {
        self.content_package = Some(value);
        self
    }

    /// Sets the design requirements.
    #[must_use]
    pub fn with_design_requirements(mut self, value: Value) -> Self {
        self.design_requirements = Some(value);
        self
    }

    /// Sets the brand guidelines.
    #[must_use]
    pub fn with_brand_guidelines(mut self, value: Value) -> Self {
        self.brand_guidelines = Some(value);
        self
    }

    /// Sets the design package.
    #[must_use]
    pub fn with_design_package(mut self, value: Value) -> Self {
        self.design_package = Some(value);
        self
    }

    /// Sets the quality package.
    #[must_use]
    pub fn with_quality_package(mut self, value: Value) -> Self {
        self.quality_package = Some(value);
        self
    }

    /// Sets the quality score.
    #[must_use]
    pub fn with_quality_score(mut self, score: f64) -> Self {
        self.quality_score = Some(score);
        self
    }

    /// Adds a domain-specific field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Looks up a field by its wire name, typed fields first.
    ///
    /// `null` values are reported as absent.
    pub fn field(&self, name: &str) -> Option<&Value> {
        let value = match name {
            "content_package" => self.content_package.as_ref(),
            "design_requirements" => self.design_requirements.as_ref(),
            "brand_guidelines" => self.brand_guidelines.as_ref(),
            "design_package" => self.design_package.as_ref(),
            "quality_package" => self.quality_package.as_ref(),
            _ => self.extra.get(name),
        };
        value.filter(|v| !v.is_null())
    }

    /// Returns true if the named field is present and not null.
    ///
    /// `quality_score` is handled separately because it is numeric.
    pub fn has_field(&self, name: &str) -> bool {
        if name == "quality_score" {
            return self.quality_score.is_some();
        }
        self.field(name).is_some()
    }

    /// Returns a copy without the merge history.
    pub fn without_history(&self) -> Self {
        Self { workflow_history: Vec::new(), ..self.clone() }
    }

    /// Returns true when no field is set.
    pub fn is_empty(&self) -> bool {
        self.content_package.is_none()
            && self.design_requirements.is_none()
            && self.brand_guidelines.is_none()
            && self.design_package.is_none()
            && self.quality_package.is_none()
            && self.quality_score.is_none()
            && self.extra.is_empty()
    }
}
