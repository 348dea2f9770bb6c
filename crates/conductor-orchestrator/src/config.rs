//! Execution configuration for a workflow run.
//!
//! Loaded from TOML, e.g.
//!
//! ```toml
//! skip_agents = ["delivery"]
//! handoff_validation = "enforce"
//! stage_timeout_ms = 120000
//!
//! [retry_policy]
//! max_retries = 3
//! strategy = "exponential"
//!
//! [quality_requirements]
//! min_quality_score = 80
//! required_compliance = "compliant"
//! ```

use conductor_abstraction::{QualityRequirements, Stage};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::handoff::ValidationMode;
use crate::retry::{DelayStrategy, RetryPolicy};

/// Upper bound accepted for `retry_policy.max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 20;

fn default_stage_timeout_ms() -> u64 {
    300_000
}

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// How a single run is executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Stages omitted from the run.
    pub skip_agents: Vec<Stage>,
    /// Retry policy applied to every stage.
    pub retry_policy: RetryPolicy,
    /// Quality gate thresholds; no gate when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_requirements: Option<QualityRequirements>,
    /// Where the delivery stage publishes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_target: Option<String>,
    /// Strictness of handoff validation.
    pub handoff_validation: ValidationMode,
    /// Deadline per stage attempt in milliseconds, 0 disables it.
    #[serde(default = "default_stage_timeout_ms")]
    pub stage_timeout_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            skip_agents: Vec::new(),
            retry_policy: RetryPolicy::default(),
            quality_requirements: None,
            deployment_target: None,
            handoff_validation: ValidationMode::default(),
            stage_timeout_ms: default_stage_timeout_ms(),
        }
    }
}

impl ExecutionConfig {
    /// Loads and validates a configuration file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ExecutionConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - `max_retries` does not exceed [`MAX_RETRIES_LIMIT`]
    /// - exponential policies have `max_delay_ms >= retry_delay_ms`
    /// - `min_quality_score` is within 0 to 100
    /// - `deployment_target` is not blank
    pub fn validate(&self) -> Result<(), ConfigError> {
        let policy = &self.retry_policy;
        if policy.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::Validation(format!(
                "retry_policy.max_retries must be at most {}, got {}",
                MAX_RETRIES_LIMIT, policy.max_retries
            )));
        }

        if policy.strategy == DelayStrategy::Exponential && policy.max_delay_ms < policy.retry_delay_ms
        {
            return Err(ConfigError::Validation(format!(
                "retry_policy.max_delay_ms ({}) must not be below retry_delay_ms ({})",
                policy.max_delay_ms, policy.retry_delay_ms
            )));
        }

        if let Some(requirements) = &self.quality_requirements {
            if !(0.0..=100.0).contains(&requirements.min_quality_score) {
                return Err(ConfigError::Validation(format!(
                    "quality_requirements.min_quality_score must be between 0 and 100, got {}",
                    requirements.min_quality_score
                )));
            }
        }

        if self.deployment_target.as_deref().is_some_and(|target| target.trim().is_empty()) {
            return Err(ConfigError::Validation("deployment_target cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Returns true if `stage` is listed in `skip_agents`.
    pub fn should_skip(&self, stage: Stage) -> bool {
        self.skip_agents.contains(&stage)
    }

    /// Deadline per stage attempt, `None` when disabled.
    pub fn stage_timeout(&self) -> Option<Duration> {
        (self.stage_timeout_ms > 0).then(|| Duration::from_millis(self.stage_timeout_ms))
    }

    /// Adds a stage to skip.
    #[must_use]
    pub fn with_skip(mut self, stage: Stage) -> Self {
        if !self.skip_agents.contains(&stage) {
            self.skip_agents.push(stage);
        }
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Enables the quality gate.
    #[must_use]
    pub fn with_quality_requirements(mut self, requirements: QualityRequirements) -> Self {
        self.quality_requirements = Some(requirements);
        self
    }

    /// Sets the deployment target.
    #[must_use]
    pub fn with_deployment_target(mut self, target: impl Into<String>) -> Self {
        self.deployment_target = Some(target.into());
        self
    }

    /// Sets the handoff validation strictness.
    #[must_use]
    pub fn with_handoff_validation(mut self, mode: ValidationMode) -> Self {
        self.handoff_validation = mode;
        self
    }

    /// Sets the per-attempt deadline; `Duration::ZERO` disables it.
    #[must_use]
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout_ms = timeout.as_millis() as u64;
        self
    }
}
