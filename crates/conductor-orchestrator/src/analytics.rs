//! Workflow analytics derived from execution records and stage outputs.
//!
//! Everything here is a pure function of data the run already collected.

use conductor_abstraction::{SpecialistOutput, Stage};
use std::collections::BTreeMap;

use crate::tracker::HandoffExecution;
use crate::types::HandoffAnalytics;

/// Factor over the mean duration above which an execution is a bottleneck.
pub const BOTTLENECK_FACTOR: f64 = 1.5;

/// Efficiency points lost per retry, as a fraction.
pub const RETRY_PENALTY: f64 = 0.1;

/// Aggregate confidence below which a recommendation is emitted.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Computes run-level metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticsEngine;

impl AnalyticsEngine {
    /// Mean of the confidence figures reported by the stages.
    ///
    /// Content, design and quality contribute `confidence_score`; delivery
    /// contributes `agent_efficiency`. Returns `None` when no stage reported one.
    pub fn overall_confidence(results: &BTreeMap<Stage, SpecialistOutput>) -> Option<f64> {
        let samples: Vec<f64> = results
            .iter()
            .filter_map(|(stage, output)| {
                let analytics = output.analytics.as_ref()?;
                match stage {
                    Stage::Delivery => analytics.agent_efficiency,
                    Stage::Content | Stage::Design | Stage::Quality => analytics.confidence_score,
                }
            })
            .filter(|value| value.is_finite())
            .collect();

        if samples.is_empty() {
            None
        } else {
            Some(samples.iter().sum::<f64>() / samples.len() as f64)
        }
    }

    /// Efficiency score: `max(0, round((success_rate - retries * 0.1) * 100))`.
    ///
    /// An empty history scores 0.
    pub fn workflow_efficiency(records: &[HandoffExecution]) -> u32 {
        if records.is_empty() {
            return 0;
        }
        let successes = records.iter().filter(|record| record.success).count();
        let success_rate = successes as f64 / records.len() as f64;
        let retries: u32 = records.iter().map(|record| record.retry_count).sum();
        let score = (success_rate - f64::from(retries) * RETRY_PENALTY) * 100.0;
        score.round().max(0.0) as u32
    }

    /// Flags executions slower than 1.5x the mean duration, and executions
    /// retried more than once.
    pub fn detect_bottlenecks(records: &[HandoffExecution]) -> Vec<String> {
        if records.is_empty() {
            return Vec::new();
        }
        let durations: Vec<u64> = records.iter().map(HandoffExecution::duration_ms).collect();
        let mean = durations.iter().sum::<u64>() as f64 / durations.len() as f64;
        let threshold = mean * BOTTLENECK_FACTOR;

        let mut bottlenecks = Vec::new();
        for (record, duration) in records.iter().zip(durations) {
            if duration as f64 > threshold {
                bottlenecks.push(format!("{} ({}ms)", record.agent_id, duration));
            }
            if record.retry_count > 1 {
                bottlenecks.push(format!("{} retries ({})", record.agent_id, record.retry_count));
            }
        }
        bottlenecks
    }

    /// Handoff counts, timing, transferred bytes and bottlenecks.
    pub fn handoff_analytics(records: &[HandoffExecution]) -> HandoffAnalytics {
        let completed: Vec<&HandoffExecution> =
            records.iter().filter(|record| record.is_completed()).collect();
        let average_handoff_time_ms = if completed.is_empty() {
            0.0
        } else {
            completed.iter().map(|record| record.duration_ms()).sum::<u64>() as f64
                / completed.len() as f64
        };
        let data_transfer_bytes = records
            .iter()
            .filter_map(|record| record.handoff_data.as_ref())
            .filter_map(|data| serde_json::to_vec(data).ok())
            .map(|bytes| bytes.len() as u64)
            .sum();

        HandoffAnalytics {
            total_handoffs: records.len(),
            completed_handoffs: completed.len(),
            average_handoff_time_ms,
            data_transfer_bytes,
            bottlenecks: Self::detect_bottlenecks(records),
        }
    }

    /// Bottleneck and confidence notes appended to the run recommendations.
    pub fn recommendations(bottlenecks: &[String], overall_confidence: Option<f64>) -> Vec<String> {
        let mut notes: Vec<String> = bottlenecks
            .iter()
            .map(|bottleneck| format!("Investigate bottleneck: {bottleneck}"))
            .collect();
        if let Some(confidence) = overall_confidence {
            if confidence < LOW_CONFIDENCE_THRESHOLD {
                notes.push(format!(
                    "Overall confidence {confidence:.2} is below {LOW_CONFIDENCE_THRESHOLD}; review the stage outputs"
                ));
            }
        }
        notes
    }
}
