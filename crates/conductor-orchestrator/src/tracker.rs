//! Execution tracking for workflow stages.
//!
//! Keeps one record per stage invocation, in the order the stages ran. The
//! list is the audit trail of a run and is never pruned while the run lives.

use chrono::{DateTime, Utc};
use conductor_abstraction::{HandoffData, Stage};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Record of one stage invocation, covering all of its attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffExecution {
    /// Stage that was executed.
    pub agent_id: Stage,
    /// When the first attempt started.
    pub start_time: DateTime<Utc>,
    /// When the stage succeeded or gave up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Snapshot of the stage input.
    pub input: Value,
    /// Snapshot of the specialist output, on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Whether the stage eventually succeeded.
    pub success: bool,
    /// Last error seen, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Number of retries (attempts minus one).
    pub retry_count: u32,
    /// Number of attempts made so far.
    pub attempts: u32,
    /// Handoff payload produced by the stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handoff_data: Option<HandoffData>,
}

impl HandoffExecution {
    /// Creates a record for a stage whose first attempt starts now.
    pub fn new(stage: Stage, input: Value) -> Self {
        Self {
            agent_id: stage,
            start_time: Utc::now(),
            end_time: None,
            input,
            output: None,
            success: false,
            error: None,
            retry_count: 0,
            attempts: 1,
            handoff_data: None,
        }
    }

    /// Records that a retry has been scheduled after `error`.
    pub fn record_retry(&mut self, retry_count: u32, error: impl Into<String>) {
        self.retry_count = retry_count;
        self.attempts = retry_count.saturating_add(1);
        self.error = Some(error.into());
    }

    /// Finalizes the record as a success.
    pub fn mark_succeeded(&mut self, output: Value, handoff_data: HandoffData, retry_count: u32) {
        self.end_time = Some(Utc::now());
        self.success = true;
        self.output = Some(output);
        self.handoff_data = Some(handoff_data);
        self.retry_count = retry_count;
        self.attempts = retry_count.saturating_add(1);
        self.error = None;
    }

    /// Finalizes the record as a failure after `attempts` attempts.
    pub fn mark_failed(&mut self, error: impl Into<String>, attempts: u32) {
        self.end_time = Some(Utc::now());
        self.success = false;
        self.error = Some(error.into());
        self.attempts = attempts.max(1);
        self.retry_count = self.attempts - 1;
    }

    /// Returns true once the record has an end time.
    pub fn is_completed(&self) -> bool {
        self.end_time.is_some()
    }

    /// Wall-clock duration in milliseconds; zero while the stage is still open.
    pub fn duration_ms(&self) -> u64 {
        self.end_time.map_or(0, |end| {
            end.signed_duration_since(self.start_time).num_milliseconds().max(0) as u64
        })
    }
}

/// Ordered execution records for one workflow run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionTracker {
    /// Workflow the records belong to.
    workflow_id: String,
    /// Records in execution order.
    records: Vec<HandoffExecution>,
}

impl ExecutionTracker {
    /// Creates an empty tracker for a workflow.
    pub fn new(workflow_id: impl Into<String>) -> Self {
        Self { workflow_id: workflow_id.into(), records: Vec::new() }
    }

    /// Workflow id this tracker belongs to.
    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// Appends a record for `stage` and returns it for in-place updates.
    pub fn begin(&mut self, stage: Stage, input: Value) -> &mut HandoffExecution {
        self.records.push(HandoffExecution::new(stage, input));
        let last = self.records.len() - 1;
        &mut self.records[last]
    }

    /// Most recent record, for in-place updates.
    pub fn last_mut(&mut self) -> Option<&mut HandoffExecution> {
        self.records.last_mut()
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[HandoffExecution] {
        &self.records
    }

    /// Most recent record for `stage`.
    pub fn latest(&self, stage: Stage) -> Option<&HandoffExecution> {
        self.records.iter().rev().find(|record| record.agent_id == stage)
    }

    /// Stages attempted, in order.
    pub fn stages_attempted(&self) -> Vec<Stage> {
        self.records.iter().map(|record| record.agent_id).collect()
    }

    /// Sum of retries across all records.
    pub fn total_retries(&self) -> u32 {
        self.records.iter().map(|record| record.retry_count).sum()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing has been tracked.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consumes the tracker, returning the records.
    pub fn into_records(self) -> Vec<HandoffExecution> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_new_is_open() {
        let record = HandoffExecution::new(Stage::Content, json!({"topic": "launch"}));
        assert_eq!(record.agent_id, Stage::Content);
        assert!(!record.success);
        assert!(!record.is_completed());
        assert_eq!(record.duration_ms(), 0);
        assert_eq!(record.retry_count, 0);
        assert_eq!(record.attempts, 1);
    }

    #[test]
    fn test_record_retry_then_success() {
        let mut record = HandoffExecution::new(Stage::Design, Value::Null);
        record.record_retry(1, "timeout");
        assert_eq!(record.error.as_deref(), Some("timeout"));
        assert_eq!(record.attempts, 2);

        record.mark_succeeded(json!({"success": true}), HandoffData::new(), 1);
        assert!(record.success);
        assert!(record.is_completed());
        assert!(record.error.is_none());
        assert_eq!(record.retry_count, 1);
    }

    #[test]
    fn test_record_attempts_saturate() {
        let mut record = HandoffExecution::new(Stage::Content, Value::Null);
        record.record_retry(u32::MAX, "still failing");
        assert_eq!(record.attempts, u32::MAX);

        record.mark_succeeded(Value::Null, HandoffData::new(), u32::MAX);
        assert_eq!(record.retry_count, u32::MAX);
        assert_eq!(record.attempts, u32::MAX);
    }

    #[test]
    fn test_record_mark_failed_counts_retries() {
        let mut record = HandoffExecution::new(Stage::Quality, Value::Null);
        record.mark_failed("backend down", 3);
        assert!(!record.success);
        assert_eq!(record.attempts, 3);
        assert_eq!(record.retry_count, 2);
    }

    #[test]
    fn test_duration_from_timestamps() {
        let mut record = HandoffExecution::new(Stage::Content, Value::Null);
        record.end_time = Some(record.start_time + chrono::Duration::milliseconds(250));
        assert_eq!(record.duration_ms(), 250);
    }

    #[test]
    fn test_tracker_keeps_order() {
        let mut tracker = ExecutionTracker::new("wf-1");
        tracker.begin(Stage::Content, Value::Null).record_retry(2, "flaky");
        tracker.begin(Stage::Quality, Value::Null);

        assert_eq!(tracker.workflow_id(), "wf-1");
        assert_eq!(tracker.stages_attempted(), vec![Stage::Content, Stage::Quality]);
        assert_eq!(tracker.total_retries(), 2);
        assert_eq!(tracker.latest(Stage::Content).map(|r| r.retry_count), Some(2));
        assert!(tracker.latest(Stage::Design).is_none());
        assert_eq!(tracker.len(), 2);

        tracker.last_mut().unwrap().mark_failed("gave up", 2);
        assert_eq!(tracker.records()[1].retry_count, 1);
    }

    #[test]
    fn test_record_serialization() {
        let mut record = HandoffExecution::new(Stage::Delivery, json!({}));
        record.mark_failed("gave up", 1);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["agent_id"], json!("delivery"));
        assert_eq!(value["retry_count"], json!(0));
        assert!(value.get("handoff_data").is_none());
    }
}
