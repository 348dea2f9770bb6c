//! Registry of in-flight workflow runs.
//!
//! Runs are registered when they start and removed when they end, so the
//! registry only ever describes live runs. A run holds a [`RunRegistration`]
//! for its lifetime; dropping it, including when the run future itself is
//! dropped, removes the entry.

use chrono::{DateTime, Utc};
use conductor_abstraction::Stage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::state::WorkflowState;
use crate::tracker::HandoffExecution;

/// Point-in-time view of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    /// Run identifier.
    pub workflow_id: String,
    /// Current state.
    pub state: WorkflowState,
    /// Stage executing now, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<Stage>,
    /// When the run was registered.
    pub started_at: DateTime<Utc>,
    /// Execution records finished so far.
    pub executions: Vec<HandoffExecution>,
}

impl RunSnapshot {
    /// Creates a snapshot of a run that has not started a stage.
    pub fn pending(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            state: WorkflowState::Pending,
            current_stage: None,
            started_at: Utc::now(),
            executions: Vec::new(),
        }
    }
}

/// Registry for inspecting in-flight runs by workflow id.
#[derive(Clone, Default)]
pub struct RunRegistry {
    /// Map of workflow ID to the latest snapshot.
    runs: Arc<RwLock<HashMap<String, RunSnapshot>>>,
}

impl fmt::Debug for RunRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunRegistry")
            .field("active_runs", &self.runs.try_read().map(|r| r.len()).unwrap_or(0))
            .finish_non_exhaustive()
    }
}

impl RunRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new run.
    ///
    /// Returns `false` without touching the existing entry if a run with the
    /// same id is already in flight.
    pub async fn register(&self, workflow_id: &str) -> bool {
        let mut runs = self.runs.write().await;
        if runs.contains_key(workflow_id) {
            warn!(workflow_id = %workflow_id, "Workflow already registered");
            return false;
        }
        debug!(workflow_id = %workflow_id, "Registering workflow run");
        runs.insert(workflow_id.to_string(), RunSnapshot::pending(workflow_id));
        true
    }

    /// Registers a new run and returns the guard that keeps it registered.
    ///
    /// Returns `None` if a run with the same id is already in flight.
    pub async fn claim(&self, workflow_id: &str) -> Option<RunRegistration> {
        self.register(workflow_id).await.then(|| RunRegistration {
            registry: self.clone(),
            workflow_id: workflow_id.to_string(),
        })
    }

    /// Records the current state and stage of a run.
    pub async fn update(
        &self,
        workflow_id: &str,
        state: WorkflowState,
        current_stage: Option<Stage>,
        executions: &[HandoffExecution],
    ) {
        let mut runs = self.runs.write().await;
        if let Some(snapshot) = runs.get_mut(workflow_id) {
            snapshot.state = state;
            snapshot.current_stage = current_stage;
            snapshot.executions = executions.to_vec();
        } else {
            warn!(workflow_id = %workflow_id, "Attempted to update unregistered workflow");
        }
    }

    /// Removes a finished run. Returns `true` if it was registered.
    pub async fn remove(&self, workflow_id: &str) -> bool {
        debug!(workflow_id = %workflow_id, "Removing workflow run");
        self.runs.write().await.remove(workflow_id).is_some()
    }

    /// Snapshot of a run, if it is in flight.
    pub async fn snapshot(&self, workflow_id: &str) -> Option<RunSnapshot> {
        self.runs.read().await.get(workflow_id).cloned()
    }

    /// Ids of every in-flight run, sorted.
    pub async fn active_runs(&self) -> Vec<String> {
        let runs = self.runs.read().await;
        let mut ids: Vec<String> = runs.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of in-flight runs.
    pub async fn count(&self) -> usize {
        self.runs.read().await.len()
    }
}

/// Keeps a run registered until dropped.
#[derive(Debug)]
pub struct RunRegistration {
    registry: RunRegistry,
    workflow_id: String,
}

impl RunRegistration {
    /// Id of the registered run.
    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }
}

impl Drop for RunRegistration {
    fn drop(&mut self) {
        if let Ok(mut runs) = self.registry.runs.try_write() {
            debug!(workflow_id = %self.workflow_id, "Removing workflow run");
            runs.remove(&self.workflow_id);
            return;
        }

        // Lock is busy; finish the removal on the runtime.
        let registry = self.registry.clone();
        let workflow_id = std::mem::take(&mut self.workflow_id);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    registry.remove(&workflow_id).await;
                });
            }
            Err(_) => warn!(workflow_id = %workflow_id, "No runtime to release workflow run"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn test_register_refuses_duplicate() {
        let registry = RunRegistry::new();
        assert!(registry.register("wf-1").await);
        assert!(!registry.register("wf-1").await);
        assert!(registry.register("wf-2").await);
        assert_eq!(registry.active_runs().await, vec!["wf-1".to_string(), "wf-2".to_string()]);
    }

    #[tokio::test]
    async fn test_update_and_snapshot() {
        let registry = RunRegistry::new();
        registry.register("wf-1").await;

        let mut record = HandoffExecution::new(Stage::Content, Value::Null);
        record.mark_failed("boom", 1);
        registry
            .update("wf-1", WorkflowState::DesignRunning, Some(Stage::Design), &[record])
            .await;

        let snapshot = registry.snapshot("wf-1").await.unwrap();
        assert_eq!(snapshot.state, WorkflowState::DesignRunning);
        assert_eq!(snapshot.current_stage, Some(Stage::Design));
        assert_eq!(snapshot.executions.len(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_is_ignored() {
        let registry = RunRegistry::new();
        registry.update("ghost", WorkflowState::Failed, None, &[]).await;
        assert!(registry.snapshot("ghost").await.is_none());
    }

    #[tokio::test]
    async fn test_remove() {
        let registry = RunRegistry::new();
        registry.register("wf-1").await;
        assert!(registry.remove("wf-1").await);
        assert!(!registry.remove("wf-1").await);
        assert_eq!(registry.count().await, 0);
        assert!(registry.register("wf-1").await);
    }

    #[tokio::test]
    async fn test_claim_releases_on_drop() {
        let registry = RunRegistry::new();
        let registration = registry.claim("wf-1").await.unwrap();
        assert_eq!(registration.workflow_id(), "wf-1");
        assert!(registry.claim("wf-1").await.is_none());

        drop(registration);
        assert_eq!(registry.count().await, 0);
        assert!(registry.claim("wf-1").await.is_some());
    }

    #[tokio::test]
    async fn test_claim_released_while_lock_is_held() {
        let registry = RunRegistry::new();
        let registration = registry.claim("wf-1").await.unwrap();

        let reader = registry.runs.read().await;
        drop(registration);
        assert!(reader.contains_key("wf-1"));
        drop(reader);

        for _ in 0..10 {
            if registry.count().await == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(registry.count().await, 0);
    }

    #[test]
    fn test_debug_reports_count() {
        let registry = RunRegistry::new();
        assert_eq!(format!("{registry:?}"), "RunRegistry { active_runs: 0, .. }");
    }
}
