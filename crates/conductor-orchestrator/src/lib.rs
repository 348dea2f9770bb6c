//! Workflow orchestration for Conductor.
//!
//! Runs the fixed content, design, quality and delivery pipeline against four
//! injected [`Specialist`](conductor_abstraction::Specialist) implementations:
//! per-stage retries and deadlines, handoff validation and merging, the
//! quality gate, execution tracking and run analytics.
//!
//! ```no_run
//! use conductor_abstraction::CampaignBrief;
//! use conductor_orchestrator::{agents, WorkflowExecutionInput, WorkflowExecutor};
//!
//! # async fn run() {
//! let executor = WorkflowExecutor::new(agents::scripted_specialists());
//! let input = WorkflowExecutionInput::new("wf-1", CampaignBrief::new("Spring sale"));
//! let output = executor.execute_workflow(&input).await;
//! assert!(output.success);
//! # }
//! ```

pub mod agents;
pub mod analytics;
pub mod config;
mod context;
pub mod coordinator;
pub mod error;
pub mod handoff;
pub mod quality_gate;
pub mod registry;
pub mod retry;
pub mod state;
pub mod tracker;
pub mod types;

pub use analytics::AnalyticsEngine;
pub use config::{ConfigError, ExecutionConfig};
pub use coordinator::{Specialists, WorkflowExecutor};
pub use error::{OrchestrationError, Result, StageError};
pub use handoff::{HandoffMerger, HandoffValidator, ValidationMode, ValidationReport};
pub use quality_gate::{GateVerdict, QualityGate};
pub use registry::{RunRegistration, RunRegistry, RunSnapshot};
pub use retry::{DelayStrategy, RetryError, RetryExecutor, RetryPolicy, RetrySuccess, RetryableError};
pub use state::WorkflowState;
pub use tracker::{ExecutionTracker, HandoffExecution};
pub use types::{
    CoordinatorCapabilities, ExecutionSummary, FinalArtifacts, HandoffAnalytics,
    PerformanceProfile, WorkflowExecutionInput, WorkflowExecutionOutput,
};
