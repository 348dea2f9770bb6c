//! Sequential four-stage workflow coordinator.
//!
//! Drives content, design, quality and delivery in order. Each stage runs
//! under the configured retry policy and per-attempt deadline; its handoff
//! payload is merged into the rolling context and validated before the next
//! stage starts. The quality stage output can be held to a quality gate. Any
//! unrecovered failure ends the run, and the result is assembled from whatever
//! the run collected up to that point.

use conductor_abstraction::{
    QualityRequirements, Specialist, SpecialistOutput, Stage, StageInput, Transition,
};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, error, info, warn};

use crate::analytics::AnalyticsEngine;
use crate::context::WorkflowRunContext;
use crate::error::{OrchestrationError, Result, StageError};
use crate::handoff::{HandoffMerger, HandoffValidator, ValidationMode};
use crate::quality_gate::QualityGate;
use crate::registry::RunRegistry;
use crate::retry::{RetryError, RetryExecutor, RetryPolicy, RetrySuccess};
use crate::state::WorkflowState;
use crate::types::{
    CoordinatorCapabilities, ExecutionSummary, FinalArtifacts, PerformanceProfile,
    WorkflowExecutionInput, WorkflowExecutionOutput,
};

/// The four specialists a coordinator drives.
#[derive(Clone)]
pub struct Specialists {
    pub content: Arc<dyn Specialist>,
    pub design: Arc<dyn Specialist>,
    pub quality: Arc<dyn Specialist>,
    pub delivery: Arc<dyn Specialist>,
}

impl Specialists {
    /// Bundles one specialist per stage.
    pub fn new(
        content: Arc<dyn Specialist>,
        design: Arc<dyn Specialist>,
        quality: Arc<dyn Specialist>,
        delivery: Arc<dyn Specialist>,
    ) -> Self {
        Self { content, design, quality, delivery }
    }

    /// The specialist responsible for `stage`.
    pub fn get(&self, stage: Stage) -> &Arc<dyn Specialist> {
        match stage {
            Stage::Content => &self.content,
            Stage::Design => &self.design,
            Stage::Quality => &self.quality,
            Stage::Delivery => &self.delivery,
        }
    }
}

impl fmt::Debug for Specialists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Specialists")
            .field("content", &self.content.id())
            .field("design", &self.design.id())
            .field("quality", &self.quality.id())
            .field("delivery", &self.delivery.id())
            .finish()
    }
}

/// Executes workflow runs against a fixed set of specialists.
///
/// Independent runs may execute concurrently on the same executor; each keeps
/// its own context and only the run registry is shared.
#[derive(Debug, Clone)]
pub struct WorkflowExecutor {
    specialists: Specialists,
    registry: RunRegistry,
    validator: HandoffValidator,
    merger: HandoffMerger,
}

impl WorkflowExecutor {
    /// Creates an executor with its own run registry.
    pub fn new(specialists: Specialists) -> Self {
        Self {
            specialists,
            registry: RunRegistry::new(),
            validator: HandoffValidator::new(),
            merger: HandoffMerger::new(),
        }
    }

    /// Uses a shared run registry.
    #[must_use]
    pub fn with_registry(mut self, registry: RunRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Registry of in-flight runs.
    pub fn registry(&self) -> &RunRegistry {
        &self.registry
    }

    /// Static description of the coordinator.
    pub fn capabilities() -> CoordinatorCapabilities {
        let defaults = crate::config::ExecutionConfig::default();
        CoordinatorCapabilities {
            name: "conductor-workflow-coordinator".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            managed_stages: Stage::ALL.to_vec(),
            features: [
                "sequential_stage_execution",
                "stage_skipping",
                "configurable_retry",
                "exponential_backoff",
                "stage_timeouts",
                "cancellation",
                "handoff_validation",
                "handoff_optimization",
                "quality_gates",
                "workflow_analytics",
                "concurrent_runs",
            ]
            .iter()
            .map(|feature| (*feature).to_string())
            .collect(),
            performance: PerformanceProfile {
                typical_workflow_duration_ms: 180_000,
                default_stage_timeout_ms: defaults.stage_timeout_ms,
                default_max_retries: RetryPolicy::default().max_retries,
                parallel_stages: false,
            },
        }
    }

    /// Runs the pipeline once. Never fails: errors end up in the output.
    pub async fn execute_workflow(
        &self,
        input: &WorkflowExecutionInput,
    ) -> WorkflowExecutionOutput {
        self.execute_workflow_with_cancel(input, CancellationToken::new()).await
    }

    /// Runs the pipeline once, stopping early when `cancel` fires.
    ///
    /// Cancellation interrupts an in-flight attempt or a retry delay and ends
    /// the run in `Failed` with the partial result. Dropping the returned
    /// future releases the workflow id and aborts the in-flight attempt.
    pub async fn execute_workflow_with_cancel(
        &self,
        input: &WorkflowExecutionInput,
        cancel: CancellationToken,
    ) -> WorkflowExecutionOutput {
        let workflow_id = input.workflow_id.as_str();
        info!(
            workflow_id = %workflow_id,
            topic = %input.campaign_brief.topic,
            skipped = input.execution_config.skip_agents.len(),
            "Starting workflow execution"
        );

        let mut ctx = WorkflowRunContext::new(input);

        let Some(registration) = self.registry.claim(workflow_id).await else {
            let err = OrchestrationError::DuplicateRun(workflow_id.to_string());
            error!(workflow_id = %workflow_id, error = %err, "Workflow refused");
            return Self::assemble_output(input, ctx, Some(err));
        };

        let result = self.run_stages(input, &mut ctx, &cancel).await;
        drop(registration);

        Self::assemble_output(input, ctx, result.err())
    }

    async fn run_stages(
        &self,
        input: &WorkflowExecutionInput,
        ctx: &mut WorkflowRunContext,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let config = &input.execution_config;

        for stage in Stage::ALL {
            if config.should_skip(stage) {
                debug!(workflow_id = %ctx.workflow_id, stage = %stage, "Skipping stage");
                continue;
            }
            if cancel.is_cancelled() {
                return Err(OrchestrationError::Cancelled(format!("before {stage} stage")));
            }

            ctx.advance(WorkflowState::running(stage))?;
            self.registry
                .update(&ctx.workflow_id, ctx.state, Some(stage), ctx.tracker.records())
                .await;

            let output = self.execute_stage(stage, input, ctx, cancel).await?;
            ctx.agent_results.insert(stage, output.clone());
            ctx.handoff = self.merger.merge(&ctx.handoff, &output.handoff_data);

            if let Some(transition) = stage.outgoing_transition() {
                if !config.should_skip(transition.to_stage()) {
                    self.check_handoff(transition, config.handoff_validation, ctx)?;
                }
            }

            if stage == Stage::Quality {
                if let Some(requirements) = &config.quality_requirements {
                    Self::apply_quality_gate(requirements, &output, ctx)?;
                }
            }
        }

        ctx.advance(WorkflowState::Completed)?;
        self.registry.update(&ctx.workflow_id, ctx.state, None, ctx.tracker.records()).await;
        Ok(())
    }

    async fn execute_stage(
        &self,
        stage: Stage,
        input: &WorkflowExecutionInput,
        ctx: &mut WorkflowRunContext,
        cancel: &CancellationToken,
    ) -> Result<SpecialistOutput> {
        let config = &input.execution_config;
        let stage_input = ctx.stage_input(stage, input);
        let snapshot = serde_json::to_value(&stage_input).unwrap_or(Value::Null);
        ctx.tracker.begin(stage, snapshot);

        let specialist = self.specialists.get(stage);
        let timeout = config.stage_timeout();
        let retry =
            RetryExecutor::new(config.retry_policy.clone()).with_cancellation(cancel.clone());
        let workflow_id = input.workflow_id.as_str();

        info!(
            workflow_id = %workflow_id,
            stage = %stage,
            specialist = %specialist.id(),
            max_attempts = retry.policy().max_attempts(),
            "Executing stage"
        );

        let outcome = retry
            .execute_with_retry(
                stage.as_str(),
                |attempt| {
                    debug!(workflow_id = %workflow_id, stage = %stage, attempt, "Stage attempt");
                    attempt_stage(Arc::clone(specialist), stage_input.clone(), timeout, cancel.clone())
                },
                |retries, err: &StageError| {
                    if let Some(record) = ctx.tracker.last_mut() {
                        record.record_retry(retries, err.to_string());
                    }
                },
            )
            .await;

        match outcome {
            Ok(RetrySuccess { value: output, retries }) => {
                let handoff = self.merger.optimize(&output.handoff_data);
                let output_snapshot = serde_json::to_value(&output).unwrap_or(Value::Null);
                if let Some(record) = ctx.tracker.last_mut() {
                    record.mark_succeeded(output_snapshot, handoff, retries);
                    info!(
                        workflow_id = %workflow_id,
                        stage = %stage,
                        retries,
                        duration_ms = record.duration_ms(),
                        "Stage completed successfully"
                    );
                }
                Ok(output)
            }
            Err(
                RetryError::Failed { error: StageError::Cancelled, attempts }
                | RetryError::Cancelled { attempts, .. },
            ) => {
                if let Some(record) = ctx.tracker.last_mut() {
                    record.mark_failed(StageError::Cancelled.to_string(), attempts);
                }
                warn!(workflow_id = %workflow_id, stage = %stage, attempts, "Stage cancelled");
                Err(OrchestrationError::Cancelled(format!("during {stage} stage")))
            }
            Err(RetryError::Failed { error, attempts }) => {
                if let Some(record) = ctx.tracker.last_mut() {
                    record.mark_failed(error.to_string(), attempts);
                }
                error!(
                    workflow_id = %workflow_id,
                    stage = %stage,
                    attempts,
                    error = %error,
                    "Stage failed, stopping execution"
                );
                Err(OrchestrationError::StageFailed { stage, attempts, source: error })
            }
        }
    }

    fn check_handoff(
        &self,
        transition: Transition,
        mode: ValidationMode,
        ctx: &mut WorkflowRunContext,
    ) -> Result<()> {
        if mode == ValidationMode::Off {
            return Ok(());
        }

        let report = self.validator.validate(&ctx.handoff, transition);
        if report.valid {
            debug!(workflow_id = %ctx.workflow_id, transition = %transition, "Handoff validated");
            ctx.handoff_reports.push(report);
            return Ok(());
        }

        let issues = report.issues.clone();
        ctx.handoff_reports.push(report);

        if mode == ValidationMode::Enforce {
            error!(
                workflow_id = %ctx.workflow_id,
                transition = %transition,
                issues = ?issues,
                "Handoff validation failed"
            );
            return Err(OrchestrationError::HandoffRejected { transition, issues });
        }

        warn!(
            workflow_id = %ctx.workflow_id,
            transition = %transition,
            issues = ?issues,
            "Handoff validation issues, continuing"
        );
        Ok(())
    }

    fn apply_quality_gate(
        requirements: &QualityRequirements,
        output: &SpecialistOutput,
        ctx: &mut WorkflowRunContext,
    ) -> Result<()> {
        let verdict = QualityGate::new(requirements.clone()).evaluate(output);
        ctx.quality_verdict = Some(verdict.clone());

        if verdict.passed {
            info!(workflow_id = %ctx.workflow_id, score = ?verdict.score, "Quality gate passed");
            return Ok(());
        }

        if requirements.auto_fix_issues {
            // No remediation exists yet; the violations are only surfaced.
            warn!(
                workflow_id = %ctx.workflow_id,
                violations = ?verdict.violations,
                "Quality gate failed, continuing because auto_fix_issues is set"
            );
            ctx.notes.extend(verdict.violations.iter().map(|violation| {
                format!("Quality gate not met (auto-fix requested, not applied): {violation}")
            }));
            return Ok(());
        }

        error!(
            workflow_id = %ctx.workflow_id,
            violations = ?verdict.violations,
            "Quality gate failed, stopping execution"
        );
        Err(OrchestrationError::QualityGate { violations: verdict.violations })
    }

    fn assemble_output(
        input: &WorkflowExecutionInput,
        mut ctx: WorkflowRunContext,
        failure: Option<OrchestrationError>,
    ) -> WorkflowExecutionOutput {
        if failure.is_some() {
            ctx.fail();
        }
        let total_execution_time_ms = ctx.elapsed_ms();

        let records = ctx.tracker.records();
        let overall_confidence = AnalyticsEngine::overall_confidence(&ctx.agent_results);
        let handoff_analytics = AnalyticsEngine::handoff_analytics(records);

        let quality_output = ctx.agent_results.get(&Stage::Quality);
        let quality_report = quality_output.and_then(|output| output.quality_report.clone());
        let quality_score = ctx
            .quality_verdict
            .as_ref()
            .and_then(|verdict| verdict.score)
            .or_else(|| quality_report.as_ref().map(|report| report.overall_score))
            .or_else(|| quality_output.and_then(|output| output.handoff_data.quality_score));

        let execution_summary = ExecutionSummary {
            agents_executed: ctx.tracker.stages_attempted(),
            total_execution_time_ms,
            overall_confidence: overall_confidence.unwrap_or(0.0),
            quality_score,
            workflow_efficiency: AnalyticsEngine::workflow_efficiency(records),
            issues_found: quality_report.as_ref().map_or(0, |report| report.issues.len()),
            critical_issues: quality_report
                .as_ref()
                .map_or(0, |report| report.critical_issue_count()),
            handoff_issues: ctx.handoff_issue_count(),
        };

        let mut recommendations: Vec<String> = ctx
            .agent_results
            .values()
            .flat_map(|output| output.recommendations.iter().cloned())
            .collect();
        for report in &ctx.handoff_reports {
            recommendations.extend(
                report.issues.iter().map(|issue| format!("Handoff {}: {}", report.transition, issue)),
            );
        }
        recommendations.extend(ctx.notes.iter().cloned());
        recommendations.extend(AnalyticsEngine::recommendations(
            &handoff_analytics.bottlenecks,
            overall_confidence,
        ));

        let delivery_package = ctx.agent_results.get(&Stage::Delivery).and_then(|output| {
            output.handoff_data.field("delivery_package").cloned().or_else(|| {
                (!output.artifacts.is_empty()).then(|| Value::Object(output.artifacts.clone()))
            })
        });
        let final_artifacts = FinalArtifacts {
            content_package: ctx.handoff.content_package.clone(),
            design_package: ctx.handoff.design_package.clone(),
            quality_report,
            delivery_package,
            deployment_target: input.execution_config.deployment_target.clone(),
        };

        let success = failure.is_none() && ctx.state == WorkflowState::Completed;
        let error = failure.map(|err| err.to_string());

        if success {
            info!(
                workflow_id = %ctx.workflow_id,
                stages = execution_summary.agents_executed.len(),
                duration_ms = total_execution_time_ms,
                efficiency = execution_summary.workflow_efficiency,
                "Workflow execution completed successfully"
            );
        } else {
            error!(
                workflow_id = %ctx.workflow_id,
                state = %ctx.state,
                error = error.as_deref().unwrap_or("unknown"),
                "Workflow execution failed"
            );
        }

        WorkflowExecutionOutput {
            success,
            workflow_id: ctx.workflow_id,
            state: ctx.state,
            execution_summary,
            agent_results: ctx.agent_results,
            final_artifacts,
            handoff_analytics,
            execution_history: ctx.tracker.into_records(),
            recommendations,
            error,
        }
    }
}

/// Runs one attempt of a stage in its own task, bounded by `timeout` and `cancel`.
async fn attempt_stage(
    specialist: Arc<dyn Specialist>,
    input: StageInput,
    timeout: Option<Duration>,
    cancel: CancellationToken,
) -> std::result::Result<SpecialistOutput, StageError> {
    if cancel.is_cancelled() {
        return Err(StageError::Cancelled);
    }

    // Aborted when dropped, so an abandoned run does not leave the call running.
    let mut handle =
        AbortOnDropHandle::new(tokio::spawn(async move { specialist.execute(&input).await }));
    let deadline = async {
        match timeout {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };

    let joined = tokio::select! {
        () = cancel.cancelled() => {
            handle.abort();
            return Err(StageError::Cancelled);
        }
        () = deadline => {
            handle.abort();
            return Err(StageError::TimedOut(timeout.map_or(0, |d| d.as_millis() as u64)));
        }
        joined = &mut handle => joined,
    };

    let output = joined.map_err(|err| StageError::Aborted(err.to_string()))??;
    if !output.success {
        return Err(StageError::Reported(
            output.error.unwrap_or_else(|| "no reason given".to_string()),
        ));
    }
    Ok(output)
}
