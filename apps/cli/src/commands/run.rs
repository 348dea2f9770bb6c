//! Run command implementation.
//!
//! Builds an execution config from the optional config file and the command
//! line, runs the workflow against the scripted specialists and prints the
//! result. `--fail STAGE=N` makes a stage fail its first N attempts.

use anyhow::{Context, bail};
use clap::Args;
use colored::Colorize;
use conductor_abstraction::{CampaignBrief, Stage};
use conductor_orchestrator::{
    ExecutionConfig, ValidationMode, WorkflowExecutionInput, WorkflowExecutionOutput,
    WorkflowExecutor, WorkflowState, agents,
    agents::ScriptedSpecialist,
};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Options of `conductor run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Campaign topic
    #[arg(long)]
    pub topic: String,

    /// Workflow id (a random UUID by default)
    #[arg(long)]
    pub workflow_id: Option<String>,

    /// Execution config file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Stage to skip (repeatable)
    #[arg(long = "skip", value_name = "STAGE")]
    pub skip: Vec<Stage>,

    /// Make a stage fail its first N attempts, e.g. `design=2` (repeatable)
    #[arg(long = "fail", value_name = "STAGE=N", value_parser = parse_failure)]
    pub fail: Vec<(Stage, u32)>,

    /// Override the retry count of the config
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Override the delay between attempts of the config, in milliseconds
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,

    /// Handoff validation mode (off, warn, enforce)
    #[arg(long, value_parser = parse_validation_mode)]
    pub validation: Option<ValidationMode>,

    /// Campaign type, e.g. newsletter
    #[arg(long)]
    pub campaign_type: Option<String>,

    /// Target audience
    #[arg(long)]
    pub audience: Option<String>,

    /// Where the delivery stage publishes
    #[arg(long)]
    pub deployment_target: Option<String>,

    /// Print the full output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Executes `conductor run`.
///
/// Fails with a non-zero exit when the workflow does not succeed.
pub async fn execute(args: RunArgs) -> anyhow::Result<()> {
    let config = build_config(&args)?;
    let workflow_id = args.workflow_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut brief = CampaignBrief::new(args.topic.clone());
    if let Some(campaign_type) = &args.campaign_type {
        brief = brief.with_campaign_type(campaign_type);
    }
    if let Some(audience) = &args.audience {
        brief = brief.with_target_audience(audience);
    }

    let failures: HashMap<Stage, u32> = args.fail.iter().copied().collect();
    let specialists = agents::scripted_specialists_with(|stage| {
        let specialist = ScriptedSpecialist::new(stage);
        match failures.get(&stage) {
            Some(&attempts) => specialist.failing_first(attempts),
            None => specialist,
        }
    });

    let executor = WorkflowExecutor::new(specialists);
    let input = WorkflowExecutionInput::new(&workflow_id, brief).with_config(config);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling workflow");
            interrupt.cancel();
        }
    });

    info!(workflow_id = %workflow_id, topic = %args.topic, "Starting workflow");
    let output = executor.execute_workflow_with_cancel(&input, cancel).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_summary(&output);
    }

    if !output.success {
        bail!(
            "Workflow {} failed: {}",
            output.workflow_id,
            output.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(())
}

fn build_config(args: &RunArgs) -> anyhow::Result<ExecutionConfig> {
    let mut config = match &args.config {
        Some(path) => ExecutionConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ExecutionConfig::default(),
    };

    for stage in &args.skip {
        config = config.with_skip(*stage);
    }
    if let Some(max_retries) = args.max_retries {
        config.retry_policy.max_retries = max_retries;
    }
    if let Some(delay) = args.retry_delay_ms {
        config.retry_policy.retry_delay_ms = delay;
        config.retry_policy.max_delay_ms = config.retry_policy.max_delay_ms.max(delay);
    }
    if let Some(mode) = args.validation {
        config = config.with_handoff_validation(mode);
    }
    if let Some(target) = &args.deployment_target {
        config = config.with_deployment_target(target);
    }

    config.validate()?;
    Ok(config)
}

fn parse_failure(value: &str) -> Result<(Stage, u32), String> {
    let (stage, attempts) = value
        .split_once('=')
        .ok_or_else(|| format!("invalid failure '{value}', expected STAGE=N"))?;
    let stage = stage.trim().parse::<Stage>().map_err(|e| e.to_string())?;
    let attempts = attempts
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid attempt count '{attempts}': {e}"))?;
    Ok((stage, attempts))
}

fn parse_validation_mode(value: &str) -> Result<ValidationMode, String> {
    match value.to_lowercase().as_str() {
        "off" => Ok(ValidationMode::Off),
        "warn" => Ok(ValidationMode::Warn),
        "enforce" => Ok(ValidationMode::Enforce),
        other => Err(format!("unknown validation mode '{other}' (expected off, warn or enforce)")),
    }
}

fn print_summary(output: &WorkflowExecutionOutput) {
    println!("{}", "conductor run".bold().cyan());
    println!();

    let state = match output.state {
        WorkflowState::Completed => output.state.to_string().green(),
        WorkflowState::Failed => output.state.to_string().red(),
        _ => output.state.to_string().yellow(),
    };
    println!("  {} Workflow: {}", "•".dimmed(), output.workflow_id.bold());
    println!("  {} State:    {}", "•".dimmed(), state);
    println!();

    println!("{}", "Stages:".bold());
    for stage in Stage::ALL {
        match output.execution(stage) {
            Some(record) if record.success => println!(
                "  {} {:<9} {:>6}ms  {} retries",
                "✓".green(),
                stage.to_string(),
                record.duration_ms(),
                record.retry_count
            ),
            Some(record) => println!(
                "  {} {:<9} {:>6}ms  {} attempts  {}",
                "✗".red(),
                stage.to_string(),
                record.duration_ms(),
                record.attempts,
                record.error.as_deref().unwrap_or_default().dimmed()
            ),
            None => println!("  {} {:<9} {}", "-".dimmed(), stage.to_string(), "not run".dimmed()),
        }
    }
    println!();

    let summary = &output.execution_summary;
    println!("{}", "Summary:".bold());
    println!("  Total time:  {}ms", summary.total_execution_time_ms);
    println!("  Confidence:  {:.2}", summary.overall_confidence);
    println!("  Efficiency:  {}", summary.workflow_efficiency);
    if let Some(score) = summary.quality_score {
        println!("  Quality:     {score}");
    }
    println!(
        "  Issues:      {} ({} critical, {} handoff)",
        summary.issues_found, summary.critical_issues, summary.handoff_issues
    );

    if !output.recommendations.is_empty() {
        println!();
        println!("{}", "Recommendations:".bold());
        for recommendation in &output.recommendations {
            println!("  {} {}", "•".dimmed(), recommendation);
        }
    }

    if let Some(error) = &output.error {
        println!();
        println!("{} {}", "Error:".red().bold(), error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_failure() {
        assert_eq!(parse_failure("design=2").unwrap(), (Stage::Design, 2));
        assert_eq!(parse_failure(" quality = 0 ").unwrap(), (Stage::Quality, 0));
        assert!(parse_failure("design").unwrap_err().contains("expected STAGE=N"));
        assert!(parse_failure("publishing=1").unwrap_err().contains("Unknown stage"));
        assert!(parse_failure("design=x").unwrap_err().contains("invalid attempt count"));
    }

    #[test]
    fn test_parse_validation_mode() {
        assert_eq!(parse_validation_mode("Enforce").unwrap(), ValidationMode::Enforce);
        assert!(parse_validation_mode("strict").is_err());
    }
}
