//! Capabilities command implementation.

use colored::Colorize;
use conductor_orchestrator::WorkflowExecutor;

/// Prints the coordinator capabilities.
pub fn execute(json: bool) -> anyhow::Result<()> {
    let capabilities = WorkflowExecutor::capabilities();

    if json {
        println!("{}", serde_json::to_string_pretty(&capabilities)?);
        return Ok(());
    }

    println!("{} {}", capabilities.name.bold().cyan(), capabilities.version.dimmed());
    println!();

    println!("{}", "Stages:".bold());
    for (position, stage) in capabilities.managed_stages.iter().enumerate() {
        println!("  {}. {}", position + 1, stage.to_string().cyan());
    }
    println!();

    println!("{}", "Features:".bold());
    for feature in &capabilities.features {
        println!("  {} {}", "•".dimmed(), feature);
    }
    println!();

    let performance = &capabilities.performance;
    println!("{}", "Defaults:".bold());
    println!("  Stage timeout: {}ms", performance.default_stage_timeout_ms);
    println!("  Max retries:   {}", performance.default_max_retries);
    println!("  Typical run:   {}ms", performance.typical_workflow_duration_ms);

    Ok(())
}
