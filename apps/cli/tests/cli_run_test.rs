//! Integration tests for the `conductor run` command.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::io::Write;
use tempfile::NamedTempFile;

fn conductor() -> Command {
    Command::cargo_bin("conductor").unwrap()
}

/// Runs `conductor run --json` with `args` and parses stdout.
fn run_json(args: &[&str], expect_success: bool) -> Value {
    let mut cmd = conductor();
    cmd.args(["--log-level", "error", "run", "--topic", "Spring sale", "--json"]).args(args);
    let assert = cmd.assert();
    let assert = if expect_success { assert.success() } else { assert.failure() };
    serde_json::from_slice(&assert.get_output().stdout).unwrap()
}

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn stages(output: &Value) -> Vec<String> {
    output["execution_summary"]["agents_executed"]
        .as_array()
        .unwrap()
        .iter()
        .map(|stage| stage.as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_run_help() {
    conductor()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--topic"))
        .stdout(predicate::str::contains("--skip"));
}

#[test]
fn test_run_requires_topic() {
    conductor()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--topic"));
}

#[test]
fn test_run_all_stages_json() {
    let output = run_json(&["--workflow-id", "wf-cli"], true);

    assert_eq!(output["success"], Value::Bool(true));
    assert_eq!(output["workflow_id"], "wf-cli");
    assert_eq!(output["state"], "completed");
    assert_eq!(stages(&output), ["content", "design", "quality", "delivery"]);
    assert_eq!(output["execution_summary"]["workflow_efficiency"], 100);
    assert_eq!(output["execution_summary"]["quality_score"], 92.0);
    assert!(output.get("error").is_none());
}

#[test]
fn test_run_generates_workflow_id() {
    let output = run_json(&[], true);
    let id = output["workflow_id"].as_str().unwrap();
    assert_eq!(id.len(), 36);
    assert_eq!(id.matches('-').count(), 4);
}

#[test]
fn test_run_human_summary() {
    conductor()
        .args(["run", "--topic", "Spring sale", "--workflow-id", "wf-human"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wf-human"))
        .stdout(predicate::str::contains("completed"))
        .stdout(predicate::str::contains("Tighten the hero image alt text"));
}

#[test]
fn test_run_skip_stages() {
    let output = run_json(&["--skip", "delivery", "--skip", "design"], true);
    assert_eq!(stages(&output), ["content", "quality"]);
    assert!(output["agent_results"].get("design").is_none());
}

#[test]
fn test_run_retries_then_succeeds() {
    let output = run_json(&["--fail", "content=2", "--retry-delay-ms", "1"], true);

    assert_eq!(output["execution_history"][0]["retry_count"], 2);
    assert_eq!(output["execution_summary"]["workflow_efficiency"], 80);
}

#[test]
fn test_run_exhausted_retries_fail() {
    let mut cmd = conductor();
    cmd.args([
        "--log-level",
        "error",
        "run",
        "--topic",
        "Spring sale",
        "--workflow-id",
        "wf-broken",
        "--fail",
        "quality=5",
        "--max-retries",
        "1",
        "--retry-delay-ms",
        "1",
        "--json",
    ]);
    let assert = cmd
        .assert()
        .failure()
        .stderr(predicate::str::contains("Workflow wf-broken failed"))
        .stderr(predicate::str::contains("Stage 'quality' failed after 2 attempt(s)"));

    let output: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(output["state"], "failed");
    assert_eq!(stages(&output), ["content", "design", "quality"]);
}

#[test]
fn test_run_invalid_stage() {
    conductor()
        .args(["run", "--topic", "x", "--skip", "publishing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown stage 'publishing'"));
}

#[test]
fn test_run_invalid_failure_spec() {
    conductor()
        .args(["run", "--topic", "x", "--fail", "content"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected STAGE=N"));
}

#[test]
fn test_run_with_config_file() {
    let config = config_file(
        r#"
skip_agents = ["design", "delivery"]
handoff_validation = "off"
"#,
    );

    let output = run_json(&["--config", config.path().to_str().unwrap()], true);
    assert_eq!(stages(&output), ["content", "quality"]);
    assert_eq!(output["execution_summary"]["handoff_issues"], 0);
}

#[test]
fn test_run_quality_gate_from_config() {
    let config = config_file(
        r#"
[quality_requirements]
min_quality_score = 95
"#,
    );

    let output = run_json(&["--config", config.path().to_str().unwrap()], false);
    assert_eq!(output["state"], "failed");
    assert!(output["error"].as_str().unwrap().starts_with("Quality gate failed"));
    assert_eq!(stages(&output), ["content", "design", "quality"]);
}

#[test]
fn test_run_invalid_config_file() {
    let config = config_file(
        r#"
[retry_policy]
max_retries = 500
"#,
    );

    conductor()
        .args(["run", "--topic", "x", "--config", config.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_run_deployment_target() {
    let output = run_json(&["--deployment-target", "s3://campaigns"], true);
    assert_eq!(output["final_artifacts"]["delivery_package"]["target"], "s3://campaigns");
}
