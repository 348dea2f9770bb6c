//! Integration tests for the `conductor capabilities` command.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

#[test]
fn test_capabilities_json() {
    let assert = Command::cargo_bin("conductor")
        .unwrap()
        .args(["capabilities", "--json"])
        .assert()
        .success();

    let capabilities: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(capabilities["name"], "conductor-workflow-coordinator");
    assert_eq!(
        capabilities["managed_stages"],
        serde_json::json!(["content", "design", "quality", "delivery"])
    );
    assert_eq!(capabilities["performance"]["default_max_retries"], 2);
}

#[test]
fn test_capabilities_human() {
    Command::cargo_bin("conductor")
        .unwrap()
        .arg("capabilities")
        .assert()
        .success()
        .stdout(predicate::str::contains("conductor-workflow-coordinator"))
        .stdout(predicate::str::contains("quality_gates"));
}
