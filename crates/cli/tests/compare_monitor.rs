// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Tests for `benchgate compare` and `benchgate monitor`.

#![allow(deprecated)] // Command::cargo_bin is deprecated but still functional

mod common;

use assert_cmd::Command;
use common::TaskDir;
use predicates::prelude::*;

fn benchgate() -> Command {
    let mut cmd = Command::cargo_bin("benchgate").unwrap();
    cmd.env_remove("BENCHGATE_LOG").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_compare_uses_task_expected_output_and_rules() {
    let dir = TaskDir::new();
    let task = dir.write(
        "task.toml",
        r#"
task_id = "rules"
expected_output = "expected.jsonl"

[candidate]
command = ["true"]
hang_timeout_ms = 1000
hard_timeout_ms = 1000

[rules]
ordering = "by-sequence"
tolerance = 0.1
"#,
    );
    let actual = dir.write(
        "actual.jsonl",
        "{\"seq\":2,\"temp\":21.05}\n{\"seq\":1,\"temp\":20.5}\n",
    );

    benchgate()
        .arg("compare")
        .arg("--task")
        .arg(&task)
        .arg("--actual")
        .arg(&actual)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("PASS"));
}

#[test]
fn test_compare_reports_missing_sequence() {
    let dir = TaskDir::new();
    let actual = dir.write("actual.jsonl", "{\"seq\":1,\"temp\":20.5}\n");

    benchgate()
        .arg("compare")
        .arg("--expected")
        .arg(dir.path().join("expected.jsonl"))
        .arg("--actual")
        .arg(&actual)
        .args(["--ordering", "by-sequence"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("missing seq 2"));
}

#[test]
fn test_compare_without_expected_exits_two() {
    let dir = TaskDir::new();
    let actual = dir.write("actual.jsonl", "{}\n");

    benchgate()
        .arg("compare")
        .arg("--actual")
        .arg(&actual)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--expected is required"));
}

#[test]
fn test_monitor_completed_process() {
    let output = benchgate()
        .args([
            "monitor",
            "--hang-timeout-ms",
            "2000",
            "--hard-timeout-ms",
            "5000",
            "--show-output",
            "sh",
            "-c",
            "echo ready; exit 0",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["process"]["name"], "sh");
    assert_eq!(json["process"]["state"], "completed");
    assert_eq!(json["process"]["exit_code"], 0);
    assert_eq!(json["output"][0]["text"], "ready");
}

#[test]
fn test_monitor_kills_silent_process() {
    let output = benchgate()
        .args([
            "monitor",
            "--name",
            "sleeper",
            "--hang-timeout-ms",
            "300",
            "--hard-timeout-ms",
            "20000",
            "sleep",
            "60",
        ])
        .timeout(std::time::Duration::from_secs(15))
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["name"], "sleeper");
    assert_eq!(json["state"], "hung");
    assert_eq!(json["termination"], "hang_timeout");
}

#[test]
fn test_monitor_missing_program_exits_two() {
    benchgate()
        .args([
            "monitor",
            "--hang-timeout-ms",
            "100",
            "--hard-timeout-ms",
            "100",
            "/nonexistent/program",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("executable not found"));
}
