// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Shared helpers for benchgate binary tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const EXPECTED: &str = "{\"seq\":1,\"temp\":20.5}\n{\"seq\":2,\"temp\":21.0}\n";

/// A task directory holding `expected.jsonl`, scripts and `task.toml`
pub struct TaskDir {
    dir: TempDir,
}

impl TaskDir {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("expected.jsonl"), EXPECTED).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Write a task running `script` as the candidate
    pub fn task(&self, script: &str, hang_ms: u64, hard_ms: u64) -> PathBuf {
        self.write(
            "task.toml",
            &format!(
                r#"
task_id = "cli-task"
expected_output = "expected.jsonl"
startup_delay_ms = 100
domain_id = 61

[candidate]
command = ["sh", "{}"]
hang_timeout_ms = {}
hard_timeout_ms = {}
"#,
                script, hang_ms, hard_ms
            ),
        )
    }
}
