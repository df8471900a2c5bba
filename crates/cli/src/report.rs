// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Verification reports.

use crate::pipeline::{CheckpointResult, CheckpointState, PipelineOutcome};
use crate::supervisor::ProcessSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

/// Identifies the run a report belongs to
#[derive(Clone, Debug, Serialize)]
pub struct ReportMetadata {
    pub run_id: Uuid,
    pub task_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the whole run
    pub duration_ms: u64,
    pub iterations: u32,
}

/// Final result of one benchmark run.
///
/// Built once from a [`PipelineOutcome`]; there are no mutating methods after
/// the builder chain.
#[derive(Clone, Debug, Serialize)]
pub struct VerificationReport {
    pub metadata: ReportMetadata,
    pub checkpoints: Vec<CheckpointResult>,
    pub passed: bool,
    pub score: f64,
    pub max_score: f64,
    /// Final state of every process the run launched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub processes: Vec<ProcessSnapshot>,
}

impl VerificationReport {
    pub fn new(task_id: impl Into<String>, outcome: PipelineOutcome) -> Self {
        let max_score = outcome.results.iter().map(|r| r.weight).sum::<f64>();
        Self {
            metadata: ReportMetadata {
                run_id: Uuid::new_v4(),
                task_id: task_id.into(),
                task_name: None,
                model_id: None,
                started_at: Utc::now(),
                duration_ms: 0,
                iterations: 1,
            },
            checkpoints: outcome.results,
            passed: outcome.passed,
            score: outcome.score,
            max_score: (max_score * 1e6).round() / 1e6,
            processes: Vec::new(),
        }
    }

    pub fn with_task_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.task_name = Some(name.into());
        self
    }

    pub fn with_model_id(mut self, model_id: Option<String>) -> Self {
        self.metadata.model_id = model_id;
        self
    }

    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.metadata.started_at = started_at;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.metadata.duration_ms = duration.as_millis() as u64;
        self
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.metadata.iterations = iterations;
        self
    }

    pub fn with_processes(mut self, processes: Vec<ProcessSnapshot>) -> Self {
        self.processes = processes;
        self
    }

    pub fn checkpoint(&self, name: &str) -> Option<&CheckpointResult> {
        self.checkpoints.iter().find(|c| c.name == name)
    }

    /// Count checkpoints by final state
    pub fn count_by_state(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::from([("passed", 0), ("failed", 0), ("skipped", 0)]);
        for checkpoint in &self.checkpoints {
            *counts.entry(checkpoint.state.as_str()).or_insert(0) += 1;
        }
        counts
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_markdown(&self) -> String {
        let meta = &self.metadata;
        let mut md = String::new();
        md.push_str(&format!(
            "# Verification Report: {}\n\n",
            meta.task_name.as_deref().unwrap_or(&meta.task_id)
        ));

        md.push_str(&format!("- Task: `{}`\n", meta.task_id));
        if let Some(model) = &meta.model_id {
            md.push_str(&format!("- Model: `{}`\n", model));
        }
        md.push_str(&format!("- Run: `{}`\n", meta.run_id));
        md.push_str(&format!("- Started: {}\n", meta.started_at.to_rfc3339()));
        md.push_str(&format!(
            "- Duration: {:.1}s\n",
            meta.duration_ms as f64 / 1000.0
        ));
        md.push_str(&format!("- Iterations: {}\n", meta.iterations));
        md.push('\n');

        md.push_str("## Summary\n\n");
        md.push_str(&format!(
            "- Result: {}\n",
            if self.passed { "PASS" } else { "FAIL" }
        ));
        md.push_str(&format!("- Score: {} / {}\n", self.score, self.max_score));
        let counts = self.count_by_state();
        md.push_str(&format!("- Passed: {}\n", counts["passed"]));
        md.push_str(&format!("- Failed: {}\n", counts["failed"]));
        md.push_str(&format!("- Skipped: {}\n", counts["skipped"]));
        md.push('\n');

        md.push_str("## Checkpoints\n\n");
        md.push_str("| Checkpoint | Status | Weight | Notes |\n");
        md.push_str("|------------|--------|--------|-------|\n");
        for checkpoint in &self.checkpoints {
            let status = match checkpoint.state {
                CheckpointState::Passed => "✅ passed",
                CheckpointState::Failed => "❌ failed",
                CheckpointState::Skipped => "⏭️ skipped",
                CheckpointState::Pending | CheckpointState::Running => "❓ incomplete",
            };
            let blocking = if checkpoint.blocking { " (blocking)" } else { "" };
            let notes = checkpoint
                .reason
                .as_deref()
                .unwrap_or("")
                .replace('|', "\\|")
                .replace('\n', " ");
            md.push_str(&format!(
                "| `{}`{} | {} | {} | {} |\n",
                checkpoint.name, blocking, status, checkpoint.weight, notes
            ));
        }
        md.push('\n');

        if !self.processes.is_empty() {
            md.push_str("## Processes\n\n");
            md.push_str("| Process | Status | Elapsed | Output lines |\n");
            md.push_str("|---------|--------|---------|--------------|\n");
            for process in &self.processes {
                md.push_str(&format!(
                    "| `{}` | {} | {}ms | {} / {} |\n",
                    process.name,
                    process.status.describe(),
                    process.elapsed_ms,
                    process.stdout_lines,
                    process.stderr_lines
                ));
            }
            md.push('\n');
        }

        md
    }

    /// Write the report; `.md` paths get markdown, anything else JSON
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        let content = if path.extension().is_some_and(|e| e == "md") {
            self.to_markdown()
        } else {
            self.to_json().map_err(std::io::Error::other)?
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
