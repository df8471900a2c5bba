// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Runs a task through the standard pipeline and produces its report.

use crate::config::TaskConfig;
use crate::pipeline::standard::{standard_pipeline, RunContext};
use crate::pipeline::{CheckpointResult, CheckpointState, PipelineOutcome, ProgressSender};
use crate::report::VerificationReport;
use crate::supervisor::ports::DomainLeases;
use crate::supervisor::SupervisorConfig;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Options for one benchmark run
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub supervisor: SupervisorConfig,
    pub leases: DomainLeases,
    /// Where per-process capture logs are mirrored
    pub artifacts: Option<PathBuf>,
    /// Overrides the task's model id
    pub model_id: Option<String>,
    /// Attempt number recorded in the report
    pub iteration: Option<u32>,
    /// Checkpoint state changes as the run proceeds
    pub progress: Option<ProgressSender>,
}

/// Run every standard checkpoint for `task`.
///
/// Always returns a report. Every process launched for the run has been
/// terminated and reaped when this returns.
pub async fn run_task(task: TaskConfig, options: RunOptions) -> VerificationReport {
    let started_at = chrono::Utc::now();
    let started = Instant::now();
    let task_id = task.task_id.clone();
    let task_name = task.display_name().to_string();
    let model_id = options.model_id.or_else(|| task.model_id.clone());
    tracing::info!(task_id = %task_id, "starting run");

    let report = match standard_pipeline(&task) {
        Ok(pipeline) => {
            let mut ctx = RunContext::new(task, options.supervisor, options.leases);
            if let Some(dir) = options.artifacts {
                match std::fs::create_dir_all(&dir) {
                    Ok(()) => ctx = ctx.with_artifacts(dir),
                    Err(err) => tracing::warn!(
                        path = %dir.display(),
                        error = %err,
                        "artifact directory unavailable; capture logs stay in memory"
                    ),
                }
            }
            let ctx = Arc::new(ctx);
            let outcome = pipeline
                .run_with_progress(Arc::clone(&ctx), options.progress)
                .await;

            // Skipped cleanup still must not leave anything running
            let cleaned = ctx.supervisor.shutdown().await;
            if !cleaned.is_empty() {
                tracing::info!(processes = ?cleaned, "terminated after pipeline");
            }
            let mut processes = ctx.supervisor.prune();
            // Survivors of shutdown stay tracked and are still reported
            processes.extend(ctx.supervisor.list());
            VerificationReport::new(&task_id, outcome).with_processes(processes)
        }
        Err(err) => {
            tracing::error!(error = %err, "invalid pipeline");
            VerificationReport::new(&task_id, invalid_pipeline(err.to_string()))
        }
    };

    let report = report
        .with_task_name(task_name)
        .with_model_id(model_id)
        .with_started_at(started_at)
        .with_duration(started.elapsed())
        .with_iterations(options.iteration.unwrap_or(1));
    tracing::info!(
        task_id = %task_id,
        passed = report.passed,
        score = report.score,
        duration_ms = report.metadata.duration_ms,
        "run finished"
    );
    report
}

fn invalid_pipeline(reason: String) -> PipelineOutcome {
    PipelineOutcome {
        results: vec![CheckpointResult {
            name: "pipeline".to_string(),
            state: CheckpointState::Failed,
            passed: false,
            weight: 0.0,
            blocking: true,
            reason: Some(reason),
            details: None,
            duration_ms: 0,
        }],
        passed: false,
        score: 0.0,
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
