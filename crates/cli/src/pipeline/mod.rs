// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered, weighted verification checkpoints.
//!
//! A [`Pipeline`] evaluates its checkpoints strictly in declared order. Each
//! verification runs on its own task, so a panic inside it is contained and
//! recorded as a failure of that checkpoint alone. A failed blocking
//! checkpoint marks every later checkpoint skipped. [`Pipeline::run`] never
//! returns an error.
//!
//! [`Pipeline::run_with_progress`] reports each state change as it happens:
//! every checkpoint starts `pending`, moves to `running` right before it is
//! evaluated, then ends `passed`, `failed` or `skipped`.

mod checkpoint;
pub mod standard;

pub use checkpoint::{
    Checkpoint, CheckpointError, CheckpointEvent, CheckpointResult, CheckpointState, VerifyFn,
    VerifyFuture,
};

use std::collections::HashSet;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinError;

/// Receives checkpoint state changes while a pipeline runs
pub type ProgressSender = UnboundedSender<CheckpointEvent>;

/// Invalid pipeline definition
#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("checkpoint '{name}' has weight {weight}; weights must be within [0, 1]")]
    InvalidWeight { name: String, weight: f64 },

    #[error("duplicate checkpoint name '{0}'")]
    DuplicateName(String),
}

/// Results of one pipeline run
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineOutcome {
    pub results: Vec<CheckpointResult>,
    /// Every checkpoint passed and none was skipped
    pub passed: bool,
    /// Sum of the weights of passed checkpoints
    pub score: f64,
}

impl PipelineOutcome {
    fn from_results(results: Vec<CheckpointResult>) -> Self {
        let passed = results.iter().all(|r| r.state == CheckpointState::Passed);
        let score = round_score(results.iter().map(CheckpointResult::earned).sum());
        Self {
            results,
            passed,
            score,
        }
    }

    pub fn result(&self, name: &str) -> Option<&CheckpointResult> {
        self.results.iter().find(|r| r.name == name)
    }
}

// Keeps summed float weights stable in reports (0.1 + 0.2 prints as 0.3)
fn round_score(score: f64) -> f64 {
    (score * 1e6).round() / 1e6
}

/// An ordered list of checkpoints over a shared context `C`
pub struct Pipeline<C> {
    checkpoints: Vec<Checkpoint<C>>,
    default_timeout: Option<Duration>,
}

impl<C> std::fmt::Debug for Pipeline<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("checkpoints", &self.checkpoints)
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

impl<C> Pipeline<C>
where
    C: Clone + Send + 'static,
{
    pub fn new(checkpoints: Vec<Checkpoint<C>>) -> Result<Self, PipelineError> {
        let mut names = HashSet::new();
        for checkpoint in &checkpoints {
            if !(0.0..=1.0).contains(&checkpoint.weight) {
                return Err(PipelineError::InvalidWeight {
                    name: checkpoint.name.clone(),
                    weight: checkpoint.weight,
                });
            }
            if !names.insert(checkpoint.name.as_str()) {
                return Err(PipelineError::DuplicateName(checkpoint.name.clone()));
            }
        }
        Ok(Self {
            checkpoints,
            default_timeout: None,
        })
    }

    /// Deadline for checkpoints that do not set their own
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn checkpoints(&self) -> &[Checkpoint<C>] {
        &self.checkpoints
    }

    /// Total weight available
    pub fn max_score(&self) -> f64 {
        round_score(self.checkpoints.iter().map(|c| c.weight).sum())
    }

    pub async fn run(&self, ctx: C) -> PipelineOutcome {
        self.run_with_progress(ctx, None).await
    }

    /// Run every checkpoint, sending each state change to `progress`.
    ///
    /// A closed receiver does not affect the run.
    pub async fn run_with_progress(
        &self,
        ctx: C,
        progress: Option<ProgressSender>,
    ) -> PipelineOutcome {
        let notify = |checkpoint: &Checkpoint<C>, state: CheckpointState| {
            if let Some(ref tx) = progress {
                let _ = tx.send(CheckpointEvent {
                    name: checkpoint.name.clone(),
                    state,
                });
            }
        };
        for checkpoint in &self.checkpoints {
            notify(checkpoint, CheckpointState::Pending);
        }

        let mut results = Vec::with_capacity(self.checkpoints.len());
        let mut halted_by: Option<&str> = None;

        for checkpoint in &self.checkpoints {
            if let Some(blocker) = halted_by {
                tracing::info!(checkpoint = %checkpoint.name, blocker, "checkpoint skipped");
                notify(checkpoint, CheckpointState::Skipped);
                results.push(
                    CheckpointResult::new(checkpoint, CheckpointState::Skipped).with_reason(
                        format!("skipped: blocking checkpoint '{}' failed", blocker),
                    ),
                );
                continue;
            }

            notify(checkpoint, CheckpointState::Running);
            let result = self.evaluate(checkpoint, ctx.clone()).await;
            notify(checkpoint, result.state);
            if result.passed {
                tracing::info!(
                    checkpoint = %checkpoint.name,
                    weight = checkpoint.weight,
                    duration_ms = result.duration_ms,
                    "checkpoint passed"
                );
            } else {
                tracing::warn!(
                    checkpoint = %checkpoint.name,
                    weight = checkpoint.weight,
                    blocking = checkpoint.blocking,
                    reason = result.reason.as_deref().unwrap_or_default(),
                    "checkpoint failed"
                );
                if checkpoint.blocking {
                    halted_by = Some(&checkpoint.name);
                }
            }
            results.push(result);
        }

        PipelineOutcome::from_results(results)
    }

    async fn evaluate(&self, checkpoint: &Checkpoint<C>, ctx: C) -> CheckpointResult {
        tracing::debug!(checkpoint = %checkpoint.name, "checkpoint running");
        let started = Instant::now();
        let verify = checkpoint.verifier();
        let mut task = tokio::spawn(async move { verify(ctx).await });

        let joined = match checkpoint.timeout.or(self.default_timeout) {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    task.abort();
                    return CheckpointResult::new(checkpoint, CheckpointState::Failed)
                        .with_reason(format!(
                            "checkpoint timed out after {}ms",
                            limit.as_millis()
                        ))
                        .with_duration(started.elapsed());
                }
            },
            None => task.await,
        };

        let result = match joined {
            Ok(Ok(details)) => {
                CheckpointResult::new(checkpoint, CheckpointState::Passed).with_details(details)
            }
            Ok(Err(CheckpointError::Failed { reason, details })) => {
                CheckpointResult::new(checkpoint, CheckpointState::Failed)
                    .with_reason(reason)
                    .with_details(details)
            }
            Ok(Err(err @ CheckpointError::Internal(_))) => {
                CheckpointResult::new(checkpoint, CheckpointState::Failed)
                    .with_reason(err.to_string())
            }
            Err(err) => CheckpointResult::new(checkpoint, CheckpointState::Failed)
                .with_reason(join_failure(err)),
        };
        result.with_duration(started.elapsed())
    }
}

fn join_failure(err: JoinError) -> String {
    if !err.is_panic() {
        return "internal error: checkpoint task was cancelled".to_string();
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("internal error: checkpoint panicked: {}", message)
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
