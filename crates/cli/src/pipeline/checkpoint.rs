// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint definitions and results.

use crate::supervisor::{LaunchError, SupervisorError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Future returned by a checkpoint's verification function
pub type VerifyFuture =
    Pin<Box<dyn Future<Output = Result<Option<serde_json::Value>, CheckpointError>> + Send>>;

/// Verification function: receives the run context, yields optional details on success
pub type VerifyFn<C> = Arc<dyn Fn(C) -> VerifyFuture + Send + Sync>;

/// Why a checkpoint's verification did not pass
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The subject under test did not meet the checkpoint's criterion
    #[error("{reason}")]
    Failed {
        reason: String,
        details: Option<serde_json::Value>,
    },

    /// The verification logic itself broke
    #[error("internal error: {0}")]
    Internal(String),
}

impl CheckpointError {
    pub fn failed(reason: impl Into<String>) -> Self {
        CheckpointError::Failed {
            reason: reason.into(),
            details: None,
        }
    }

    pub fn failed_with(reason: impl Into<String>, details: serde_json::Value) -> Self {
        CheckpointError::Failed {
            reason: reason.into(),
            details: Some(details),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CheckpointError::Internal(message.into())
    }
}

impl From<LaunchError> for CheckpointError {
    fn from(err: LaunchError) -> Self {
        CheckpointError::failed(format!("launch failed: {}", err))
    }
}

impl From<SupervisorError> for CheckpointError {
    fn from(err: SupervisorError) -> Self {
        CheckpointError::internal(err.to_string())
    }
}

/// Lifecycle of one checkpoint within a run
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointState {
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
}

impl CheckpointState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointState::Pending => "pending",
            CheckpointState::Running => "running",
            CheckpointState::Passed => "passed",
            CheckpointState::Failed => "failed",
            CheckpointState::Skipped => "skipped",
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(
            self,
            CheckpointState::Passed | CheckpointState::Failed | CheckpointState::Skipped
        )
    }
}

impl std::fmt::Display for CheckpointState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A checkpoint moved to a new state during a run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointEvent {
    pub name: String,
    pub state: CheckpointState,
}

/// One named, weighted verification step
pub struct Checkpoint<C> {
    pub name: String,
    /// Contribution to the score when passed, in [0, 1]
    pub weight: f64,
    /// Failure skips every later checkpoint
    pub blocking: bool,
    /// Overrides the pipeline's default deadline
    pub timeout: Option<Duration>,
    verify: VerifyFn<C>,
}

impl<C> Clone for Checkpoint<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            weight: self.weight,
            blocking: self.blocking,
            timeout: self.timeout,
            verify: Arc::clone(&self.verify),
        }
    }
}

impl<C> std::fmt::Debug for Checkpoint<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkpoint")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .field("blocking", &self.blocking)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<C> Checkpoint<C> {
    pub fn new<F, Fut>(name: impl Into<String>, weight: f64, verify: F) -> Self
    where
        C: 'static,
        F: Fn(C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<serde_json::Value>, CheckpointError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            weight,
            blocking: false,
            timeout: None,
            verify: Arc::new(move |ctx| -> VerifyFuture { Box::pin(verify(ctx)) }),
        }
    }

    pub fn blocking(mut self) -> Self {
        self.blocking = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) fn verifier(&self) -> VerifyFn<C> {
        Arc::clone(&self.verify)
    }
}

/// Outcome of one checkpoint, retained in the report
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckpointResult {
    pub name: String,
    pub state: CheckpointState,
    pub passed: bool,
    pub weight: f64,
    pub blocking: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Diagnostic payload, e.g. a comparison diff
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub duration_ms: u64,
}

impl CheckpointResult {
    pub(crate) fn new<C>(checkpoint: &Checkpoint<C>, state: CheckpointState) -> Self {
        Self {
            name: checkpoint.name.clone(),
            state,
            passed: state == CheckpointState::Passed,
            weight: checkpoint.weight,
            blocking: checkpoint.blocking,
            reason: None,
            details: None,
            duration_ms: 0,
        }
    }

    pub(crate) fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub(crate) fn with_details(mut self, details: Option<serde_json::Value>) -> Self {
        self.details = details;
        self
    }

    pub(crate) fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }

    /// Weight counted toward the score
    pub fn earned(&self) -> f64 {
        if self.passed {
            self.weight
        } else {
            0.0
        }
    }
}
