// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle states and status snapshots of managed processes.

use serde::Serialize;
use uuid::Uuid;

/// Uniquely identifies one managed process run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProcessHandle(Uuid);

impl ProcessHandle {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn run_id(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state. Transitions only move forward:
/// `Starting -> Running -> (Completed | TimedOut | Hung | Killed)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Starting,
    Running,
    /// Exited on its own
    Completed,
    /// Exceeded the hard timeout
    TimedOut,
    /// Silent for longer than the hang timeout
    Hung,
    /// Terminated on request or at shutdown
    Killed,
}

impl ProcessState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProcessState::Completed
                | ProcessState::TimedOut
                | ProcessState::Hung
                | ProcessState::Killed
        )
    }

    fn rank(self) -> u8 {
        match self {
            ProcessState::Starting => 0,
            ProcessState::Running => 1,
            _ => 2,
        }
    }

    /// Whether `next` is a legal successor of `self`
    pub fn can_advance_to(self, next: ProcessState) -> bool {
        next.rank() > self.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessState::Starting => "starting",
            ProcessState::Running => "running",
            ProcessState::Completed => "completed",
            ProcessState::TimedOut => "timed_out",
            ProcessState::Hung => "hung",
            ProcessState::Killed => "killed",
        }
    }
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the supervisor ended a process
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// `terminate` was called
    Requested,
    HangTimeout,
    HardTimeout,
    /// The supervisor was shut down with the process still running
    Shutdown,
}

impl Termination {
    /// State the process ends in once terminated for this reason
    pub fn final_state(self) -> ProcessState {
        match self {
            Termination::HangTimeout => ProcessState::Hung,
            Termination::HardTimeout => ProcessState::TimedOut,
            Termination::Requested | Termination::Shutdown => ProcessState::Killed,
        }
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Termination::Requested => write!(f, "terminated on request"),
            Termination::HangTimeout => write!(f, "hang timeout (no output)"),
            Termination::HardTimeout => write!(f, "hard timeout exceeded"),
            Termination::Shutdown => write!(f, "terminated at supervisor shutdown"),
        }
    }
}

/// Current lifecycle state plus exit details once terminated
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ProcessStatus {
    pub state: ProcessState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Signal that ended the process, when it did not exit normally
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination: Option<Termination>,
}

impl ProcessStatus {
    pub(crate) fn starting() -> Self {
        Self {
            state: ProcessState::Starting,
            exit_code: None,
            signal: None,
            termination: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Completed with exit code zero
    pub fn success(&self) -> bool {
        self.state == ProcessState::Completed && self.exit_code == Some(0)
    }

    /// Short human description, e.g. for checkpoint failure reasons
    pub fn describe(&self) -> String {
        match (self.state, self.termination) {
            (ProcessState::Completed, _) => match (self.exit_code, self.signal) {
                (Some(code), _) => format!("exited with code {}", code),
                (None, Some(sig)) => format!("killed by signal {}", sig),
                (None, None) => "exited".to_string(),
            },
            (state, Some(reason)) => format!("{}: {}", state, reason),
            (state, None) => state.to_string(),
        }
    }
}

/// Point-in-time view of one managed process
#[derive(Clone, Debug, Serialize)]
pub struct ProcessSnapshot {
    pub name: String,
    pub run_id: ProcessHandle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub command: Vec<String>,
    #[serde(flatten)]
    pub status: ProcessStatus,
    pub started_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_ms: Option<u64>,
    pub last_output_ms: u64,
    pub elapsed_ms: u64,
    pub stdout_lines: usize,
    pub stderr_lines: usize,
    /// Output pipes outlived the process group, so something escaped it
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub orphaned_output: bool,
}
