// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::ProcessHandle;
use std::path::PathBuf;
use thiserror::Error;

/// Why a process could not be started.
///
/// A failed launch leaves no entry in the supervisor and does not affect
/// other managed processes.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("executable not found: {program}")]
    NotFound { program: String },

    #[error("permission denied executing {program}")]
    PermissionDenied { program: String },

    #[error("working directory does not exist or is not a directory: {}", path.display())]
    InvalidWorkingDir { path: PathBuf },

    #[error("invalid launch spec for '{name}': {reason}")]
    InvalidSpec { name: String, reason: String },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create capture file {}: {source}", path.display())]
    CaptureFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("supervisor is shut down")]
    ShutDown,
}

impl LaunchError {
    pub(crate) fn from_spawn(program: &str, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => LaunchError::NotFound {
                program: program.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => LaunchError::PermissionDenied {
                program: program.to_string(),
            },
            _ => LaunchError::Spawn {
                program: program.to_string(),
                source,
            },
        }
    }
}

/// Errors from operations on an existing handle
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SupervisorError {
    #[error("unknown process handle {0}")]
    UnknownHandle(ProcessHandle),

    #[error("process {0} has not finished")]
    StillRunning(ProcessHandle),
}
