// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Captured line data types.

use super::duration_ms;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which output stream a line was read from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamOrigin {
    Stdout,
    Stderr,
}

impl StreamOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamOrigin::Stdout => "stdout",
            StreamOrigin::Stderr => "stderr",
        }
    }
}

impl std::fmt::Display for StreamOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of child output, immutable once appended
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapturedLine {
    /// Position in the owning log
    pub seq: u64,

    /// Receipt time in clock milliseconds
    pub timestamp_ms: u64,

    /// Time since the capture was opened
    #[serde(with = "duration_ms", rename = "elapsed_ms")]
    pub elapsed: Duration,

    /// Stream the line arrived on
    pub origin: StreamOrigin,

    /// Line text without the trailing newline
    pub text: String,

    /// True when the line was flushed without a terminating newline
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
}

impl CapturedLine {
    pub fn is_stdout(&self) -> bool {
        self.origin == StreamOrigin::Stdout
    }

    pub fn is_stderr(&self) -> bool {
        self.origin == StreamOrigin::Stderr
    }
}
