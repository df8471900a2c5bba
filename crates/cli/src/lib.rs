// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! benchgate
//!
//! Launches benchmark subjects under hang and hard timeouts, captures their
//! output, compares the resulting record streams against expected output, and
//! scores the run through an ordered list of weighted checkpoints.
//!
//! ```no_run
//! use benchgate::config::TaskConfig;
//! use benchgate::runner::{run_task, RunOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let task = TaskConfig::load(std::path::Path::new("tasks/L1-PY-01/task.toml"))?;
//! let report = run_task(task, RunOptions::default()).await;
//! println!("{}", report.to_markdown());
//! # Ok(())
//! # }
//! ```

/// Re-exported capture types from the benchgate-capture crate.
pub mod capture {
    pub use benchgate_capture::{CaptureLog, CapturedLine, StreamOrigin};
}

/// Re-exported comparison types from the benchgate-compare crate.
pub mod compare {
    pub use benchgate_compare::{
        compare, render_stream_diff, CompareError, ComparisonResult, ComparisonRules,
        OrderingMode, Record, RecordStream,
    };
}

#[doc(hidden)]
pub mod cli;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod supervisor;
pub mod time;
