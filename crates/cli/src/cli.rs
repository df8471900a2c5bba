// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line interface.

use crate::supervisor::SupervisorConfig;
use benchgate_compare::OrderingMode;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Deterministic benchmark verification
#[derive(Parser, Debug)]
#[command(name = "benchgate", version, about = "Deterministic benchmark verification")]
pub struct Cli {
    /// Debug logging unless BENCHGATE_LOG or RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a task through the standard checkpoints and emit a report
    Run(RunArgs),
    /// Compare an actual JSONL file against expected records
    Compare(CompareArgs),
    /// Run one command under hang and hard timeouts and print its final status
    Monitor(MonitorArgs),
}

/// Report serialization
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Json,
    Markdown,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Task file (TOML, or JSON by extension)
    #[arg(value_name = "TASK")]
    pub task: PathBuf,

    /// Write the report here instead of stdout (`.md` selects markdown)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Report format on stdout
    #[arg(long, value_enum, default_value = "json")]
    pub format: ReportFormat,

    /// Directory for per-process capture logs
    #[arg(long)]
    pub artifacts: Option<PathBuf>,

    /// Model identifier recorded in the report
    #[arg(long, env = "BENCHGATE_MODEL_ID")]
    pub model_id: Option<String>,

    /// Attempt number recorded in the report
    #[arg(long)]
    pub iteration: Option<u32>,

    /// Print checkpoint progress to stderr
    #[arg(long)]
    pub progress: bool,

    /// Period of the hang/timeout sweep
    #[arg(long, default_value_t = 1000)]
    pub sweep_interval_ms: u64,

    /// Time between SIGTERM and SIGKILL
    #[arg(long, default_value_t = 2000)]
    pub grace_period_ms: u64,
}

impl RunArgs {
    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig::default()
            .with_sweep_interval(Duration::from_millis(self.sweep_interval_ms.max(1)))
            .with_grace_period(Duration::from_millis(self.grace_period_ms))
    }
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Actual JSONL file to verify
    #[arg(long)]
    pub actual: PathBuf,

    /// Reference JSONL file; defaults to the task's expected output
    #[arg(long)]
    pub expected: Option<PathBuf>,

    /// Take rules (and the expected file) from this task
    #[arg(long)]
    pub task: Option<PathBuf>,

    /// Absolute tolerance for float fields
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// strict, by-sequence or unordered
    #[arg(long)]
    pub ordering: Option<OrderingMode>,

    /// Field path never compared (repeatable)
    #[arg(long = "ignore")]
    pub ignore: Vec<String>,

    /// Accept extra actual records
    #[arg(long)]
    pub allow_superset: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Print a unified diff of the two streams on failure
    #[arg(long)]
    pub diff: bool,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Name used in logs and output; defaults to the program name
    #[arg(long)]
    pub name: Option<String>,

    /// Maximum silence on stdout and stderr
    #[arg(long)]
    pub hang_timeout_ms: u64,

    /// Maximum total lifetime
    #[arg(long)]
    pub hard_timeout_ms: u64,

    /// Working directory
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Mirror captured lines to this JSONL file
    #[arg(long)]
    pub capture: Option<PathBuf>,

    /// Include captured lines in the printed JSON
    #[arg(long)]
    pub show_output: bool,

    /// Command and arguments
    #[arg(trailing_var_arg = true, required = true, num_args = 1.., value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl MonitorArgs {
    pub fn process_name(&self) -> String {
        if let Some(ref name) = self.name {
            return name.clone();
        }
        self.command
            .first()
            .and_then(|program| {
                std::path::Path::new(program)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "process".to_string())
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
