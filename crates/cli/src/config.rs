// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Benchmark task configuration loaded from TOML or JSON files.
//!
//! ```toml
//! task_id = "L1-PY-01"
//! expected_output = "expected.jsonl"
//!
//! [reference]
//! command = ["python3", "subscriber.py", "--domain", "{domain}", "--count", "10"]
//! hang_timeout_ms = 10000
//! hard_timeout_ms = 60000
//!
//! [candidate]
//! command = ["python3", "publisher.py", "--domain", "{domain}"]
//! hang_timeout_ms = 10000
//! hard_timeout_ms = 60000
//!
//! [rules]
//! ordering = "by-sequence"
//! ignore_fields = ["timestamp"]
//! ```

use crate::supervisor::ports::validate_domain_id;
use crate::supervisor::{LaunchError, LaunchSpec};
use benchgate_compare::ComparisonRules;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_STARTUP_DELAY_MS: u64 = 2000;
pub const DEFAULT_MIN_RECORDS: usize = 1;

const DOMAIN_PLACEHOLDER: &str = "{domain}";
const WORKSPACE_PLACEHOLDER: &str = "{workspace}";

fn default_startup_delay_ms() -> u64 {
    DEFAULT_STARTUP_DELAY_MS
}

fn default_min_records() -> usize {
    DEFAULT_MIN_RECORDS
}

/// Errors loading or validating a task file
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Failed to read task file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// One process of a benchmark task
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProcessConfig {
    /// Program followed by its arguments
    pub command: Vec<String>,

    /// Working directory, relative to the workspace
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Maximum silence on stdout and stderr
    pub hang_timeout_ms: u64,

    /// Maximum total lifetime
    pub hard_timeout_ms: u64,
}

/// Values substituted into commands and environment before launch
#[derive(Clone, Debug)]
pub struct Placeholders {
    /// Left unsubstituted until a domain is leased
    pub domain_id: Option<u32>,
    pub workspace: PathBuf,
}

impl Placeholders {
    fn apply(&self, text: &str) -> String {
        let text = text.replace(WORKSPACE_PLACEHOLDER, &self.workspace.display().to_string());
        match self.domain_id {
            Some(domain_id) => text.replace(DOMAIN_PLACEHOLDER, &domain_id.to_string()),
            None => text,
        }
    }
}

impl ProcessConfig {
    /// Build a launch spec with placeholders substituted
    pub fn to_launch_spec(
        &self,
        name: &str,
        placeholders: &Placeholders,
    ) -> Result<LaunchSpec, LaunchError> {
        let argv: Vec<String> = self.command.iter().map(|a| placeholders.apply(a)).collect();
        let mut spec = LaunchSpec::from_argv(
            name,
            &argv,
            Duration::from_millis(self.hang_timeout_ms),
            Duration::from_millis(self.hard_timeout_ms),
        )?;

        let cwd = match self.cwd {
            Some(ref cwd) => placeholders.workspace.join(cwd),
            None => placeholders.workspace.clone(),
        };
        spec = spec.cwd(cwd);
        for (key, value) in &self.env {
            spec = spec.env(key.clone(), placeholders.apply(value));
        }
        Ok(spec)
    }

    fn validate(&self, role: &str) -> Result<(), TaskError> {
        if self.command.first().map_or(true, |p| p.trim().is_empty()) {
            return Err(TaskError::Validation(format!(
                "[{}] command must name a program",
                role
            )));
        }
        if self.hang_timeout_ms == 0 || self.hard_timeout_ms == 0 {
            return Err(TaskError::Validation(format!(
                "[{}] hang_timeout_ms and hard_timeout_ms must be positive",
                role
            )));
        }
        Ok(())
    }
}

/// Process whose stdout is compared against the expected output
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Reference,
    Candidate,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Reference => write!(f, "reference"),
            Role::Candidate => write!(f, "candidate"),
        }
    }
}

/// Where the actual record stream comes from
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ActualSource {
    /// Captured stdout of a launched process
    Stdout { role: Role },
    /// A file written by the processes, read after they finish
    File { path: PathBuf },
}

/// Weights of the standard checkpoints
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CheckpointWeights {
    pub build: f64,
    pub startup: f64,
    pub communication: f64,
    pub data_integrity: f64,
    pub resource_cleanup: f64,
}

impl Default for CheckpointWeights {
    fn default() -> Self {
        Self {
            build: 0.1,
            startup: 0.2,
            communication: 0.2,
            data_integrity: 0.4,
            resource_cleanup: 0.1,
        }
    }
}

impl CheckpointWeights {
    fn entries(&self) -> [(&'static str, f64); 5] {
        [
            ("build", self.build),
            ("startup", self.startup),
            ("communication", self.communication),
            ("data_integrity", self.data_integrity),
            ("resource_cleanup", self.resource_cleanup),
        ]
    }
}

/// Top-level task configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    pub task_id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Model or subject identifier recorded in the report
    #[serde(default)]
    pub model_id: Option<String>,

    /// Fixed domain id; leased automatically when absent
    #[serde(default)]
    pub domain_id: Option<u32>,

    /// Run to completion before anything else
    #[serde(default)]
    pub build: Option<ProcessConfig>,

    /// Started first and left running while the candidate runs
    #[serde(default)]
    pub reference: Option<ProcessConfig>,

    pub candidate: ProcessConfig,

    /// Defaults to the reference stdout, or the candidate stdout without a reference
    #[serde(default)]
    pub actual: Option<ActualSource>,

    pub expected_output: PathBuf,

    /// Delay between starting the reference and the candidate
    #[serde(default = "default_startup_delay_ms")]
    pub startup_delay_ms: u64,

    /// Fewest records the actual stream must contain for communication to pass
    #[serde(default = "default_min_records")]
    pub min_records: usize,

    /// Deadline applied to each checkpoint
    #[serde(default)]
    pub checkpoint_timeout_ms: Option<u64>,

    #[serde(default)]
    pub rules: ComparisonRules,

    #[serde(default)]
    pub weights: CheckpointWeights,

    /// Directory relative paths resolve against
    #[serde(skip)]
    pub workspace: PathBuf,
}

impl TaskConfig {
    /// Load a task from a TOML or JSON file.
    ///
    /// The workspace defaults to the task file's directory.
    pub fn load(path: &Path) -> Result<Self, TaskError> {
        let content = std::fs::read_to_string(path).map_err(|source| TaskError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: TaskConfig = if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content)?
        } else {
            toml::from_str(&content)?
        };
        config.workspace = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML text with the given workspace
    pub fn from_toml(content: &str, workspace: impl Into<PathBuf>) -> Result<Self, TaskError> {
        let mut config: TaskConfig = toml::from_str(content)?;
        config.workspace = workspace.into();
        config.validate()?;
        Ok(config)
    }

    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = workspace.into();
        self
    }

    pub fn validate(&self) -> Result<(), TaskError> {
        if self.task_id.trim().is_empty() {
            return Err(TaskError::Validation("task_id must not be empty".into()));
        }
        if let Some(ref build) = self.build {
            build.validate("build")?;
        }
        if let Some(ref reference) = self.reference {
            reference.validate("reference")?;
        }
        self.candidate.validate("candidate")?;

        if let Some(domain_id) = self.domain_id {
            validate_domain_id(domain_id).map_err(|e| TaskError::Validation(e.to_string()))?;
        }
        if self.actual_source() == (ActualSource::Stdout { role: Role::Reference })
            && self.reference.is_none()
        {
            return Err(TaskError::Validation(
                "actual source is the reference stdout but no [reference] process is configured"
                    .into(),
            ));
        }
        for (name, weight) in self.weights.entries() {
            if !(0.0..=1.0).contains(&weight) {
                return Err(TaskError::Validation(format!(
                    "weight for '{}' must be within [0, 1], got {}",
                    name, weight
                )));
            }
        }
        if !self.rules.tolerance.is_finite() || self.rules.tolerance < 0.0 {
            return Err(TaskError::Validation(format!(
                "rules.tolerance must be a non-negative number, got {}",
                self.rules.tolerance
            )));
        }
        if !(0.0..=1.0).contains(&self.rules.max_malformed_ratio) {
            return Err(TaskError::Validation(format!(
                "rules.max_malformed_ratio must be within [0, 1], got {}",
                self.rules.max_malformed_ratio
            )));
        }
        Ok(())
    }

    pub fn actual_source(&self) -> ActualSource {
        match self.actual {
            Some(ref source) => source.clone(),
            None if self.reference.is_some() => ActualSource::Stdout {
                role: Role::Reference,
            },
            None => ActualSource::Stdout {
                role: Role::Candidate,
            },
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.task_id
        } else {
            &self.name
        }
    }

    /// Resolve a configured path against the workspace
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.workspace.join(path)
    }

    pub fn expected_output_path(&self) -> PathBuf {
        self.resolve(&self.expected_output)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn checkpoint_timeout(&self) -> Option<Duration> {
        self.checkpoint_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
