// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative description of a process to launch.

use super::LaunchError;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// What to run and how long it may live.
///
/// Both timeouts are required. The hang timeout bounds silence on stdout and
/// stderr combined; the hard timeout bounds total lifetime.
#[derive(Clone, Debug, PartialEq)]
pub struct LaunchSpec {
    /// Human-readable name used in logs and reports
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Variables set on top of the inherited environment
    pub env: BTreeMap<String, String>,
    pub hang_timeout: Duration,
    pub hard_timeout: Duration,
    /// Mirror captured lines to this JSONL file
    pub capture_file: Option<PathBuf>,
}

impl LaunchSpec {
    pub fn new(
        name: impl Into<String>,
        program: impl Into<String>,
        hang_timeout: Duration,
        hard_timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
            hang_timeout,
            hard_timeout,
            capture_file: None,
        }
    }

    /// Build from an argv vector (program first)
    pub fn from_argv(
        name: impl Into<String>,
        argv: &[String],
        hang_timeout: Duration,
        hard_timeout: Duration,
    ) -> Result<Self, LaunchError> {
        let name = name.into();
        let (program, args) = argv.split_first().ok_or_else(|| LaunchError::InvalidSpec {
            name: name.clone(),
            reason: "command is empty".to_string(),
        })?;
        Ok(Self::new(name, program.clone(), hang_timeout, hard_timeout).args(args.iter().cloned()))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn capture_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.capture_file = Some(path.into());
        self
    }

    /// Program followed by its arguments
    pub fn command_line(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    pub(crate) fn validate(&self) -> Result<(), LaunchError> {
        let invalid = |reason: &str| LaunchError::InvalidSpec {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.program.trim().is_empty() {
            return Err(invalid("program is empty"));
        }
        if self.hang_timeout.is_zero() {
            return Err(invalid("hang timeout must be positive"));
        }
        if self.hard_timeout.is_zero() {
            return Err(invalid("hard timeout must be positive"));
        }
        if let Some(ref cwd) = self.cwd {
            if !cwd.is_dir() {
                return Err(LaunchError::InvalidWorkingDir { path: cwd.clone() });
            }
        }
        Ok(())
    }

    pub(crate) fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group so termination reaches grandchildren too
        cmd.process_group(0);
        cmd
    }
}
