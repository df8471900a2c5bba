// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Process supervision with hang and hard-timeout enforcement.
//!
//! The [`Supervisor`] owns every process it launches. Each child gets two
//! output pump tasks feeding a [`CaptureLog`] and one reaper task that owns the
//! `Child` and performs termination. A background loop calls
//! [`Supervisor::sweep`] on a fixed interval, independently of any caller
//! waiting on a process.

mod error;
pub mod ports;
mod process;
mod spec;
mod status;

pub use error::{LaunchError, SupervisorError};
pub use spec::LaunchSpec;
pub use status::{ProcessHandle, ProcessSnapshot, ProcessState, ProcessStatus, Termination};

use crate::time::{Clock, ClockHandle};
use benchgate_capture::{CaptureLog, CapturedLine, StreamOrigin};
use parking_lot::Mutex;
use ports::DomainLease;
use process::ProcessEntry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Supervisor tuning
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Period of the background sweep
    pub sweep_interval: Duration,
    /// Time between SIGTERM and SIGKILL
    pub grace_period: Duration,
    pub clock: ClockHandle,
    /// Run the background sweep loop. Tests driving a fake clock call
    /// [`Supervisor::sweep`] themselves.
    pub auto_sweep: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            grace_period: DEFAULT_GRACE_PERIOD,
            clock: ClockHandle::system(),
            auto_sweep: true,
        }
    }
}

impl SupervisorConfig {
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    pub fn with_clock(mut self, clock: ClockHandle) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_auto_sweep(mut self, auto_sweep: bool) -> Self {
        self.auto_sweep = auto_sweep;
        self
    }
}

struct Inner {
    processes: Mutex<HashMap<ProcessHandle, Arc<ProcessEntry>>>,
    config: SupervisorConfig,
    shut_down: AtomicBool,
}

impl Inner {
    fn entries(&self) -> Vec<Arc<ProcessEntry>> {
        self.processes.lock().values().cloned().collect()
    }

    fn sweep(&self) -> Vec<(ProcessHandle, Termination)> {
        let now = self.config.clock.now_millis();
        let mut terminated = Vec::new();
        for entry in self.entries() {
            let Some(reason) = entry.overdue(now) else {
                continue;
            };
            if entry.request_termination(reason) {
                tracing::warn!(
                    run_id = %entry.handle,
                    name = %entry.spec.name,
                    pid = ?entry.pid,
                    %reason,
                    "terminating process"
                );
                terminated.push((entry.handle, reason));
            }
        }
        terminated
    }
}

/// Owns and bounds a set of child processes.
///
/// Must be created inside a tokio runtime. Dropping the supervisor kills
/// every process still running; call [`Supervisor::shutdown`] first for a
/// graceful stop.
pub struct Supervisor {
    inner: Arc<Inner>,
    sweeper: Option<JoinHandle<()>>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new(SupervisorConfig::default())
    }
}

impl Supervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        let auto_sweep = config.auto_sweep;
        let interval = config.sweep_interval;
        let inner = Arc::new(Inner {
            processes: Mutex::new(HashMap::new()),
            config,
            shut_down: AtomicBool::new(false),
        });
        let sweeper =
            auto_sweep.then(|| tokio::spawn(sweep_loop(Arc::downgrade(&inner), interval)));
        Self { inner, sweeper }
    }

    pub fn clock(&self) -> &ClockHandle {
        &self.inner.config.clock
    }

    /// Start a process and begin capturing its output.
    pub fn launch(&self, spec: LaunchSpec) -> Result<ProcessHandle, LaunchError> {
        if self.inner.shut_down.load(Ordering::Acquire) {
            return Err(LaunchError::ShutDown);
        }
        spec.validate()?;

        let clock = self.inner.config.clock.clone();
        let now = clock.now_millis();
        let capture = match spec.capture_file {
            Some(ref path) => {
                CaptureLog::with_file(path, now).map_err(|source| LaunchError::CaptureFile {
                    path: path.clone(),
                    source,
                })?
            }
            None => CaptureLog::new(now),
        };

        let mut child = spec
            .to_command()
            .spawn()
            .map_err(|e| LaunchError::from_spawn(&spec.program, e))?;

        let handle = ProcessHandle::new();
        let pid = child.id();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        tracing::info!(
            run_id = %handle,
            name = %spec.name,
            pid = ?pid,
            command = ?spec.command_line(),
            "launched process"
        );

        let entry = Arc::new(ProcessEntry::new(handle, spec, pid, capture.clone()));
        self.inner
            .processes
            .lock()
            .insert(handle, Arc::clone(&entry));

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = stdout {
            readers.push(tokio::spawn(process::pump(
                stdout,
                StreamOrigin::Stdout,
                capture.clone(),
                clock.clone(),
            )));
        }
        if let Some(stderr) = stderr {
            readers.push(tokio::spawn(process::pump(
                stderr,
                StreamOrigin::Stderr,
                capture,
                clock.clone(),
            )));
        }

        entry.mark_running();
        tokio::spawn(process::reap(
            entry,
            child,
            readers,
            self.inner.config.grace_period,
            clock,
        ));
        Ok(handle)
    }

    /// Current status. Never blocks.
    pub fn poll(&self, handle: ProcessHandle) -> Result<ProcessStatus, SupervisorError> {
        Ok(self.entry(handle)?.status())
    }

    /// Wait for the process to end or for `timeout` to elapse.
    ///
    /// The returned status is terminal if the process ended and non-terminal
    /// if the timeout elapsed first.
    pub async fn wait(
        &self,
        handle: ProcessHandle,
        timeout: Duration,
    ) -> Result<ProcessStatus, SupervisorError> {
        let entry = self.entry(handle)?;
        Ok(entry.wait(timeout).await)
    }

    /// Request termination: SIGTERM, then SIGKILL after the grace period.
    ///
    /// Idempotent, and a no-op once the process has ended.
    pub fn terminate(&self, handle: ProcessHandle) -> Result<(), SupervisorError> {
        let entry = self.entry(handle)?;
        if entry.request_termination(Termination::Requested) {
            tracing::info!(run_id = %handle, name = %entry.spec.name, "termination requested");
        }
        Ok(())
    }

    /// Terminate every process past its hang or hard timeout.
    ///
    /// When both bounds are exceeded the hard timeout is reported. Returns the
    /// processes terminated by this pass.
    pub fn sweep(&self) -> Vec<(ProcessHandle, Termination)> {
        self.inner.sweep()
    }

    /// Status change notifications for one process
    pub fn subscribe(
        &self,
        handle: ProcessHandle,
    ) -> Result<watch::Receiver<ProcessStatus>, SupervisorError> {
        Ok(self.entry(handle)?.subscribe())
    }

    pub fn snapshot(&self, handle: ProcessHandle) -> Result<ProcessSnapshot, SupervisorError> {
        Ok(self.entry(handle)?.snapshot(self.clock().now_millis()))
    }

    /// Snapshots of every managed process, oldest first
    pub fn list(&self) -> Vec<ProcessSnapshot> {
        let now = self.clock().now_millis();
        let mut snapshots: Vec<_> = self
            .inner
            .entries()
            .iter()
            .map(|e| e.snapshot(now))
            .collect();
        snapshots.sort_by(|a, b| (a.started_ms, &a.name).cmp(&(b.started_ms, &b.name)));
        snapshots
    }

    /// Drop a finished process from the table and return its final snapshot.
    ///
    /// Fails with [`SupervisorError::StillRunning`] until the process is
    /// terminal; its handle is unknown afterwards.
    pub fn forget(&self, handle: ProcessHandle) -> Result<ProcessSnapshot, SupervisorError> {
        let now = self.clock().now_millis();
        let mut processes = self.inner.processes.lock();
        let entry = processes
            .get(&handle)
            .ok_or(SupervisorError::UnknownHandle(handle))?;
        if !entry.status().is_terminal() {
            return Err(SupervisorError::StillRunning(handle));
        }
        let snapshot = entry.snapshot(now);
        processes.remove(&handle);
        Ok(snapshot)
    }

    /// Forget every finished process, returning their final snapshots oldest first
    pub fn prune(&self) -> Vec<ProcessSnapshot> {
        let now = self.clock().now_millis();
        let mut pruned: Vec<_> = {
            let mut processes = self.inner.processes.lock();
            let finished: Vec<ProcessHandle> = processes
                .iter()
                .filter(|(_, e)| e.status().is_terminal())
                .map(|(h, _)| *h)
                .collect();
            finished
                .into_iter()
                .filter_map(|h| processes.remove(&h))
                .map(|e| e.snapshot(now))
                .collect()
        };
        pruned.sort_by(|a, b| (a.started_ms, &a.name).cmp(&(b.started_ms, &b.name)));
        if !pruned.is_empty() {
            tracing::debug!(count = pruned.len(), "pruned finished processes");
        }
        pruned
    }

    /// Lines captured so far
    pub fn output(&self, handle: ProcessHandle) -> Result<Vec<CapturedLine>, SupervisorError> {
        Ok(self.entry(handle)?.capture.lines())
    }

    /// Shared view of the capture log
    pub fn capture(&self, handle: ProcessHandle) -> Result<CaptureLog, SupervisorError> {
        Ok(self.entry(handle)?.capture.clone())
    }

    /// Tie a domain lease to a process; it is released when the process ends
    pub fn attach_lease(
        &self,
        handle: ProcessHandle,
        lease: DomainLease,
    ) -> Result<(), SupervisorError> {
        self.entry(handle)?.attach_lease(lease);
        Ok(())
    }

    /// Terminate everything still running and wait for it to be reaped.
    ///
    /// New launches are refused afterwards. Returns the names of processes
    /// this call had to terminate.
    pub async fn shutdown(&self) -> Vec<String> {
        self.inner.shut_down.store(true, Ordering::Release);
        let entries = self.inner.entries();

        let mut cleaned = Vec::new();
        for entry in &entries {
            if entry.request_termination(Termination::Shutdown) {
                cleaned.push(entry.spec.name.clone());
            }
        }

        let deadline = self.inner.config.grace_period + Duration::from_secs(1);
        for entry in &entries {
            let status = entry.wait(deadline).await;
            if !status.is_terminal() {
                tracing::error!(
                    run_id = %entry.handle,
                    name = %entry.spec.name,
                    "process survived shutdown"
                );
                entry.kill_now();
            }
        }

        if !cleaned.is_empty() {
            tracing::info!(processes = ?cleaned, "terminated processes at shutdown");
        }
        cleaned
    }

    fn entry(&self, handle: ProcessHandle) -> Result<Arc<ProcessEntry>, SupervisorError> {
        self.inner
            .processes
            .lock()
            .get(&handle)
            .cloned()
            .ok_or(SupervisorError::UnknownHandle(handle))
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
        for entry in self.inner.entries() {
            if !entry.status().is_terminal() {
                tracing::warn!(
                    run_id = %entry.handle,
                    name = %entry.spec.name,
                    "killing process at supervisor drop"
                );
                entry.kill_now();
            }
        }
    }
}

async fn sweep_loop(inner: Weak<Inner>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.sweep();
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
