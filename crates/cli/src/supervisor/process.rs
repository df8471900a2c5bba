// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! One managed process: its state record and the tasks driving it.

use super::ports::DomainLease;
use super::{LaunchSpec, ProcessHandle, ProcessSnapshot, ProcessState, ProcessStatus, Termination};
use crate::time::{Clock, ClockHandle};
use benchgate_capture::{CaptureLog, StreamOrigin};
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::sys::wait::{waitid, Id, WaitPidFlag};
use nix::unistd::Pid;
use parking_lot::Mutex;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

const READ_CHUNK: usize = 8192;

/// How long to wait for output readers after the process is reaped
const READER_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

struct ProcessRecord {
    status: ProcessStatus,
    ended_ms: Option<u64>,
    /// The leader exited on its own; termination requests are ignored from here on
    exited: bool,
    /// Output pipes were still held open after the process group was gone
    orphaned_output: bool,
    /// Set just before the leader is reaped; its group id is no longer ours to signal
    reaping: bool,
    /// Released when the process is reaped
    leases: Vec<DomainLease>,
}

pub(super) struct ProcessEntry {
    pub(super) handle: ProcessHandle,
    pub(super) spec: LaunchSpec,
    pub(super) pid: Option<u32>,
    pub(super) started_ms: u64,
    pub(super) capture: CaptureLog,
    record: Mutex<ProcessRecord>,
    status_tx: watch::Sender<ProcessStatus>,
    kill: Notify,
}

impl ProcessRecord {
    fn accepts_termination(&self) -> bool {
        !self.exited && !self.status.is_terminal() && self.status.termination.is_none()
    }
}

impl ProcessEntry {
    pub(super) fn new(
        handle: ProcessHandle,
        spec: LaunchSpec,
        pid: Option<u32>,
        capture: CaptureLog,
    ) -> Self {
        let (status_tx, _) = watch::channel(ProcessStatus::starting());
        Self {
            handle,
            spec,
            pid,
            started_ms: capture.started_ms(),
            capture,
            record: Mutex::new(ProcessRecord {
                status: ProcessStatus::starting(),
                ended_ms: None,
                exited: false,
                orphaned_output: false,
                reaping: false,
                leases: Vec::new(),
            }),
            status_tx,
            kill: Notify::new(),
        }
    }

    pub(super) fn status(&self) -> ProcessStatus {
        self.record.lock().status
    }

    pub(super) fn subscribe(&self) -> watch::Receiver<ProcessStatus> {
        self.status_tx.subscribe()
    }

    /// Wait until terminal or until `timeout` elapses; returns the status either way
    pub(super) async fn wait(&self, timeout: Duration) -> ProcessStatus {
        let mut rx = self.subscribe();
        let status = match tokio::time::timeout(timeout, rx.wait_for(ProcessStatus::is_terminal))
            .await
        {
            Ok(Ok(status)) => *status,
            _ => self.status(),
        };
        status
    }

    fn advance(&self, next: ProcessState) -> bool {
        let status = {
            let mut record = self.record.lock();
            if !record.status.state.can_advance_to(next) {
                return false;
            }
            record.status.state = next;
            record.status
        };
        self.status_tx.send_replace(status);
        true
    }

    pub(super) fn mark_running(&self) {
        self.advance(ProcessState::Running);
    }

    /// Record why the process is being ended and wake the reaper.
    ///
    /// Returns false when the process already exited or another reason was
    /// recorded first; the first reason decides the final state.
    pub(super) fn request_termination(&self, reason: Termination) -> bool {
        {
            let mut record = self.record.lock();
            if !record.accepts_termination() {
                return false;
            }
            record.status.termination = Some(reason);
        }
        self.kill.notify_one();
        true
    }

    pub(super) fn attach_lease(&self, lease: DomainLease) {
        let mut record = self.record.lock();
        if !record.status.is_terminal() {
            record.leases.push(lease);
        }
    }

    /// Which bound the process has exceeded at `now_ms`, hard timeout first
    pub(super) fn overdue(&self, now_ms: u64) -> Option<Termination> {
        if !self.record.lock().accepts_termination() {
            return None;
        }
        let lifetime = Duration::from_millis(now_ms.saturating_sub(self.started_ms));
        let silence = Duration::from_millis(now_ms.saturating_sub(self.capture.last_output_ms()));
        if lifetime > self.spec.hard_timeout {
            Some(Termination::HardTimeout)
        } else if silence > self.spec.hang_timeout {
            Some(Termination::HangTimeout)
        } else {
            None
        }
    }

    /// Record a natural exit observed before the process is reaped
    fn mark_exited(&self) {
        let mut record = self.record.lock();
        if record.status.termination.is_none() {
            record.exited = true;
        }
    }

    fn mark_orphaned_output(&self) {
        self.record.lock().orphaned_output = true;
    }

    fn finish(&self, exit: Option<ExitStatus>, now_ms: u64) -> ProcessStatus {
        let (status, leases) = {
            let mut record = self.record.lock();
            let next = record
                .status
                .termination
                .map_or(ProcessState::Completed, Termination::final_state);
            if record.status.state.can_advance_to(next) {
                record.status.state = next;
                record.status.exit_code = exit.and_then(|s| s.code());
                record.status.signal = exit.and_then(|s| s.signal());
                record.ended_ms = Some(now_ms);
            }
            (record.status, std::mem::take(&mut record.leases))
        };
        drop(leases);
        self.status_tx.send_replace(status);
        status
    }

    pub(super) fn snapshot(&self, now_ms: u64) -> ProcessSnapshot {
        let (status, ended_ms, orphaned_output) = {
            let record = self.record.lock();
            (record.status, record.ended_ms, record.orphaned_output)
        };
        let end = ended_ms.unwrap_or(now_ms);
        ProcessSnapshot {
            name: self.spec.name.clone(),
            run_id: self.handle,
            pid: self.pid,
            command: self.spec.command_line(),
            status,
            started_ms: self.started_ms,
            ended_ms,
            last_output_ms: self.capture.last_output_ms(),
            elapsed_ms: end.saturating_sub(self.started_ms),
            stdout_lines: self.capture.count(StreamOrigin::Stdout),
            stderr_lines: self.capture.count(StreamOrigin::Stderr),
            orphaned_output,
        }
    }

    /// Best-effort SIGKILL of the whole process group, usable from `Drop`
    pub(super) fn kill_now(&self) {
        let record = self.record.lock();
        if !record.reaping {
            signal_group(self.pid, Signal::SIGKILL);
        }
    }

    /// Kill whatever is left in the group, then hand the leader over to be reaped
    fn kill_stragglers(&self) {
        let mut record = self.record.lock();
        signal_group(self.pid, Signal::SIGKILL);
        record.reaping = true;
    }
}

/// Copy one output stream into the capture log until EOF
pub(super) async fn pump<R>(mut reader: R, origin: StreamOrigin, capture: CaptureLog, clock: ClockHandle)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => capture.ingest(origin, &buf[..n], clock.now_millis()),
            Err(err) => {
                tracing::debug!(%origin, error = %err, "output read failed");
                break;
            }
        }
    }
    capture.flush_stream(origin, clock.now_millis());
}

/// Own the child until it exits, escalating SIGTERM to SIGKILL on request.
///
/// The leader stays unreaped until stragglers in its group have been killed,
/// so the group id cannot be recycled underneath the signal.
pub(super) async fn reap(
    entry: Arc<ProcessEntry>,
    mut child: Child,
    readers: Vec<JoinHandle<()>>,
    grace_period: Duration,
    clock: ClockHandle,
) {
    tokio::select! {
        () = leader_exited(entry.pid) => entry.mark_exited(),
        () = entry.kill.notified() => {
            signal_group(entry.pid, Signal::SIGTERM);
            if tokio::time::timeout(grace_period, leader_exited(entry.pid)).await.is_err() {
                tracing::warn!(
                    run_id = %entry.handle,
                    name = %entry.spec.name,
                    pid = ?entry.pid,
                    "process ignored SIGTERM; killing"
                );
                signal_group(entry.pid, Signal::SIGKILL);
                if let Err(err) = child.start_kill() {
                    tracing::debug!(error = %err, "start_kill failed");
                }
                leader_exited(entry.pid).await;
            }
        }
    };

    // The leader is a zombie here, so the group id still belongs to it
    entry.kill_stragglers();

    let exit = match child.wait().await {
        Ok(status) => Some(status),
        Err(err) => {
            tracing::warn!(run_id = %entry.handle, error = %err, "failed to wait for process");
            None
        }
    };

    let mut orphaned = false;
    for mut reader in readers {
        if tokio::time::timeout(READER_DRAIN_TIMEOUT, &mut reader).await.is_err() {
            reader.abort();
            orphaned = true;
        }
    }
    if orphaned {
        tracing::warn!(
            run_id = %entry.handle,
            name = %entry.spec.name,
            "output still held open by a process outside the group"
        );
        entry.mark_orphaned_output();
    }

    let now = clock.now_millis();
    entry.capture.finalize(now);
    let status = entry.finish(exit, now);
    tracing::info!(
        run_id = %entry.handle,
        name = %entry.spec.name,
        state = %status.state,
        exit_code = ?status.exit_code,
        "process ended"
    );
}

/// Resolves once the leader has exited, without reaping it
async fn leader_exited(pid: Option<u32>) {
    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    let waited = tokio::task::spawn_blocking(move || loop {
        match waitid(
            Id::Pid(Pid::from_raw(pid)),
            WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT,
        ) {
            Err(Errno::EINTR) => continue,
            other => return other,
        }
    })
    .await;
    match waited {
        Ok(Ok(_)) => {}
        Ok(Err(err)) => tracing::debug!(pid, error = %err, "waitid failed"),
        Err(err) => tracing::debug!(pid, error = %err, "waitid task failed"),
    }
}

fn signal_group(pid: Option<u32>, signal: Signal) {
    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    if let Err(err) = killpg(Pid::from_raw(pid), signal) {
        tracing::trace!(pid, ?signal, error = %err, "signal not delivered");
    }
}
