// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The standard benchmark checkpoints built from a [`TaskConfig`].
//!
//! | Checkpoint | Blocking | Passes when |
//! |------------|----------|-------------|
//! | `build` | yes | the build command exits 0 (or no build is configured) |
//! | `startup` | yes | a domain is leased and reference/candidate start without failing |
//! | `communication` | no | the actual stream holds at least `min_records` records without a timeout |
//! | `data_integrity` | no | the actual stream matches the expected output under the task rules |
//! | `resource_cleanup` | no | every process is reaped, none left output held open past its group, and the domain is released |

use super::{Checkpoint, CheckpointError, Pipeline, PipelineError};
use crate::config::{ActualSource, Placeholders, ProcessConfig, Role, TaskConfig};
use crate::supervisor::ports::{DomainLease, DomainLeases};
use crate::supervisor::{
    ProcessHandle, ProcessState, ProcessStatus, Supervisor, SupervisorConfig,
    Termination,
};
use crate::time::Clock;
use benchgate_compare::{compare, render_stream_diff, RecordStream};
use parking_lot::Mutex;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const BUILD: &str = "build";
pub const STARTUP: &str = "startup";
pub const COMMUNICATION: &str = "communication";
pub const DATA_INTEGRITY: &str = "data_integrity";
pub const RESOURCE_CLEANUP: &str = "resource_cleanup";

/// Lines of output attached to launch and exit failures
const TAIL_LINES: usize = 20;

/// State shared by the standard checkpoints of one run
pub struct RunContext {
    pub task: TaskConfig,
    pub supervisor: Supervisor,
    leases: DomainLeases,
    artifacts: Option<PathBuf>,
    grace_period: Duration,
    state: Mutex<RunState>,
}

#[derive(Default)]
struct RunState {
    lease: Option<DomainLease>,
    reference: Option<ProcessHandle>,
    candidate: Option<ProcessHandle>,
    actual: Option<Arc<RecordStream>>,
}

impl RunContext {
    pub fn new(task: TaskConfig, config: SupervisorConfig, leases: DomainLeases) -> Self {
        let grace_period = config.grace_period;
        Self {
            task,
            supervisor: Supervisor::new(config),
            leases,
            artifacts: None,
            grace_period,
            state: Mutex::new(RunState::default()),
        }
    }

    /// Mirror each process's captured output to `<dir>/<role>.log.jsonl`
    pub fn with_artifacts(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts = Some(dir.into());
        self
    }

    pub fn domain_id(&self) -> Option<u32> {
        self.state.lock().lease.as_ref().map(DomainLease::domain_id)
    }

    /// The actual record stream once communication has collected it
    pub fn actual(&self) -> Option<Arc<RecordStream>> {
        self.state.lock().actual.clone()
    }

    fn placeholders(&self) -> Placeholders {
        Placeholders {
            domain_id: self.domain_id(),
            workspace: self.task.workspace.clone(),
        }
    }

    fn launch(&self, process: &ProcessConfig, name: &str) -> Result<ProcessHandle, CheckpointError> {
        let mut spec = process.to_launch_spec(name, &self.placeholders())?;
        if let Some(ref dir) = self.artifacts {
            spec = spec.capture_to(dir.join(format!("{}.log.jsonl", name)));
        }
        Ok(self.supervisor.launch(spec)?)
    }

    /// Wait long enough for the sweep to enforce the hard timeout
    async fn wait_bounded(
        &self,
        handle: ProcessHandle,
        process: &ProcessConfig,
    ) -> Result<ProcessStatus, CheckpointError> {
        let budget = Duration::from_millis(process.hard_timeout_ms)
            + self.grace_period
            + Duration::from_secs(2);
        let status = self.supervisor.wait(handle, budget).await?;
        if status.is_terminal() {
            return Ok(status);
        }
        self.stop(handle).await
    }

    /// Terminate a process if still running and wait for it to be reaped
    async fn stop(&self, handle: ProcessHandle) -> Result<ProcessStatus, CheckpointError> {
        self.supervisor.terminate(handle)?;
        let status = self
            .supervisor
            .wait(handle, self.grace_period + Duration::from_secs(1))
            .await?;
        Ok(status)
    }

    fn tail(&self, handle: ProcessHandle) -> serde_json::Value {
        let lines: Vec<String> = self
            .supervisor
            .capture(handle)
            .map(|capture| {
                capture
                    .last(TAIL_LINES)
                    .into_iter()
                    .map(|l| format!("[{}] {}", l.origin, l.text))
                    .collect()
            })
            .unwrap_or_default();
        json!({ "output_tail": lines })
    }

    fn handle_for(&self, role: Role) -> Result<ProcessHandle, CheckpointError> {
        let state = self.state.lock();
        let handle = match role {
            Role::Reference => state.reference,
            Role::Candidate => state.candidate,
        };
        handle.ok_or_else(|| CheckpointError::internal(format!("{} was never launched", role)))
    }

    fn process_for(&self, role: Role) -> Result<&ProcessConfig, CheckpointError> {
        match role {
            Role::Reference => self
                .task
                .reference
                .as_ref()
                .ok_or_else(|| CheckpointError::internal("no reference process configured")),
            Role::Candidate => Ok(&self.task.candidate),
        }
    }

    fn collect_actual(&self) -> Result<RecordStream, CheckpointError> {
        let options = &self.task.rules.stream;
        match self.task.actual_source() {
            ActualSource::Stdout { role } => {
                let lines = self.supervisor.output(self.handle_for(role)?)?;
                Ok(RecordStream::parse(&lines, options))
            }
            ActualSource::File { path } => RecordStream::load(&self.task.resolve(&path), options)
                .map_err(|e| CheckpointError::failed(e.to_string())),
        }
    }
}

/// Build the five standard checkpoints with the task's weights
pub fn standard_pipeline(task: &TaskConfig) -> Result<Pipeline<Arc<RunContext>>, PipelineError> {
    let weights = &task.weights;
    let pipeline = Pipeline::new(vec![
        Checkpoint::new(BUILD, weights.build, verify_build).blocking(),
        Checkpoint::new(STARTUP, weights.startup, verify_startup).blocking(),
        Checkpoint::new(COMMUNICATION, weights.communication, verify_communication),
        Checkpoint::new(DATA_INTEGRITY, weights.data_integrity, verify_data_integrity),
        Checkpoint::new(RESOURCE_CLEANUP, weights.resource_cleanup, verify_resource_cleanup),
    ])?;
    Ok(pipeline.with_default_timeout(task.checkpoint_timeout()))
}

type Verified = Result<Option<serde_json::Value>, CheckpointError>;

async fn verify_build(ctx: Arc<RunContext>) -> Verified {
    let Some(ref build) = ctx.task.build else {
        return Ok(Some(json!({ "note": "no build step configured" })));
    };
    let handle = ctx.launch(build, BUILD)?;
    let status = ctx.wait_bounded(handle, build).await?;
    if !status.success() {
        return Err(CheckpointError::failed_with(
            format!("build {}", status.describe()),
            ctx.tail(handle),
        ));
    }
    Ok(None)
}

async fn verify_startup(ctx: Arc<RunContext>) -> Verified {
    let lease = match ctx.task.domain_id {
        Some(domain_id) => ctx.leases.claim(domain_id),
        None => ctx.leases.acquire(),
    }
    .map_err(|e| CheckpointError::failed(format!("domain allocation failed: {}", e)))?;
    let domain_id = lease.domain_id();
    ctx.state.lock().lease = Some(lease);

    if let Some(ref reference) = ctx.task.reference {
        let handle = ctx.launch(reference, "reference")?;
        ctx.state.lock().reference = Some(handle);
        ctx.supervisor.clock().sleep(ctx.task.startup_delay()).await;

        let status = ctx.supervisor.poll(handle)?;
        if status.is_terminal() && !status.success() {
            return Err(CheckpointError::failed_with(
                format!("reference {} during startup", status.describe()),
                ctx.tail(handle),
            ));
        }
    }

    let candidate = ctx.launch(&ctx.task.candidate, "candidate")?;
    ctx.state.lock().candidate = Some(candidate);
    let status = ctx
        .supervisor
        .wait(candidate, ctx.task.startup_delay())
        .await?;
    if status.is_terminal() && !status.success() {
        return Err(CheckpointError::failed_with(
            format!("candidate {} during startup", status.describe()),
            ctx.tail(candidate),
        ));
    }

    let snapshot = ctx.supervisor.snapshot(candidate)?;
    Ok(Some(json!({
        "domain_id": domain_id,
        "candidate_pid": snapshot.pid,
    })))
}

fn timed_out(status: &ProcessStatus) -> bool {
    matches!(
        status.termination,
        Some(Termination::HangTimeout | Termination::HardTimeout)
    )
}

async fn verify_communication(ctx: Arc<RunContext>) -> Verified {
    // The process producing the actual stream runs to completion; the others
    // are stopped once it has finished.
    let sink = match ctx.task.actual_source() {
        ActualSource::Stdout { role } => role,
        ActualSource::File { .. } => Role::Candidate,
    };
    let sink_handle = ctx.handle_for(sink)?;
    let sink_status = ctx.wait_bounded(sink_handle, ctx.process_for(sink)?).await?;

    let mut candidate_status = sink_status;
    for role in [Role::Reference, Role::Candidate] {
        if role == sink {
            continue;
        }
        let Ok(handle) = ctx.handle_for(role) else {
            continue;
        };
        let status = ctx.stop(handle).await?;
        if role == Role::Candidate {
            candidate_status = status;
        }
    }

    let actual = Arc::new(ctx.collect_actual()?);
    ctx.state.lock().actual = Some(Arc::clone(&actual));

    let details = json!({
        "records": actual.len(),
        "malformed_lines": actual.malformed_line_count(),
        "source": sink,
        "source_status": sink_status.describe(),
    });

    if timed_out(&sink_status) {
        return Err(CheckpointError::failed_with(
            format!("{} {}", sink, sink_status.describe()),
            details,
        ));
    }
    if timed_out(&candidate_status) {
        return Err(CheckpointError::failed_with(
            format!("candidate {}", candidate_status.describe()),
            details,
        ));
    }
    if candidate_status.state == ProcessState::Completed && !candidate_status.success() {
        return Err(CheckpointError::failed_with(
            format!("candidate {}", candidate_status.describe()),
            details,
        ));
    }
    if actual.len() < ctx.task.min_records {
        return Err(CheckpointError::failed_with(
            format!(
                "received {} records, expected at least {}",
                actual.len(),
                ctx.task.min_records
            ),
            details,
        ));
    }
    Ok(Some(details))
}

async fn verify_data_integrity(ctx: Arc<RunContext>) -> Verified {
    let expected = RecordStream::load(&ctx.task.expected_output_path(), &ctx.task.rules.stream)
        .map_err(|e| CheckpointError::failed(format!("cannot load expected output: {}", e)))?;
    let actual = match ctx.actual() {
        Some(actual) => actual,
        None => Arc::new(ctx.collect_actual()?),
    };

    let result = compare(&actual, &expected, &ctx.task.rules)
        .map_err(|e| CheckpointError::failed(e.to_string()))?;
    if result.passed {
        return Ok(Some(json!({
            "matched": result.matched_count,
            "expected": result.expected_count,
        })));
    }
    Err(CheckpointError::failed_with(
        result.summary(),
        json!({
            "comparison": result.to_json(),
            "diff": render_stream_diff(&actual, &expected),
        }),
    ))
}

async fn verify_resource_cleanup(ctx: Arc<RunContext>) -> Verified {
    let cleaned = ctx.supervisor.shutdown().await;
    let snapshots = ctx.supervisor.list();

    let lease = ctx.state.lock().lease.take();
    let domain_id = lease.as_ref().map(DomainLease::domain_id);
    drop(lease);

    let unfinished: Vec<&str> = snapshots
        .iter()
        .filter(|s| !s.status.is_terminal())
        .map(|s| s.name.as_str())
        .collect();

    let orphaned: Vec<&str> = snapshots
        .iter()
        .filter(|s| s.orphaned_output)
        .map(|s| s.name.as_str())
        .collect();

    let details = json!({
        "terminated_at_cleanup": cleaned,
        "released_domain": domain_id,
    });
    if !unfinished.is_empty() {
        return Err(CheckpointError::failed_with(
            format!("processes not reaped: {}", unfinished.join(", ")),
            details,
        ));
    }
    if !orphaned.is_empty() {
        return Err(CheckpointError::failed_with(
            format!(
                "processes escaped their group and kept output open: {}",
                orphaned.join(", ")
            ),
            details,
        ));
    }
    if let Some(domain_id) = domain_id.filter(|id| ctx.leases.is_leased(*id)) {
        return Err(CheckpointError::failed_with(
            format!("domain {} is still leased", domain_id),
            details,
        ));
    }
    Ok(Some(details))
}

#[cfg(test)]
#[path = "standard_tests.rs"]
mod tests;
