// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Capture log implementation.

use crate::line::{CapturedLine, StreamOrigin};
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Bytes received on one stream that have not yet seen a newline
#[derive(Default)]
struct PendingLines {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    finalized: bool,
}

impl PendingLines {
    fn buffer(&mut self, origin: StreamOrigin) -> &mut Vec<u8> {
        match origin {
            StreamOrigin::Stdout => &mut self.stdout,
            StreamOrigin::Stderr => &mut self.stderr,
        }
    }
}

/// Append-only log of one process's output.
///
/// Cloning yields another handle to the same log, so reader tasks and the
/// supervisor can share it. Writers hold the internal lock only long enough
/// to push a line; readers receive snapshots.
pub struct CaptureLog {
    started_ms: u64,
    lines: Arc<Mutex<Vec<CapturedLine>>>,
    pending: Arc<Mutex<PendingLines>>,
    last_output_ms: Arc<AtomicU64>,
    file_writer: Option<Arc<Mutex<BufWriter<File>>>>,
}

impl CaptureLog {
    /// Create a new in-memory capture log opened at `now_ms`
    pub fn new(now_ms: u64) -> Self {
        Self {
            started_ms: now_ms,
            lines: Arc::new(Mutex::new(Vec::new())),
            pending: Arc::new(Mutex::new(PendingLines::default())),
            last_output_ms: Arc::new(AtomicU64::new(now_ms)),
            file_writer: None,
        }
    }

    /// Create a capture log that also mirrors every line to a JSONL file
    pub fn with_file(path: &Path, now_ms: u64) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            file_writer: Some(Arc::new(Mutex::new(BufWriter::new(file)))),
            ..Self::new(now_ms)
        })
    }

    /// Feed a raw chunk read from `origin`.
    ///
    /// The output timestamp advances on every non-empty chunk, even when the
    /// chunk does not complete a line. Chunks arriving after [`finalize`]
    /// are dropped.
    ///
    /// [`finalize`]: CaptureLog::finalize
    pub fn ingest(&self, origin: StreamOrigin, chunk: &[u8], now_ms: u64) {
        if chunk.is_empty() {
            return;
        }
        self.last_output_ms.fetch_max(now_ms, Ordering::SeqCst);

        let mut pending = self.pending.lock();
        if pending.finalized {
            return;
        }
        let buffer = pending.buffer(origin);
        buffer.extend_from_slice(chunk);

        let mut complete = Vec::new();
        while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
            let rest = buffer.split_off(pos + 1);
            let mut line = std::mem::replace(buffer, rest);
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            complete.push(line);
        }

        for line in complete {
            self.push_line(origin, &line, false, now_ms);
        }
    }

    /// Flush a partial line left on one stream, e.g. when that stream hits EOF
    pub fn flush_stream(&self, origin: StreamOrigin, now_ms: u64) {
        let mut pending = self.pending.lock();
        if pending.finalized {
            return;
        }
        let rest = std::mem::take(pending.buffer(origin));
        if !rest.is_empty() {
            self.push_line(origin, &rest, true, now_ms);
        }
    }

    /// Flush all partial lines and stop accepting input. Idempotent.
    pub fn finalize(&self, now_ms: u64) {
        let mut pending = self.pending.lock();
        if pending.finalized {
            return;
        }
        for origin in [StreamOrigin::Stdout, StreamOrigin::Stderr] {
            let rest = std::mem::take(pending.buffer(origin));
            if !rest.is_empty() {
                self.push_line(origin, &rest, true, now_ms);
            }
        }
        pending.finalized = true;

        if let Some(ref writer) = self.file_writer {
            let _ = writer.lock().flush();
        }
    }

    // Callers hold the pending lock, which keeps appends ordered per log.
    fn push_line(&self, origin: StreamOrigin, raw: &[u8], partial: bool, now_ms: u64) {
        let mut lines = self.lines.lock();
        let floor = lines.last().map_or(self.started_ms, |l| l.timestamp_ms);
        let timestamp_ms = now_ms.max(floor);
        let line = CapturedLine {
            seq: lines.len() as u64,
            timestamp_ms,
            elapsed: Duration::from_millis(timestamp_ms.saturating_sub(self.started_ms)),
            origin,
            text: String::from_utf8_lossy(raw).into_owned(),
            partial,
        };

        if let Some(ref writer) = self.file_writer {
            let mut w = writer.lock();
            if let Ok(json) = serde_json::to_string(&line) {
                let _ = writeln!(w, "{}", json);
            }
        }

        lines.push(line);
    }

    /// Clock time at which the log was opened
    pub fn started_ms(&self) -> u64 {
        self.started_ms
    }

    /// Clock time of the most recent chunk on either stream
    pub fn last_output_ms(&self) -> u64 {
        self.last_output_ms.load(Ordering::SeqCst)
    }

    /// Whether the log has been finalized
    pub fn is_finalized(&self) -> bool {
        self.pending.lock().finalized
    }

    /// Snapshot of every captured line
    pub fn lines(&self) -> Vec<CapturedLine> {
        self.lines.lock().clone()
    }

    /// Lines with `seq >= from`, for incremental readers
    pub fn lines_from(&self, from: u64) -> Vec<CapturedLine> {
        self.lines
            .lock()
            .iter()
            .skip(from as usize)
            .cloned()
            .collect()
    }

    /// The last N lines
    pub fn last(&self, n: usize) -> Vec<CapturedLine> {
        let all = self.lines.lock();
        all.iter().rev().take(n).rev().cloned().collect()
    }

    /// Text of every line from one stream
    pub fn text(&self, origin: StreamOrigin) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|l| l.origin == origin)
            .map(|l| l.text.clone())
            .collect()
    }

    /// Text of every stdout line
    pub fn stdout_lines(&self) -> Vec<String> {
        self.text(StreamOrigin::Stdout)
    }

    /// Text of every stderr line
    pub fn stderr_lines(&self) -> Vec<String> {
        self.text(StreamOrigin::Stderr)
    }

    /// Count lines from one stream
    pub fn count(&self, origin: StreamOrigin) -> usize {
        self.lines
            .lock()
            .iter()
            .filter(|l| l.origin == origin)
            .count()
    }

    /// Total number of captured lines
    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    /// Check if nothing has been captured
    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl Clone for CaptureLog {
    fn clone(&self) -> Self {
        Self {
            started_ms: self.started_ms,
            lines: Arc::clone(&self.lines),
            pending: Arc::clone(&self.pending),
            last_output_ms: Arc::clone(&self.last_output_ms),
            file_writer: self.file_writer.as_ref().map(Arc::clone),
        }
    }
}

impl std::fmt::Debug for CaptureLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureLog")
            .field("started_ms", &self.started_ms)
            .field("lines", &self.len())
            .field("last_output_ms", &self.last_output_ms())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
