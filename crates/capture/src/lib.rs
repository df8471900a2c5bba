// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Output capture for supervised benchmark processes.
//!
//! A [`CaptureLog`] is bound to one child process. Reader tasks feed it raw
//! chunks from the child's stdout and stderr; the log assembles them into
//! timestamped [`CapturedLine`]s and tracks when output was last observed, which
//! the supervisor uses for hang detection.

mod duration_ms;
mod line;
mod log;

pub use line::{CapturedLine, StreamOrigin};
pub use log::CaptureLog;
