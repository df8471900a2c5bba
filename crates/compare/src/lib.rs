// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Record streams and deterministic comparison for benchgate.
//!
//! Captured output is parsed into a [`RecordStream`] (one JSON object per
//! line), then [`compare`]d against a reference stream under
//! [`ComparisonRules`]: float tolerance, ordering mode, required and ignored
//! fields. The result keeps a bounded list of mismatches for triage.

mod compare;
mod diff;
mod record;
mod result;
mod rules;
mod stream;
mod value;

pub use compare::{compare, CompareError, StreamSide};
pub use diff::render_stream_diff;
pub use record::Record;
pub use result::{ComparisonResult, CountMismatch, FieldMismatch, MismatchKind, RecordKey};
pub use rules::{ComparisonRules, OrderingMode, DEFAULT_MAX_DIFFS, DEFAULT_TOLERANCE};
pub use stream::{RecordStream, StreamError, StreamOptions};
pub use value::Value;
