// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Unified diff of two record streams.

use crate::stream::RecordStream;
use similar::TextDiff;

const CONTEXT_RADIUS: usize = 3;

/// Render a unified diff from `expected` to `actual`, one canonical JSON
/// record per line. Returns an empty string when the streams render the same.
pub fn render_stream_diff(actual: &RecordStream, expected: &RecordStream) -> String {
    let expected_text = render(expected);
    let actual_text = render(actual);
    if expected_text == actual_text {
        return String::new();
    }

    TextDiff::from_lines(&expected_text, &actual_text)
        .unified_diff()
        .context_radius(CONTEXT_RADIUS)
        .header("expected", "actual")
        .to_string()
}

fn render(stream: &RecordStream) -> String {
    let mut out = String::new();
    for record in stream {
        out.push_str(&record.to_canonical_json());
        out.push('\n');
    }
    out
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
