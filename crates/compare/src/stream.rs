// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Record stream construction from captured logs and reference files.

use crate::record::Record;
use benchgate_capture::{CapturedLine, StreamOrigin};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors loading a record stream from disk
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Failed to read record file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Which fields carry record metadata
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamOptions {
    /// Field holding the explicit sequence number
    pub sequence_field: String,

    /// Field holding the topic / category label
    pub topic_field: String,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            sequence_field: "seq".to_string(),
            topic_field: "topic".to_string(),
        }
    }
}

/// An ordered, frozen sequence of records.
///
/// There are no mutating methods; once built, a stream can be shared freely
/// between the capture side and the comparison engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RecordStream {
    records: Vec<Record>,
    malformed_line_count: usize,
    candidate_line_count: usize,
}

impl RecordStream {
    /// Parse stdout lines of a captured log; stderr is diagnostics only
    pub fn parse(log: &[CapturedLine], options: &StreamOptions) -> Self {
        Self::parse_lines(
            log.iter()
                .filter(|l| l.origin == StreamOrigin::Stdout)
                .map(|l| l.text.as_str()),
            options,
        )
    }

    /// Parse line-delimited JSON objects.
    ///
    /// Blank lines are ignored. Any other line that is not a JSON object is
    /// skipped and counted as malformed.
    pub fn parse_lines<'a, I>(lines: I, options: &StreamOptions) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut records = Vec::new();
        let mut malformed_line_count = 0;
        let mut candidate_line_count = 0;

        for (line_no, line) in lines.into_iter().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            candidate_line_count += 1;

            match serde_json::from_str::<serde_json::Value>(trimmed) {
                Ok(serde_json::Value::Object(object)) => {
                    records.push(Record::from_json(&object, records.len(), options));
                }
                Ok(_) => {
                    tracing::debug!(line_no, "skipping non-object JSON line");
                    malformed_line_count += 1;
                }
                Err(err) => {
                    tracing::debug!(line_no, error = %err, "skipping unparseable line");
                    malformed_line_count += 1;
                }
            }
        }

        Self {
            records,
            malformed_line_count,
            candidate_line_count,
        }
    }

    /// Parse a JSONL file, typically a reference output
    pub fn load(path: &Path, options: &StreamOptions) -> Result<Self, StreamError> {
        let content = std::fs::read_to_string(path).map_err(|source| StreamError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::parse_lines(content.lines(), options))
    }

    /// Build a stream directly from records, renumbering their indices
    pub fn from_records(records: Vec<Record>) -> Self {
        let records: Vec<Record> = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| Record { index, ..record })
            .collect();
        let candidate_line_count = records.len();
        Self {
            records,
            malformed_line_count: 0,
            candidate_line_count,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Lines that looked like content but did not parse as a JSON object
    pub fn malformed_line_count(&self) -> usize {
        self.malformed_line_count
    }

    /// Non-blank lines considered for parsing
    pub fn candidate_line_count(&self) -> usize {
        self.candidate_line_count
    }

    /// Fraction of non-blank lines that were malformed (0.0 for no lines)
    pub fn malformed_ratio(&self) -> f64 {
        if self.candidate_line_count == 0 {
            0.0
        } else {
            self.malformed_line_count as f64 / self.candidate_line_count as f64
        }
    }

    /// Records carrying the given topic label
    pub fn by_topic<'a>(&'a self, topic: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        self.records
            .iter()
            .filter(move |r| r.topic.as_deref() == Some(topic))
    }
}

impl<'a> IntoIterator for &'a RecordStream {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
