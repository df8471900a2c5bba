// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The comparison engine.
//!
//! Records are paired according to the ordering mode, then every compared
//! field of the expected record is checked against the actual record. Count
//! mismatches do not stop field comparison: as much detail as possible is
//! gathered in a single pass.

use crate::record::Record;
use crate::result::{ComparisonResult, CountMismatch, FieldMismatch, MismatchKind, RecordKey};
use crate::rules::{ComparisonRules, OrderingMode};
use crate::stream::RecordStream;
use crate::value::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Which side of a comparison an input error refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamSide {
    Actual,
    Expected,
}

impl std::fmt::Display for StreamSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamSide::Actual => write!(f, "actual"),
            StreamSide::Expected => write!(f, "expected"),
        }
    }
}

/// Malformed comparison input
#[derive(Debug, Error, PartialEq)]
pub enum CompareError {
    #[error("duplicate sequence number {seq} in {side} stream (records #{first} and #{second})")]
    DuplicateSequence {
        side: StreamSide,
        seq: i64,
        first: usize,
        second: usize,
    },

    #[error("{side} record #{index} has no integer '{field}' field")]
    MissingSequence {
        side: StreamSide,
        index: usize,
        field: String,
    },
}

/// Compare `actual` against `expected` under `rules`.
///
/// Returns an error only for malformed input (duplicate or missing sequence
/// numbers in by-sequence mode); every other problem is reported in the
/// result.
pub fn compare(
    actual: &RecordStream,
    expected: &RecordStream,
    rules: &ComparisonRules,
) -> Result<ComparisonResult, CompareError> {
    let mut collector = Collector::new(rules.max_diffs);

    let pairing = match rules.ordering {
        OrderingMode::Strict => pair_strict(actual, expected, rules, &mut collector),
        OrderingMode::BySequence => pair_by_sequence(actual, expected, rules, &mut collector)?,
        OrderingMode::Unordered => pair_unordered(actual, expected, rules),
    };

    let count_mismatch = if pairing.missing.is_empty() && pairing.extra.is_empty() {
        None
    } else {
        Some(CountMismatch {
            expected_count: expected.len(),
            actual_count: actual.len(),
            missing: pairing.missing,
            extra: pairing.extra,
        })
    };

    let error = malformed_output_error(actual, expected, rules);
    let passed = error.is_none() && count_mismatch.is_none() && collector.total == 0;

    Ok(ComparisonResult {
        passed,
        actual_count: actual.len(),
        expected_count: expected.len(),
        matched_count: pairing.matched,
        count_mismatch,
        mismatches: collector.retained,
        total_mismatches: collector.total,
        malformed_lines: actual.malformed_line_count(),
        error,
    })
}

/// Keeps the first N mismatches and counts the rest
struct Collector {
    limit: usize,
    retained: Vec<FieldMismatch>,
    total: usize,
}

impl Collector {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            retained: Vec::new(),
            total: 0,
        }
    }

    /// Returns true when the pair matched
    fn record_pair(
        &mut self,
        actual: &Record,
        expected: &Record,
        key: RecordKey,
        rules: &ComparisonRules,
    ) -> bool {
        let found = field_mismatches(actual, expected, key, rules);
        let matched = found.is_empty();
        self.total += found.len();
        let room = self.limit.saturating_sub(self.retained.len());
        self.retained.extend(found.into_iter().take(room));
        matched
    }
}

#[derive(Default)]
struct Pairing {
    matched: usize,
    missing: Vec<RecordKey>,
    extra: Vec<RecordKey>,
}

fn key_for(record: &Record) -> RecordKey {
    match record.seq {
        Some(seq) => RecordKey::Seq(seq),
        None => RecordKey::Index(record.index),
    }
}

fn pair_strict(
    actual: &RecordStream,
    expected: &RecordStream,
    rules: &ComparisonRules,
    collector: &mut Collector,
) -> Pairing {
    let mut pairing = Pairing::default();

    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        if collector.record_pair(a, e, RecordKey::Index(i), rules) {
            pairing.matched += 1;
        }
    }

    pairing.missing = expected.records()[actual.len().min(expected.len())..]
        .iter()
        .map(key_for)
        .collect();
    if !rules.allow_superset {
        pairing.extra = actual.records()[expected.len().min(actual.len())..]
            .iter()
            .map(key_for)
            .collect();
    }
    pairing
}

fn index_by_sequence<'a>(
    stream: &'a RecordStream,
    side: StreamSide,
    rules: &ComparisonRules,
) -> Result<BTreeMap<i64, &'a Record>, CompareError> {
    let mut by_seq: BTreeMap<i64, &Record> = BTreeMap::new();
    for record in stream {
        let seq = record.seq.ok_or_else(|| CompareError::MissingSequence {
            side,
            index: record.index,
            field: rules.stream.sequence_field.clone(),
        })?;
        if let Some(previous) = by_seq.insert(seq, record) {
            return Err(CompareError::DuplicateSequence {
                side,
                seq,
                first: previous.index,
                second: record.index,
            });
        }
    }
    Ok(by_seq)
}

fn pair_by_sequence(
    actual: &RecordStream,
    expected: &RecordStream,
    rules: &ComparisonRules,
    collector: &mut Collector,
) -> Result<Pairing, CompareError> {
    let expected_by_seq = index_by_sequence(expected, StreamSide::Expected, rules)?;
    let actual_by_seq = index_by_sequence(actual, StreamSide::Actual, rules)?;
    let mut pairing = Pairing::default();

    for (seq, e) in &expected_by_seq {
        match actual_by_seq.get(seq) {
            Some(a) => {
                if collector.record_pair(a, e, RecordKey::Seq(*seq), rules) {
                    pairing.matched += 1;
                }
            }
            None => pairing.missing.push(RecordKey::Seq(*seq)),
        }
    }

    if !rules.allow_superset {
        pairing.extra = actual_by_seq
            .keys()
            .filter(|seq| !expected_by_seq.contains_key(seq))
            .map(|seq| RecordKey::Seq(*seq))
            .collect();
    }
    Ok(pairing)
}

fn pair_unordered(
    actual: &RecordStream,
    expected: &RecordStream,
    rules: &ComparisonRules,
) -> Pairing {
    let mut used = vec![false; actual.len()];
    let mut pairing = Pairing::default();

    for e in expected {
        let found = actual.iter().position(|a| {
            !used[a.index] && field_mismatches(a, e, RecordKey::Index(e.index), rules).is_empty()
        });
        match found {
            Some(j) => {
                used[j] = true;
                pairing.matched += 1;
            }
            None => pairing.missing.push(key_for(e)),
        }
    }

    if !rules.allow_superset {
        pairing.extra = actual
            .iter()
            .filter(|a| !used[a.index])
            .map(key_for)
            .collect();
    }
    pairing
}

fn field_mismatches(
    actual: &Record,
    expected: &Record,
    key: RecordKey,
    rules: &ComparisonRules,
) -> Vec<FieldMismatch> {
    let mut found = Vec::new();
    for (field, expected_value) in &expected.fields {
        if !rules.is_compared(field) {
            continue;
        }
        let actual_value = actual.get(field);
        let kind = match actual_value {
            None => Some(MismatchKind::MissingField),
            Some(actual_value) => compare_values(actual_value, expected_value, rules),
        };
        if let Some(kind) = kind {
            found.push(FieldMismatch {
                key,
                field: field.clone(),
                expected: Some(expected_value.clone()),
                actual: actual_value.cloned(),
                kind,
            });
        }
    }
    found
}

fn compare_values(actual: &Value, expected: &Value, rules: &ComparisonRules) -> Option<MismatchKind> {
    let tolerance_check = |a: f64, e: f64| {
        let delta = (a - e).abs();
        if delta <= rules.tolerance {
            None
        } else {
            Some(MismatchKind::OutOfTolerance {
                delta,
                tolerance: rules.tolerance,
            })
        }
    };

    match (actual, expected) {
        (Value::Float(a), Value::Float(e)) => tolerance_check(*a, *e),
        _ if rules.lenient_numbers && (actual.is_float() || expected.is_float()) => {
            match (actual.as_number(), expected.as_number()) {
                (Some(a), Some(e)) => tolerance_check(a, e),
                _ => Some(type_mismatch(actual, expected)),
            }
        }
        _ if std::mem::discriminant(actual) == std::mem::discriminant(expected) => {
            if actual == expected {
                None
            } else {
                Some(MismatchKind::ValueMismatch)
            }
        }
        _ => Some(type_mismatch(actual, expected)),
    }
}

fn type_mismatch(actual: &Value, expected: &Value) -> MismatchKind {
    MismatchKind::TypeMismatch {
        expected_type: expected.type_name(),
        actual_type: actual.type_name(),
    }
}

fn malformed_output_error(
    actual: &RecordStream,
    expected: &RecordStream,
    rules: &ComparisonRules,
) -> Option<String> {
    let malformed = actual.malformed_line_count();
    if malformed == 0 {
        return None;
    }
    let starved = actual.is_empty() && !expected.is_empty();
    if starved || actual.malformed_ratio() > rules.max_malformed_ratio {
        Some(format!(
            "output stream did not produce parseable records ({} of {} lines malformed)",
            malformed,
            actual.candidate_line_count()
        ))
    } else {
        None
    }
}

#[cfg(test)]
#[path = "compare_tests.rs"]
mod tests;
