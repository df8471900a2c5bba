// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Comparison result types.

use crate::value::Value;
use serde::Serialize;

/// Identifies a record by position or by sequence number
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKey {
    Index(usize),
    Seq(i64),
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKey::Index(i) => write!(f, "record #{}", i),
            RecordKey::Seq(s) => write!(f, "seq {}", s),
        }
    }
}

/// Why a field did not match
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MismatchKind {
    /// Required field absent from the actual record
    MissingField,
    /// Same type, different value
    ValueMismatch,
    /// Float difference larger than the tolerance
    OutOfTolerance { delta: f64, tolerance: f64 },
    /// Values of different types
    TypeMismatch {
        expected_type: &'static str,
        actual_type: &'static str,
    },
}

/// A single field mismatch between a paired actual and expected record
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldMismatch {
    pub key: RecordKey,
    pub field: String,
    pub expected: Option<Value>,
    pub actual: Option<Value>,
    #[serde(flatten)]
    pub kind: MismatchKind,
}

impl std::fmt::Display for FieldMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let show = |v: &Option<Value>| {
            v.as_ref()
                .map_or_else(|| "<missing>".to_string(), Value::to_string)
        };
        match &self.kind {
            MismatchKind::MissingField => write!(
                f,
                "{}: field '{}' missing (expected {})",
                self.key,
                self.field,
                show(&self.expected)
            ),
            MismatchKind::ValueMismatch => write!(
                f,
                "{}: field '{}' expected {}, got {}",
                self.key,
                self.field,
                show(&self.expected),
                show(&self.actual)
            ),
            MismatchKind::OutOfTolerance { delta, tolerance } => write!(
                f,
                "{}: field '{}' expected {}, got {} (|delta| {:e} > {:e})",
                self.key,
                self.field,
                show(&self.expected),
                show(&self.actual),
                delta,
                tolerance
            ),
            MismatchKind::TypeMismatch {
                expected_type,
                actual_type,
            } => write!(
                f,
                "{}: field '{}' expected {} {}, got {} {}",
                self.key,
                self.field,
                expected_type,
                show(&self.expected),
                actual_type,
                show(&self.actual)
            ),
        }
    }
}

/// Records present on one side only
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CountMismatch {
    pub expected_count: usize,
    pub actual_count: usize,
    /// Expected records with no actual counterpart
    pub missing: Vec<RecordKey>,
    /// Actual records with no expected counterpart
    pub extra: Vec<RecordKey>,
}

impl std::fmt::Display for CountMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "record count mismatch: {} actual vs {} expected",
            self.actual_count, self.expected_count
        )?;
        if !self.missing.is_empty() {
            write!(f, "; missing {}", join_keys(&self.missing))?;
        }
        if !self.extra.is_empty() {
            write!(f, "; extra {}", join_keys(&self.extra))?;
        }
        Ok(())
    }
}

fn join_keys(keys: &[RecordKey]) -> String {
    const SHOWN: usize = 10;
    let mut out: Vec<String> = keys.iter().take(SHOWN).map(|k| k.to_string()).collect();
    if keys.len() > SHOWN {
        out.push(format!("... ({} more)", keys.len() - SHOWN));
    }
    out.join(", ")
}

/// Result of comparing an actual stream against an expected stream
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub passed: bool,
    pub actual_count: usize,
    pub expected_count: usize,
    /// Paired records with no field mismatches
    pub matched_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count_mismatch: Option<CountMismatch>,
    /// First `max_diffs` field mismatches
    pub mismatches: Vec<FieldMismatch>,
    /// All field mismatches found, including those not retained
    pub total_mismatches: usize,
    /// Malformed lines in the actual stream
    pub malformed_lines: usize,
    /// Stream-level failure, e.g. unparseable output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComparisonResult {
    /// One-line human summary
    pub fn summary(&self) -> String {
        if self.passed {
            return format!("{} of {} records matched", self.matched_count, self.expected_count);
        }
        let mut parts = Vec::new();
        if let Some(ref err) = self.error {
            parts.push(err.clone());
        }
        if let Some(ref count) = self.count_mismatch {
            parts.push(count.to_string());
        }
        if self.total_mismatches > 0 {
            parts.push(format!("{} field mismatch(es)", self.total_mismatches));
        }
        format!(
            "{} of {} records matched: {}",
            self.matched_count,
            self.expected_count,
            parts.join("; ")
        )
    }

    /// Pretty JSON form for reports
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
