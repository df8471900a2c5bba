// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Comparison rules.

use crate::stream::StreamOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default absolute tolerance for float fields
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Default number of mismatches retained in a result
pub const DEFAULT_MAX_DIFFS: usize = 10;

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_max_diffs() -> usize {
    DEFAULT_MAX_DIFFS
}

fn default_max_malformed_ratio() -> f64 {
    0.5
}

/// How actual records are paired with expected records
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderingMode {
    /// Pair records by position
    #[default]
    Strict,
    /// Pair records by their sequence field, ignoring arrival order
    BySequence,
    /// Match each expected record against any unused actual record
    Unordered,
}

impl std::fmt::Display for OrderingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderingMode::Strict => write!(f, "strict"),
            OrderingMode::BySequence => write!(f, "by-sequence"),
            OrderingMode::Unordered => write!(f, "unordered"),
        }
    }
}

impl std::str::FromStr for OrderingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(OrderingMode::Strict),
            "by-sequence" | "by_sequence" | "sequence" => Ok(OrderingMode::BySequence),
            "unordered" => Ok(OrderingMode::Unordered),
            other => Err(format!(
                "unknown ordering mode '{}': expected strict, by-sequence or unordered",
                other
            )),
        }
    }
}

/// Rules governing one comparison
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRules {
    /// Absolute tolerance applied to float fields
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    #[serde(default)]
    pub ordering: OrderingMode,

    /// Fields that must match. `None` means every field of the expected record.
    /// A path also covers its nested fields (`data` covers `data.x`).
    #[serde(default)]
    pub required_fields: Option<BTreeSet<String>>,

    /// Fields never compared (same prefix semantics as `required_fields`)
    #[serde(default)]
    pub ignore_fields: BTreeSet<String>,

    /// Accept actual streams that carry extra records beyond the expected ones
    #[serde(default)]
    pub allow_superset: bool,

    /// Compare ints and floats numerically instead of as distinct types
    #[serde(default)]
    pub lenient_numbers: bool,

    /// Mismatches retained in the result
    #[serde(default = "default_max_diffs")]
    pub max_diffs: usize,

    /// Highest tolerated share of malformed lines in the actual stream
    #[serde(default = "default_max_malformed_ratio")]
    pub max_malformed_ratio: f64,

    #[serde(default, flatten)]
    pub stream: StreamOptions,
}

impl Default for ComparisonRules {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            ordering: OrderingMode::Strict,
            required_fields: None,
            ignore_fields: BTreeSet::new(),
            allow_superset: false,
            lenient_numbers: false,
            max_diffs: DEFAULT_MAX_DIFFS,
            max_malformed_ratio: default_max_malformed_ratio(),
            stream: StreamOptions::default(),
        }
    }
}

impl ComparisonRules {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_ordering(mut self, ordering: OrderingMode) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn with_required_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_ignored_field(mut self, field: impl Into<String>) -> Self {
        self.ignore_fields.insert(field.into());
        self
    }

    pub fn with_superset(mut self, allow: bool) -> Self {
        self.allow_superset = allow;
        self
    }

    pub fn with_lenient_numbers(mut self, lenient: bool) -> Self {
        self.lenient_numbers = lenient;
        self
    }

    pub fn with_max_diffs(mut self, max_diffs: usize) -> Self {
        self.max_diffs = max_diffs;
        self
    }

    /// Whether a flattened field path takes part in the comparison
    pub fn is_compared(&self, path: &str) -> bool {
        if self.ignore_fields.iter().any(|p| covers(p, path)) {
            return false;
        }
        match self.required_fields {
            Some(ref required) => required.iter().any(|p| covers(p, path)),
            None => true,
        }
    }
}

/// `pattern` names `path` itself or one of its ancestors
fn covers(pattern: &str, path: &str) -> bool {
    match path.strip_prefix(pattern) {
        Some(rest) => rest.is_empty() || rest.starts_with('.') || rest.starts_with('['),
        None => false,
    }
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod tests;
