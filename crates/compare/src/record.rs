// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Structured records parsed from one output line.

use crate::stream::StreamOptions;
use crate::value::Value;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// One parsed record.
///
/// Nested objects and arrays are flattened into dotted and indexed paths
/// (`data.x`, `items[0]`) so every field holds a scalar. Empty containers keep
/// a field of their own, and key characters that are path syntax (`.`, `[`,
/// `]`, `\`) are escaped with a backslash, so `{"a.b":1}` has the path `a\.b`
/// and never collides with `{"a":{"b":1}}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Record {
    /// Position in the owning stream
    pub index: usize,

    /// Explicit sequence number, if the record carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<i64>,

    /// Topic or category label, if the record carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    /// Field path to value
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    /// Build a record from a JSON object
    pub fn from_json(
        object: &serde_json::Map<String, serde_json::Value>,
        index: usize,
        options: &StreamOptions,
    ) -> Self {
        let mut fields = BTreeMap::new();
        for (key, value) in object {
            flatten_into(&mut fields, escape_key(key).into_owned(), value);
        }
        Self::from_fields(fields, index, options)
    }

    /// Build a record from already-flattened fields
    pub fn from_fields(
        fields: BTreeMap<String, Value>,
        index: usize,
        options: &StreamOptions,
    ) -> Self {
        let seq = fields
            .get(&options.sequence_field)
            .and_then(Value::as_i64);
        let topic = fields
            .get(&options.topic_field)
            .and_then(Value::as_str)
            .map(str::to_string);
        Self {
            index,
            seq,
            topic,
            fields,
        }
    }

    /// Look up a field by path
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.fields.get(path)
    }

    /// Number of scalar fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Canonical single-line JSON form, used for diffs
    pub fn to_canonical_json(&self) -> String {
        serde_json::to_string(&self.fields).unwrap_or_default()
    }
}

fn flatten_into(fields: &mut BTreeMap<String, Value>, path: String, value: &serde_json::Value) {
    match value {
        serde_json::Value::Object(map) if map.is_empty() => {
            fields.insert(path, Value::EmptyObject);
        }
        serde_json::Value::Object(map) => {
            for (key, nested) in map {
                flatten_into(fields, format!("{}.{}", path, escape_key(key)), nested);
            }
        }
        serde_json::Value::Array(items) if items.is_empty() => {
            fields.insert(path, Value::EmptyArray);
        }
        serde_json::Value::Array(items) => {
            for (i, nested) in items.iter().enumerate() {
                flatten_into(fields, format!("{}[{}]", path, i), nested);
            }
        }
        scalar => {
            if let Some(v) = Value::from_json(scalar) {
                fields.insert(path, v);
            }
        }
    }
}

/// Escape path syntax inside a single object key
fn escape_key(key: &str) -> Cow<'_, str> {
    if !key.contains(['.', '[', ']', '\\']) {
        return Cow::Borrowed(key);
    }
    let mut escaped = String::with_capacity(key.len() + 2);
    for c in key.chars() {
        if matches!(c, '.' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    Cow::Owned(escaped)
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
