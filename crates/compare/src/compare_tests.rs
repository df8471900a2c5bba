// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;
use crate::stream::StreamOptions;
use proptest::prelude::*;
use rstest::rstest;

fn stream(lines: &[&str]) -> RecordStream {
    RecordStream::parse_lines(lines.iter().copied(), &StreamOptions::default())
}

fn run(actual: &[&str], expected: &[&str], rules: &ComparisonRules) -> ComparisonResult {
    compare(&stream(actual), &stream(expected), rules).unwrap()
}

#[test]
fn test_identical_streams_pass() {
    let lines = [r#"{"seq":1,"x":1.5,"name":"a"}"#, r#"{"seq":2,"x":2.5,"name":"b"}"#];
    let result = run(&lines, &lines, &ComparisonRules::default());

    assert!(result.passed);
    assert!(result.mismatches.is_empty());
    assert_eq!(result.matched_count, 2);
    assert!(result.count_mismatch.is_none());
}

#[test]
fn test_missing_sequence_reported_by_number() {
    let result = run(
        &[r#"{"seq":1,"x":1}"#],
        &[r#"{"seq":1,"x":1}"#, r#"{"seq":2,"x":2}"#],
        &ComparisonRules::default(),
    );

    assert!(!result.passed);
    let count = result.count_mismatch.unwrap();
    assert_eq!(count.missing, vec![RecordKey::Seq(2)]);
    assert!(count.extra.is_empty());
    assert_eq!(result.matched_count, 1);
}

#[test]
fn test_missing_sequence_by_sequence_mode() {
    let rules = ComparisonRules::default().with_ordering(OrderingMode::BySequence);
    let result = run(
        &[r#"{"seq":1,"x":1}"#],
        &[r#"{"seq":1,"x":1}"#, r#"{"seq":2,"x":2}"#],
        &rules,
    );

    assert!(!result.passed);
    assert_eq!(result.count_mismatch.unwrap().missing, vec![RecordKey::Seq(2)]);
}

#[test]
fn test_float_within_tolerance_passes() {
    let result = run(
        &[r#"{"x":1.0000005}"#],
        &[r#"{"x":1.0}"#],
        &ComparisonRules::default(),
    );
    assert!(result.passed);
}

#[test]
fn test_float_outside_tolerance_reports_field() {
    let result = run(
        &[r#"{"x":1.1,"y":2.0}"#],
        &[r#"{"x":1.0,"y":2.0}"#],
        &ComparisonRules::default(),
    );

    assert!(!result.passed);
    assert_eq!(result.mismatches.len(), 1);
    let mismatch = &result.mismatches[0];
    assert_eq!(mismatch.field, "x");
    assert_eq!(mismatch.key, RecordKey::Index(0));
    assert!(matches!(mismatch.kind, MismatchKind::OutOfTolerance { .. }));
    assert_eq!(mismatch.expected, Some(Value::Float(1.0)));
    assert_eq!(mismatch.actual, Some(Value::Float(1.1)));
}

#[test]
fn test_tolerance_not_applied_to_integers() {
    let rules = ComparisonRules::default().with_tolerance(10.0);
    let result = run(&[r#"{"x":2}"#], &[r#"{"x":1}"#], &rules);

    assert!(!result.passed);
    assert_eq!(result.mismatches[0].kind, MismatchKind::ValueMismatch);
}

#[test]
fn test_no_implicit_type_coercion() {
    let result = run(&[r#"{"x":"1"}"#], &[r#"{"x":1}"#], &ComparisonRules::default());
    assert!(!result.passed);
    assert_eq!(
        result.mismatches[0].kind,
        MismatchKind::TypeMismatch {
            expected_type: "int",
            actual_type: "string"
        }
    );
}

#[rstest]
#[case(false, false)]
#[case(true, true)]
fn test_int_float_mixing_requires_lenient(#[case] lenient: bool, #[case] passes: bool) {
    let rules = ComparisonRules::default().with_lenient_numbers(lenient);
    let result = run(&[r#"{"x":1}"#], &[r#"{"x":1.0}"#], &rules);
    assert_eq!(result.passed, passes);
}

#[test]
fn test_missing_field_is_failure_extra_field_ignored() {
    let result = run(
        &[r#"{"a":1,"debug":"extra"}"#],
        &[r#"{"a":1,"b":2}"#],
        &ComparisonRules::default(),
    );

    assert!(!result.passed);
    assert_eq!(result.mismatches.len(), 1);
    assert_eq!(result.mismatches[0].field, "b");
    assert_eq!(result.mismatches[0].kind, MismatchKind::MissingField);
    assert_eq!(result.mismatches[0].actual, None);
}

#[test]
fn test_required_fields_limit_comparison() {
    let rules = ComparisonRules::default().with_required_fields(["a"]);
    let result = run(&[r#"{"a":1,"b":3}"#], &[r#"{"a":1,"b":2}"#], &rules);
    assert!(result.passed);
}

#[test]
fn test_ignored_nested_field() {
    let rules = ComparisonRules::default().with_ignored_field("meta");
    let result = run(
        &[r#"{"data":{"x":1},"meta":{"ts":999}}"#],
        &[r#"{"data":{"x":1},"meta":{"ts":1}}"#],
        &rules,
    );
    assert!(result.passed);
}

#[test]
fn test_nested_field_mismatch_uses_path() {
    let result = run(
        &[r#"{"data":{"values":[1,5]}}"#],
        &[r#"{"data":{"values":[1,2]}}"#],
        &ComparisonRules::default(),
    );
    assert_eq!(result.mismatches[0].field, "data.values[1]");
}

#[test]
fn test_by_sequence_ignores_arrival_order() {
    let rules = ComparisonRules::default().with_ordering(OrderingMode::BySequence);
    let result = run(
        &[r#"{"seq":2,"x":2}"#, r#"{"seq":1,"x":1}"#],
        &[r#"{"seq":1,"x":1}"#, r#"{"seq":2,"x":2}"#],
        &rules,
    );
    assert!(result.passed);
    assert_eq!(result.matched_count, 2);
}

#[test]
fn test_strict_order_detects_reordering() {
    let result = run(
        &[r#"{"seq":2,"x":2}"#, r#"{"seq":1,"x":1}"#],
        &[r#"{"seq":1,"x":1}"#, r#"{"seq":2,"x":2}"#],
        &ComparisonRules::default(),
    );
    assert!(!result.passed);
    assert_eq!(result.total_mismatches, 4);
}

#[test]
fn test_duplicate_sequence_is_error() {
    let rules = ComparisonRules::default().with_ordering(OrderingMode::BySequence);
    let err = compare(
        &stream(&[r#"{"seq":1,"x":1}"#, r#"{"seq":1,"x":2}"#]),
        &stream(&[r#"{"seq":1,"x":1}"#]),
        &rules,
    )
    .unwrap_err();

    assert_eq!(
        err,
        CompareError::DuplicateSequence {
            side: StreamSide::Actual,
            seq: 1,
            first: 0,
            second: 1,
        }
    );
}

#[test]
fn test_missing_sequence_field_is_error() {
    let rules = ComparisonRules::default().with_ordering(OrderingMode::BySequence);
    let err = compare(
        &stream(&[r#"{"seq":1}"#]),
        &stream(&[r#"{"seq":1}"#, r#"{"x":2}"#]),
        &rules,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        CompareError::MissingSequence {
            side: StreamSide::Expected,
            index: 1,
            ..
        }
    ));
}

#[test]
fn test_empty_expected_with_actual_fails() {
    let result = run(&[r#"{"x":1}"#], &[], &ComparisonRules::default());
    assert!(!result.passed);
    assert_eq!(result.count_mismatch.unwrap().extra, vec![RecordKey::Index(0)]);
}

#[test]
fn test_superset_allowed_when_enabled() {
    let rules = ComparisonRules::default().with_superset(true);
    let result = run(&[r#"{"x":1}"#, r#"{"x":2}"#], &[r#"{"x":1}"#], &rules);
    assert!(result.passed);

    let empty_expected = run(&[r#"{"x":1}"#], &[], &rules);
    assert!(empty_expected.passed);
}

#[test]
fn test_unordered_matches_any_position() {
    let rules = ComparisonRules::default().with_ordering(OrderingMode::Unordered);
    let result = run(
        &[r#"{"id":"b","v":2.0}"#, r#"{"id":"a","v":1.0}"#],
        &[r#"{"id":"a","v":1.0}"#, r#"{"id":"b","v":2.0}"#],
        &rules,
    );
    assert!(result.passed);
    assert_eq!(result.matched_count, 2);
}

#[test]
fn test_unordered_each_actual_used_once() {
    let rules = ComparisonRules::default().with_ordering(OrderingMode::Unordered);
    let result = run(
        &[r#"{"id":"a"}"#, r#"{"id":"c"}"#],
        &[r#"{"id":"a"}"#, r#"{"id":"a"}"#],
        &rules,
    );

    assert!(!result.passed);
    let count = result.count_mismatch.unwrap();
    assert_eq!(count.missing, vec![RecordKey::Index(1)]);
    assert_eq!(count.extra, vec![RecordKey::Index(1)]);
}

#[test]
fn test_mismatches_truncated_to_max_diffs() {
    let actual: Vec<String> = (0..20).map(|i| format!(r#"{{"x":{}}}"#, i + 100)).collect();
    let expected: Vec<String> = (0..20).map(|i| format!(r#"{{"x":{}}}"#, i)).collect();
    let actual: Vec<&str> = actual.iter().map(String::as_str).collect();
    let expected: Vec<&str> = expected.iter().map(String::as_str).collect();

    let result = run(&actual, &expected, &ComparisonRules::default().with_max_diffs(3));

    assert_eq!(result.mismatches.len(), 3);
    assert_eq!(result.total_mismatches, 20);
    assert_eq!(result.mismatches[0].key, RecordKey::Index(0));
}

#[test]
fn test_count_mismatch_still_compares_pairs() {
    let result = run(
        &[r#"{"x":5}"#],
        &[r#"{"x":1}"#, r#"{"x":2}"#],
        &ComparisonRules::default(),
    );
    assert!(result.count_mismatch.is_some());
    assert_eq!(result.total_mismatches, 1);
}

#[test]
fn test_unparseable_output_fails() {
    let result = run(
        &["Publisher starting", "sent sample 1"],
        &[r#"{"x":1}"#],
        &ComparisonRules::default(),
    );

    assert!(!result.passed);
    assert_eq!(result.malformed_lines, 2);
    assert!(result
        .error
        .unwrap()
        .starts_with("output stream did not produce parseable records"));
}

#[test]
fn test_malformed_lines_tolerated_below_ratio() {
    let result = run(
        &["banner", r#"{"x":1}"#, r#"{"x":2}"#],
        &[r#"{"x":1}"#, r#"{"x":2}"#],
        &ComparisonRules::default(),
    );
    assert!(result.passed);
    assert_eq!(result.malformed_lines, 1);
    assert!(result.error.is_none());
}

#[test]
fn test_summary_mentions_failures() {
    let result = run(&[r#"{"x":2}"#], &[r#"{"x":1}"#, r#"{"x":3}"#], &ComparisonRules::default());
    let summary = result.summary();
    assert!(summary.contains("record count mismatch"));
    assert!(summary.contains("1 field mismatch"));
}

#[test]
fn test_result_serializes_mismatch_kind() {
    let result = run(&[r#"{"x":2}"#], &[r#"{"x":1}"#], &ComparisonRules::default());
    let json = result.to_json();
    assert_eq!(json["passed"], false);
    assert_eq!(json["mismatches"][0]["kind"], "value_mismatch");
    assert_eq!(json["mismatches"][0]["field"], "x");
}

fn record_line() -> impl Strategy<Value = String> {
    (any::<i32>(), -1.0e6f64..1.0e6, "[a-z]{0,8}", any::<bool>()).prop_map(|(i, f, s, b)| {
        serde_json::json!({ "seq": i, "value": f, "label": s, "ok": b }).to_string()
    })
}

proptest! {
    #[test]
    fn prop_compare_is_reflexive(lines in prop::collection::vec(record_line(), 0..16)) {
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let result = run(&refs, &refs, &ComparisonRules::default());
        prop_assert!(result.passed);
        prop_assert_eq!(result.total_mismatches, 0);
        prop_assert_eq!(result.matched_count, refs.len());
    }

    #[test]
    fn prop_tolerance_boundary(base in -1.0e3f64..1.0e3, frac in 0.0f64..1.0) {
        let tolerance = 1e-3;
        let rules = ComparisonRules::default().with_tolerance(tolerance);
        let expected = serde_json::json!({ "v": base }).to_string();

        let near = serde_json::json!({ "v": base + tolerance * frac * 0.5 }).to_string();
        prop_assert!(run(&[&near], &[&expected], &rules).passed);

        let far = serde_json::json!({ "v": base + tolerance * (2.0 + frac) }).to_string();
        let result = run(&[&far], &[&expected], &rules);
        prop_assert!(!result.passed);
        prop_assert_eq!(result.mismatches.len(), 1);
        prop_assert_eq!(result.mismatches[0].field.as_str(), "v");
    }
}

#[test]
fn test_empty_expected_array_rejects_populated_actual() {
    let result = run(
        &[r#"{"x":1,"items":[9,9]}"#],
        &[r#"{"x":1,"items":[]}"#],
        &ComparisonRules::default(),
    );

    assert!(!result.passed);
    assert_eq!(result.mismatches[0].field, "items");
    assert_eq!(result.mismatches[0].kind, MismatchKind::MissingField);
}

#[test]
fn test_empty_containers_match_themselves() {
    let lines = [r#"{"items":[],"meta":{}}"#];
    assert!(run(&lines, &lines, &ComparisonRules::default()).passed);
}

#[test]
fn test_dotted_key_is_not_a_nested_field() {
    let result = run(
        &[r#"{"a":{"b":1}}"#],
        &[r#"{"a.b":1}"#],
        &ComparisonRules::default(),
    );
    assert!(!result.passed);
    assert_eq!(result.mismatches[0].field, r"a\.b");
}
