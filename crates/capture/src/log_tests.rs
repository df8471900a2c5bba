// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;
use proptest::prelude::*;
use rstest::rstest;
use std::thread;

#[test]
fn test_complete_lines_are_appended() {
    let log = CaptureLog::new(1_000);

    log.ingest(StreamOrigin::Stdout, b"hello\nworld\n", 1_010);

    assert_eq!(log.len(), 2);
    assert_eq!(log.stdout_lines(), vec!["hello", "world"]);
    let lines = log.lines();
    assert_eq!(lines[0].seq, 0);
    assert_eq!(lines[1].seq, 1);
    assert_eq!(lines[0].elapsed, Duration::from_millis(10));
    assert!(!lines[0].partial);
}

#[test]
fn test_lines_split_across_chunks() {
    let log = CaptureLog::new(0);

    log.ingest(StreamOrigin::Stdout, b"{\"seq\":", 1);
    assert!(log.is_empty());
    log.ingest(StreamOrigin::Stdout, b"1}\n{\"seq\"", 2);
    log.ingest(StreamOrigin::Stdout, b":2}\n", 3);

    assert_eq!(log.stdout_lines(), vec![r#"{"seq":1}"#, r#"{"seq":2}"#]);
}

#[test]
fn test_crlf_is_stripped() {
    let log = CaptureLog::new(0);
    log.ingest(StreamOrigin::Stderr, b"warning\r\n", 5);
    assert_eq!(log.stderr_lines(), vec!["warning"]);
}

#[test]
fn test_streams_are_tagged() {
    let log = CaptureLog::new(0);
    log.ingest(StreamOrigin::Stdout, b"out\n", 1);
    log.ingest(StreamOrigin::Stderr, b"err\n", 2);

    assert_eq!(log.count(StreamOrigin::Stdout), 1);
    assert_eq!(log.count(StreamOrigin::Stderr), 1);
    let lines = log.lines();
    assert!(lines[0].is_stdout());
    assert!(lines[1].is_stderr());
}

#[test]
fn test_partial_chunk_updates_last_output() {
    let log = CaptureLog::new(100);
    assert_eq!(log.last_output_ms(), 100);

    log.ingest(StreamOrigin::Stdout, b"no newline yet", 250);

    assert!(log.is_empty());
    assert_eq!(log.last_output_ms(), 250);
}

#[test]
fn test_empty_chunk_does_not_count_as_output() {
    let log = CaptureLog::new(100);
    log.ingest(StreamOrigin::Stdout, b"", 900);
    assert_eq!(log.last_output_ms(), 100);
}

#[test]
fn test_finalize_flushes_partial_lines() {
    let log = CaptureLog::new(0);
    log.ingest(StreamOrigin::Stdout, b"done\ntrailing", 1);
    log.ingest(StreamOrigin::Stderr, b"oops", 2);

    log.finalize(3);

    assert_eq!(log.stdout_lines(), vec!["done", "trailing"]);
    assert_eq!(log.stderr_lines(), vec!["oops"]);
    let last = log.last(1);
    assert!(last[0].partial);
    assert!(log.is_finalized());
}

#[test]
fn test_finalize_is_idempotent_and_stops_ingest() {
    let log = CaptureLog::new(0);
    log.ingest(StreamOrigin::Stdout, b"a\n", 1);
    log.finalize(2);
    log.finalize(3);
    log.ingest(StreamOrigin::Stdout, b"late\n", 4);

    assert_eq!(log.len(), 1);
}

#[test]
fn test_flush_stream_only_touches_one_origin() {
    let log = CaptureLog::new(0);
    log.ingest(StreamOrigin::Stdout, b"out", 1);
    log.ingest(StreamOrigin::Stderr, b"err", 1);

    log.flush_stream(StreamOrigin::Stdout, 2);

    assert_eq!(log.stdout_lines(), vec!["out"]);
    assert!(log.stderr_lines().is_empty());
}

#[test]
fn test_timestamps_never_go_backwards() {
    let log = CaptureLog::new(0);
    log.ingest(StreamOrigin::Stdout, b"first\n", 50);
    log.ingest(StreamOrigin::Stderr, b"second\n", 20);

    let lines = log.lines();
    assert_eq!(lines[0].timestamp_ms, 50);
    assert_eq!(lines[1].timestamp_ms, 50);
}

#[rstest]
#[case(1, 1)]
#[case(5, 2)]
#[case(3, 10)]
fn test_last_n(#[case] total: usize, #[case] n: usize) {
    let log = CaptureLog::new(0);
    for i in 0..total {
        log.ingest(StreamOrigin::Stdout, format!("line {}\n", i).as_bytes(), i as u64);
    }

    let last = log.last(n);
    let expected_len = n.min(total);
    assert_eq!(last.len(), expected_len);
    let start = total.saturating_sub(n);
    for (i, line) in last.iter().enumerate() {
        assert_eq!(line.text, format!("line {}", start + i));
    }
}

#[test]
fn test_lines_from_offset() {
    let log = CaptureLog::new(0);
    log.ingest(StreamOrigin::Stdout, b"a\nb\nc\n", 1);

    let tail = log.lines_from(1);
    assert_eq!(tail.len(), 2);
    assert_eq!(tail[0].text, "b");
    assert!(log.lines_from(10).is_empty());
}

#[test]
fn test_clone_shares_storage() {
    let log = CaptureLog::new(0);
    let other = log.clone();

    other.ingest(StreamOrigin::Stdout, b"shared\n", 1);

    assert_eq!(log.len(), 1);
    assert_eq!(log.last_output_ms(), 1);
}

#[test]
fn test_concurrent_writers() {
    let log = CaptureLog::new(0);
    let mut handles = vec![];

    for origin in [StreamOrigin::Stdout, StreamOrigin::Stderr] {
        let log = log.clone();
        handles.push(thread::spawn(move || {
            for i in 0..100u64 {
                log.ingest(origin, format!("{} {}\n", origin, i).as_bytes(), i);
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(log.len(), 200);
    assert_eq!(log.count(StreamOrigin::Stdout), 100);
    let lines = log.lines();
    for pair in lines.windows(2) {
        assert!(pair[0].timestamp_ms <= pair[1].timestamp_ms);
        assert_eq!(pair[0].seq + 1, pair[1].seq);
    }
}

#[test]
fn test_with_file_writes_jsonl() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.jsonl");
    let log = CaptureLog::with_file(&path, 0).unwrap();

    log.ingest(StreamOrigin::Stdout, b"one\n", 1);
    log.ingest(StreamOrigin::Stderr, b"two", 2);
    log.finalize(3);

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    let first: CapturedLine = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first.text, "one");
    assert_eq!(first.origin, StreamOrigin::Stdout);
    assert!(lines[1].contains(r#""origin":"stderr""#));
    assert!(lines[1].contains(r#""partial":true"#));
}

proptest! {
    #[test]
    fn chunking_does_not_change_lines(text in "[a-z \n]{0,200}", cut in 0usize..200) {
        let whole = CaptureLog::new(0);
        whole.ingest(StreamOrigin::Stdout, text.as_bytes(), 1);
        whole.finalize(2);

        let split = CaptureLog::new(0);
        let cut = cut.min(text.len());
        let (a, b) = text.as_bytes().split_at(cut);
        split.ingest(StreamOrigin::Stdout, a, 1);
        split.ingest(StreamOrigin::Stdout, b, 1);
        split.finalize(2);

        prop_assert_eq!(whole.stdout_lines(), split.stdout_lines());
    }
}
