// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use parking_lot::Mutex;
use std::sync::Arc;

type Trace = Arc<Mutex<Vec<String>>>;

fn pass(name: &str, weight: f64) -> Checkpoint<Trace> {
    let label = name.to_string();
    Checkpoint::new(name, weight, move |trace: Trace| {
        let label = label.clone();
        async move {
            trace.lock().push(label);
            Ok(None)
        }
    })
}

fn fail(name: &str, weight: f64) -> Checkpoint<Trace> {
    let label = name.to_string();
    Checkpoint::new(name, weight, move |trace: Trace| {
        let label = label.clone();
        async move {
            trace.lock().push(label.clone());
            Err(CheckpointError::failed(format!("{} did not hold", label)))
        }
    })
}

fn trace() -> Trace {
    Arc::new(Mutex::new(Vec::new()))
}

#[tokio::test]
async fn test_blocking_failure_skips_rest() {
    let pipeline = Pipeline::new(vec![fail("a", 0.5).blocking(), pass("b", 0.5)]).unwrap();
    let ran = trace();

    let outcome = pipeline.run(Arc::clone(&ran)).await;

    assert_eq!(outcome.results[0].state, CheckpointState::Failed);
    assert_eq!(outcome.results[1].state, CheckpointState::Skipped);
    assert_eq!(outcome.score, 0.0);
    assert!(!outcome.passed);
    assert_eq!(*ran.lock(), vec!["a"]);
    assert!(outcome.results[1]
        .reason
        .as_deref()
        .unwrap()
        .contains("blocking checkpoint 'a'"));
}

#[tokio::test]
async fn test_progress_reports_every_state_change() {
    let pipeline = Pipeline::new(vec![
        pass("a", 0.2),
        fail("b", 0.3).blocking(),
        pass("c", 0.5),
    ])
    .unwrap();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let outcome = pipeline.run_with_progress(trace(), Some(tx)).await;

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push((event.name, event.state));
    }
    let expected: Vec<(String, CheckpointState)> = [
        ("a", CheckpointState::Pending),
        ("b", CheckpointState::Pending),
        ("c", CheckpointState::Pending),
        ("a", CheckpointState::Running),
        ("a", CheckpointState::Passed),
        ("b", CheckpointState::Running),
        ("b", CheckpointState::Failed),
        ("c", CheckpointState::Skipped),
    ]
    .into_iter()
    .map(|(name, state)| (name.to_string(), state))
    .collect();
    assert_eq!(events, expected);
    assert_eq!(outcome.score, 0.2);
}

#[tokio::test]
async fn test_closed_progress_receiver_does_not_stop_run() {
    let pipeline = Pipeline::new(vec![pass("a", 0.5), pass("b", 0.5)]).unwrap();
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    drop(rx);

    let outcome = pipeline.run_with_progress(trace(), Some(tx)).await;
    assert!(outcome.passed);
    assert_eq!(outcome.results.len(), 2);
}

#[tokio::test]
async fn test_non_blocking_failure_continues() {
    let pipeline = Pipeline::new(vec![pass("a", 0.3), fail("b", 0.7), pass("c", 0.0)]).unwrap();
    let ran = trace();

    let outcome = pipeline.run(Arc::clone(&ran)).await;

    assert_eq!(outcome.score, 0.3);
    assert!(!outcome.passed);
    assert_eq!(*ran.lock(), vec!["a", "b", "c"]);
    assert_eq!(
        outcome.result("b").unwrap().reason.as_deref(),
        Some("b did not hold")
    );
}

#[tokio::test]
async fn test_all_passed() {
    let pipeline = Pipeline::new(vec![
        pass("build", 0.1),
        pass("startup", 0.2),
        pass("data", 0.7),
    ])
    .unwrap();

    let outcome = pipeline.run(trace()).await;

    assert!(outcome.passed);
    assert_eq!(outcome.score, 1.0);
    assert_eq!(pipeline.max_score(), 1.0);
    assert!(outcome.results.iter().all(|r| r.reason.is_none()));
}

#[tokio::test]
async fn test_score_is_rounded() {
    let pipeline = Pipeline::new(vec![pass("a", 0.1), pass("b", 0.2)]).unwrap();
    assert_eq!(pipeline.run(trace()).await.score, 0.3);
}

#[tokio::test]
async fn test_panic_is_contained() {
    let boom: Checkpoint<Trace> = Checkpoint::new("boom", 0.5, |_trace: Trace| async move {
        if true {
            panic!("verifier exploded");
        }
        Ok(None)
    });
    let pipeline = Pipeline::new(vec![boom, pass("after", 0.5)]).unwrap();
    let ran = trace();

    let outcome = pipeline.run(Arc::clone(&ran)).await;

    let boom = outcome.result("boom").unwrap();
    assert_eq!(boom.state, CheckpointState::Failed);
    let reason = boom.reason.as_deref().unwrap();
    assert!(!reason.is_empty());
    assert!(reason.contains("verifier exploded"), "got {}", reason);
    assert_eq!(outcome.result("after").unwrap().state, CheckpointState::Passed);
    assert_eq!(outcome.score, 0.5);
    assert_eq!(*ran.lock(), vec!["after"]);
}

#[tokio::test]
async fn test_internal_error_fails_checkpoint() {
    let broken: Checkpoint<Trace> = Checkpoint::new("broken", 1.0, |_trace: Trace| async move {
        Err(CheckpointError::internal("lost the handle"))
    });
    let outcome = Pipeline::new(vec![broken]).unwrap().run(trace()).await;

    assert_eq!(
        outcome.results[0].reason.as_deref(),
        Some("internal error: lost the handle")
    );
}

#[tokio::test]
async fn test_failure_details_are_kept() {
    let diff: Checkpoint<Trace> = Checkpoint::new("data", 1.0, |_trace: Trace| async move {
        Err(CheckpointError::failed_with(
            "1 mismatch",
            serde_json::json!({"field": "x"}),
        ))
    });
    let outcome = Pipeline::new(vec![diff]).unwrap().run(trace()).await;

    assert_eq!(
        outcome.results[0].details,
        Some(serde_json::json!({"field": "x"}))
    );
}

#[tokio::test]
async fn test_success_details_are_kept() {
    let counted: Checkpoint<Trace> = Checkpoint::new("count", 1.0, |_trace: Trace| async move {
        Ok(Some(serde_json::json!({"records": 10})))
    });
    let outcome = Pipeline::new(vec![counted]).unwrap().run(trace()).await;
    assert_eq!(outcome.results[0].details.as_ref().unwrap()["records"], 10);
}

#[tokio::test(start_paused = true)]
async fn test_checkpoint_timeout() {
    let slow: Checkpoint<Trace> = Checkpoint::new("slow", 0.5, |_trace: Trace| async move {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(None)
    })
    .blocking();
    let pipeline = Pipeline::new(vec![slow, pass("next", 0.5)])
        .unwrap()
        .with_default_timeout(Some(Duration::from_secs(5)));

    let outcome = pipeline.run(trace()).await;

    assert_eq!(
        outcome.results[0].reason.as_deref(),
        Some("checkpoint timed out after 5000ms")
    );
    assert_eq!(outcome.results[1].state, CheckpointState::Skipped);
}

#[tokio::test(start_paused = true)]
async fn test_checkpoint_timeout_override() {
    let slow: Checkpoint<Trace> = Checkpoint::new("slow", 1.0, |_trace: Trace| async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(None)
    })
    .with_timeout(Duration::from_secs(60));
    let pipeline = Pipeline::new(vec![slow])
        .unwrap()
        .with_default_timeout(Some(Duration::from_secs(1)));

    assert!(pipeline.run(trace()).await.passed);
}

#[test]
fn test_weight_out_of_range_rejected() {
    let err = Pipeline::new(vec![pass("a", 1.5)]).unwrap_err();
    assert_eq!(
        err,
        PipelineError::InvalidWeight {
            name: "a".to_string(),
            weight: 1.5
        }
    );
}

#[test]
fn test_duplicate_name_rejected() {
    let err = Pipeline::new(vec![pass("a", 0.1), fail("a", 0.1)]).unwrap_err();
    assert_eq!(err, PipelineError::DuplicateName("a".to_string()));
}

#[tokio::test]
async fn test_empty_pipeline_passes_with_zero_score() {
    let outcome = Pipeline::<Trace>::new(Vec::new()).unwrap().run(trace()).await;
    assert!(outcome.passed);
    assert_eq!(outcome.score, 0.0);
}

#[test]
fn test_result_serialization() {
    let checkpoint = pass("startup", 0.2).blocking();
    let result = CheckpointResult::new(&checkpoint, CheckpointState::Failed)
        .with_reason("candidate hung")
        .with_duration(Duration::from_millis(1500));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["state"], "failed");
    assert_eq!(json["passed"], false);
    assert_eq!(json["blocking"], true);
    assert_eq!(json["duration_ms"], 1500);
    assert!(json.get("details").is_none());
}

proptest::proptest! {
    #[test]
    fn test_score_is_sum_of_passed_weights(
        cases in proptest::collection::vec((0u32..=100, proptest::bool::ANY), 0..8)
    ) {
        let checkpoints: Vec<Checkpoint<Trace>> = cases
            .iter()
            .enumerate()
            .map(|(i, (weight, passes))| {
                let name = format!("c{}", i);
                let weight = f64::from(*weight) / 100.0;
                if *passes { pass(&name, weight) } else { fail(&name, weight) }
            })
            .collect();
        let pipeline = Pipeline::new(checkpoints).unwrap();
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let outcome = runtime.block_on(pipeline.run(trace()));

        let expected: u32 = cases.iter().filter(|(_, p)| *p).map(|(w, _)| *w).sum();
        proptest::prop_assert!((outcome.score - f64::from(expected) / 100.0).abs() < 1e-9);
        proptest::prop_assert_eq!(outcome.passed, cases.iter().all(|(_, p)| *p));
        proptest::prop_assert!(outcome.score <= pipeline.max_score() + 1e-9);
        proptest::prop_assert_eq!(outcome.results.len(), cases.len());
    }
}
