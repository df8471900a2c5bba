// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;

#[test]
fn test_system_clock_is_recent() {
    // After 2023
    assert!(SystemClock.now_millis() > 1_700_000_000_000);
}

#[test]
fn test_fake_clock_clones_share_time() {
    let clock = FakeClock::new(1000);
    let other = clock.clone();
    other.advance(Duration::from_millis(500));
    assert_eq!(clock.now_millis(), 1500);

    clock.set(10);
    assert_eq!(other.now_millis(), 10);
}

#[test]
fn test_since_saturates() {
    let clock = FakeClock::new(1000);
    assert_eq!(clock.since(400), Duration::from_millis(600));
    assert_eq!(clock.since(5000), Duration::ZERO);
}

#[tokio::test]
async fn test_fake_sleep_advances_instantly() {
    let handle = ClockHandle::fake_at(0);
    handle.sleep(Duration::from_secs(30)).await;
    assert_eq!(handle.now_millis(), 30_000);
}

#[test]
fn test_handle_as_fake() {
    assert!(ClockHandle::system().as_fake().is_none());
    let handle = ClockHandle::fake_at(7);
    handle.as_fake().unwrap().advance_ms(3);
    assert_eq!(handle.now_millis(), 10);
}
