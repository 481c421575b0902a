// tests/test_window_counter.rs
//
// WindowCounter policies as seen by a gauge reader.

mod common;

use anyhow::Result;
use std::time::Duration;

use hdrwin::api::{ResetPolicy, SnapshotSource, WindowCounter};

#[test]
fn test_gauge_read_resets_on_snapshot() {
    let counter = WindowCounter::reset_on_snapshot();
    counter.add(3);
    counter.add(4);
    assert_eq!(counter.sum(), 7);
    assert_eq!(counter.snapshot(), 7);
    assert_eq!(counter.snapshot(), 0);
}

#[test]
fn test_periodic_counter_ignores_reads() -> Result<()> {
    let clock = common::mock_clock();
    let counter = WindowCounter::new(ResetPolicy::Periodically(Duration::from_millis(1000)), clock.clone())?;

    counter.add(10);
    counter.add(20);
    assert_eq!(counter.value(), 30);

    clock.advance_millis(999);
    counter.add(1);
    assert_eq!(counter.value(), 31);

    clock.advance_millis(1);
    counter.add(2);
    assert_eq!(counter.value(), 2);

    // nobody writes; the window still closes
    clock.advance_millis(5_000);
    assert_eq!(counter.sum(), 0);
    Ok(())
}

#[test]
fn test_uniform_counter_accepts_negative_deltas() {
    let counter = WindowCounter::never_reset();
    counter.add(10);
    counter.add(-15);
    assert_eq!(counter.value(), -5);
    assert_eq!(counter.value(), -5);
}
