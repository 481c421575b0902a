// tests/test_snapshot_cache.rs
//
// Snapshot caching over histograms, counters and top trackers.

mod common;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use hdrwin::api::{CachingSnapshotSource, HdrBuilder, SnapshotSource, TopBuilder, WindowCounter};

#[test]
fn test_cached_reads_are_identical_within_ttl() -> Result<()> {
    let clock = common::mock_clock();
    let timer = HdrBuilder::new()
        .reset_periodically(Duration::from_secs(60))
        .with_snapshot_cache_ttl(Duration::from_secs(1))
        .with_clock(clock.clone())
        .build_timer()?;

    timer.update(Duration::from_micros(100));
    let first = timer.snapshot();
    timer.update(Duration::from_micros(900));
    let second = timer.snapshot();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.count(), 1);

    clock.advance(Duration::from_secs(1));
    let refreshed = timer.snapshot();
    assert_eq!(refreshed.count(), 2);

    let stats = timer.reservoir().cache_stats().expect("cache enabled");
    assert_eq!((stats.hits, stats.misses), (1, 2));
    assert_eq!(stats.age, Some(Duration::ZERO));
    Ok(())
}

#[test]
fn test_cache_hides_reset_side_effects() -> Result<()> {
    let clock = common::mock_clock();
    let histogram = HdrBuilder::new()
        .reset_on_snapshot()
        .with_snapshot_cache_ttl(Duration::from_millis(500))
        .with_clock(clock.clone())
        .build_histogram()?;

    histogram.update(42);
    // several readers within the TTL all see the same interval
    for _ in 0..3 {
        let snapshot = histogram.snapshot();
        assert_eq!((snapshot.count(), snapshot.max()), (1, 42));
    }

    clock.advance_millis(500);
    assert!(histogram.snapshot().is_empty());
    Ok(())
}

#[test]
fn test_zero_ttl_means_no_cache() -> Result<()> {
    let timer = HdrBuilder::new()
        .with_snapshot_cache_ttl(Duration::ZERO)
        .build_timer()?;
    assert!(timer.reservoir().cache_stats().is_none());
    Ok(())
}

#[test]
fn test_caching_counter_and_top() -> Result<()> {
    let clock = common::mock_clock();

    let counter = CachingSnapshotSource::new(WindowCounter::reset_on_snapshot(), Duration::from_secs(5), clock.clone());
    counter.inner().add(10);
    assert_eq!(counter.snapshot(), 10);
    counter.inner().add(5);
    assert_eq!(counter.snapshot(), 10);
    clock.advance(Duration::from_secs(5));
    assert_eq!(counter.snapshot(), 5);

    let top = TopBuilder::new().with_size(1).with_clock(clock.clone()).build_windowed()?;
    let cached_top = CachingSnapshotSource::new(top, Duration::from_secs(5), clock.clone());
    cached_top.inner().update(0, 7, || "seven".to_string());
    assert_eq!(cached_top.snapshot().len(), 1);
    // the drain already happened; cached copy is still served
    assert_eq!(cached_top.snapshot().len(), 1);
    clock.advance(Duration::from_secs(5));
    assert!(cached_top.snapshot().is_empty());
    Ok(())
}
