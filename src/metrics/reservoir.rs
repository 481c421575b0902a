// src/metrics/reservoir.rs
//
// Reservoir: the accumulator composed with its decorators in a fixed order.
//
//   update -> [overflow resolution] -> accumulator
//   snapshot <- [snapshot cache] <- accumulator
//
// Overflow resolution is the innermost stage on the write path and the
// snapshot cache the outermost on the read path; neither is optional in
// position, only in presence.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::api::SnapshotSource;
use crate::clock::Clock;
use crate::config::{ConfigError, HistogramConfig, OverflowResolver};
use crate::metrics::accumulator::Accumulator;
use crate::metrics::snapshot::Snapshot;
use crate::snapshot_cache::{CacheStats, CachingSnapshotSource};

/// Applies the configured [`OverflowResolver`] before values reach the recorder.
#[derive(Debug)]
pub struct OverflowGuard {
    highest_trackable: u64,
    resolver: OverflowResolver,
    skipped: AtomicU64,
}

impl OverflowGuard {
    pub fn new(highest_trackable: u64, resolver: OverflowResolver) -> Self {
        Self {
            highest_trackable,
            resolver,
            skipped: AtomicU64::new(0),
        }
    }

    /// The value to record, or `None` when it must be dropped.
    pub fn resolve(&self, value: u64) -> Option<u64> {
        if value <= self.highest_trackable {
            return Some(value);
        }
        match self.resolver {
            OverflowResolver::PassThru => Some(value),
            OverflowResolver::ReduceToHighestTrackable => Some(self.highest_trackable),
            OverflowResolver::Skip => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                trace!("skipping {} above highest trackable {}", value, self.highest_trackable);
                None
            }
        }
    }

    /// Number of values dropped by the `Skip` resolver.
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
enum ReadPath {
    Direct(Accumulator),
    Cached(CachingSnapshotSource<Accumulator>),
}

/// Histogram storage shared by [`super::Histogram`] and [`super::Timer`].
#[derive(Debug)]
pub struct Reservoir {
    overflow: Option<OverflowGuard>,
    read_path: ReadPath,
}

impl Reservoir {
    pub fn new(config: &HistogramConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        let accumulator = Accumulator::new(config, Arc::clone(&clock))?;
        let overflow = config
            .highest_trackable_value
            .map(|(highest, resolver)| OverflowGuard::new(highest, resolver));
        let read_path = match config.effective_cache_ttl() {
            Some(ttl) => ReadPath::Cached(CachingSnapshotSource::new(accumulator, ttl, clock)),
            None => ReadPath::Direct(accumulator),
        };
        Ok(Self { overflow, read_path })
    }

    /// Record one value. Negative values are ignored.
    pub fn update(&self, value: i64) {
        let Ok(value) = u64::try_from(value) else {
            trace!("ignoring negative value {}", value);
            return;
        };
        let value = match &self.overflow {
            Some(guard) => match guard.resolve(value) {
                Some(value) => value,
                None => return,
            },
            None => value,
        };
        self.accumulator().record(value);
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        match &self.read_path {
            ReadPath::Direct(accumulator) => SnapshotSource::snapshot(accumulator),
            ReadPath::Cached(cache) => cache.snapshot(),
        }
    }

    /// Values dropped because they exceeded the highest trackable value.
    pub fn skipped_values(&self) -> u64 {
        self.overflow.as_ref().map_or(0, OverflowGuard::skipped)
    }

    /// Cache statistics when snapshot caching is enabled.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        match &self.read_path {
            ReadPath::Cached(cache) => Some(cache.stats()),
            ReadPath::Direct(_) => None,
        }
    }

    pub fn estimated_footprint_in_bytes(&self) -> usize {
        self.accumulator().estimated_footprint_in_bytes()
    }

    fn accumulator(&self) -> &Accumulator {
        match &self.read_path {
            ReadPath::Direct(accumulator) => accumulator,
            ReadPath::Cached(cache) => cache.inner(),
        }
    }
}

impl SnapshotSource for Reservoir {
    type Summary = Arc<Snapshot>;

    fn snapshot(&self) -> Arc<Snapshot> {
        Reservoir::snapshot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::config::ResetPolicy;
    use std::time::Duration;

    #[test]
    fn test_overflow_guard_modes() {
        let skip = OverflowGuard::new(100, OverflowResolver::Skip);
        assert_eq!(skip.resolve(100), Some(100));
        assert_eq!(skip.resolve(101), None);
        assert_eq!(skip.skipped(), 1);

        let reduce = OverflowGuard::new(100, OverflowResolver::ReduceToHighestTrackable);
        assert_eq!(reduce.resolve(5_000), Some(100));
        assert_eq!(reduce.skipped(), 0);

        let pass = OverflowGuard::new(100, OverflowResolver::PassThru);
        assert_eq!(pass.resolve(5_000), Some(5_000));
    }

    #[test]
    fn test_reservoir_reduces_overflow_before_recording() {
        let config = HistogramConfig {
            highest_trackable_value: Some((1_000, OverflowResolver::ReduceToHighestTrackable)),
            predefined_percentiles: None,
            ..Default::default()
        };
        let reservoir = Reservoir::new(&config, Arc::new(MockClock::new(0))).unwrap();
        reservoir.update(10);
        reservoir.update(1_000_000);

        let snapshot = reservoir.snapshot();
        assert_eq!(snapshot.count(), 2);
        assert_eq!(snapshot.min(), 10);
        assert!(snapshot.max() >= 1_000 && snapshot.max() < 1_010);
    }

    #[test]
    fn test_reservoir_skips_and_counts_overflow() {
        let config = HistogramConfig {
            highest_trackable_value: Some((1_000, OverflowResolver::Skip)),
            ..Default::default()
        };
        let reservoir = Reservoir::new(&config, Arc::new(MockClock::new(0))).unwrap();
        reservoir.update(999);
        reservoir.update(1_001);
        reservoir.update(-5);

        assert_eq!(reservoir.skipped_values(), 1);
        assert_eq!(reservoir.snapshot().count(), 1);
    }

    #[test]
    fn test_cached_reservoir_shields_reset_on_snapshot() {
        let clock = Arc::new(MockClock::new(0));
        let config = HistogramConfig {
            reset_policy: ResetPolicy::OnSnapshot,
            snapshot_cache_ttl: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        let reservoir = Reservoir::new(&config, clock.clone()).unwrap();

        reservoir.update(10);
        let first = reservoir.snapshot();
        reservoir.update(20);
        let second = reservoir.snapshot();
        assert!(Arc::ptr_eq(&first, &second));

        clock.advance(Duration::from_secs(5));
        let third = reservoir.snapshot();
        assert_eq!((third.min(), third.max(), third.count()), (20, 20, 1));

        let stats = reservoir.cache_stats().unwrap();
        assert_eq!((stats.hits, stats.misses), (1, 2));
    }
}
