// src/metrics/accumulator.rs
//
// Reset-policy engine: one recorder plus the temporal policy deciding when
// its interval is rotated.

use std::sync::Arc;

use tracing::debug;

use crate::api::SnapshotSource;
use crate::clock::Clock;
use crate::config::{sorted_percentiles, ConfigError, HistogramConfig, ResetPolicy};
use crate::metrics::recorder::HistogramRecorder;
use crate::metrics::snapshot::Snapshot;
use crate::rotation::RotationGuard;

#[derive(Debug)]
enum PolicyState {
    ResetOnSnapshot,
    ResetPeriodically(RotationGuard),
    Uniform,
}

/// A recorder wrapped with one of the three reset policies.
///
/// Under the periodic policy a value recorded between the winning rotation
/// CAS and the recorder clear is discarded with the old interval; see
/// [`RotationGuard::try_rotate`].
///
/// `record` never waits on `snapshot` for longer than the recorder's own
/// single-value critical section or an O(1) histogram swap, plus an O(1)
/// rotation check.
#[derive(Debug)]
pub struct Accumulator {
    recorder: HistogramRecorder,
    policy: PolicyState,
    clock: Arc<dyn Clock>,
    percentiles: Option<Vec<f64>>,
    #[cfg(test)]
    discarded: std::sync::atomic::AtomicU64,
}

impl Accumulator {
    pub fn new(config: &HistogramConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;
        let recorder = HistogramRecorder::new(config)?;
        let policy = match config.reset_policy {
            ResetPolicy::OnSnapshot => PolicyState::ResetOnSnapshot,
            ResetPolicy::Periodically(period) => {
                PolicyState::ResetPeriodically(RotationGuard::new(period, clock.now_millis())?)
            }
            ResetPolicy::Never => PolicyState::Uniform,
        };
        Ok(Self {
            recorder,
            policy,
            clock,
            percentiles: config.predefined_percentiles.as_deref().map(sorted_percentiles),
            #[cfg(test)]
            discarded: std::sync::atomic::AtomicU64::new(0),
        })
    }

    pub fn record(&self, value: u64) {
        self.rotate_if_due();
        self.recorder.record(value);
    }

    /// Summary of the current interval, applying the policy's read semantics.
    pub fn snapshot(&self) -> Snapshot {
        let hdr = match &self.policy {
            PolicyState::ResetOnSnapshot => self.recorder.take_and_reset(),
            PolicyState::ResetPeriodically(_) => {
                self.rotate_if_due();
                self.recorder.peek()
            }
            PolicyState::Uniform => self.recorder.peek(),
        };
        Snapshot::from_histogram(hdr, self.percentiles.as_deref())
    }

    /// Rough upper bound of the memory held by the recorder and one snapshot.
    pub fn estimated_footprint_in_bytes(&self) -> usize {
        // active, spare and accumulated counts + the copy taken for a snapshot
        4 * self.recorder.distinct_values() * std::mem::size_of::<u64>()
    }

    fn rotate_if_due(&self) {
        if let PolicyState::ResetPeriodically(guard) = &self.policy {
            let now = self.clock.now_millis();
            if guard.try_rotate(now) {
                let discarded = self.recorder.reset();
                #[cfg(test)]
                self.discarded
                    .fetch_add(discarded, std::sync::atomic::Ordering::AcqRel);
                debug!("rotated histogram interval at {} ms, discarded {} values", now, discarded);
            }
        }
    }
}

impl SnapshotSource for Accumulator {
    type Summary = Arc<Snapshot>;

    fn snapshot(&self) -> Arc<Snapshot> {
        Arc::new(Accumulator::snapshot(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn accumulator(policy: ResetPolicy, clock: Arc<MockClock>) -> Accumulator {
        let config = HistogramConfig {
            reset_policy: policy,
            predefined_percentiles: None,
            ..Default::default()
        };
        Accumulator::new(&config, clock).unwrap()
    }

    #[test]
    fn test_reset_on_snapshot_reads_and_clears() {
        let acc = accumulator(ResetPolicy::OnSnapshot, Arc::new(MockClock::new(0)));
        acc.record(10);
        acc.record(30);

        let first = acc.snapshot();
        assert_eq!((first.min(), first.max(), first.count()), (10, 30, 2));

        acc.record(5);
        let second = acc.snapshot();
        assert_eq!((second.min(), second.max(), second.count()), (5, 5, 1));

        assert!(acc.snapshot().is_empty());
    }

    #[test]
    fn test_uniform_never_clears() {
        let clock = Arc::new(MockClock::new(0));
        let acc = accumulator(ResetPolicy::Never, clock.clone());
        acc.record(10);
        assert_eq!(acc.snapshot().count(), 1);

        clock.advance(Duration::from_secs(3600));
        acc.record(1000);
        let snapshot = acc.snapshot();
        assert_eq!((snapshot.min(), snapshot.max(), snapshot.count()), (10, 1000, 2));
    }

    #[test]
    fn test_periodic_rotation_discards_old_interval() {
        let clock = Arc::new(MockClock::new(10_000));
        let acc = accumulator(ResetPolicy::Periodically(Duration::from_millis(100)), clock.clone());
        acc.record(1);
        acc.record(2);
        assert_eq!(acc.snapshot().count(), 2);
        assert_eq!(acc.snapshot().count(), 2);

        // Rotation happens on elapsed time even when only a reader shows up.
        clock.advance_millis(100);
        assert!(acc.snapshot().is_empty());
    }

    #[test]
    fn test_backward_clock_does_not_rotate() {
        let clock = Arc::new(MockClock::new(10_000));
        let acc = accumulator(ResetPolicy::Periodically(Duration::from_millis(100)), clock.clone());
        acc.record(3);
        clock.set_millis(0);
        acc.record(4);
        assert_eq!(acc.snapshot().count(), 2);
    }

    #[test]
    fn test_zero_period_rejected() {
        let config = HistogramConfig {
            reset_policy: ResetPolicy::Periodically(Duration::ZERO),
            ..Default::default()
        };
        let err = Accumulator::new(&config, Arc::new(MockClock::new(0))).unwrap_err();
        assert!(matches!(err, ConfigError::NonPositivePeriod { .. }));
    }

    #[test]
    fn test_periodic_rotation_conserves_records() {
        let clock = Arc::new(MockClock::new(0));
        let acc = Arc::new(accumulator(ResetPolicy::Periodically(Duration::from_millis(10)), clock.clone()));
        let writers = 8;
        let per_writer = 20_000u64;
        let finished = Arc::new(AtomicUsize::new(0));

        let ticker = {
            let clock = Arc::clone(&clock);
            let finished = Arc::clone(&finished);
            thread::spawn(move || {
                while finished.load(Ordering::SeqCst) < writers {
                    clock.advance_millis(7);
                    thread::yield_now();
                }
            })
        };
        let handles: Vec<_> = (0..writers)
            .map(|w| {
                let acc = Arc::clone(&acc);
                let clock = Arc::clone(&clock);
                let finished = Arc::clone(&finished);
                thread::spawn(move || {
                    for i in 0..per_writer {
                        if i == per_writer / 2 {
                            while clock.now_millis() < 20 {
                                thread::yield_now();
                            }
                        }
                        acc.record(i % 1_000 + w as u64 + 1);
                    }
                    finished.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        ticker.join().unwrap();

        // No reader ran, so every discarded value was still pending in the
        // active histogram when its window closed.
        let remaining = acc.recorder.peek().len();
        let discarded = acc.discarded.load(Ordering::SeqCst);
        assert!(discarded > 0, "clock never crossed a period boundary");
        assert_eq!(discarded + remaining, writers as u64 * per_writer);
    }
}
