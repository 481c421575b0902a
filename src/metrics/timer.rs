// src/metrics/timer.rs
//
// Histogram and timer instruments built on a reservoir.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::api::SnapshotSource;
use crate::metrics::reservoir::Reservoir;
use crate::metrics::snapshot::Snapshot;

/// Distribution of arbitrary values plus a lifetime update count.
///
/// The count is never reset; the reservoir follows its own reset policy.
#[derive(Debug)]
pub struct Histogram {
    count: AtomicU64,
    reservoir: Reservoir,
}

impl Histogram {
    pub fn new(reservoir: Reservoir) -> Self {
        Self {
            count: AtomicU64::new(0),
            reservoir,
        }
    }

    pub fn update(&self, value: i64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.reservoir.update(value);
    }

    /// Number of updates since construction.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.reservoir.snapshot()
    }

    pub fn reservoir(&self) -> &Reservoir {
        &self.reservoir
    }
}

impl SnapshotSource for Histogram {
    type Summary = Arc<Snapshot>;

    fn snapshot(&self) -> Arc<Snapshot> {
        self.reservoir.snapshot()
    }
}

/// Latency histogram recording durations in nanoseconds.
#[derive(Debug)]
pub struct Timer {
    histogram: Histogram,
}

impl Timer {
    pub fn new(reservoir: Reservoir) -> Self {
        Self {
            histogram: Histogram::new(reservoir),
        }
    }

    pub fn update(&self, elapsed: Duration) {
        let nanos = elapsed.as_nanos().min(i64::MAX as u128) as i64;
        self.histogram.update(nanos);
    }

    /// Run `f` and record how long it took.
    pub fn time<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let started = Instant::now();
        let result = f();
        self.update(started.elapsed());
        result
    }

    /// Start timing; the elapsed time is recorded on [`TimerContext::stop`] or drop.
    pub fn start(&self) -> TimerContext<'_> {
        TimerContext {
            timer: self,
            started: Instant::now(),
            stopped: false,
        }
    }

    pub fn count(&self) -> u64 {
        self.histogram.count()
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.histogram.snapshot()
    }

    pub fn reservoir(&self) -> &Reservoir {
        self.histogram.reservoir()
    }
}

impl SnapshotSource for Timer {
    type Summary = Arc<Snapshot>;

    fn snapshot(&self) -> Arc<Snapshot> {
        self.histogram.snapshot()
    }
}

/// Running measurement started by [`Timer::start`].
#[derive(Debug)]
pub struct TimerContext<'a> {
    timer: &'a Timer,
    started: Instant,
    stopped: bool,
}

impl TimerContext<'_> {
    /// Record the elapsed time and return it.
    pub fn stop(mut self) -> Duration {
        self.record()
    }

    fn record(&mut self) -> Duration {
        let elapsed = self.started.elapsed();
        if !self.stopped {
            self.stopped = true;
            self.timer.update(elapsed);
        }
        elapsed
    }
}

impl Drop for TimerContext<'_> {
    fn drop(&mut self) {
        self.record();
    }
}
