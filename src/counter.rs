// src/counter.rs
//
// Additive counter with the same three reset policies as histograms.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::api::SnapshotSource;
use crate::clock::{system_clock, Clock};
use crate::config::{ConfigError, ResetPolicy};
use crate::rotation::RotationGuard;

#[derive(Debug)]
enum CounterPolicy {
    ResetOnSnapshot,
    ResetPeriodically {
        guard: RotationGuard,
        clock: Arc<dyn Clock>,
    },
    Uniform,
}

/// Lock-free windowed sum.
///
/// `add` is a single atomic add (preceded by a rotation check for the
/// periodic policy). `value()` is the gauge read: under reset-on-snapshot it
/// returns the sum and clears it in one atomic swap, so concurrent adds land
/// either in the returned value or in the next one. Under the periodic
/// policy an add landing between the winning rotation CAS and the swap to
/// zero is discarded with the old window.
#[derive(Debug)]
pub struct WindowCounter {
    sum: AtomicI64,
    policy: CounterPolicy,
    #[cfg(test)]
    discarded: AtomicI64,
}

impl WindowCounter {
    pub fn new(policy: ResetPolicy, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        let policy = match policy {
            ResetPolicy::OnSnapshot => CounterPolicy::ResetOnSnapshot,
            ResetPolicy::Periodically(period) => CounterPolicy::ResetPeriodically {
                guard: RotationGuard::new(period, clock.now_millis())?,
                clock,
            },
            ResetPolicy::Never => CounterPolicy::Uniform,
        };
        Ok(Self::with_policy(policy))
    }

    fn with_policy(policy: CounterPolicy) -> Self {
        Self {
            sum: AtomicI64::new(0),
            policy,
            #[cfg(test)]
            discarded: AtomicI64::new(0),
        }
    }

    pub fn reset_on_snapshot() -> Self {
        Self::with_policy(CounterPolicy::ResetOnSnapshot)
    }

    pub fn reset_periodically(period: Duration) -> Result<Self, ConfigError> {
        Self::new(ResetPolicy::Periodically(period), system_clock())
    }

    pub fn never_reset() -> Self {
        Self::with_policy(CounterPolicy::Uniform)
    }

    pub fn add(&self, delta: i64) {
        self.rotate_if_due();
        self.sum.fetch_add(delta, Ordering::AcqRel);
    }

    /// Current sum; never clears.
    pub fn sum(&self) -> i64 {
        self.rotate_if_due();
        self.sum.load(Ordering::Acquire)
    }

    /// Gauge read; clears the sum under reset-on-snapshot.
    pub fn value(&self) -> i64 {
        match self.policy {
            CounterPolicy::ResetOnSnapshot => self.sum.swap(0, Ordering::AcqRel),
            _ => self.sum(),
        }
    }

    fn rotate_if_due(&self) {
        if let CounterPolicy::ResetPeriodically { guard, clock } = &self.policy {
            let now = clock.now_millis();
            if guard.try_rotate(now) {
                let previous = self.sum.swap(0, Ordering::AcqRel);
                #[cfg(test)]
                self.discarded.fetch_add(previous, Ordering::AcqRel);
                debug!("rotated counter window at {} ms, previous sum {}", now, previous);
            }
        }
    }
}

impl SnapshotSource for WindowCounter {
    type Summary = i64;

    fn snapshot(&self) -> i64 {
        self.value()
    }
}
