// src/top/windowed.rs
//
// Top tracker rotated by the same reset policies as histograms.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::api::SnapshotSource;
use crate::clock::Clock;
use crate::config::{ConfigError, ResetPolicy, TopConfig};
use crate::rotation::RotationGuard;
use crate::top::concurrent::ConcurrentTop;
use crate::top::position::Position;

#[derive(Debug)]
enum TopPolicy {
    ResetOnSnapshot,
    ResetPeriodically(RotationGuard),
    Uniform,
}

/// [`ConcurrentTop`] with a reset policy.
///
/// - on snapshot: each read drains the tracker atomically
/// - periodically: cleared when the period elapses, checked on every update and read;
///   an update landing between the winning rotation CAS and the clear goes
///   out with the old window
/// - never: positions accumulate for the tracker's lifetime
#[derive(Debug)]
pub struct WindowedTop {
    top: ConcurrentTop,
    policy: TopPolicy,
    clock: Arc<dyn Clock>,
}

impl WindowedTop {
    pub fn new(config: &TopConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        let top = ConcurrentTop::new(config)?;
        let policy = match config.reset_policy {
            ResetPolicy::OnSnapshot => TopPolicy::ResetOnSnapshot,
            ResetPolicy::Periodically(period) => {
                TopPolicy::ResetPeriodically(RotationGuard::new(period, clock.now_millis())?)
            }
            ResetPolicy::Never => TopPolicy::Uniform,
        };
        Ok(Self { top, policy, clock })
    }

    pub fn update<F>(&self, timestamp_ms: u64, latency_nanos: i64, description: F) -> bool
    where
        F: FnOnce() -> String,
    {
        self.rotate_if_due();
        self.top.update(timestamp_ms, latency_nanos, description)
    }

    /// Offer an operation that ended now.
    pub fn update_duration<F>(&self, latency: Duration, description: F) -> bool
    where
        F: FnOnce() -> String,
    {
        self.rotate_if_due();
        self.top.update_duration(self.clock.now_millis(), latency, description)
    }

    /// Positions of the current window, applying the policy's read semantics.
    pub fn positions_in_descending_order(&self) -> Vec<Position> {
        match &self.policy {
            TopPolicy::ResetOnSnapshot => self.top.take(),
            TopPolicy::ResetPeriodically(_) => {
                self.rotate_if_due();
                self.top.positions_in_descending_order()
            }
            TopPolicy::Uniform => self.top.positions_in_descending_order(),
        }
    }

    pub fn reset(&self) {
        self.top.reset();
    }

    /// The live tracker, for merges and inspection without policy side effects.
    pub fn tracker(&self) -> &ConcurrentTop {
        &self.top
    }

    fn rotate_if_due(&self) {
        if let TopPolicy::ResetPeriodically(guard) = &self.policy {
            let now = self.clock.now_millis();
            if guard.try_rotate(now) {
                let discarded = self.top.take();
                debug!("rotated top window at {} ms, discarded {} positions", now, discarded.len());
            }
        }
    }
}

impl SnapshotSource for WindowedTop {
    type Summary = Vec<Position>;

    fn snapshot(&self) -> Vec<Position> {
        self.positions_in_descending_order()
    }
}
