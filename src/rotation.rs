// src/rotation.rs
//
// Time-anchored rotation guard shared by every periodically resetting
// instrument, so co-configured instruments observe the same elapsed-time
// boundary.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::ConfigError;

/// Elects exactly one caller per elapsed period to perform a rotation.
///
/// The anchor is swapped with a compare-and-swap; the caller whose CAS
/// succeeds owns the rotation, every other caller proceeds without rotating.
/// A clock moving backwards never triggers a rotation, it only delays the
/// next one.
#[derive(Debug)]
pub struct RotationGuard {
    period_ms: u64,
    anchor_ms: AtomicU64,
}

impl RotationGuard {
    pub fn new(period: Duration, now_ms: u64) -> Result<Self, ConfigError> {
        let period_ms = period.as_millis().min(u128::from(u64::MAX)) as u64;
        if period_ms == 0 {
            return Err(ConfigError::NonPositivePeriod { period });
        }
        Ok(Self {
            period_ms,
            anchor_ms: AtomicU64::new(now_ms),
        })
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// Timestamp of the last rotation (or of construction).
    pub fn anchor_millis(&self) -> u64 {
        self.anchor_ms.load(Ordering::Acquire)
    }

    /// Returns `true` when the caller has won the right to rotate at `now_ms`.
    ///
    /// The winner clears after its CAS succeeds. A value written by another
    /// caller between that CAS and the clear lands in the discarded window,
    /// even though its timestamp is already past the boundary; it is never
    /// counted in both windows.
    pub fn try_rotate(&self, now_ms: u64) -> bool {
        let anchor = self.anchor_ms.load(Ordering::Acquire);
        if now_ms.saturating_sub(anchor) < self.period_ms {
            return false;
        }
        self.anchor_ms
            .compare_exchange(anchor, now_ms, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
