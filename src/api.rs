// src/api.rs
//! # hdrwin Public API
//!
//! The stable surface of the library: the snapshot capability every
//! instrument exposes, plus re-exports of the builders and instruments.
//!
//! ## Core Concepts
//!
//! - **SnapshotSource**: anything that can summarize what it accumulated
//! - **Reset policies**: on-snapshot, periodic (tumbling window) or never
//! - **Top trackers**: the K slowest operations with their descriptions
//!
//! ## Quick Start
//!
//! ```rust
//! use hdrwin::api::{HdrBuilder, SnapshotSource};
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), hdrwin::api::ConfigError> {
//! let timer = HdrBuilder::new()
//!     .reset_periodically(Duration::from_secs(60))
//!     .with_snapshot_cache_ttl(Duration::from_secs(5))
//!     .build_timer()?;
//!
//! timer.update(Duration::from_millis(12));
//! let snapshot = timer.snapshot();
//! assert_eq!(snapshot.count(), 1);
//! # Ok(())
//! # }
//! ```

/// Read side of every instrument.
///
/// Safe to call repeatedly and concurrently with writers.
pub trait SnapshotSource: Send + Sync {
    /// Histogram-backed sources return a shared [`Snapshot`], counters a plain
    /// integer, top trackers their ordered positions.
    type Summary: Clone + Send + Sync;

    fn snapshot(&self) -> Self::Summary;
}

/// Configuration values and errors
pub use crate::config::{ConfigError, HistogramConfig, OverflowResolver, ResetPolicy, TopConfig};

/// Time sources
pub use crate::clock::{Clock, MockClock, SystemClock};

/// Histogram-backed instruments
pub use crate::metrics::{Histogram, HdrBuilder, Reservoir, Snapshot, Timer, TimerContext};

/// Windowed additive counter
pub use crate::counter::WindowCounter;

/// Snapshot caching decorator usable over any source
pub use crate::snapshot_cache::{CacheStats, CachingSnapshotSource};

/// Top trackers
pub use crate::top::{ConcurrentTop, Position, PositionSink, TopBuffer, TopBuilder, WindowedTop};
