// src/snapshot_cache.rs
//
// TTL cache over any snapshot source
//
// Pull-based monitoring systems read several values of the same metric one
// request at a time (p95, then p99, then mean). Serving them all from one
// memoized snapshot keeps the values mutually consistent.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::api::SnapshotSource;
use crate::clock::Clock;

/// Cached summary with the time it was taken
#[derive(Debug, Clone)]
struct CachedSnapshot<T> {
    summary: T,
    captured_at_ms: u64,
}

/// Memoizes the wrapped source's snapshot for `ttl`.
///
/// Within the TTL the cached summary is returned unchanged and the wrapped
/// source is not touched, so none of its reset side effects run. The first
/// reader past expiry recomputes while holding the cache lock; readers that
/// arrive meanwhile wait and then get the fresh value. Writers recording into
/// the wrapped source are never blocked by the cache.
///
/// # Usage Pattern
///
/// ```
/// use hdrwin::api::{CachingSnapshotSource, MockClock, SnapshotSource, WindowCounter};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let clock = Arc::new(MockClock::new(0));
/// let counter = WindowCounter::never_reset();
/// let cached = CachingSnapshotSource::new(counter, Duration::from_secs(5), clock.clone());
///
/// cached.inner().add(3);
/// assert_eq!(cached.snapshot(), 3);
/// cached.inner().add(4);
/// assert_eq!(cached.snapshot(), 3);      // served from cache
///
/// clock.advance(Duration::from_secs(5));
/// assert_eq!(cached.snapshot(), 7);      // TTL elapsed
/// ```
pub struct CachingSnapshotSource<S: SnapshotSource> {
    inner: S,
    ttl_ms: u64,
    clock: Arc<dyn Clock>,
    cached: Mutex<Option<CachedSnapshot<S::Summary>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<S: SnapshotSource> CachingSnapshotSource<S> {
    /// Wrap `inner`; a zero `ttl` recomputes on every call.
    pub fn new(inner: S, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            ttl_ms: ttl.as_millis().min(u128::from(u64::MAX)) as u64,
            clock,
            cached: Mutex::new(None),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// The wrapped source, for the write path.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Drop the cached snapshot so the next read recomputes.
    pub fn invalidate(&self) {
        self.cached.lock().take();
        tracing::debug!("Invalidated cached snapshot");
    }

    /// Hit/miss counters and the age of the cached entry.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now_millis();
        let age = self
            .cached
            .lock()
            .as_ref()
            .map(|entry| Duration::from_millis(now.saturating_sub(entry.captured_at_ms)));
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            age,
        }
    }
}

impl<S: SnapshotSource> SnapshotSource for CachingSnapshotSource<S> {
    type Summary = S::Summary;

    fn snapshot(&self) -> S::Summary {
        let now = self.clock.now_millis();
        let mut cached = self.cached.lock();

        if let Some(entry) = cached.as_ref() {
            let age_ms = now.saturating_sub(entry.captured_at_ms);
            if age_ms < self.ttl_ms {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("Snapshot cache HIT (age: {} ms)", age_ms);
                return entry.summary.clone();
            }
            tracing::trace!("Snapshot cache EXPIRED (age: {} ms)", age_ms);
        } else {
            tracing::trace!("Snapshot cache MISS");
        }

        let summary = self.inner.snapshot();
        *cached = Some(CachedSnapshot {
            summary: summary.clone(),
            captured_at_ms: now,
        });
        self.misses.fetch_add(1, Ordering::Relaxed);
        summary
    }
}

impl<S: SnapshotSource + std::fmt::Debug> std::fmt::Debug for CachingSnapshotSource<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingSnapshotSource")
            .field("inner", &self.inner)
            .field("ttl_ms", &self.ttl_ms)
            .finish()
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered from the cached snapshot
    pub hits: u64,
    /// Reads that recomputed from the wrapped source
    pub misses: u64,
    /// Age of the cached snapshot, if any
    pub age: Option<Duration>,
}

impl CacheStats {
    /// Fraction of reads answered from cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        }
    }
}
