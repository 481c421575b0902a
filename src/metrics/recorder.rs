// src/metrics/recorder.rs
//
// Concurrent-safe interval recorder over an HDR histogram.

use hdrhistogram::{CreationError, Histogram};
use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::config::{ConfigError, HistogramConfig, OverflowResolver};

/// Construction parameters, kept so an empty histogram can be built
/// without looking at the live one.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    lowest: u64,
    highest: u64,
    digits: u8,
    auto_resize: bool,
}

impl Bounds {
    fn of(hdr: &Histogram<u64>) -> Self {
        Self {
            lowest: hdr.low(),
            highest: hdr.high(),
            digits: hdr.sigfig(),
            auto_resize: hdr.is_auto_resize(),
        }
    }

    fn empty(&self) -> Result<Histogram<u64>, CreationError> {
        let mut hdr = Histogram::new_with_bounds(self.lowest, self.highest, self.digits)?;
        hdr.auto(self.auto_resize);
        Ok(hdr)
    }
}

/// Histogram writers record into, tagged with the rotation it belongs to.
struct Interval {
    hdr: Histogram<u64>,
    generation: u64,
}

/// Reader-owned histograms; writers never touch this lock.
struct ReaderState {
    /// Everything drained from the active interval since the last clear.
    accumulated: Histogram<u64>,
    /// Empty histogram swapped in for the active one on every read.
    spare: Histogram<u64>,
    /// Generation `accumulated` was collected in.
    generation: u64,
}

/// HDR histogram shared between writer threads and readers.
///
/// Writers hold the active lock for a single `record`. Readers hold it only
/// long enough to swap the active histogram with an empty spare; merging,
/// copying and zeroing happen afterwards under a separate reader lock. A
/// clear installs a preallocated histogram and bumps the generation, so data
/// drained before the clear is never folded into the next interval.
pub struct HistogramRecorder {
    bounds: Bounds,
    active: Mutex<Interval>,
    reader: Mutex<ReaderState>,
}

impl HistogramRecorder {
    /// Create a recorder with bounds derived from `config`.
    ///
    /// With no highest trackable value the histogram auto-resizes; the same
    /// happens for `PassThru` so out-of-range values are still recorded.
    pub fn new(config: &HistogramConfig) -> Result<Self, ConfigError> {
        let digits = config.significant_digits;
        let mut hdr = match (config.lowest_discernible_value, config.highest_trackable_value) {
            (Some(lowest), Some((highest, _))) => Histogram::new_with_bounds(lowest, highest, digits)?,
            (None, Some((highest, _))) => Histogram::new_with_max(highest, digits)?,
            (Some(_), None) => return Err(ConfigError::LowestWithoutHighest),
            (None, None) => Histogram::new(digits)?,
        };
        if let Some((_, OverflowResolver::PassThru)) = config.highest_trackable_value {
            hdr.auto(true);
        }
        let reader = ReaderState {
            accumulated: Histogram::new_from(&hdr),
            spare: Histogram::new_from(&hdr),
            generation: 0,
        };
        Ok(Self {
            bounds: Bounds::of(&hdr),
            active: Mutex::new(Interval { hdr, generation: 0 }),
            reader: Mutex::new(reader),
        })
    }

    /// Record a value; values the histogram cannot hold are dropped.
    pub fn record(&self, value: u64) {
        if let Err(e) = self.active.lock().hdr.record(value) {
            trace!("dropping value {} outside histogram range: {}", value, e);
        }
    }

    /// Return everything recorded since the previous call and start a new interval.
    pub fn take_and_reset(&self) -> Histogram<u64> {
        let mut reader = self.reader.lock();
        self.drain_active(&mut reader);
        let fresh = Histogram::new_from(&reader.accumulated);
        std::mem::replace(&mut reader.accumulated, fresh)
    }

    /// Copy of the current interval without clearing it.
    pub fn peek(&self) -> Histogram<u64> {
        let mut reader = self.reader.lock();
        self.drain_active(&mut reader);
        reader.accumulated.clone()
    }

    /// Clear the current interval, discarding its contents, and return how
    /// many values were still pending in the active histogram.
    ///
    /// The replacement is allocated before the lock is taken; values recorded
    /// before the swap belong to the discarded interval.
    pub fn reset(&self) -> u64 {
        match self.bounds.empty() {
            Ok(fresh) => {
                let discarded = {
                    let mut active = self.active.lock();
                    active.generation += 1;
                    std::mem::replace(&mut active.hdr, fresh)
                };
                discarded.len()
            }
            Err(e) => {
                warn!("cannot allocate empty histogram ({}), clearing in place", e);
                let mut active = self.active.lock();
                active.generation += 1;
                let pending = active.hdr.len();
                active.hdr.reset();
                pending
            }
        }
    }

    /// Number of counts slots backing the active histogram.
    pub fn distinct_values(&self) -> usize {
        self.active.lock().hdr.distinct_values()
    }

    fn drain_active(&self, reader: &mut ReaderState) {
        let generation = {
            let mut active = self.active.lock();
            std::mem::swap(&mut active.hdr, &mut reader.spare);
            active.generation
        };
        if reader.generation != generation {
            reader.accumulated.reset();
            reader.generation = generation;
        }
        let ReaderState { accumulated, spare, .. } = reader;
        if let Err(e) = accumulated.add(&*spare) {
            warn!("failed to merge interval into accumulated histogram: {}", e);
        }
        spare.reset();
    }
}

impl std::fmt::Debug for HistogramRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let active = self.active.lock();
        f.debug_struct("HistogramRecorder")
            .field("pending", &active.hdr.len())
            .field("generation", &active.generation)
            .field("low", &active.hdr.low())
            .field("high", &active.hdr.high())
            .field("sigfig", &active.hdr.sigfig())
            .finish()
    }
}
