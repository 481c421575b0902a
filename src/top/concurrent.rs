// src/top/concurrent.rs
//
// Thread-safe top tracker.
//
// An atomic admission floor (the latency a newcomer must exceed) is checked
// before anything else, so the common case of a fast operation costs one
// atomic load and never touches the lock or the description closure.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use super::buffer::{duration_nanos, Slots};
use super::{admissible_latency, PositionSink};
use crate::config::{ConfigError, TopConfig};
use crate::top::buffer::TopBuffer;
use crate::top::position::Position;

/// Top tracker safe to update from any number of threads.
///
/// With K = 1 writers claim the slot with a compare-and-swap on the floor and
/// only then build the description. With K > 1 each accepted update holds
/// the lock for one bounded insertion.
#[derive(Debug)]
pub struct ConcurrentTop {
    slots: Mutex<Slots>,
    floor: AtomicU64,
    size: usize,
    slow_threshold_nanos: u64,
    max_description_length: usize,
}

impl ConcurrentTop {
    /// Reset policy in `config` is ignored; see [`super::WindowedTop`].
    pub fn new(config: &TopConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_limits(
            config.size,
            config.slow_threshold_nanos(),
            config.max_description_length,
        ))
    }

    pub(crate) fn with_limits(size: usize, slow_threshold_nanos: u64, max_description_length: usize) -> Self {
        Self {
            slots: Mutex::new(Slots::with_capacity(size)),
            floor: AtomicU64::new(0),
            size,
            slow_threshold_nanos,
            max_description_length,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn slow_threshold(&self) -> Duration {
        Duration::from_nanos(self.slow_threshold_nanos)
    }

    pub fn max_description_length(&self) -> usize {
        self.max_description_length
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offer one operation; see [`TopBuffer::update`].
    pub fn update<F>(&self, timestamp_ms: u64, latency_nanos: i64, description: F) -> bool
    where
        F: FnOnce() -> String,
    {
        let Some(latency) = admissible_latency(latency_nanos, self.slow_threshold_nanos) else {
            return false;
        };
        if self.size == 1 {
            if !self.claim_single(latency) {
                return false;
            }
        } else if latency <= self.floor.load(Ordering::Acquire) {
            return false;
        }
        let position = Position::truncated(timestamp_ms, latency, description(), self.max_description_length);
        self.insert(position)
    }

    pub fn update_duration<F>(&self, timestamp_ms: u64, latency: Duration, description: F) -> bool
    where
        F: FnOnce() -> String,
    {
        self.update(timestamp_ms, duration_nanos(latency), description)
    }

    /// Clear every position.
    pub fn reset(&self) {
        let mut slots = self.slots.lock();
        slots.clear();
        self.floor.store(0, Ordering::Release);
    }

    /// Remove and return every position in one step.
    pub fn take(&self) -> Vec<Position> {
        let mut slots = self.slots.lock();
        let taken = slots.take();
        self.floor.store(0, Ordering::Release);
        taken
    }

    /// Point-in-time copy, sorted descending; the tracker is not modified.
    pub fn positions_in_descending_order(&self) -> Vec<Position> {
        let mut copy = self.empty_copy();
        self.add_into(&mut copy);
        copy.into_positions()
    }

    /// Offer every held position to `sink`. The lock is held only while the
    /// positions are copied out, not while `sink` is fed.
    pub fn add_into<S: PositionSink + ?Sized>(&self, sink: &mut S) {
        let held = self.slots.lock().to_vec();
        for position in held {
            sink.offer(position);
        }
    }

    /// Single-writer tracker with the same size and limits, holding nothing.
    pub fn empty_copy(&self) -> TopBuffer {
        TopBuffer::with_limits(self.size, self.slow_threshold_nanos, self.max_description_length)
    }

    fn claim_single(&self, latency: u64) -> bool {
        let mut current = self.floor.load(Ordering::Acquire);
        loop {
            if latency <= current {
                return false;
            }
            match self
                .floor
                .compare_exchange_weak(current, latency, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    fn offer_shared(&self, position: Position) -> bool {
        if self.size == 1 && !self.claim_single(position.latency_nanos()) {
            return false;
        }
        self.insert(position)
    }

    fn insert(&self, position: Position) -> bool {
        let latency = position.latency_nanos();
        let mut slots = self.slots.lock();
        let inserted = slots.insert(position);
        if self.size > 1 {
            self.floor.store(slots.floor(), Ordering::Release);
        }
        if !inserted {
            trace!("latency {} ns lost the race for the top", latency);
        }
        inserted
    }
}

impl PositionSink for ConcurrentTop {
    fn offer(&mut self, position: Position) -> bool {
        self.offer_shared(position)
    }
}

impl PositionSink for &ConcurrentTop {
    fn offer(&mut self, position: Position) -> bool {
        self.offer_shared(position)
    }
}
