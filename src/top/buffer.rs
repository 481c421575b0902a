// src/top/buffer.rs
//
// Bounded descending slot storage and the single-writer top tracker.

use std::time::Duration;

use tracing::trace;

use super::{admissible_latency, PositionSink};
use crate::config::{ConfigError, TopConfig};
use crate::top::position::Position;

/// Up to K positions sorted by descending latency.
#[derive(Debug, Clone)]
pub(crate) enum Slots {
    Single(Option<Position>),
    Multi { capacity: usize, held: Vec<Position> },
}

impl Slots {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        if capacity == 1 {
            Slots::Single(None)
        } else {
            Slots::Multi {
                capacity,
                held: Vec::with_capacity(capacity),
            }
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        match self {
            Slots::Single(_) => 1,
            Slots::Multi { capacity, .. } => *capacity,
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Slots::Single(slot) => usize::from(slot.is_some()),
            Slots::Multi { held, .. } => held.len(),
        }
    }

    /// Latency a newcomer must exceed, or 0 while free slots remain.
    pub(crate) fn floor(&self) -> u64 {
        match self {
            Slots::Single(slot) => slot.as_ref().map_or(0, Position::latency_nanos),
            Slots::Multi { capacity, held } if held.len() == *capacity => {
                held.last().map_or(0, Position::latency_nanos)
            }
            Slots::Multi { .. } => 0,
        }
    }

    /// Insert if the latency beats the floor. Equal latencies never evict.
    pub(crate) fn insert(&mut self, position: Position) -> bool {
        if position.latency_nanos() <= self.floor() {
            return false;
        }
        match self {
            Slots::Single(slot) => {
                *slot = Some(position);
            }
            Slots::Multi { capacity, held } => {
                if held.len() == *capacity {
                    held.pop();
                }
                // after every held position with latency >= the newcomer's
                let at = held.partition_point(|p| p.latency_nanos() >= position.latency_nanos());
                held.insert(at, position);
            }
        }
        true
    }

    pub(crate) fn clear(&mut self) {
        match self {
            Slots::Single(slot) => *slot = None,
            Slots::Multi { held, .. } => held.clear(),
        }
    }

    pub(crate) fn to_vec(&self) -> Vec<Position> {
        match self {
            Slots::Single(slot) => slot.iter().cloned().collect(),
            Slots::Multi { held, .. } => held.clone(),
        }
    }

    pub(crate) fn take(&mut self) -> Vec<Position> {
        match self {
            Slots::Single(slot) => slot.take().into_iter().collect(),
            Slots::Multi { held, capacity } => std::mem::replace(held, Vec::with_capacity(*capacity)),
        }
    }
}

/// Top tracker for a single writer.
///
/// Mutation takes `&mut self`, so it needs no internal synchronization. Used
/// as the merge target for point-in-time reads of a [`super::ConcurrentTop`]
/// and wherever access is already serialized.
#[derive(Debug, Clone)]
pub struct TopBuffer {
    slots: Slots,
    slow_threshold_nanos: u64,
    max_description_length: usize,
}

impl TopBuffer {
    /// Reset policy in `config` is ignored; a buffer is cleared explicitly.
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
            slots: Slots::with_capacity(size),
            slow_threshold_nanos,
            max_description_length,
        }
    }

    /// Same size and limits, no positions.
    pub fn empty_like(&self) -> Self {
        Self::with_limits(self.size(), self.slow_threshold_nanos, self.max_description_length)
    }

    pub fn size(&self) -> usize {
        self.slots.capacity()
    }

    pub fn slow_threshold(&self) -> Duration {
        Duration::from_nanos(self.slow_threshold_nanos)
    }

    pub fn max_description_length(&self) -> usize {
        self.max_description_length
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.len() == 0
    }

    /// Offer one operation. `description` is only called when the latency
    /// can make it into the top. Returns whether the position was kept.
    pub fn update<F>(&mut self, timestamp_ms: u64, latency_nanos: i64, description: F) -> bool
    where
        F: FnOnce() -> String,
    {
        let Some(latency) = admissible_latency(latency_nanos, self.slow_threshold_nanos) else {
            return false;
        };
        if latency <= self.slots.floor() {
            trace!("latency {} ns does not beat the current top", latency);
            return false;
        }
        let position = Position::truncated(timestamp_ms, latency, description(), self.max_description_length);
        self.slots.insert(position)
    }

    pub fn update_duration<F>(&mut self, timestamp_ms: u64, latency: Duration, description: F) -> bool
    where
        F: FnOnce() -> String,
    {
        self.update(timestamp_ms, duration_nanos(latency), description)
    }

    pub fn reset(&mut self) {
        self.slots.clear();
    }

    pub fn positions_in_descending_order(&self) -> Vec<Position> {
        self.slots.to_vec()
    }

    pub fn into_positions(mut self) -> Vec<Position> {
        self.slots.take()
    }

    /// Offer every held position to `sink`; this buffer is left unchanged.
    pub fn add_into<S: PositionSink + ?Sized>(&self, sink: &mut S) {
        for position in self.slots.to_vec() {
            sink.offer(position);
        }
    }
}

impl PositionSink for TopBuffer {
    fn offer(&mut self, position: Position) -> bool {
        self.slots.insert(position)
    }
}

pub(crate) fn duration_nanos(latency: Duration) -> i64 {
    latency.as_nanos().min(i64::MAX as u128) as i64
}
