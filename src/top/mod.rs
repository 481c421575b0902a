//! Top-K trackers of the slowest operations
//!
//! A tracker keeps at most K [`Position`]s ordered by descending latency.
//! Latencies that are not positive or fall below the slow threshold are
//! ignored, and the description closure runs only for operations that can
//! still enter the top.

pub mod buffer;
pub mod builder;
pub mod concurrent;
pub mod position;
pub mod windowed;

pub use buffer::TopBuffer;
pub use builder::TopBuilder;
pub use concurrent::ConcurrentTop;
pub use position::Position;
pub use windowed::WindowedTop;

/// Merge target for [`TopBuffer::add_into`] and [`ConcurrentTop::add_into`].
///
/// Offered positions are already admitted by their source, so the sink only
/// applies its own capacity and ordering.
pub trait PositionSink {
    /// Returns whether the position was kept.
    fn offer(&mut self, position: Position) -> bool;
}

/// The latency as unsigned nanos if it may enter a tracker with `threshold_nanos`.
pub(crate) fn admissible_latency(latency_nanos: i64, threshold_nanos: u64) -> Option<u64> {
    if latency_nanos <= 0 {
        return None;
    }
    let latency = latency_nanos as u64;
    (latency >= threshold_nanos).then_some(latency)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admissible_latency() {
        assert_eq!(admissible_latency(-1, 0), None);
        assert_eq!(admissible_latency(0, 0), None);
        assert_eq!(admissible_latency(1, 0), Some(1));
        assert_eq!(admissible_latency(99, 100), None);
        assert_eq!(admissible_latency(100, 100), Some(100));
    }
}
