//! Histogram-backed instruments
//!
//! Values flow through a fixed pipeline: overflow resolution, then the
//! reset-policy accumulator holding an HDR recorder. Reads go the other way,
//! optionally through the snapshot cache.

pub mod accumulator;
pub mod builder;
pub mod recorder;
pub mod reservoir;
pub mod snapshot;
pub mod timer;

pub use accumulator::Accumulator;
pub use builder::HdrBuilder;
pub use recorder::HistogramRecorder;
pub use reservoir::{OverflowGuard, Reservoir};
pub use snapshot::Snapshot;
pub use timer::{Histogram, Timer, TimerContext};
