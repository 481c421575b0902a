// src/constants.rs
//
// Centralized defaults for hdrwin instruments to avoid hardcoded values
// throughout the codebase

use crate::config::ResetPolicy;

// ============================================================================
// Histogram Configuration Constants
// ============================================================================

/// Default number of significant value digits kept by histogram recorders (2)
pub const DEFAULT_SIGNIFICANT_DIGITS: u8 = 2;

/// Highest number of significant value digits supported by the recorder
pub const MAX_SIGNIFICANT_DIGITS: u8 = 5;

/// Default reset policy for histograms, timers and reservoirs
pub const DEFAULT_RESET_POLICY: ResetPolicy = ResetPolicy::OnSnapshot;

/// Percentiles kept in snapshots unless snapshot optimization is switched off.
///
/// Matches the quantile set most registries and JMX-style reporters publish
/// (median, 75th, 90th, 95th, 98th, 99th and 99.9th).
pub const DEFAULT_PERCENTILES: [f64; 7] = [0.5, 0.75, 0.9, 0.95, 0.98, 0.99, 0.999];

/// Fixed per-reservoir bookkeeping added on top of the counts arrays when
/// estimating a footprint (bytes)
pub const RESERVOIR_BASE_FOOTPRINT_BYTES: usize = 512;

// ============================================================================
// Top Tracker Configuration Constants
// ============================================================================

/// Default number of slowest positions retained by a top tracker (10)
pub const DEFAULT_TOP_SIZE: usize = 10;

/// Default slow threshold: every positive latency qualifies
pub const DEFAULT_SLOW_THRESHOLD_NANOS: u64 = 0;

/// Default maximum description length in characters (1000)
pub const DEFAULT_MAX_DESCRIPTION_LENGTH: usize = 1000;
