// src/config.rs
//
// Immutable configuration values for histograms and top trackers, plus the
// pure validation run before anything is built.

use std::time::Duration;

use clap::ValueEnum;
use thiserror::Error;

use crate::constants::{
    DEFAULT_MAX_DESCRIPTION_LENGTH, DEFAULT_PERCENTILES, DEFAULT_RESET_POLICY,
    DEFAULT_SIGNIFICANT_DIGITS, DEFAULT_SLOW_THRESHOLD_NANOS, DEFAULT_TOP_SIZE,
    MAX_SIGNIFICANT_DIGITS,
};

/// Configuration-time failures. Never produced on the record/snapshot path.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reset period must be positive, got {period:?}")]
    NonPositivePeriod { period: Duration },

    #[error("significant digits must be between 0 and {max}, got {digits}")]
    SignificantDigitsOutOfRange { digits: u8, max: u8 },

    #[error("lowestDiscernibleValue must be >= 1, got {0}")]
    LowestDiscernibleTooSmall(u64),

    #[error("highestTrackableValue must be >= 2, got {0}")]
    HighestTrackableTooSmall(u64),

    #[error("highestTrackableValue ({highest}) must be >= 2 * lowestDiscernibleValue ({lowest})")]
    TrackableRangeTooNarrow { lowest: u64, highest: u64 },

    #[error("lowestDiscernibleValue is specified but highestTrackableValue undefined")]
    LowestWithoutHighest,

    #[error("predefined percentiles must not be empty; disable snapshot optimization instead")]
    EmptyPercentiles,

    #[error("illegal percentiles {0:?} - all values must be between 0 and 1")]
    PercentileOutOfRange(Vec<f64>),

    #[error("top size must be >= 1")]
    EmptyTop,

    #[error("failed to create histogram: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),
}

/// When accumulated state is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetPolicy {
    /// Every snapshot reads and clears.
    OnSnapshot,
    /// Tumbling window: cleared once per elapsed period, independent of reads.
    Periodically(Duration),
    /// Never cleared; the whole lifetime history stays visible.
    Never,
}

impl ResetPolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            ResetPolicy::Periodically(period) if period.as_millis() == 0 => {
                Err(ConfigError::NonPositivePeriod { period: *period })
            }
            _ => Ok(()),
        }
    }
}

impl Default for ResetPolicy {
    fn default() -> Self {
        DEFAULT_RESET_POLICY
    }
}

/// What happens to a value above the highest trackable value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OverflowResolver {
    /// Drop the value and count it as skipped.
    Skip,
    /// Record the highest trackable value instead.
    ReduceToHighestTrackable,
    /// Hand the value to the recorder unchanged (the recorder auto-resizes).
    PassThru,
}

/// Settings shared by reservoirs, histograms and timers.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramConfig {
    pub reset_policy: ResetPolicy,
    pub significant_digits: u8,
    pub lowest_discernible_value: Option<u64>,
    pub highest_trackable_value: Option<(u64, OverflowResolver)>,
    /// `None` disables snapshot caching.
    pub snapshot_cache_ttl: Option<Duration>,
    /// Any order; sorted when an instrument is built. `None` keeps the full
    /// histogram in snapshots.
    pub predefined_percentiles: Option<Vec<f64>>,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            reset_policy: ResetPolicy::default(),
            significant_digits: DEFAULT_SIGNIFICANT_DIGITS,
            lowest_discernible_value: None,
            highest_trackable_value: None,
            snapshot_cache_ttl: None,
            predefined_percentiles: Some(DEFAULT_PERCENTILES.to_vec()),
        }
    }
}

impl HistogramConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reset_policy.validate()?;

        if self.significant_digits > MAX_SIGNIFICANT_DIGITS {
            return Err(ConfigError::SignificantDigitsOutOfRange {
                digits: self.significant_digits,
                max: MAX_SIGNIFICANT_DIGITS,
            });
        }

        if let Some(lowest) = self.lowest_discernible_value {
            if lowest < 1 {
                return Err(ConfigError::LowestDiscernibleTooSmall(lowest));
            }
        }

        if let Some((highest, _)) = self.highest_trackable_value {
            if highest < 2 {
                return Err(ConfigError::HighestTrackableTooSmall(highest));
            }
        }

        match (self.lowest_discernible_value, self.highest_trackable_value) {
            (Some(lowest), Some((highest, _))) if highest < lowest.saturating_mul(2) => {
                return Err(ConfigError::TrackableRangeTooNarrow { lowest, highest });
            }
            (Some(_), None) => return Err(ConfigError::LowestWithoutHighest),
            _ => {}
        }

        if let Some(percentiles) = &self.predefined_percentiles {
            if percentiles.is_empty() {
                return Err(ConfigError::EmptyPercentiles);
            }
            // `contains` is false for NaN, so NaN is rejected here as well.
            if percentiles.iter().any(|p| !(0.0..=1.0).contains(p)) {
                return Err(ConfigError::PercentileOutOfRange(percentiles.clone()));
            }
        }

        Ok(())
    }

    /// Snapshot cache TTL, treating a zero duration as disabled.
    pub fn effective_cache_ttl(&self) -> Option<Duration> {
        self.snapshot_cache_ttl.filter(|ttl| !ttl.is_zero())
    }
}

/// Settings for a top tracker; fixed for its lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct TopConfig {
    pub size: usize,
    pub slow_threshold: Duration,
    pub max_description_length: usize,
    pub reset_policy: ResetPolicy,
}

impl Default for TopConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_TOP_SIZE,
            slow_threshold: Duration::from_nanos(DEFAULT_SLOW_THRESHOLD_NANOS),
            max_description_length: DEFAULT_MAX_DESCRIPTION_LENGTH,
            reset_policy: ResetPolicy::default(),
        }
    }
}

impl TopConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 {
            return Err(ConfigError::EmptyTop);
        }
        self.reset_policy.validate()
    }

    pub fn slow_threshold_nanos(&self) -> u64 {
        self.slow_threshold.as_nanos().min(u128::from(u64::MAX)) as u64
    }
}

/// Returns a sorted copy of `percentiles`.
pub(crate) fn sorted_percentiles(percentiles: &[f64]) -> Vec<f64> {
    let mut sorted = percentiles.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}
