// src/metrics/builder.rs
//
// Fluent builder producing reservoirs, histograms and timers from one
// HistogramConfig.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::clock::{system_clock, Clock};
use crate::config::{sorted_percentiles, ConfigError, HistogramConfig, OverflowResolver, ResetPolicy};
use crate::constants::RESERVOIR_BASE_FOOTPRINT_BYTES;
use crate::metrics::reservoir::Reservoir;
use crate::metrics::timer::{Histogram, Timer};

/// Builder for histogram-backed instruments.
///
/// Defaults: two significant digits, reset on snapshot, no value bounds, no
/// snapshot cache and the standard predefined percentiles. Each `build_*`
/// call validates the accumulated settings and creates an independent
/// instrument, so one builder can stamp out many of them.
///
/// ```
/// use hdrwin::api::{HdrBuilder, OverflowResolver};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), hdrwin::api::ConfigError> {
/// let builder = HdrBuilder::new()
///     .with_significant_digits(3)
///     .with_highest_trackable_value(60_000_000_000, OverflowResolver::ReduceToHighestTrackable)
///     .reset_periodically(Duration::from_secs(30));
///
/// println!("reservoir will use about {} bytes", builder.estimated_footprint_in_bytes()?);
/// let histogram = builder.build_histogram()?;
/// histogram.update(42);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HdrBuilder {
    config: HistogramConfig,
    clock: Arc<dyn Clock>,
}

impl Default for HdrBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HdrBuilder {
    pub fn new() -> Self {
        Self::from_config(HistogramConfig::default())
    }

    /// Start from an existing configuration.
    pub fn from_config(config: HistogramConfig) -> Self {
        Self {
            config,
            clock: system_clock(),
        }
    }

    /// Replace the time source used by periodic resets and the snapshot cache.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn reset_on_snapshot(mut self) -> Self {
        self.config.reset_policy = ResetPolicy::OnSnapshot;
        self
    }

    /// Tumbling window of `period`; validated at build time.
    pub fn reset_periodically(mut self, period: Duration) -> Self {
        self.config.reset_policy = ResetPolicy::Periodically(period);
        self
    }

    pub fn never_reset(mut self) -> Self {
        self.config.reset_policy = ResetPolicy::Never;
        self
    }

    pub fn with_significant_digits(mut self, digits: u8) -> Self {
        self.config.significant_digits = digits;
        self
    }

    /// Requires [`with_highest_trackable_value`](Self::with_highest_trackable_value) as well.
    pub fn with_lowest_discernible_value(mut self, lowest: u64) -> Self {
        self.config.lowest_discernible_value = Some(lowest);
        self
    }

    pub fn with_highest_trackable_value(mut self, highest: u64, resolver: OverflowResolver) -> Self {
        self.config.highest_trackable_value = Some((highest, resolver));
        self
    }

    /// Memoize snapshots for `ttl`; zero disables caching.
    pub fn with_snapshot_cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.snapshot_cache_ttl = Some(ttl);
        self
    }

    pub fn without_snapshot_cache(mut self) -> Self {
        self.config.snapshot_cache_ttl = None;
        self
    }

    /// Keep only these percentiles in snapshots. Order does not matter.
    pub fn with_predefined_percentiles(mut self, percentiles: &[f64]) -> Self {
        self.config.predefined_percentiles = Some(sorted_percentiles(percentiles));
        self
    }

    /// Keep the full histogram in every snapshot so any quantile can be read.
    pub fn without_snapshot_optimization(mut self) -> Self {
        self.config.predefined_percentiles = None;
        self
    }

    pub fn config(&self) -> &HistogramConfig {
        &self.config
    }

    pub fn build_reservoir(&self) -> Result<Reservoir, ConfigError> {
        let reservoir = Reservoir::new(&self.config, Arc::clone(&self.clock))?;
        info!(
            "Built reservoir: policy={:?}, digits={}, highest={:?}, cache_ttl={:?}",
            self.config.reset_policy,
            self.config.significant_digits,
            self.config.highest_trackable_value,
            self.config.effective_cache_ttl()
        );
        Ok(reservoir)
    }

    pub fn build_histogram(&self) -> Result<Histogram, ConfigError> {
        Ok(Histogram::new(self.build_reservoir()?))
    }

    pub fn build_timer(&self) -> Result<Timer, ConfigError> {
        Ok(Timer::new(self.build_reservoir()?))
    }

    /// Conservatively high estimate of one reservoir's memory use.
    pub fn estimated_footprint_in_bytes(&self) -> Result<usize, ConfigError> {
        let reservoir = Reservoir::new(&self.config, Arc::clone(&self.clock))?;
        Ok(RESERVOIR_BASE_FOOTPRINT_BYTES + reservoir.estimated_footprint_in_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::constants::DEFAULT_PERCENTILES;

    #[test]
    fn test_defaults() {
        let builder = HdrBuilder::default();
        let config = builder.config();
        assert_eq!(config.reset_policy, ResetPolicy::OnSnapshot);
        assert_eq!(config.significant_digits, 2);
        assert_eq!(config.predefined_percentiles.as_deref(), Some(&DEFAULT_PERCENTILES[..]));
        assert!(config.snapshot_cache_ttl.is_none());
    }

    #[test]
    fn test_percentiles_are_sorted() {
        let builder = HdrBuilder::new().with_predefined_percentiles(&[0.99, 0.5, 0.9]);
        assert_eq!(builder.config().predefined_percentiles, Some(vec![0.5, 0.9, 0.99]));
    }

    #[test]
    fn test_invalid_settings_fail_at_build() {
        let builder = HdrBuilder::new().with_lowest_discernible_value(10);
        assert!(matches!(builder.build_timer(), Err(ConfigError::LowestWithoutHighest)));

        let builder = HdrBuilder::new().with_predefined_percentiles(&[]);
        assert!(matches!(builder.build_reservoir(), Err(ConfigError::EmptyPercentiles)));

        let builder = HdrBuilder::new().with_predefined_percentiles(&[0.5, 1.5]);
        assert!(matches!(
            builder.build_histogram(),
            Err(ConfigError::PercentileOutOfRange(_))
        ));

        let builder = HdrBuilder::new().reset_periodically(Duration::ZERO);
        assert!(builder.estimated_footprint_in_bytes().is_err());
    }

    #[test]
    fn test_builds_independent_instruments() {
        let clock = Arc::new(MockClock::new(0));
        let builder = HdrBuilder::new().never_reset().with_clock(clock);
        let first = builder.build_histogram().unwrap();
        let second = builder.build_histogram().unwrap();

        first.update(7);
        assert_eq!(first.snapshot().count(), 1);
        assert_eq!(second.snapshot().count(), 0);
    }

    #[test]
    fn test_footprint_grows_with_precision() {
        let coarse = HdrBuilder::new()
            .with_highest_trackable_value(3_600_000_000_000, OverflowResolver::Skip)
            .estimated_footprint_in_bytes()
            .unwrap();
        let fine = HdrBuilder::new()
            .with_significant_digits(4)
            .with_highest_trackable_value(3_600_000_000_000, OverflowResolver::Skip)
            .estimated_footprint_in_bytes()
            .unwrap();
        assert!(coarse > RESERVOIR_BASE_FOOTPRINT_BYTES);
        assert!(fine > coarse);
    }

    #[test]
    fn test_builder_is_reusable_after_clone() {
        let base = HdrBuilder::new().with_significant_digits(3);
        let cached = base.clone().with_snapshot_cache_ttl(Duration::from_secs(1));
        assert!(base.config().snapshot_cache_ttl.is_none());
        assert_eq!(cached.config().significant_digits, 3);
        assert!(cached.build_timer().unwrap().reservoir().cache_stats().is_some());
    }
}
