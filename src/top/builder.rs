// src/top/builder.rs
//
// Fluent builder for top trackers.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::clock::{system_clock, Clock};
use crate::config::{ConfigError, ResetPolicy, TopConfig};
use crate::top::buffer::TopBuffer;
use crate::top::concurrent::ConcurrentTop;
use crate::top::windowed::WindowedTop;

/// Builder for [`TopBuffer`], [`ConcurrentTop`] and [`WindowedTop`].
///
/// ```
/// use hdrwin::api::TopBuilder;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), hdrwin::api::ConfigError> {
/// let top = TopBuilder::new()
///     .with_size(5)
///     .with_slow_threshold(Duration::from_millis(100))
///     .reset_periodically(Duration::from_secs(60))
///     .build_windowed()?;
///
/// top.update_duration(Duration::from_millis(250), || "SELECT * FROM orders".to_string());
/// assert_eq!(top.positions_in_descending_order().len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TopBuilder {
    config: TopConfig,
    clock: Arc<dyn Clock>,
}

impl Default for TopBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TopBuilder {
    pub fn new() -> Self {
        Self::from_config(TopConfig::default())
    }

    /// Start from an existing configuration.
    pub fn from_config(config: TopConfig) -> Self {
        Self {
            config,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.config.size = size;
        self
    }

    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.config.slow_threshold = threshold;
        self
    }

    pub fn with_max_description_length(mut self, max_chars: usize) -> Self {
        self.config.max_description_length = max_chars;
        self
    }

    pub fn reset_on_snapshot(mut self) -> Self {
        self.config.reset_policy = ResetPolicy::OnSnapshot;
        self
    }

    pub fn reset_periodically(mut self, period: Duration) -> Self {
        self.config.reset_policy = ResetPolicy::Periodically(period);
        self
    }

    pub fn never_reset(mut self) -> Self {
        self.config.reset_policy = ResetPolicy::Never;
        self
    }

    pub fn config(&self) -> &TopConfig {
        &self.config
    }

    pub fn build_buffer(&self) -> Result<TopBuffer, ConfigError> {
        TopBuffer::new(&self.config)
    }

    pub fn build_concurrent(&self) -> Result<ConcurrentTop, ConfigError> {
        ConcurrentTop::new(&self.config)
    }

    pub fn build_windowed(&self) -> Result<WindowedTop, ConfigError> {
        let top = WindowedTop::new(&self.config, Arc::clone(&self.clock))?;
        info!(
            "Built top tracker: size={}, threshold={:?}, policy={:?}",
            self.config.size, self.config.slow_threshold, self.config.reset_policy
        );
        Ok(top)
    }
}
