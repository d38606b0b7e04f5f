//! Store Configuration
//!
//! A zero duration plays the role of "non-positive" in both fields:
//! a zero `default_ttl` means entries without an explicit TTL never expire,
//! and a zero `sweep_interval` disables the background sweeper.

use std::time::Duration;

/// Default lifetime for entries set without an explicit TTL (never expire).
pub const DEFAULT_TTL: Duration = Duration::ZERO;

/// Default cadence of the background expiry sweeper.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for a [`TtlStore`](crate::storage::TtlStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Fallback lifetime for entries set without an explicit TTL.
    /// `Duration::ZERO` means such entries never expire.
    pub default_ttl: Duration,

    /// Interval between background sweeps.
    /// `Duration::ZERO` disables the sweeper; expired entries are then only
    /// hidden from reads and reclaimed by explicit deletes.
    pub sweep_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Disable the background sweeper.
    pub fn without_sweeper(mut self) -> Self {
        self.sweep_interval = Duration::ZERO;
        self
    }

    /// Returns true if a background sweeper should run.
    pub fn sweeper_enabled(&self) -> bool {
        !self.sweep_interval.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.default_ttl, Duration::ZERO);
        assert_eq!(config.sweep_interval, Duration::from_secs(1));
        assert!(config.sweeper_enabled());
    }

    #[test]
    fn test_builder() {
        let config = StoreConfig::new()
            .with_default_ttl(Duration::from_secs(600))
            .with_sweep_interval(Duration::from_millis(250));

        assert_eq!(config.default_ttl, Duration::from_secs(600));
        assert_eq!(config.sweep_interval, Duration::from_millis(250));

        let config = config.without_sweeper();
        assert!(!config.sweeper_enabled());
    }
}
