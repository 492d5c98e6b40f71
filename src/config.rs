//! Configuration Module
//!
//! Handles loading and validating memory cache parameters from environment variables.

use std::env;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Default capacity in bytes (4 MiB)
pub const DEFAULT_MEMORY_CAPACITY: u64 = 4 * 1024 * 1024;

/// Fraction of capacity at which LRU eviction becomes eligible
pub const DEFAULT_PRESSURE_FACTOR: f64 = 0.875;

/// Fractional bits kept from the pressure factor when computing max_pressure
const PRESSURE_FACTOR_BITS: u32 = 32;

/// Memory cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Hard admission limit in bytes
    pub memory_capacity: u64,
    /// Fraction of capacity at which LRU eviction starts
    pub pressure_factor: f64,
    /// Interval between timer-driven sweeps
    pub sweep_interval: Duration,
    /// Policy hooks running longer than this are logged as a liveness warning
    pub slow_policy_threshold: Duration,
}

impl Config {
    /// Creates a new Config with the given capacity and defaults for the rest.
    pub fn with_capacity(memory_capacity: u64) -> Self {
        Self {
            memory_capacity,
            ..Self::default()
        }
    }

    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MEMORY_CAPACITY` - Capacity in bytes (default: 4194304)
    /// - `PRESSURE_FACTOR` - LRU pressure threshold as a fraction of capacity (default: 0.875)
    /// - `SWEEP_INTERVAL_MS` - Timer sweep frequency in milliseconds (default: 30000)
    /// - `SLOW_POLICY_MS` - Slow policy hook warning threshold in milliseconds (default: 250)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            memory_capacity: env::var("MEMORY_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.memory_capacity),
            pressure_factor: env::var("PRESSURE_FACTOR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.pressure_factor),
            sweep_interval: env::var("SWEEP_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.sweep_interval),
            slow_policy_threshold: env::var("SLOW_POLICY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.slow_policy_threshold),
        }
    }

    // == Builders ==
    /// Overrides the sweep interval.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Overrides the pressure factor.
    pub fn pressure_factor(mut self, factor: f64) -> Self {
        self.pressure_factor = factor;
        self
    }

    // == Validate ==
    /// Checks that every parameter is usable.
    pub fn validate(&self) -> Result<()> {
        if self.memory_capacity == 0 {
            return Err(CacheError::InvalidConfig(
                "memory capacity must be positive".to_string(),
            ));
        }
        if !(self.pressure_factor > 0.0 && self.pressure_factor <= 1.0) {
            return Err(CacheError::InvalidConfig(format!(
                "pressure factor {} must be in (0, 1]",
                self.pressure_factor
            )));
        }
        if self.sweep_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "sweep interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    // == Max Pressure ==
    /// Usage at or above which entries become LRU candidates.
    ///
    /// Computed as `ceil(capacity * factor)` in integer arithmetic, with the
    /// factor rounded to 32 fractional bits. Exact for the default factor at
    /// any capacity.
    pub fn max_pressure(&self) -> u64 {
        let scale = 1u128 << PRESSURE_FACTOR_BITS;
        let factor = (self.pressure_factor * scale as f64).round() as u128;
        let pressure = (u128::from(self.memory_capacity) * factor).div_ceil(scale);
        u64::try_from(pressure).unwrap_or(u64::MAX)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            pressure_factor: DEFAULT_PRESSURE_FACTOR,
            sweep_interval: Duration::from_secs(30),
            slow_policy_threshold: Duration::from_millis(250),
        }
    }
}
