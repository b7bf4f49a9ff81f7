//! Node configuration.

use procsim_analytics::AnalyticsConfig;
use procsim_scheduler::SchedulerConfig;
use procsim_types::SchedError;
use procsim_workload::{ArrivalConfig, ArrivalConfigError};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::Duration;
use thiserror::Error;

/// A node configuration the runtime setters would have refused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid scheduler settings: {0}")]
    Scheduler(#[source] SchedError),

    #[error("Invalid analytics settings: {0}")]
    Analytics(#[source] SchedError),

    #[error("Invalid arrival settings: {0}")]
    Arrival(#[from] ArrivalConfigError),

    #[error("Invalid manual burst range: {0}")]
    ManualBurstRange(#[source] ArrivalConfigError),

    #[error("Core speed bounds {min}..={max} are empty or include 0")]
    SpeedBounds { min: u32, max: u32 },

    #[error("Default core speed {speed} is outside {min}..={max}")]
    DefaultSpeed { speed: u32, min: u32, max: u32 },

    #[error("Utilization interval must be greater than 0")]
    ZeroUtilizationInterval,
}

/// Configuration for a scheduling node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub scheduler: SchedulerConfig,

    pub analytics: AnalyticsConfig,

    pub arrival: ArrivalConfig,

    /// Ticks per second of newly added cores.
    pub default_core_speed: u32,

    pub min_core_speed: u32,

    pub max_core_speed: u32,

    /// Period of the utilization recompute timer.
    #[serde(with = "procsim_types::millis")]
    pub utilization_interval: Duration,

    /// Burst lengths of manually submitted random processes.
    pub manual_burst_range: RangeInclusive<u64>,

    /// Seed for every random draw the node makes.
    pub seed: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            analytics: AnalyticsConfig::default(),
            arrival: ArrivalConfig::default(),
            default_core_speed: 10,
            min_core_speed: 10,
            max_core_speed: 250,
            utilization_interval: Duration::from_millis(1000),
            manual_burst_range: 1..=30,
            seed: 12345,
        }
    }
}

impl NodeConfig {
    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_analytics(mut self, analytics: AnalyticsConfig) -> Self {
        self.analytics = analytics;
        self
    }

    pub fn with_arrival(mut self, arrival: ArrivalConfig) -> Self {
        self.arrival = arrival;
        self
    }

    /// Set the speed new cores start at. Clamped to the speed bounds.
    pub fn with_default_core_speed(mut self, speed: u32) -> Self {
        self.default_core_speed = speed.clamp(self.min_core_speed, self.max_core_speed);
        self
    }

    pub fn with_utilization_interval(mut self, interval: Duration) -> Self {
        self.utilization_interval = interval;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check every field against the bounds the setters enforce.
    ///
    /// Builders keep a configuration valid. A configuration read from a
    /// file should be validated before a node is built from it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler.validate().map_err(ConfigError::Scheduler)?;
        self.analytics.validate().map_err(ConfigError::Analytics)?;
        self.arrival.validate()?;
        ArrivalConfig::check_burst_range(&self.manual_burst_range)
            .map_err(ConfigError::ManualBurstRange)?;

        let (min, max) = (self.min_core_speed, self.max_core_speed);
        if min == 0 || min > max {
            return Err(ConfigError::SpeedBounds { min, max });
        }
        if !(min..=max).contains(&self.default_core_speed) {
            return Err(ConfigError::DefaultSpeed {
                speed: self.default_core_speed,
                min,
                max,
            });
        }
        if self.utilization_interval.is_zero() {
            return Err(ConfigError::ZeroUtilizationInterval);
        }
        Ok(())
    }

    /// Time between two steps of a core running at `speed` ticks per second.
    pub fn step_period(speed: u32) -> Duration {
        Duration::from_secs(1) / speed.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_period() {
        assert_eq!(NodeConfig::step_period(10), Duration::from_millis(100));
        assert_eq!(NodeConfig::step_period(250), Duration::from_millis(4));
    }

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(NodeConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_zero_utilization_interval_is_rejected() {
        let config = NodeConfig::default().with_utilization_interval(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroUtilizationInterval));
    }

    #[test]
    fn test_reversed_burst_ranges_are_rejected() {
        let mut config = NodeConfig::default();
        config.manual_burst_range = RangeInclusive::new(30, 1);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ManualBurstRange(
                ArrivalConfigError::InvalidBurstRange { start: 30, end: 1 }
            ))
        );

        let mut config = NodeConfig::default();
        config.arrival.burst_range = RangeInclusive::new(10, 1);
        assert_eq!(
            config.validate(),
            Err(ConfigError::Arrival(ArrivalConfigError::InvalidBurstRange {
                start: 10,
                end: 1
            }))
        );
    }

    #[test]
    fn test_nested_windows_are_checked() {
        let mut config = NodeConfig::default();
        config.analytics.window = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Analytics(_))));

        let mut config = NodeConfig::default();
        config.analytics.core_window = Duration::from_millis(50);
        assert_eq!(
            config.validate(),
            Err(ConfigError::Analytics(SchedError::ValueTooSmall {
                value: 50,
                min: 101
            }))
        );
    }

    #[test]
    fn test_speed_bounds_are_checked() {
        let mut config = NodeConfig::default();
        config.min_core_speed = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::SpeedBounds { min: 0, max: 250 })
        );

        let mut config = NodeConfig::default();
        config.default_core_speed = 500;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DefaultSpeed { speed: 500, .. })
        ));
    }

    #[test]
    fn test_default_speed_is_clamped() {
        let config = NodeConfig::default().with_default_core_speed(1_000);
        assert_eq!(config.default_core_speed, 250);
    }
}
