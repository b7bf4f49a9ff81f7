//! Analytics configuration.

use procsim_types::SchedError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Window sizes for the statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Sample count at which running averages stop growing their count.
    pub window: u64,

    /// Trailing span of wall time utilization is computed over.
    #[serde(with = "procsim_types::millis")]
    pub core_window: Duration,

    /// Drop expired time blocks every this many recomputes.
    pub prune_every: u64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            window: 200,
            core_window: Duration::from_millis(100_000),
            prune_every: 20,
        }
    }
}

impl AnalyticsConfig {
    /// Smallest accepted running-average window.
    pub const MIN_WINDOW: u64 = 1;

    /// Core windows must be strictly longer than this.
    pub const MIN_CORE_WINDOW: Duration = Duration::from_millis(100);

    /// Set the running-average window.
    pub fn with_window(mut self, window: u64) -> Self {
        self.window = window.max(Self::MIN_WINDOW);
        self
    }

    /// Set the utilization window.
    pub fn with_core_window(mut self, core_window: Duration) -> Self {
        self.core_window = core_window;
        self
    }

    /// Set how often expired time blocks are dropped.
    pub fn with_prune_every(mut self, recomputes: u64) -> Self {
        self.prune_every = recomputes.max(1);
        self
    }

    /// Check a running-average window.
    pub fn check_window(window: u64) -> Result<(), SchedError> {
        if window < Self::MIN_WINDOW {
            return Err(SchedError::ValueTooSmall {
                value: window,
                min: Self::MIN_WINDOW,
            });
        }
        Ok(())
    }

    /// Check a utilization window.
    pub fn check_core_window(core_window: Duration) -> Result<(), SchedError> {
        if core_window <= Self::MIN_CORE_WINDOW {
            return Err(SchedError::ValueTooSmall {
                value: core_window.as_millis() as u64,
                min: Self::MIN_CORE_WINDOW.as_millis() as u64 + 1,
            });
        }
        Ok(())
    }

    /// Apply the same bounds as the runtime setters.
    ///
    /// Configurations built with the `with_*` methods always pass. Ones
    /// deserialized from a file may not.
    pub fn validate(&self) -> Result<(), SchedError> {
        Self::check_window(self.window)?;
        Self::check_core_window(self.core_window)?;
        if self.prune_every == 0 {
            return Err(SchedError::ValueTooSmall { value: 0, min: 1 });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(AnalyticsConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_deserialized_bounds_are_checked() {
        let config = AnalyticsConfig {
            window: 0,
            ..AnalyticsConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SchedError::ValueTooSmall { value: 0, min: 1 })
        );

        let config = AnalyticsConfig {
            core_window: Duration::from_millis(100),
            ..AnalyticsConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SchedError::ValueTooSmall { value: 100, min: 101 })
        );

        let config = AnalyticsConfig {
            prune_every: 0,
            ..AnalyticsConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
