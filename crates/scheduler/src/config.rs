//! Scheduler configuration.

use procsim_types::{Algorithm, SchedError};
use serde::{Deserialize, Serialize};

/// Defaults applied to every newly added core, plus quantum bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Policy a new core starts with.
    pub default_algorithm: Algorithm,

    /// Round Robin quantum a new core starts with.
    pub default_time_quantum: u64,

    /// Largest quantum `set_time_quantum` accepts.
    pub max_time_quantum: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_algorithm: Algorithm::FirstComeFirstServe,
            default_time_quantum: 5,
            max_time_quantum: 10_000,
        }
    }
}

impl SchedulerConfig {
    /// Smallest quantum `set_time_quantum` accepts.
    pub const MIN_TIME_QUANTUM: u64 = 1;

    /// Set the policy new cores start with.
    pub fn with_default_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.default_algorithm = algorithm;
        self
    }

    /// Set the quantum new cores start with (never below one).
    pub fn with_default_time_quantum(mut self, quantum: u64) -> Self {
        self.default_time_quantum = quantum.max(Self::MIN_TIME_QUANTUM);
        self
    }

    /// Check a quantum against both bounds.
    pub fn check_time_quantum(&self, quantum: u64) -> Result<(), SchedError> {
        if quantum < Self::MIN_TIME_QUANTUM {
            return Err(SchedError::ValueTooSmall {
                value: quantum,
                min: Self::MIN_TIME_QUANTUM,
            });
        }
        if quantum > self.max_time_quantum {
            return Err(SchedError::ValueTooLarge {
                value: quantum,
                max: self.max_time_quantum,
            });
        }
        Ok(())
    }

    /// The default quantum must itself be a quantum `set_time_quantum` would accept.
    pub fn validate(&self) -> Result<(), SchedError> {
        self.check_time_quantum(self.default_time_quantum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_quantum_must_fit_bounds() {
        assert_eq!(SchedulerConfig::default().validate(), Ok(()));

        let config = SchedulerConfig {
            default_time_quantum: 0,
            ..SchedulerConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SchedError::ValueTooSmall { value: 0, min: 1 })
        );

        let config = SchedulerConfig {
            default_time_quantum: 50,
            max_time_quantum: 10,
            ..SchedulerConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SchedError::ValueTooLarge { value: 50, max: 10 })
        );
    }
}
