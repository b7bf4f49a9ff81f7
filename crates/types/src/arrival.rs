//! Arrival-model configuration enums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// The unit a mean arrival count is expressed against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[default]
    Second,
    Minute,
    Hour,
}

impl TimeUnit {
    /// Milliseconds in one unit.
    pub fn millis(&self) -> u64 {
        match self {
            TimeUnit::Second => 1_000,
            TimeUnit::Minute => 60_000,
            TimeUnit::Hour => 3_600_000,
        }
    }

    /// One unit as a `Duration`.
    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.millis())
    }

    /// Largest mean arrival count accepted for this unit.
    pub fn max_mean_arrival_count(&self) -> f64 {
        match self {
            TimeUnit::Second => 100.0,
            TimeUnit::Minute => 1_000.0,
            TimeUnit::Hour => 10_000.0,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeUnit::Second => f.write_str("second"),
            TimeUnit::Minute => f.write_str("minute"),
            TimeUnit::Hour => f.write_str("hour"),
        }
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s" | "sec" | "second" => Ok(TimeUnit::Second),
            "m" | "min" | "minute" => Ok(TimeUnit::Minute),
            "h" | "hour" => Ok(TimeUnit::Hour),
            _ => Err(format!("Unknown time unit: {}", s)),
        }
    }
}

/// How inter-arrival gaps are produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationParadigm {
    /// Exponentially distributed gaps, resampled after every arrival.
    #[default]
    Poisson,
    /// A fixed gap of one unit divided by the mean count.
    Linear,
}

impl fmt::Display for GenerationParadigm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationParadigm::Poisson => f.write_str("poisson"),
            GenerationParadigm::Linear => f.write_str("linear"),
        }
    }
}

impl FromStr for GenerationParadigm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "poisson" => Ok(GenerationParadigm::Poisson),
            "linear" => Ok(GenerationParadigm::Linear),
            _ => Err(format!("Unknown generation paradigm: {}", s)),
        }
    }
}
