//! Arrival generator configuration.

use crate::ArrivalConfigError;
use procsim_types::{GenerationParadigm, TimeUnit};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Arrival rate, shape and job sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrivalConfig {
    /// Expected arrivals per `time_unit`.
    pub mean_arrival_count: f64,

    pub time_unit: TimeUnit,

    pub paradigm: GenerationParadigm,

    /// Burst lengths of generated processes are drawn uniformly from here.
    pub burst_range: RangeInclusive<u64>,
}

impl Default for ArrivalConfig {
    fn default() -> Self {
        Self {
            mean_arrival_count: 1.0,
            time_unit: TimeUnit::Second,
            paradigm: GenerationParadigm::Poisson,
            burst_range: 1..=100,
        }
    }
}

impl ArrivalConfig {
    /// Set the arrival rate.
    pub fn with_rate(mut self, mean_arrival_count: f64, time_unit: TimeUnit) -> Self {
        self.mean_arrival_count = mean_arrival_count;
        self.time_unit = time_unit;
        self
    }

    /// Set the gap distribution.
    pub fn with_paradigm(mut self, paradigm: GenerationParadigm) -> Self {
        self.paradigm = paradigm;
        self
    }

    /// Set the burst length range. Empty ranges and zero bursts are pulled up to 1.
    pub fn with_burst_range(mut self, burst_range: RangeInclusive<u64>) -> Self {
        let start = (*burst_range.start()).max(1);
        let end = (*burst_range.end()).max(start);
        self.burst_range = start..=end;
        self
    }

    /// Check that bursts can be drawn from `range`.
    pub fn check_burst_range(range: &RangeInclusive<u64>) -> Result<(), ArrivalConfigError> {
        let (start, end) = (*range.start(), *range.end());
        if start == 0 || start > end {
            return Err(ArrivalConfigError::InvalidBurstRange { start, end });
        }
        Ok(())
    }

    /// Reject a configuration the setters would not have produced.
    ///
    /// A count above its unit's cap passes: it is clamped when applied.
    pub fn validate(&self) -> Result<(), ArrivalConfigError> {
        let count = self.mean_arrival_count;
        if count.is_nan() || count <= 0.0 {
            return Err(ArrivalConfigError::NonPositive { value: count });
        }
        Self::check_burst_range(&self.burst_range)
    }
}
