//! Weighted routing of arrivals to cores.

use procsim_types::CoreId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Tolerance on the sum of all probabilities.
const SUM_TOLERANCE: f64 = 1e-4;

/// Tolerance, in percentage points, on a bulk assignment's total.
const BULK_TOLERANCE: f64 = 0.1;

/// Routing weight of one core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoreWeight {
    pub core: CoreId,
    /// Relative throughput in ticks per second.
    pub speed: u32,
    /// Share of arrivals routed here, in `[0, 1]`.
    pub probability: f64,
}

/// Errors from probability edits. A failed edit leaves the weights untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistributionError {
    #[error("{core} is out of bounds ({core_count} cores)")]
    CoreOutOfBound { core: CoreId, core_count: usize },

    #[error("A single core always receives every arrival")]
    SingleCore,

    #[error("Probability must be greater than 0, got {value}")]
    NonPositive { value: f64 },

    #[error("Probability must be below 1 with more than one core, got {value}")]
    AtOrAboveOne { value: f64 },

    #[error("Other cores hold {available:.4} but {needed:.4} is needed")]
    InsufficientMass { needed: f64, available: f64 },

    #[error("Entry {index} ({entry:?}) is not a valid number")]
    Unparsable { index: usize, entry: String },

    #[error("Entry {index} is negative ({value})")]
    Negative { index: usize, value: f64 },

    #[error("Total must be 100%, got {total:.1}%")]
    WrongTotal { total: f64 },

    #[error("Expected {expected} entries, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("Core speed must be greater than 0")]
    NonPositiveSpeed,
}

/// Per-core arrival probabilities.
///
/// After every successful operation the probabilities are non-negative and
/// sum to 1 within `1e-4`. Adding or removing a core resets to equal shares.
#[derive(Debug, Clone)]
pub struct ProbabilityDistributor {
    weights: Vec<CoreWeight>,
}

impl ProbabilityDistributor {
    /// A distributor over a single core running at `speed`.
    pub fn new(speed: u32) -> Self {
        Self {
            weights: vec![CoreWeight {
                core: CoreId(0),
                speed,
                probability: 1.0,
            }],
        }
    }

    pub fn weights(&self) -> &[CoreWeight] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Sum of all probabilities.
    pub fn total(&self) -> f64 {
        self.weights.iter().map(|w| w.probability).sum()
    }

    pub fn probability(&self, core: CoreId) -> Result<f64, DistributionError> {
        self.check_core(core).map(|i| self.weights[i].probability)
    }

    fn check_core(&self, core: CoreId) -> Result<usize, DistributionError> {
        if core.index() < self.weights.len() {
            Ok(core.index())
        } else {
            Err(DistributionError::CoreOutOfBound {
                core,
                core_count: self.weights.len(),
            })
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Structure
    // ═══════════════════════════════════════════════════════════════════════════

    /// Append a core and reset to equal shares.
    pub fn add_core(&mut self, speed: u32) -> CoreId {
        let core = CoreId(self.weights.len());
        self.weights.push(CoreWeight {
            core,
            speed,
            probability: 0.0,
        });
        self.set_equal();
        core
    }

    /// Remove a core, renumber the ones above it and reset to equal shares.
    pub fn remove_core(&mut self, core: CoreId) -> Result<(), DistributionError> {
        let index = self.check_core(core)?;
        self.weights.remove(index);
        for (i, weight) in self.weights.iter_mut().enumerate() {
            weight.core = CoreId(i);
        }
        self.set_equal();
        Ok(())
    }

    /// Back to a single core running at `speed`.
    pub fn reset(&mut self, speed: u32) {
        *self = Self::new(speed);
    }

    /// Record a new speed for `core`. Probabilities are unchanged.
    pub fn set_speed(&mut self, core: CoreId, speed: u32) -> Result<(), DistributionError> {
        let index = self.check_core(core)?;
        if speed == 0 {
            return Err(DistributionError::NonPositiveSpeed);
        }
        self.weights[index].speed = speed;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Probability edits
    // ═══════════════════════════════════════════════════════════════════════════

    /// Give every core the same share.
    pub fn set_equal(&mut self) {
        let share = 1.0 / self.weights.len().max(1) as f64;
        for weight in &mut self.weights {
            weight.probability = share;
        }
    }

    /// Give every core a share proportional to its speed.
    pub fn set_proportional_to_speed(&mut self) {
        let total_speed: u64 = self.weights.iter().map(|w| u64::from(w.speed)).sum();
        if total_speed == 0 {
            self.set_equal();
            return;
        }
        for weight in &mut self.weights {
            weight.probability = f64::from(weight.speed) / total_speed as f64;
        }
    }

    /// Set one core's share and rebalance the others in proportion to their
    /// current shares.
    pub fn set_one(&mut self, core: CoreId, value: f64) -> Result<(), DistributionError> {
        let target = self.check_core(core)?;
        if self.weights.len() <= 1 {
            return Err(DistributionError::SingleCore);
        }
        if value.is_nan() || value <= 0.0 {
            return Err(DistributionError::NonPositive { value });
        }
        if value >= 1.0 {
            return Err(DistributionError::AtOrAboveOne { value });
        }

        let delta = value - self.weights[target].probability;
        let others: f64 = self
            .weights
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != target)
            .map(|(_, w)| w.probability)
            .sum();
        if delta > 0.0 && others < delta {
            warn!(%core, value, others, "Rejected probability edit");
            return Err(DistributionError::InsufficientMass {
                needed: delta,
                available: others,
            });
        }

        let other_count = (self.weights.len() - 1) as f64;
        for (i, weight) in self.weights.iter_mut().enumerate() {
            if i == target {
                weight.probability = value;
            } else if others > 0.0 {
                let ratio = weight.probability / others;
                weight.probability = (weight.probability - delta * ratio).max(0.0);
            } else {
                // Nothing to scale: the freed mass is shared evenly.
                weight.probability = -delta / other_count;
            }
        }

        let residual = 1.0 - self.total();
        if residual != 0.0 {
            if let Some(largest) = self.largest_except(target) {
                let weight = &mut self.weights[largest];
                weight.probability = (weight.probability + residual).max(0.0);
            }
        }

        debug!(%core, value, "Probability set");
        Ok(())
    }

    /// Index of the first core with the largest share, skipping `skip`.
    fn largest_except(&self, skip: usize) -> Option<usize> {
        let mut largest: Option<usize> = None;
        for (i, weight) in self.weights.iter().enumerate() {
            if i == skip {
                continue;
            }
            match largest {
                Some(j) if self.weights[j].probability >= weight.probability => {}
                _ => largest = Some(i),
            }
        }
        largest
    }

    /// Assign every core's share from a list of percentages.
    ///
    /// Entries may carry a trailing `%`. They must all parse as non-negative
    /// numbers and total 100 within 0.1; the values are then used as given.
    pub fn apply_bulk<S: AsRef<str>>(&mut self, entries: &[S]) -> Result<(), DistributionError> {
        if entries.len() != self.weights.len() {
            return Err(DistributionError::WrongLength {
                expected: self.weights.len(),
                actual: entries.len(),
            });
        }

        let mut percentages = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let raw = entry.as_ref().trim();
            let value = raw
                .strip_suffix('%')
                .unwrap_or(raw)
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| DistributionError::Unparsable {
                    index,
                    entry: raw.to_string(),
                })?;
            if value < 0.0 {
                return Err(DistributionError::Negative { index, value });
            }
            percentages.push(value);
        }

        let total: f64 = percentages.iter().sum();
        if (total - 100.0).abs() > BULK_TOLERANCE {
            warn!(total, "Rejected bulk probabilities");
            return Err(DistributionError::WrongTotal { total });
        }

        for (weight, percentage) in self.weights.iter_mut().zip(percentages) {
            weight.probability = percentage / 100.0;
        }
        debug!(cores = self.weights.len(), "Bulk probabilities applied");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Sampling
    // ═══════════════════════════════════════════════════════════════════════════

    /// The first core whose cumulative probability reaches `draw`.
    ///
    /// `draw` is uniform in `[0, 1)`. Rounding shortfalls land on the last core.
    pub fn pick(&self, draw: f64) -> Option<CoreId> {
        let mut cumulative = 0.0;
        for weight in &self.weights {
            cumulative += weight.probability;
            if draw <= cumulative {
                return Some(weight.core);
            }
        }
        self.weights.last().map(|w| w.core)
    }

    /// Whether the probabilities currently sum to 1.
    pub fn is_normalized(&self) -> bool {
        (self.total() - 1.0).abs() <= SUM_TOLERANCE
    }
}
