//! Arrival generation.

use crate::{ArrivalConfig, ProbabilityDistributor, WorkloadGenerator};
use procsim_core::{Action, TimerId};
use procsim_types::{CoreId, GenerationParadigm, TimeUnit};
use rand::Rng;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Longest gap ever scheduled between two arrivals.
const MAX_WAIT: Duration = Duration::from_secs(3600);

/// A process to create: where it goes and how long it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrival {
    pub core: CoreId,
    pub burst_length: u64,
}

/// Rejected arrival parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArrivalConfigError {
    #[error("Arrival rate must be greater than 0, got {value}")]
    NonPositive { value: f64 },

    /// Bursts are drawn from `start..=end`, which must be non-empty and start at 1 or more.
    #[error("Burst range {start}..={end} is empty or allows zero-length bursts")]
    InvalidBurstRange { start: u64, end: u64 },

    /// The value was clamped to `max` and the generator is running at the cap.
    #[error("Maximum value for unit {unit} is {max}, got {requested}")]
    AboveMaximum {
        requested: f64,
        max: f64,
        unit: TimeUnit,
    },
}

/// Result of a parameter change that was applied.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct ConfigUpdate {
    /// Timer actions restarting generation at the new rate.
    pub actions: Vec<Action>,
    /// Set when the requested count had to be clamped to its unit's cap.
    pub clamped: Option<ArrivalConfigError>,
}

impl ConfigUpdate {
    fn applied(actions: Vec<Action>) -> Self {
        Self {
            actions,
            clamped: None,
        }
    }

    /// Move the actions into `outbox`, reporting a clamp as an error.
    pub fn into_result(self, outbox: &mut Vec<Action>) -> Result<(), ArrivalConfigError> {
        outbox.extend(self.actions);
        match self.clamped {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Produces process arrivals on a single timer.
///
/// Linear mode fires every `unit / count`. Poisson mode samples a fresh
/// exponential gap after each arrival. Every parameter change while running
/// cancels and re-arms the timer, so there is never more than one.
#[derive(Debug, Clone)]
pub struct ArrivalGenerator {
    config: ArrivalConfig,
    generating: bool,
}

impl ArrivalGenerator {
    pub fn new(config: ArrivalConfig) -> Self {
        Self {
            config,
            generating: false,
        }
    }

    pub fn config(&self) -> &ArrivalConfig {
        &self.config
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// Poisson rate in arrivals per millisecond.
    pub fn lambda(&self) -> f64 {
        self.config.mean_arrival_count / self.config.time_unit.millis() as f64
    }

    /// Linear gap between arrivals, `None` if the count is not positive.
    pub fn interval(&self) -> Option<Duration> {
        let count = self.config.mean_arrival_count;
        if count > 0.0 {
            let nanos = (self.config.time_unit.millis() as f64 * 1e6 / count).round();
            Some(Duration::from_nanos(nanos as u64).min(MAX_WAIT))
        } else {
            None
        }
    }

    /// Sample an exponential gap for the current rate.
    pub fn poisson_wait(&self, rng: &mut impl Rng) -> Duration {
        let lambda = self.lambda();
        if lambda <= 0.0 {
            return MAX_WAIT;
        }
        // Uniform in (0, 1].
        let u: f64 = 1.0 - rng.gen::<f64>();
        let millis = (-u.ln() / lambda).round();
        Duration::from_millis(millis as u64).min(MAX_WAIT)
    }

    fn next_wait(&self, rng: &mut impl Rng) -> Option<Duration> {
        match self.config.paradigm {
            GenerationParadigm::Poisson => Some(self.poisson_wait(rng)),
            GenerationParadigm::Linear => self.interval(),
        }
    }

    fn arm(&self, rng: &mut impl Rng) -> Vec<Action> {
        match self.next_wait(rng) {
            Some(duration) => {
                trace!(?duration, paradigm = %self.config.paradigm, "Arrival timer armed");
                vec![Action::SetTimer {
                    id: TimerId::Arrival,
                    duration,
                }]
            }
            None => vec![],
        }
    }

    fn restart(&self, rng: &mut impl Rng) -> Vec<Action> {
        if !self.generating {
            return vec![];
        }
        let mut actions = vec![Action::CancelTimer {
            id: TimerId::Arrival,
        }];
        actions.extend(self.arm(rng));
        actions
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Start / stop
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn start(&mut self, rng: &mut impl Rng) -> Vec<Action> {
        if self.generating {
            return vec![];
        }
        self.generating = true;
        debug!(
            count = self.config.mean_arrival_count,
            unit = %self.config.time_unit,
            paradigm = %self.config.paradigm,
            "Arrival generation started"
        );
        self.arm(rng)
    }

    pub fn stop(&mut self) -> Vec<Action> {
        if !self.generating {
            return vec![];
        }
        self.generating = false;
        debug!("Arrival generation stopped");
        vec![Action::CancelTimer {
            id: TimerId::Arrival,
        }]
    }

    pub fn toggle(&mut self, rng: &mut impl Rng) -> Vec<Action> {
        if self.generating {
            self.stop()
        } else {
            self.start(rng)
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Parameters
    // ═══════════════════════════════════════════════════════════════════════════

    /// Clamp the count to the unit's cap, returning the error to report if it was.
    fn clamp_count(&mut self, requested: f64) -> Option<ArrivalConfigError> {
        let unit = self.config.time_unit;
        let max = unit.max_mean_arrival_count();
        if requested > max {
            warn!(requested, max, %unit, "Arrival count clamped");
            self.config.mean_arrival_count = max;
            Some(ArrivalConfigError::AboveMaximum {
                requested,
                max,
                unit,
            })
        } else {
            self.config.mean_arrival_count = requested;
            None
        }
    }

    /// Set the expected number of arrivals per time unit.
    pub fn set_mean_arrival_count(
        &mut self,
        count: f64,
        rng: &mut impl Rng,
    ) -> Result<ConfigUpdate, ArrivalConfigError> {
        if count.is_nan() || count <= 0.0 {
            warn!(count, "Rejected arrival count");
            return Err(ArrivalConfigError::NonPositive { value: count });
        }
        let clamped = self.clamp_count(count);
        Ok(ConfigUpdate {
            actions: self.restart(rng),
            clamped,
        })
    }

    /// Change the time unit, pulling the count down to the new unit's cap.
    pub fn set_time_unit(&mut self, unit: TimeUnit, rng: &mut impl Rng) -> ConfigUpdate {
        self.config.time_unit = unit;
        let clamped = self.clamp_count(self.config.mean_arrival_count);
        ConfigUpdate {
            actions: self.restart(rng),
            clamped,
        }
    }

    pub fn set_paradigm(&mut self, paradigm: GenerationParadigm, rng: &mut impl Rng) -> ConfigUpdate {
        self.config.paradigm = paradigm;
        ConfigUpdate::applied(self.restart(rng))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Timer
    // ═══════════════════════════════════════════════════════════════════════════

    /// Handle the arrival timer: produce one arrival and re-arm.
    ///
    /// A timer that fires after generation stopped yields nothing.
    pub fn on_arrival_timer(
        &mut self,
        distributor: &ProbabilityDistributor,
        rng: &mut impl Rng,
    ) -> (Option<Arrival>, Vec<Action>) {
        if !self.generating {
            return (None, vec![]);
        }
        let arrival = self.generate_one(distributor, rng);
        (arrival, self.arm(rng))
    }
}

impl Default for ArrivalGenerator {
    fn default() -> Self {
        Self::new(ArrivalConfig::default())
    }
}

impl WorkloadGenerator for ArrivalGenerator {
    fn generate_one(
        &mut self,
        distributor: &ProbabilityDistributor,
        rng: &mut impl Rng,
    ) -> Option<Arrival> {
        let draw = rng.gen::<f64>();
        let Some(core) = distributor.pick(draw) else {
            warn!("No core to route an arrival to");
            return None;
        };
        let burst_length = rng.gen_range(self.config.burst_range.clone());
        Some(Arrival { core, burst_length })
    }
}
