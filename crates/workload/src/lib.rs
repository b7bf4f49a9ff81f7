//! Workload generation for the scheduling simulator.
//!
//! - [`ArrivalGenerator`] decides *when* a process arrives (Poisson or
//!   linear gaps) and drives a single arrival timer.
//! - [`ProbabilityDistributor`] decides *where* it goes, by inverse-CDF
//!   sampling over per-core weights.

mod arrival;
mod config;
mod distributor;

pub use arrival::{Arrival, ArrivalConfigError, ArrivalGenerator, ConfigUpdate};
pub use config::ArrivalConfig;
pub use distributor::{CoreWeight, DistributionError, ProbabilityDistributor};

/// Something that produces process arrivals.
pub trait WorkloadGenerator {
    /// Produce a single arrival routed through `distributor`.
    ///
    /// Returns `None` when there is no core to route to.
    fn generate_one(
        &mut self,
        distributor: &ProbabilityDistributor,
        rng: &mut impl rand::Rng,
    ) -> Option<Arrival>;
}
