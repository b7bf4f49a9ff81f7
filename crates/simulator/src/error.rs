//! Simulator errors.

use procsim_node::ConfigError;
use procsim_types::SchedError;
use procsim_workload::{ArrivalConfigError, DistributionError};
use thiserror::Error;

/// Errors raised while loading or applying a scenario.
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("Failed to read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid scenario: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Scenario needs at least one core")]
    NoCores,

    #[error("Invalid node settings: {0}")]
    Config(#[from] ConfigError),

    #[error("Scheduler rejected the scenario: {0}")]
    Sched(#[from] SchedError),

    #[error("Routing rejected the scenario: {0}")]
    Distribution(#[from] DistributionError),

    #[error("Arrival settings rejected: {0}")]
    Arrival(#[from] ArrivalConfigError),

    #[error("Failed to create metrics histogram: {0}")]
    Metrics(#[from] hdrhistogram::CreationError),
}
