//! Procsim Simulator
//!
//! Runs a scheduling scenario on the simulated clock and reports on it.
//!
//! # Architecture
//!
//! The simulator builds on `procsim-simulation` to provide:
//!
//! - **Scenarios**: core layout, policies, speeds, routing and arrival rate,
//!   loadable from TOML
//! - **Metrics Collection**: exact waiting and turnaround percentiles from
//!   the node's lifecycle notifications, next to the node's own windowed
//!   statistics
//!
//! # Example
//!
//! ```ignore
//! use procsim_simulator::{CoreScenario, Simulator, SimulatorConfig};
//! use procsim_types::Algorithm;
//! use std::time::Duration;
//!
//! let config = SimulatorConfig::default()
//!     .with_cores(vec![
//!         CoreScenario::default(),
//!         CoreScenario::default().with_algorithm(Algorithm::RoundRobin),
//!     ])
//!     .with_seed(12345);
//!
//! let mut simulator = Simulator::new(config)?;
//! let report = simulator.run_for(Duration::from_secs(60));
//! println!("{report}");
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod runner;

pub use config::{CoreScenario, SimulatorConfig};
pub use error::SimulatorError;
pub use metrics::{CoreReport, MetricsCollector, SimulationReport};
pub use runner::Simulator;
