//! Configuration types for the simulator.

use crate::SimulatorError;
use procsim_node::NodeConfig;
use procsim_types::Algorithm;
use procsim_workload::ArrivalConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for a simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Node settings, including the seed and arrival rate.
    pub node: NodeConfig,

    /// Cores to set up before the run, in index order.
    pub cores: Vec<CoreScenario>,

    /// Arrival routing as percentages, one per core. Equal shares if unset.
    pub probabilities: Option<Vec<String>>,

    /// Route in proportion to core speed instead. Ignored if `probabilities` is set.
    pub proportional_to_speed: bool,

    /// Whether the arrival generator runs.
    pub generate: bool,

    /// Simulated time to run for.
    #[serde(with = "humantime_secs")]
    pub duration: Duration,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            cores: vec![CoreScenario::default()],
            probabilities: None,
            proportional_to_speed: false,
            generate: true,
            duration: Duration::from_secs(60),
        }
    }
}

impl SimulatorConfig {
    /// Parse a scenario from TOML. Missing fields take their defaults.
    pub fn from_toml_str(toml: &str) -> Result<Self, SimulatorError> {
        Ok(toml::from_str(toml)?)
    }

    /// Read a scenario from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SimulatorError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn with_cores(mut self, cores: Vec<CoreScenario>) -> Self {
        self.cores = cores;
        self
    }

    pub fn with_arrival(mut self, arrival: ArrivalConfig) -> Self {
        self.node.arrival = arrival;
        self
    }

    /// Set routing percentages, one per core.
    pub fn with_probabilities(mut self, percentages: Vec<String>) -> Self {
        self.probabilities = Some(percentages);
        self
    }

    pub fn with_proportional_to_speed(mut self, enabled: bool) -> Self {
        self.proportional_to_speed = enabled;
        self
    }

    pub fn with_generation(mut self, enabled: bool) -> Self {
        self.generate = enabled;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.node.seed = seed;
        self
    }
}

/// Setup of a single core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreScenario {
    pub algorithm: Algorithm,

    /// Round Robin quantum.
    pub time_quantum: u64,

    /// Ticks per second.
    pub speed: u32,

    /// Burst lengths of processes queued before the run starts.
    pub initial_bursts: Vec<u64>,

    /// Whether the core steps. A stopped core only accumulates work.
    pub running: bool,
}

impl Default for CoreScenario {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::FirstComeFirstServe,
            time_quantum: 5,
            speed: 10,
            initial_bursts: Vec::new(),
            running: true,
        }
    }
}

impl CoreScenario {
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_time_quantum(mut self, quantum: u64) -> Self {
        self.time_quantum = quantum;
        self
    }

    pub fn with_speed(mut self, speed: u32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_initial_bursts(mut self, bursts: Vec<u64>) -> Self {
        self.initial_bursts = bursts;
        self
    }

    pub fn with_running(mut self, running: bool) -> Self {
        self.running = running;
        self
    }
}

/// Serialize a `Duration` as a humantime string such as `"90s"` or `"5m"`.
mod humantime_secs {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(D::Error::custom)
    }
}
