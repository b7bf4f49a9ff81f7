//! Process Scheduling Simulator CLI
//!
//! Runs a scheduling scenario on the simulated clock and prints a report.

use clap::Parser;
use procsim_simulator::{CoreScenario, Simulator, SimulatorConfig};
use procsim_types::{Algorithm, GenerationParadigm, TimeUnit};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "procsim")]
#[command(about = "Multi-core process scheduling simulator")]
#[command(version)]
struct Cli {
    /// Scenario file (TOML). Flags below override its values.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Simulated time to run (e.g., "30s", "5m", "1h")
    #[arg(short, long)]
    duration: Option<humantime::Duration>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Number of cores, all set up alike
    #[arg(long)]
    cores: Option<usize>,

    /// Scheduling algorithm for every core (fcfs, sjf, rr)
    #[arg(short, long)]
    algorithm: Option<Algorithm>,

    /// Round Robin time quantum
    #[arg(long)]
    quantum: Option<u64>,

    /// Core speed in steps per second
    #[arg(long)]
    speed: Option<u32>,

    /// Mean number of arrivals per time unit
    #[arg(long)]
    rate: Option<f64>,

    /// Time unit for the arrival rate (second, minute, hour)
    #[arg(long)]
    unit: Option<TimeUnit>,

    /// Arrival paradigm (poisson, linear)
    #[arg(long)]
    paradigm: Option<GenerationParadigm>,

    /// Routing percentages, one per core (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    probabilities: Option<Vec<String>>,

    /// Route in proportion to core speed
    #[arg(long)]
    proportional: bool,

    /// Do not generate arrivals
    #[arg(long)]
    no_generation: bool,
}

impl Cli {
    fn into_config(self) -> Result<SimulatorConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => SimulatorConfig::from_file(path)?,
            None => SimulatorConfig::default(),
        };

        if let Some(count) = self.cores {
            let template = config.cores.first().cloned().unwrap_or_default();
            config.cores = vec![template; count];
        }
        for core in &mut config.cores {
            if let Some(algorithm) = self.algorithm {
                core.algorithm = algorithm;
            }
            if let Some(quantum) = self.quantum {
                core.time_quantum = quantum;
            }
            if let Some(speed) = self.speed {
                core.speed = speed;
            }
        }

        let arrival = &mut config.node.arrival;
        if let Some(rate) = self.rate {
            arrival.mean_arrival_count = rate;
        }
        if let Some(unit) = self.unit {
            arrival.time_unit = unit;
        }
        if let Some(paradigm) = self.paradigm {
            arrival.paradigm = paradigm;
        }

        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(duration) = self.duration {
            config = config.with_duration(*duration);
        }
        if let Some(probabilities) = self.probabilities {
            config = config.with_probabilities(probabilities);
        }
        if self.proportional {
            config = config.with_proportional_to_speed(true);
        }
        if self.no_generation {
            config = config.with_generation(false);
        }
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = cli.into_config()?;
    let cores: Vec<&str> = config
        .cores
        .iter()
        .map(|core: &CoreScenario| core.algorithm.short_name())
        .collect();
    println!(
        "Simulating {} core(s) [{}] for {:?}...",
        cores.len(),
        cores.join(", "),
        config.duration
    );

    let mut simulator = Simulator::new(config)?;
    let report = simulator.run();
    report.print();

    Ok(())
}
