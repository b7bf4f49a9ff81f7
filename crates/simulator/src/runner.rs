//! Scenario runner.

use crate::{MetricsCollector, SimulationReport, SimulatorConfig, SimulatorError};
use procsim_simulation::SimulationRunner;
use procsim_types::CoreId;
use procsim_workload::ArrivalConfigError;
use std::time::Duration;
use tracing::{info, warn};

/// Notifications are folded into the metrics after every slice of this length.
const COLLECT_EVERY: Duration = Duration::from_secs(1);

/// Sets up a scenario on a fresh node and runs it.
pub struct Simulator {
    config: SimulatorConfig,
    runner: SimulationRunner,
    metrics: MetricsCollector,
}

impl Simulator {
    /// Build the scenario's cores, routing and generator.
    pub fn new(config: SimulatorConfig) -> Result<Self, SimulatorError> {
        if config.cores.is_empty() {
            return Err(SimulatorError::NoCores);
        }
        config.node.validate()?;

        let mut runner = SimulationRunner::new(config.node.clone());
        let setup = runner.control(|node| -> Result<(), SimulatorError> {
            for (index, scenario) in config.cores.iter().enumerate() {
                let core = if index == 0 { CoreId(0) } else { node.add_core() };
                node.set_algorithm(core, scenario.algorithm)?;
                node.set_time_quantum(core, scenario.time_quantum)?;
                node.set_core_speed(core, scenario.speed)?;
                for &burst in &scenario.initial_bursts {
                    node.submit_process(core, burst)?;
                }
            }

            if let Some(percentages) = &config.probabilities {
                node.apply_bulk_probabilities(percentages)?;
            } else if config.proportional_to_speed {
                node.set_probabilities_proportional_to_speed();
            }

            // Validate the configured rate the same way a live change would be.
            let count = config.node.arrival.mean_arrival_count;
            match node.set_mean_arrival_count(count) {
                Ok(()) => {}
                Err(err @ ArrivalConfigError::AboveMaximum { .. }) => {
                    warn!(error = %err, "Arrival rate clamped");
                }
                Err(err) => return Err(err.into()),
            }

            for (index, scenario) in config.cores.iter().enumerate() {
                if scenario.running {
                    node.start_core(CoreId(index))?;
                }
            }
            if config.generate {
                node.start_generation();
            }
            Ok(())
        });
        setup?;

        let mut simulator = Self {
            config,
            runner,
            metrics: MetricsCollector::new()?,
        };
        simulator.collect();
        info!(
            cores = simulator.config.cores.len(),
            seed = simulator.config.node.seed,
            "Scenario ready"
        );
        Ok(simulator)
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn runner(&self) -> &SimulationRunner {
        &self.runner
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    fn collect(&mut self) {
        let notifications = self.runner.take_notifications();
        self.metrics.record_all(&notifications);
    }

    /// Run for `duration` of simulated time and report.
    pub fn run_for(&mut self, duration: Duration) -> SimulationReport {
        let end = self.runner.now() + duration;
        while self.runner.now() < end {
            let next = (self.runner.now() + COLLECT_EVERY).min(end);
            self.runner.run_until(next);
            self.collect();
        }
        info!(
            time = ?self.runner.now(),
            events = self.runner.stats().events_processed,
            arrivals = self.metrics.arrivals(),
            completions = self.metrics.completions(),
            "Run finished"
        );
        self.report()
    }

    /// Run for the scenario's configured duration.
    pub fn run(&mut self) -> SimulationReport {
        self.run_for(self.config.duration)
    }

    pub fn report(&self) -> SimulationReport {
        self.metrics.report(self.runner.node())
    }
}
