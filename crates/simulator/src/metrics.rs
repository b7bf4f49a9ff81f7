//! Metrics collection and reporting.

use hdrhistogram::{CreationError, Histogram};
use procsim_core::{Lifecycle, StateMachine};
use procsim_node::SchedulerNode;
use procsim_simulation::Notification;
use procsim_types::{CoreId, ProcessId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::warn;

/// Largest latency the histograms track: one simulated day, in ms.
const MAX_TRACKED_MS: u64 = 24 * 60 * 60 * 1000;

/// Collects exact per-process latencies from lifecycle notifications.
pub struct MetricsCollector {
    /// Arrival-to-completion time, in ms.
    turnaround: Histogram<u64>,

    /// Time spent waiting before each promotion to running, in ms.
    waiting: Histogram<u64>,

    arrived: HashMap<ProcessId, Duration>,
    waiting_since: HashMap<ProcessId, Duration>,

    completed_per_core: HashMap<CoreId, u64>,

    arrivals: u64,
    completions: u64,
}

impl MetricsCollector {
    pub fn new() -> Result<Self, CreationError> {
        Ok(Self {
            turnaround: Histogram::new_with_bounds(1, MAX_TRACKED_MS, 3)?,
            waiting: Histogram::new_with_bounds(1, MAX_TRACKED_MS, 3)?,
            arrived: HashMap::new(),
            waiting_since: HashMap::new(),
            completed_per_core: HashMap::new(),
            arrivals: 0,
            completions: 0,
        })
    }

    fn record_ms(histogram: &mut Histogram<u64>, value: Duration) {
        let ms = (value.as_millis() as u64).min(MAX_TRACKED_MS);
        if let Err(err) = histogram.record(ms) {
            warn!(ms, error = ?err, "Failed to record latency");
        }
    }

    /// Fold one notification in.
    pub fn record(&mut self, notification: &Notification) {
        let now = notification.time;
        match notification.event {
            Lifecycle::Waiting { process, .. } => {
                // A re-queued process keeps its original arrival.
                if let Entry::Vacant(entry) = self.arrived.entry(process) {
                    entry.insert(now);
                    self.arrivals += 1;
                }
                self.waiting_since.insert(process, now);
            }
            Lifecycle::Running { process, .. } => {
                let since = match self.waiting_since.remove(&process) {
                    Some(since) => since,
                    None => {
                        self.arrivals += 1;
                        self.arrived.insert(process, now);
                        now
                    }
                };
                Self::record_ms(&mut self.waiting, now.saturating_sub(since));
            }
            Lifecycle::Finished { process, core } => {
                self.waiting_since.remove(&process);
                if let Some(arrived) = self.arrived.remove(&process) {
                    Self::record_ms(&mut self.turnaround, now.saturating_sub(arrived));
                }
                self.completions += 1;
                *self.completed_per_core.entry(core).or_insert(0) += 1;
            }
            Lifecycle::CoreIdle { .. } | Lifecycle::CoreBusy { .. } => {}
        }
    }

    pub fn record_all(&mut self, notifications: &[Notification]) {
        for notification in notifications {
            self.record(notification);
        }
    }

    /// Processes seen arriving.
    pub fn arrivals(&self) -> u64 {
        self.arrivals
    }

    /// Processes seen finishing.
    pub fn completions(&self) -> u64 {
        self.completions
    }

    /// Turnaround at `quantile`, in ms. Zero before the first completion.
    pub fn turnaround_at(&self, quantile: f64) -> u64 {
        if self.turnaround.is_empty() {
            return 0;
        }
        self.turnaround.value_at_quantile(quantile)
    }

    /// Waiting time at `quantile`, in ms.
    pub fn waiting_at(&self, quantile: f64) -> u64 {
        if self.waiting.is_empty() {
            return 0;
        }
        self.waiting.value_at_quantile(quantile)
    }

    /// Build a report from the collected metrics and the node's own statistics.
    pub fn report(&self, node: &SchedulerNode) -> SimulationReport {
        let analytics = node.analytics();
        let scheduler = node.scheduler();

        let cores = scheduler
            .cores()
            .iter()
            .enumerate()
            .map(|(index, state)| {
                let core = CoreId(index);
                CoreReport {
                    core,
                    algorithm: state.algorithm().label(),
                    speed: node.core_speed(core).unwrap_or_default(),
                    queued: state.queue_len(),
                    completed: self.completed_per_core.get(&core).copied().unwrap_or(0),
                    waiting_ms: analytics.waiting_time(core).unwrap_or_default(),
                    turnaround_ms: analytics.turnaround_time(core).unwrap_or_default(),
                    utilization: analytics.core_utilization(core).unwrap_or_default(),
                }
            })
            .collect();

        SimulationReport {
            duration: node.now(),
            cores,
            waiting_ms: analytics.overall_waiting_time(),
            turnaround_ms: analytics.overall_turnaround_time(),
            utilization: analytics.overall_core_utilization(),
            arrivals: self.arrivals,
            completions: self.completions,
            turnaround_p50_ms: self.turnaround_at(0.50),
            turnaround_p90_ms: self.turnaround_at(0.90),
            turnaround_p99_ms: self.turnaround_at(0.99),
            waiting_p99_ms: self.waiting_at(0.99),
        }
    }
}

/// One core's line in the report.
#[derive(Clone, Debug)]
pub struct CoreReport {
    pub core: CoreId,
    pub algorithm: &'static str,
    pub speed: u32,
    pub queued: usize,
    pub completed: u64,
    /// Windowed running average.
    pub waiting_ms: f64,
    /// Windowed running average.
    pub turnaround_ms: f64,
    pub utilization: f64,
}

/// Summary of a run.
#[derive(Clone, Debug)]
pub struct SimulationReport {
    /// Simulated time covered.
    pub duration: Duration,
    pub cores: Vec<CoreReport>,
    pub waiting_ms: f64,
    pub turnaround_ms: f64,
    pub utilization: f64,
    pub arrivals: u64,
    pub completions: u64,
    pub turnaround_p50_ms: u64,
    pub turnaround_p90_ms: u64,
    pub turnaround_p99_ms: u64,
    pub waiting_p99_ms: u64,
}

impl SimulationReport {
    /// Completions per simulated second.
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.completions as f64 / secs
        } else {
            0.0
        }
    }

    /// Print the report to stdout.
    pub fn print(&self) {
        println!("{self}");
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Simulation Report ===")?;
        writeln!(f, "Simulated time:     {:?}", self.duration)?;
        writeln!(f, "Processes arrived:  {}", self.arrivals)?;
        writeln!(f, "Processes finished: {}", self.completions)?;
        writeln!(f, "Throughput:         {:.2}/s", self.throughput())?;
        writeln!(f)?;
        writeln!(f, "Waiting time:       {:.1} ms (p99 {} ms)", self.waiting_ms, self.waiting_p99_ms)?;
        writeln!(f, "Turnaround time:    {:.1} ms", self.turnaround_ms)?;
        writeln!(
            f,
            "  p50 / p90 / p99:  {} / {} / {} ms",
            self.turnaround_p50_ms, self.turnaround_p90_ms, self.turnaround_p99_ms
        )?;
        writeln!(f, "Core utilization:   {:.1}%", self.utilization * 100.0)?;
        writeln!(f)?;
        writeln!(
            f,
            "{:<10} {:<24} {:>6} {:>7} {:>9} {:>12} {:>14} {:>7}",
            "core", "algorithm", "speed", "queued", "finished", "waiting ms", "turnaround ms", "util"
        )?;
        for core in &self.cores {
            writeln!(
                f,
                "{:<10} {:<24} {:>6} {:>7} {:>9} {:>12.1} {:>14.1} {:>6.1}%",
                core.core.to_string(),
                core.algorithm,
                core.speed,
                core.queued,
                core.completed,
                core.waiting_ms,
                core.turnaround_ms,
                core.utilization * 100.0
            )?;
        }
        Ok(())
    }
}
