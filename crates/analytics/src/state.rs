//! Analytics engine state.

use crate::{AnalyticsConfig, CoreState, CoreTimeline, RunningAverage};
use indexmap::IndexMap;
use procsim_core::{CoreChange, Lifecycle, LifecycleObserver};
use procsim_types::{CoreId, ProcessId, SchedError};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Timestamps of one process on its core.
#[derive(Debug, Clone, Copy)]
struct ProcessTimes {
    arrived: Duration,
    became_waiting: Duration,
    became_running: Option<Duration>,
}

impl ProcessTimes {
    fn arriving(now: Duration) -> Self {
        Self {
            arrived: now,
            became_waiting: now,
            became_running: None,
        }
    }
}

/// Everything tracked for one core.
#[derive(Debug, Clone, Default)]
struct CoreStats {
    waiting: RunningAverage,
    turnaround: RunningAverage,
    utilization: f64,
    timeline: CoreTimeline,
    processes: IndexMap<ProcessId, ProcessTimes>,
}

/// Windowed waiting-time, turnaround and utilization statistics.
///
/// Fed exclusively through [`LifecycleObserver`]; it never looks at the
/// scheduler's queues. Times are taken from the clock set with
/// [`set_time`](AnalyticsEngine::set_time) and averages are in milliseconds.
#[derive(Debug)]
pub struct AnalyticsEngine {
    defaults: AnalyticsConfig,

    window: u64,
    core_window: Duration,
    prune_every: u64,

    now: Duration,

    cores: Vec<CoreStats>,

    overall_waiting: RunningAverage,
    overall_turnaround: RunningAverage,
    overall_utilization: f64,

    /// Recomputes since the last prune.
    recomputes: u64,
}

impl AnalyticsEngine {
    /// Create an engine tracking a single core.
    pub fn new(config: AnalyticsConfig) -> Self {
        Self {
            window: config.window,
            core_window: config.core_window,
            prune_every: config.prune_every.max(1),
            defaults: config,
            now: Duration::ZERO,
            cores: vec![CoreStats::default()],
            overall_waiting: RunningAverage::default(),
            overall_turnaround: RunningAverage::default(),
            overall_utilization: 0.0,
            recomputes: 0,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Clock
    // ═══════════════════════════════════════════════════════════════════════════

    /// Set the time subsequent notifications are stamped with.
    pub fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    /// The time last set.
    pub fn now(&self) -> Duration {
        self.now
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════════

    /// Number of cores being tracked.
    pub fn core_count(&self) -> usize {
        self.cores.len()
    }

    fn stats(&self, core: CoreId) -> Result<&CoreStats, SchedError> {
        self.cores.get(core.index()).ok_or(SchedError::CoreOutOfBound {
            core,
            core_count: self.cores.len(),
        })
    }

    /// Average time a process on `core` waited before running, in ms.
    pub fn waiting_time(&self, core: CoreId) -> Result<f64, SchedError> {
        self.stats(core).map(|s| s.waiting.average())
    }

    /// Average arrival-to-completion time on `core`, in ms.
    pub fn turnaround_time(&self, core: CoreId) -> Result<f64, SchedError> {
        self.stats(core).map(|s| s.turnaround.average())
    }

    /// Busy share of `core` over the window, as of the last recompute.
    pub fn core_utilization(&self, core: CoreId) -> Result<f64, SchedError> {
        self.stats(core).map(|s| s.utilization)
    }

    /// Idle/busy history of `core`.
    pub fn timeline(&self, core: CoreId) -> Result<&CoreTimeline, SchedError> {
        self.stats(core).map(|s| &s.timeline)
    }

    /// Utilization of every core, by index.
    pub fn core_utilizations(&self) -> Vec<f64> {
        self.cores.iter().map(|s| s.utilization).collect()
    }

    pub fn overall_waiting_time(&self) -> f64 {
        self.overall_waiting.average()
    }

    pub fn overall_turnaround_time(&self) -> f64 {
        self.overall_turnaround.average()
    }

    /// Mean utilization across cores, as of the last recompute.
    pub fn overall_core_utilization(&self) -> f64 {
        self.overall_utilization
    }

    /// Processes seen on `core` that have not finished yet.
    pub fn tracked_processes(&self, core: CoreId) -> Result<usize, SchedError> {
        self.stats(core).map(|s| s.processes.len())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Windows
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn window(&self) -> u64 {
        self.window
    }

    pub fn core_window(&self) -> Duration {
        self.core_window
    }

    /// Set the sample cap of every running average.
    pub fn set_window(&mut self, window: u64) -> Result<(), SchedError> {
        if let Err(err) = AnalyticsConfig::check_window(window) {
            warn!(window, "Rejected running-average window");
            return Err(err);
        }
        self.window = window;
        debug!(window, "Running-average window set");
        Ok(())
    }

    /// Set the span utilization is computed over.
    ///
    /// The next recompute revisits every retained block against the new span.
    pub fn set_core_window(&mut self, core_window: Duration) -> Result<(), SchedError> {
        if let Err(err) = AnalyticsConfig::check_core_window(core_window) {
            warn!(core_window_ms = core_window.as_millis() as u64, "Rejected core window");
            return Err(err);
        }
        self.core_window = core_window;
        for stats in &mut self.cores {
            stats.timeline.rewind();
        }
        debug!(core_window_ms = core_window.as_millis() as u64, "Core window set");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Utilization
    // ═══════════════════════════════════════════════════════════════════════════

    /// Reconcile every core's history against the trailing window ending now.
    ///
    /// Calling this twice at the same time with no notifications in between
    /// leaves every utilization unchanged.
    pub fn recompute_utilization(&mut self) {
        let (core_window, now) = (self.core_window, self.now);
        for stats in &mut self.cores {
            stats.timeline.reconcile(core_window, now);
            stats.utilization = stats.timeline.utilization();
        }

        self.overall_utilization = if self.cores.is_empty() {
            0.0
        } else {
            self.cores.iter().map(|s| s.utilization).sum::<f64>() / self.cores.len() as f64
        };

        self.recomputes += 1;
        if self.recomputes >= self.prune_every {
            self.recomputes = 0;
            let pruned: usize = self.cores.iter_mut().map(|s| s.timeline.prune()).sum();
            if pruned > 0 {
                trace!(pruned, "Pruned expired time blocks");
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Notification handlers
    // ═══════════════════════════════════════════════════════════════════════════

    fn stats_mut(&mut self, core: CoreId) -> Option<&mut CoreStats> {
        let core_count = self.cores.len();
        let stats = self.cores.get_mut(core.index());
        if stats.is_none() {
            warn!(%core, core_count, "Notification for an untracked core");
        }
        stats
    }

    fn on_waiting(&mut self, process: ProcessId, core: CoreId) {
        let now = self.now;
        let Some(stats) = self.stats_mut(core) else {
            return;
        };
        stats
            .processes
            .entry(process)
            .and_modify(|times| times.became_waiting = now)
            .or_insert_with(|| ProcessTimes::arriving(now));
    }

    fn on_running(&mut self, process: ProcessId, core: CoreId) {
        let (now, window) = (self.now, self.window);
        let Some(stats) = self.stats_mut(core) else {
            return;
        };
        let times = stats
            .processes
            .entry(process)
            .or_insert_with(|| ProcessTimes::arriving(now));
        times.became_running = Some(now);

        let waited = now.saturating_sub(times.became_waiting).as_secs_f64() * 1000.0;
        stats.waiting.record(waited, window);
        self.overall_waiting.record(waited, window);
        trace!(%process, %core, waited_ms = waited, "Process running");
    }

    fn on_finished(&mut self, process: ProcessId, core: CoreId) {
        let (now, window) = (self.now, self.window);
        let Some(stats) = self.stats_mut(core) else {
            return;
        };
        let Some(times) = stats.processes.shift_remove(&process) else {
            debug!(%process, %core, "Finished process was never seen arriving");
            return;
        };

        let turnaround = now.saturating_sub(times.arrived).as_secs_f64() * 1000.0;
        stats.turnaround.record(turnaround, window);
        self.overall_turnaround.record(turnaround, window);
        trace!(%process, %core, turnaround_ms = turnaround, "Process finished");
    }

    fn on_core_state(&mut self, core: CoreId, state: CoreState) {
        let now = self.now;
        let Some(stats) = self.stats_mut(core) else {
            return;
        };
        if stats.timeline.transition(state, now) {
            trace!(%core, ?state, "Core state changed");
        }
    }

    /// Drop everything and track a single fresh core with default windows.
    fn reset(&mut self) {
        let now = self.now;
        *self = Self::new(self.defaults.clone());
        self.now = now;
        debug!("Analytics reset");
    }
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self::new(AnalyticsConfig::default())
    }
}

impl LifecycleObserver for AnalyticsEngine {
    fn on_lifecycle(&mut self, event: Lifecycle) {
        match event {
            Lifecycle::Waiting { process, core } => self.on_waiting(process, core),
            Lifecycle::Running { process, core } => self.on_running(process, core),
            Lifecycle::Finished { process, core } => self.on_finished(process, core),
            Lifecycle::CoreIdle { core } => self.on_core_state(core, CoreState::Idle),
            Lifecycle::CoreBusy { core } => self.on_core_state(core, CoreState::Busy),
        }
    }

    fn on_core_change(&mut self, change: CoreChange) {
        match change {
            CoreChange::Added { core } => {
                if core.index() != self.cores.len() {
                    warn!(%core, core_count = self.cores.len(), "Added core out of step");
                }
                self.cores.push(CoreStats::default());
            }
            CoreChange::Removed { core } => {
                if core.index() < self.cores.len() {
                    self.cores.remove(core.index());
                } else {
                    warn!(%core, core_count = self.cores.len(), "Removed core not tracked");
                }
            }
            CoreChange::Reset => self.reset(),
        }
    }
}
