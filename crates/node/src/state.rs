//! Scheduling node state machine.

use crate::NodeConfig;
use procsim_analytics::AnalyticsEngine;
use procsim_core::{Action, CoreChange, Event, Lifecycle, LifecycleObserver, StateMachine, TimerId};
use procsim_scheduler::Scheduler;
use procsim_types::{Algorithm, CoreId, GenerationParadigm, Process, ProcessId, SchedError, TimeUnit};
use procsim_workload::{
    Arrival, ArrivalConfigError, ArrivalGenerator, DistributionError, ProbabilityDistributor,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Forwards scheduler notifications to analytics and surfaces them to the driver.
struct Notify<'a> {
    analytics: &'a mut AnalyticsEngine,
    outbox: &'a mut Vec<Action>,
}

impl LifecycleObserver for Notify<'_> {
    fn on_lifecycle(&mut self, event: Lifecycle) {
        self.analytics.on_lifecycle(event);
        self.outbox.push(Action::EmitLifecycle { event });
    }

    fn on_core_change(&mut self, change: CoreChange) {
        self.analytics.on_core_change(change);
    }
}

/// Combined scheduling node.
///
/// Owns the scheduler (the single authority on the core count), the
/// analytics engine, the probability distributor and the arrival generator.
/// Timer events arrive through [`StateMachine::handle`]; control operations
/// are plain methods that queue their timer actions for
/// [`take_actions`](SchedulerNode::take_actions).
pub struct SchedulerNode {
    config: NodeConfig,

    now: Duration,

    scheduler: Scheduler,
    analytics: AnalyticsEngine,
    distributor: ProbabilityDistributor,
    arrivals: ArrivalGenerator,

    /// Cores with a live step timer.
    stepping: BTreeSet<CoreId>,

    /// Next id handed to a generated or submitted process.
    next_process_id: ProcessId,

    rng: ChaCha8Rng,

    /// Actions produced by control operations, drained by the driver.
    outbox: Vec<Action>,
}

impl std::fmt::Debug for SchedulerNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerNode")
            .field("now", &self.now)
            .field("cores", &self.scheduler.core_count())
            .field("stepping", &self.stepping)
            .field("generating", &self.arrivals.is_generating())
            .field("next_process_id", &self.next_process_id)
            .finish()
    }
}

impl SchedulerNode {
    /// Create a node with a single idle core.
    pub fn new(config: NodeConfig) -> Self {
        Self {
            now: Duration::ZERO,
            scheduler: Scheduler::new(config.scheduler.clone()),
            analytics: AnalyticsEngine::new(config.analytics.clone()),
            distributor: ProbabilityDistributor::new(config.default_core_speed),
            arrivals: ArrivalGenerator::new(config.arrival.clone()),
            stepping: BTreeSet::new(),
            next_process_id: ProcessId::FIRST,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            outbox: Vec::new(),
            config,
        }
    }

    /// Timers that must be live from the start.
    pub fn boot(&mut self) -> Vec<Action> {
        info!(seed = self.config.seed, "Node booted");
        vec![self.utilization_timer()]
    }

    /// Drain the actions queued by control operations.
    pub fn take_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.outbox)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn analytics(&self) -> &AnalyticsEngine {
        &self.analytics
    }

    pub fn distributor(&self) -> &ProbabilityDistributor {
        &self.distributor
    }

    pub fn arrivals(&self) -> &ArrivalGenerator {
        &self.arrivals
    }

    pub fn core_count(&self) -> usize {
        self.scheduler.core_count()
    }

    /// Whether `core` has a live step timer.
    pub fn is_stepping(&self, core: CoreId) -> bool {
        self.stepping.contains(&core)
    }

    pub fn stepping_cores(&self) -> impl Iterator<Item = CoreId> + '_ {
        self.stepping.iter().copied()
    }

    /// Ticks per second of `core`.
    pub fn core_speed(&self, core: CoreId) -> Result<u32, SchedError> {
        self.scheduler.core(core)?;
        Ok(self
            .distributor
            .weights()
            .get(core.index())
            .map(|w| w.speed)
            .unwrap_or(self.config.default_core_speed))
    }

    /// Id the next process will get.
    pub fn next_process_id(&self) -> ProcessId {
        self.next_process_id
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Internals
    // ═══════════════════════════════════════════════════════════════════════════

    fn notify(&mut self) -> Notify<'_> {
        Notify {
            analytics: &mut self.analytics,
            outbox: &mut self.outbox,
        }
    }

    fn allocate_process_id(&mut self) -> ProcessId {
        let id = self.next_process_id;
        self.next_process_id = id.next();
        id
    }

    fn utilization_timer(&self) -> Action {
        Action::SetTimer {
            id: TimerId::Utilization,
            duration: self.config.utilization_interval,
        }
    }

    fn step_timer(&self, core: CoreId) -> Action {
        let speed = self.core_speed(core).unwrap_or(self.config.default_core_speed);
        Action::SetTimer {
            id: TimerId::CoreStep(core),
            duration: NodeConfig::step_period(speed),
        }
    }

    fn enqueue_new(&mut self, core: CoreId, burst_length: u64) -> Result<ProcessId, SchedError> {
        self.scheduler.core(core)?;
        let id = self.allocate_process_id();
        let process = Process::new(id, burst_length);
        let mut notify = Notify {
            analytics: &mut self.analytics,
            outbox: &mut self.outbox,
        };
        self.scheduler.enqueue(core, process, &mut notify)?;
        debug!(%core, process = %id, burst_length, "Process submitted");
        Ok(id)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Timer handlers
    // ═══════════════════════════════════════════════════════════════════════════

    fn on_core_step_timer(&mut self, core: CoreId) -> Vec<Action> {
        if !self.stepping.contains(&core) {
            trace!(%core, "Ignoring step timer for a stopped core");
            return vec![];
        }

        let mut actions = Vec::new();
        let mut notify = Notify {
            analytics: &mut self.analytics,
            outbox: &mut actions,
        };
        match self.scheduler.step(core, &mut notify) {
            Ok(outcome) => {
                trace!(%core, executed = %outcome.executed, running = ?outcome.running, "Stepped");
            }
            Err(SchedError::NoProcessInQueue { .. }) => {}
            Err(err) => {
                warn!(%core, error = %err, logic_error = err.is_logic_error(), "Step failed");
            }
        }

        actions.push(self.step_timer(core));
        actions
    }

    fn on_arrival_timer(&mut self) -> Vec<Action> {
        let (arrival, mut actions) = self
            .arrivals
            .on_arrival_timer(&self.distributor, &mut self.rng);

        if let Some(Arrival { core, burst_length }) = arrival {
            match self.enqueue_new(core, burst_length) {
                Ok(_) => actions.extend(self.take_actions()),
                Err(err) => warn!(%core, error = %err, "Dropped generated process"),
            }
        }
        actions
    }

    fn on_utilization_timer(&mut self) -> Vec<Action> {
        self.analytics.recompute_utilization();
        trace!(
            overall = self.analytics.overall_core_utilization(),
            "Utilization recomputed"
        );
        vec![self.utilization_timer()]
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Core control
    // ═══════════════════════════════════════════════════════════════════════════

    /// Append a core at the default speed.
    pub fn add_core(&mut self) -> CoreId {
        let mut notify = Notify {
            analytics: &mut self.analytics,
            outbox: &mut self.outbox,
        };
        let core = self.scheduler.add_core(&mut notify);
        self.distributor.add_core(self.config.default_core_speed);
        core
    }

    /// Remove `core` and renumber the cores above it, step timers included.
    pub fn remove_core(&mut self, core: CoreId) -> Result<(), SchedError> {
        let mut notify = Notify {
            analytics: &mut self.analytics,
            outbox: &mut self.outbox,
        };
        self.scheduler.remove_core(core, &mut notify)?;
        if let Err(err) = self.distributor.remove_core(core) {
            warn!(%core, error = %err, "Distributor out of step with scheduler");
        }

        let previously_stepping = std::mem::take(&mut self.stepping);
        for stepping in previously_stepping {
            if stepping < core {
                self.stepping.insert(stepping);
                continue;
            }
            self.outbox.push(Action::CancelTimer {
                id: TimerId::CoreStep(stepping),
            });
            if let Some(renumbered) = stepping.after_removal_of(core) {
                self.stepping.insert(renumbered);
                let timer = self.step_timer(renumbered);
                self.outbox.push(timer);
            }
        }
        Ok(())
    }

    /// Stop everything and return to a single idle core.
    ///
    /// Process ids start over from the first id.
    pub fn reset(&mut self) {
        let stepping = std::mem::take(&mut self.stepping);
        for core in stepping {
            self.outbox.push(Action::CancelTimer {
                id: TimerId::CoreStep(core),
            });
        }
        let stop = self.arrivals.stop();
        self.outbox.extend(stop);

        let mut notify = Notify {
            analytics: &mut self.analytics,
            outbox: &mut self.outbox,
        };
        self.scheduler.reset(&mut notify);
        self.distributor.reset(self.config.default_core_speed);
        self.arrivals = ArrivalGenerator::new(self.config.arrival.clone());
        self.next_process_id = ProcessId::FIRST;
        info!("Node reset");
    }

    /// Begin stepping `core` at its speed.
    pub fn start_core(&mut self, core: CoreId) -> Result<(), SchedError> {
        let has_work = !self.scheduler.core(core)?.is_idle();
        if !self.stepping.insert(core) {
            return Ok(());
        }
        let timer = self.step_timer(core);
        self.outbox.push(timer);
        if has_work {
            self.notify().on_lifecycle(Lifecycle::CoreBusy { core });
        }
        debug!(%core, "Core started");
        Ok(())
    }

    /// Stop stepping `core`.
    pub fn stop_core(&mut self, core: CoreId) -> Result<(), SchedError> {
        self.scheduler.core(core)?;
        if !self.stepping.remove(&core) {
            return Ok(());
        }
        self.outbox.push(Action::CancelTimer {
            id: TimerId::CoreStep(core),
        });
        self.notify().on_lifecycle(Lifecycle::CoreIdle { core });
        debug!(%core, "Core stopped");
        Ok(())
    }

    /// Change how many ticks per second `core` runs, re-arming its timer.
    pub fn set_core_speed(&mut self, core: CoreId, speed: u32) -> Result<(), SchedError> {
        if speed < self.config.min_core_speed {
            return Err(SchedError::ValueTooSmall {
                value: speed.into(),
                min: self.config.min_core_speed.into(),
            });
        }
        if speed > self.config.max_core_speed {
            return Err(SchedError::ValueTooLarge {
                value: speed.into(),
                max: self.config.max_core_speed.into(),
            });
        }
        self.scheduler.core(core)?;
        if let Err(err) = self.distributor.set_speed(core, speed) {
            warn!(%core, error = %err, "Distributor out of step with scheduler");
        }

        if self.stepping.contains(&core) {
            self.outbox.push(Action::CancelTimer {
                id: TimerId::CoreStep(core),
            });
            let timer = self.step_timer(core);
            self.outbox.push(timer);
        }
        debug!(%core, speed, "Core speed changed");
        Ok(())
    }

    pub fn set_algorithm(&mut self, core: CoreId, algorithm: Algorithm) -> Result<(), SchedError> {
        self.scheduler.set_algorithm(core, algorithm)
    }

    pub fn set_time_quantum(&mut self, core: CoreId, quantum: u64) -> Result<u64, SchedError> {
        self.scheduler.set_time_quantum(core, quantum)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Manual submission
    // ═══════════════════════════════════════════════════════════════════════════

    /// Queue a process needing `burst_length` units on `core`.
    pub fn submit_process(&mut self, core: CoreId, burst_length: u64) -> Result<ProcessId, SchedError> {
        if burst_length < 1 {
            return Err(SchedError::ValueTooSmall {
                value: burst_length,
                min: 1,
            });
        }
        self.enqueue_new(core, burst_length)
    }

    /// Queue a process with a random burst length on `core`.
    pub fn submit_random_process(&mut self, core: CoreId) -> Result<ProcessId, SchedError> {
        self.scheduler.core(core)?;
        let burst_length = self.rng.gen_range(self.config.manual_burst_range.clone());
        self.submit_process(core, burst_length.max(1))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Arrival control
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn start_generation(&mut self) {
        let actions = self.arrivals.start(&mut self.rng);
        self.outbox.extend(actions);
    }

    pub fn stop_generation(&mut self) {
        let actions = self.arrivals.stop();
        self.outbox.extend(actions);
    }

    pub fn toggle_generation(&mut self) {
        let actions = self.arrivals.toggle(&mut self.rng);
        self.outbox.extend(actions);
    }

    /// Set arrivals per time unit.
    ///
    /// A count above the unit's cap is applied at the cap and still reported
    /// as `AboveMaximum`.
    pub fn set_mean_arrival_count(&mut self, count: f64) -> Result<(), ArrivalConfigError> {
        self.arrivals
            .set_mean_arrival_count(count, &mut self.rng)?
            .into_result(&mut self.outbox)
    }

    pub fn set_time_unit(&mut self, unit: TimeUnit) -> Result<(), ArrivalConfigError> {
        self.arrivals
            .set_time_unit(unit, &mut self.rng)
            .into_result(&mut self.outbox)
    }

    pub fn set_paradigm(&mut self, paradigm: GenerationParadigm) {
        let update = self.arrivals.set_paradigm(paradigm, &mut self.rng);
        self.outbox.extend(update.actions);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Routing control
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn set_probability(&mut self, core: CoreId, value: f64) -> Result<(), DistributionError> {
        self.distributor.set_one(core, value)
    }

    pub fn set_equal_probabilities(&mut self) {
        self.distributor.set_equal();
    }

    pub fn set_probabilities_proportional_to_speed(&mut self) {
        self.distributor.set_proportional_to_speed();
    }

    pub fn apply_bulk_probabilities<S: AsRef<str>>(
        &mut self,
        percentages: &[S],
    ) -> Result<(), DistributionError> {
        self.distributor.apply_bulk(percentages)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Analytics control
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn set_window(&mut self, window: u64) -> Result<(), SchedError> {
        self.analytics.set_window(window)
    }

    pub fn set_core_window(&mut self, core_window: Duration) -> Result<(), SchedError> {
        self.analytics.set_core_window(core_window)
    }

    /// Recompute utilization now rather than at the next timer.
    pub fn recompute_utilization(&mut self) {
        self.analytics.recompute_utilization();
    }
}

impl StateMachine for SchedulerNode {
    fn handle(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::CoreStepTimer { core } => self.on_core_step_timer(core),
            Event::ArrivalTimer => self.on_arrival_timer(),
            Event::UtilizationTimer => self.on_utilization_timer(),
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
        self.analytics.set_time(now);
    }

    fn now(&self) -> Duration {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn node() -> SchedulerNode {
        SchedulerNode::new(NodeConfig::default().with_seed(7))
    }

    fn timers(actions: &[Action]) -> Vec<Action> {
        actions.iter().filter(|a| a.is_timer()).cloned().collect()
    }

    fn lifecycle(actions: &[Action]) -> Vec<Lifecycle> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::EmitLifecycle { event } => Some(*event),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_boot_arms_utilization_timer() {
        let mut node = node();
        assert_eq!(
            node.boot(),
            vec![Action::SetTimer {
                id: TimerId::Utilization,
                duration: Duration::from_secs(1)
            }]
        );
        assert_eq!(node.handle(Event::UtilizationTimer).len(), 1);
    }

    #[test]
    fn test_process_ids_shared_across_sources() {
        let mut node = node();
        let manual = node.submit_process(CoreId(0), 3).unwrap();
        assert_eq!(manual, ProcessId(1));

        node.start_generation();
        let _ = node.take_actions();
        let actions = node.handle(Event::ArrivalTimer);
        assert!(lifecycle(&actions)
            .iter()
            .any(|e| e.process() == Some(ProcessId(2))));

        let random = node.submit_random_process(CoreId(0)).unwrap();
        assert_eq!(random, ProcessId(3));
        assert_eq!(node.next_process_id(), ProcessId(4));
    }

    #[test]
    fn test_submit_validation() {
        let mut node = node();
        assert_eq!(
            node.submit_process(CoreId(0), 0),
            Err(SchedError::ValueTooSmall { value: 0, min: 1 })
        );
        assert!(matches!(
            node.submit_process(CoreId(3), 5),
            Err(SchedError::CoreOutOfBound { .. })
        ));
        assert_eq!(node.next_process_id(), ProcessId::FIRST);
    }

    #[test]
    fn test_step_timer_rearms_and_notifies() {
        let mut node = node();
        node.submit_process(CoreId(0), 2).unwrap();
        node.start_core(CoreId(0)).unwrap();
        let control = node.take_actions();
        assert!(control.contains(&Action::SetTimer {
            id: TimerId::CoreStep(CoreId(0)),
            duration: Duration::from_millis(100)
        }));
        assert!(lifecycle(&control).contains(&Lifecycle::CoreBusy { core: CoreId(0) }));

        let actions = node.handle(Event::CoreStepTimer { core: CoreId(0) });
        assert_eq!(
            timers(&actions),
            vec![Action::SetTimer {
                id: TimerId::CoreStep(CoreId(0)),
                duration: Duration::from_millis(100)
            }]
        );

        let actions = node.handle(Event::CoreStepTimer { core: CoreId(0) });
        assert!(lifecycle(&actions).contains(&Lifecycle::Finished {
            process: ProcessId(1),
            core: CoreId(0)
        }));
    }

    #[test]
    fn test_stopped_core_ignores_stale_timer() {
        let mut node = node();
        node.start_core(CoreId(0)).unwrap();
        node.stop_core(CoreId(0)).unwrap();
        let control = node.take_actions();
        assert!(control.contains(&Action::CancelTimer {
            id: TimerId::CoreStep(CoreId(0))
        }));

        assert!(node.handle(Event::CoreStepTimer { core: CoreId(0) }).is_empty());
    }

    #[test]
    fn test_remove_core_rekeys_step_timers() {
        let mut node = node();
        node.add_core();
        node.add_core();
        node.start_core(CoreId(0)).unwrap();
        node.start_core(CoreId(2)).unwrap();
        let _ = node.take_actions();

        node.remove_core(CoreId(1)).unwrap();
        let actions = node.take_actions();
        assert_eq!(
            actions,
            vec![
                Action::CancelTimer {
                    id: TimerId::CoreStep(CoreId(2))
                },
                Action::SetTimer {
                    id: TimerId::CoreStep(CoreId(1)),
                    duration: Duration::from_millis(100)
                },
            ]
        );
        assert_eq!(node.stepping_cores().collect::<Vec<_>>(), vec![CoreId(0), CoreId(1)]);
        assert_eq!(node.core_count(), 2);
        assert_eq!(node.distributor().len(), 2);
        assert_eq!(node.analytics().core_count(), 2);
    }

    #[test]
    fn test_remove_then_add_restores_default_core() {
        let mut node = node();
        node.set_algorithm(CoreId(0), Algorithm::RoundRobin).unwrap();
        node.submit_process(CoreId(0), 4).unwrap();

        node.remove_core(CoreId(0)).unwrap();
        assert_eq!(node.core_count(), 0);
        let core = node.add_core();

        assert_eq!(core, CoreId(0));
        let state = node.scheduler().core(core).unwrap();
        assert!(state.queue().is_empty());
        assert_eq!(state.algorithm(), Algorithm::FirstComeFirstServe);
        assert_eq!(node.distributor().probability(core), Ok(1.0));
    }

    #[test]
    fn test_core_speed_bounds_and_restart() {
        let mut node = node();
        assert!(matches!(
            node.set_core_speed(CoreId(0), 5),
            Err(SchedError::ValueTooSmall { min: 10, .. })
        ));
        assert!(matches!(
            node.set_core_speed(CoreId(0), 251),
            Err(SchedError::ValueTooLarge { max: 250, .. })
        ));

        node.start_core(CoreId(0)).unwrap();
        let _ = node.take_actions();
        node.set_core_speed(CoreId(0), 50).unwrap();
        assert_eq!(
            node.take_actions(),
            vec![
                Action::CancelTimer {
                    id: TimerId::CoreStep(CoreId(0))
                },
                Action::SetTimer {
                    id: TimerId::CoreStep(CoreId(0)),
                    duration: Duration::from_millis(20)
                },
            ]
        );
        assert_eq!(node.core_speed(CoreId(0)), Ok(50));
    }

    #[test]
    fn test_clamped_count_still_restarts() {
        let mut node = node();
        node.start_generation();
        let _ = node.take_actions();

        assert!(matches!(
            node.set_mean_arrival_count(1_000.0),
            Err(ArrivalConfigError::AboveMaximum { .. })
        ));
        let actions = node.take_actions();
        assert_eq!(actions.len(), 2);
        assert_eq!(node.arrivals().config().mean_arrival_count, 100.0);
    }

    #[traced_test]
    #[test]
    fn test_reset() {
        let mut node = node();
        node.add_core();
        node.start_core(CoreId(1)).unwrap();
        node.start_generation();
        node.submit_process(CoreId(1), 3).unwrap();
        let _ = node.take_actions();

        node.reset();
        let actions = node.take_actions();
        assert!(actions.contains(&Action::CancelTimer {
            id: TimerId::CoreStep(CoreId(1))
        }));
        assert!(actions.contains(&Action::CancelTimer {
            id: TimerId::Arrival
        }));
        assert_eq!(node.core_count(), 1);
        assert_eq!(node.analytics().core_count(), 1);
        assert_eq!(node.distributor().len(), 1);
        assert!(!node.arrivals().is_generating());
        assert_eq!(node.next_process_id(), ProcessId::FIRST);
        assert!(logs_contain("Node reset"));
    }

    #[test]
    fn test_same_seed_same_arrivals() {
        let run = || {
            let mut node = node();
            node.add_core();
            node.start_generation();
            let _ = node.take_actions();
            (0..20)
                .flat_map(|_| lifecycle(&node.handle(Event::ArrivalTimer)))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
