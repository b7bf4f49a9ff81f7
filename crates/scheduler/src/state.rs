//! Scheduler state machine.

use crate::{Core, SchedulerConfig};
use procsim_core::{CoreChange, Lifecycle, LifecycleObserver};
use procsim_types::{Algorithm, CoreId, Process, ProcessId, SchedError};
use std::collections::VecDeque;
use tracing::{debug, trace, warn};

/// What a successful step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    /// The process that received this tick.
    pub executed: ProcessId,

    /// Set if `executed` finished on this tick.
    pub finished: Option<ProcessId>,

    /// The queue head after the step, `None` if the core is now empty.
    pub running: Option<ProcessId>,
}

/// Owns every core's queue and dispatch policy.
///
/// This is the single authority for the core count. Observers are told
/// about every structural change so they can mirror it index for index.
pub struct Scheduler {
    /// Defaults for new cores and quantum bounds.
    config: SchedulerConfig,

    /// One record per core, indexed by `CoreId`.
    cores: Vec<Core>,
}

impl Scheduler {
    /// Create a scheduler with a single default core.
    pub fn new(config: SchedulerConfig) -> Self {
        let cores = vec![Core::new(&config)];
        Self { config, cores }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════════

    /// Number of cores.
    pub fn core_count(&self) -> usize {
        self.cores.len()
    }

    /// All cores in index order.
    pub fn cores(&self) -> &[Core] {
        &self.cores
    }

    /// Get a core record.
    pub fn core(&self, core: CoreId) -> Result<&Core, SchedError> {
        self.cores.get(core.index()).ok_or(SchedError::CoreOutOfBound {
            core,
            core_count: self.cores.len(),
        })
    }

    fn core_mut(&mut self, core: CoreId) -> Result<&mut Core, SchedError> {
        let core_count = self.cores.len();
        self.cores
            .get_mut(core.index())
            .ok_or(SchedError::CoreOutOfBound { core, core_count })
    }

    /// The queue of `core` in scheduling order.
    pub fn process_queue(&self, core: CoreId) -> Result<&VecDeque<Process>, SchedError> {
        self.core(core).map(Core::queue)
    }

    /// Human-readable label of the policy `core` runs.
    pub fn algorithm_label(&self, core: CoreId) -> Result<&'static str, SchedError> {
        self.core(core).map(|c| c.algorithm().label())
    }

    /// Id of the process at the head of `core`.
    pub fn running_process_id(&self, core: CoreId) -> Result<Option<ProcessId>, SchedError> {
        self.core(core).map(Core::running_process_id)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Configuration
    // ═══════════════════════════════════════════════════════════════════════════

    /// Change the dispatch policy of `core`.
    pub fn set_algorithm(&mut self, core: CoreId, algorithm: Algorithm) -> Result<(), SchedError> {
        let state = self.core_mut(core)?;
        state.algorithm = algorithm;
        debug!(core = %core, algorithm = %algorithm, "Algorithm changed");
        Ok(())
    }

    /// Change the Round Robin quantum of `core`, returning the new quantum.
    pub fn set_time_quantum(&mut self, core: CoreId, quantum: u64) -> Result<u64, SchedError> {
        self.config.check_time_quantum(quantum)?;

        let state = self.core_mut(core)?;
        state.time_quantum = quantum;
        debug!(core = %core, quantum, "Time quantum changed");
        Ok(quantum)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Structure
    // ═══════════════════════════════════════════════════════════════════════════

    /// Append a default core and return its id.
    pub fn add_core(&mut self, observer: &mut impl LifecycleObserver) -> CoreId {
        let core = CoreId(self.cores.len());
        self.cores.push(Core::new(&self.config));
        observer.on_core_change(CoreChange::Added { core });
        debug!(core = %core, core_count = self.cores.len(), "Core added");
        core
    }

    /// Remove `core`. Every higher core shifts down by one.
    ///
    /// Processes queued on the removed core are dropped.
    pub fn remove_core(
        &mut self,
        core: CoreId,
        observer: &mut impl LifecycleObserver,
    ) -> Result<(), SchedError> {
        self.core(core)?;
        let removed = self.cores.remove(core.index());
        observer.on_core_change(CoreChange::Removed { core });
        debug!(
            core = %core,
            dropped = removed.queue.len(),
            core_count = self.cores.len(),
            "Core removed"
        );
        Ok(())
    }

    /// Tear down to a single default core.
    pub fn reset(&mut self, observer: &mut impl LifecycleObserver) {
        self.cores = vec![Core::new(&self.config)];
        observer.on_core_change(CoreChange::Reset);
        debug!("Scheduler reset");
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Dispatch
    // ═══════════════════════════════════════════════════════════════════════════

    /// Append `process` to the queue of `core`.
    ///
    /// On an empty queue the process starts running immediately; otherwise
    /// it waits behind the current head.
    pub fn enqueue(
        &mut self,
        core: CoreId,
        process: Process,
        observer: &mut impl LifecycleObserver,
    ) -> Result<(), SchedError> {
        let state = self.core_mut(core)?;
        let id = process.id;
        let was_empty = state.queue.is_empty();
        state.queue.push_back(process);

        if was_empty {
            state.running = Some(id);
            trace!(core = %core, process = %id, "Enqueued onto empty core");
            observer.on_lifecycle(Lifecycle::Running { process: id, core });
        } else {
            trace!(core = %core, process = %id, queued = state.queue.len(), "Enqueued");
            observer.on_lifecycle(Lifecycle::Waiting { process: id, core });
        }
        Ok(())
    }

    /// Advance `core` by one unit of simulated time.
    ///
    /// The head receives one unit of service, then the core's policy decides
    /// what runs next. An empty queue reports the core idle and fails with
    /// `NoProcessInQueue`.
    pub fn step(
        &mut self,
        core: CoreId,
        observer: &mut impl LifecycleObserver,
    ) -> Result<StepOutcome, SchedError> {
        let state = self.core_mut(core)?;

        let Some(head) = state.queue.front_mut() else {
            observer.on_lifecycle(Lifecycle::CoreIdle { core });
            return Err(SchedError::NoProcessInQueue { core });
        };

        if state.running != Some(head.id) {
            warn!(
                core = %core,
                expected = ?state.running,
                head = %head.id,
                "Running process is not the queue head"
            );
            return Err(SchedError::ProcNotFound {
                core,
                expected: state.running,
            });
        }

        observer.on_lifecycle(Lifecycle::CoreBusy { core });

        head.run_for_one_unit();
        let executed = head.id;
        let head_finished = head.is_finished();
        let mut finished = None;

        match state.algorithm {
            Algorithm::FirstComeFirstServe => {
                if head_finished {
                    state.queue.pop_front();
                    finished = Some(executed);
                }
            }

            Algorithm::ShortestJobFirst => {
                if head_finished {
                    state.queue.pop_front();
                    finished = Some(executed);
                }
                if let Some(index) = state.shortest_job_index().filter(|&i| i > 0) {
                    if let Some(shortest) = state.queue.remove(index) {
                        state.queue.push_front(shortest);
                    }
                }
            }

            Algorithm::RoundRobin => {
                state.round_robin_counter = (state.round_robin_counter + 1).min(state.time_quantum);
                let quantum_expired = state.round_robin_counter >= state.time_quantum
                    && state.queue.len() > 1;

                if head_finished || quantum_expired {
                    if let Some(rotated) = state.queue.pop_front() {
                        if rotated.is_finished() {
                            finished = Some(executed);
                        } else {
                            state.queue.push_back(rotated);
                        }
                    }
                    state.round_robin_counter = 0;
                }
            }
        }

        if let Some(process) = finished {
            debug!(core = %core, process = %process, "Process finished");
            observer.on_lifecycle(Lifecycle::Finished { process, core });
        }

        // Hand the head over if it changed. A displaced or rotated process
        // that is still queued goes back to waiting first.
        let new_head = state.queue.front().map(|p| p.id);
        if new_head != state.running {
            if let Some(previous) = state.running.filter(|&id| state.is_queued(id)) {
                observer.on_lifecycle(Lifecycle::Waiting {
                    process: previous,
                    core,
                });
            }
            if let Some(next) = new_head {
                trace!(core = %core, process = %next, "Process promoted to running");
                observer.on_lifecycle(Lifecycle::Running { process: next, core });
            }
            state.running = new_head;
        }

        Ok(StepOutcome {
            executed,
            finished,
            running: new_head,
        })
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    const CORE: CoreId = CoreId(0);

    fn scheduler_with(algorithm: Algorithm) -> Scheduler {
        let mut scheduler = Scheduler::default();
        scheduler.set_algorithm(CORE, algorithm).unwrap();
        scheduler
    }

    fn submit(scheduler: &mut Scheduler, id: u64, burst: u64) {
        scheduler
            .enqueue(CORE, Process::new(ProcessId(id), burst), &mut Vec::new())
            .unwrap();
    }

    /// Step `n` times, returning which process received each tick.
    fn executed_sequence(scheduler: &mut Scheduler, n: usize) -> Vec<u64> {
        (0..n)
            .map(|_| scheduler.step(CORE, &mut Vec::new()).unwrap().executed.0)
            .collect()
    }

    #[traced_test]
    #[test]
    fn test_fcfs_runs_in_arrival_order() {
        let mut scheduler = scheduler_with(Algorithm::FirstComeFirstServe);
        submit(&mut scheduler, 1, 3);
        submit(&mut scheduler, 2, 2);

        assert_eq!(executed_sequence(&mut scheduler, 5), vec![1, 1, 1, 2, 2]);

        let mut events = Vec::new();
        assert_eq!(
            scheduler.step(CORE, &mut events),
            Err(SchedError::NoProcessInQueue { core: CORE })
        );
        assert_eq!(events, vec![Lifecycle::CoreIdle { core: CORE }]);
        assert_eq!(scheduler.running_process_id(CORE), Ok(None));
    }

    #[traced_test]
    #[test]
    fn test_fcfs_reports_running_after_step() {
        let mut scheduler = scheduler_with(Algorithm::FirstComeFirstServe);
        submit(&mut scheduler, 1, 1);
        submit(&mut scheduler, 2, 1);

        let outcome = scheduler.step(CORE, &mut Vec::new()).unwrap();
        assert_eq!(
            outcome,
            StepOutcome {
                executed: ProcessId(1),
                finished: Some(ProcessId(1)),
                running: Some(ProcessId(2)),
            }
        );
    }

    #[traced_test]
    #[test]
    fn test_sjf_selects_by_original_burst_length() {
        let mut scheduler = scheduler_with(Algorithm::ShortestJobFirst);
        submit(&mut scheduler, 1, 5);
        executed_sequence(&mut scheduler, 2);
        assert_eq!(scheduler.process_queue(CORE).unwrap()[0].remaining, 3);

        submit(&mut scheduler, 2, 2);
        let mut events = Vec::new();
        let outcome = scheduler.step(CORE, &mut events).unwrap();

        // Process 1 now has 2 units left, tying process 2's burst. The policy
        // still compares original bursts (5 vs 2), so process 2 takes over.
        assert_eq!(outcome.executed, ProcessId(1));
        assert_eq!(outcome.running, Some(ProcessId(2)));
        assert_eq!(
            events,
            vec![
                Lifecycle::CoreBusy { core: CORE },
                Lifecycle::Waiting {
                    process: ProcessId(1),
                    core: CORE
                },
                Lifecycle::Running {
                    process: ProcessId(2),
                    core: CORE
                },
            ]
        );
    }

    #[traced_test]
    #[test]
    fn test_sjf_promotes_shortest_after_finish() {
        let mut scheduler = scheduler_with(Algorithm::ShortestJobFirst);
        submit(&mut scheduler, 1, 1);
        submit(&mut scheduler, 2, 9);
        submit(&mut scheduler, 3, 4);

        let mut events = Vec::new();
        let outcome = scheduler.step(CORE, &mut events).unwrap();
        assert_eq!(outcome.finished, Some(ProcessId(1)));
        assert_eq!(outcome.running, Some(ProcessId(3)));

        let order: Vec<_> = scheduler
            .process_queue(CORE)
            .unwrap()
            .iter()
            .map(|p| p.id.0)
            .collect();
        assert_eq!(order, vec![3, 2]);

        // The finished process must not be sent back to waiting.
        assert!(!events.contains(&Lifecycle::Waiting {
            process: ProcessId(1),
            core: CORE
        }));
    }

    #[traced_test]
    #[test]
    fn test_round_robin_rotates_every_quantum() {
        let mut scheduler = scheduler_with(Algorithm::RoundRobin);
        scheduler.set_time_quantum(CORE, 2).unwrap();
        submit(&mut scheduler, 1, 4);
        submit(&mut scheduler, 2, 4);

        assert_eq!(
            executed_sequence(&mut scheduler, 8),
            vec![1, 1, 2, 2, 1, 1, 2, 2]
        );
        assert!(scheduler.core(CORE).unwrap().is_idle());
    }

    #[traced_test]
    #[test]
    fn test_round_robin_single_process_is_not_rotated() {
        let mut scheduler = scheduler_with(Algorithm::RoundRobin);
        scheduler.set_time_quantum(CORE, 2).unwrap();
        submit(&mut scheduler, 1, 10);

        let mut events = Vec::new();
        for _ in 0..4 {
            scheduler.step(CORE, &mut events).unwrap();
        }

        // Counter saturates at the quantum instead of growing.
        assert_eq!(scheduler.core(CORE).unwrap().round_robin_counter(), 2);
        assert!(events.iter().all(|e| matches!(e, Lifecycle::CoreBusy { .. })));

        // A second arrival is rotated in on the very next step.
        submit(&mut scheduler, 2, 1);
        let outcome = scheduler.step(CORE, &mut Vec::new()).unwrap();
        assert_eq!(outcome.running, Some(ProcessId(2)));
        assert_eq!(scheduler.core(CORE).unwrap().round_robin_counter(), 0);
    }

    #[traced_test]
    #[test]
    fn test_enqueue_events() {
        let mut scheduler = Scheduler::default();
        let mut events = Vec::new();
        scheduler
            .enqueue(CORE, Process::new(ProcessId(1), 3), &mut events)
            .unwrap();
        scheduler
            .enqueue(CORE, Process::new(ProcessId(2), 3), &mut events)
            .unwrap();

        assert_eq!(
            events,
            vec![
                Lifecycle::Running {
                    process: ProcessId(1),
                    core: CORE
                },
                Lifecycle::Waiting {
                    process: ProcessId(2),
                    core: CORE
                },
            ]
        );
        assert_eq!(scheduler.running_process_id(CORE), Ok(Some(ProcessId(1))));
    }

    #[traced_test]
    #[test]
    fn test_out_of_range_core() {
        let mut scheduler = Scheduler::default();
        let bad = CoreId(3);
        let expected = SchedError::CoreOutOfBound {
            core: bad,
            core_count: 1,
        };

        assert_eq!(
            scheduler.enqueue(bad, Process::new(ProcessId(1), 1), &mut Vec::new()),
            Err(expected)
        );
        assert_eq!(scheduler.step(bad, &mut Vec::new()), Err(expected));
        assert_eq!(scheduler.remove_core(bad, &mut Vec::new()), Err(expected));
        assert_eq!(scheduler.algorithm_label(bad), Err(expected));
    }

    #[traced_test]
    #[test]
    fn test_time_quantum_bounds() {
        let mut scheduler = Scheduler::default();
        assert_eq!(
            scheduler.set_time_quantum(CORE, 0),
            Err(SchedError::ValueTooSmall { value: 0, min: 1 })
        );
        assert_eq!(
            scheduler.set_time_quantum(CORE, 10_001),
            Err(SchedError::ValueTooLarge {
                value: 10_001,
                max: 10_000
            })
        );
        assert_eq!(scheduler.set_time_quantum(CORE, 7), Ok(7));
        assert_eq!(scheduler.core(CORE).unwrap().time_quantum(), 7);
    }

    #[traced_test]
    #[test]
    fn test_remove_then_add_restores_default_core() {
        let mut scheduler = scheduler_with(Algorithm::RoundRobin);
        submit(&mut scheduler, 1, 3);

        scheduler.remove_core(CORE, &mut Vec::new()).unwrap();
        assert_eq!(scheduler.core_count(), 0);

        let added = scheduler.add_core(&mut Vec::new());
        assert_eq!(added, CORE);
        assert_eq!(scheduler.core_count(), 1);
        assert!(scheduler.process_queue(CORE).unwrap().is_empty());
        assert_eq!(
            scheduler.algorithm_label(CORE),
            Ok("First Come First Serve")
        );
    }

    #[traced_test]
    #[test]
    fn test_remove_core_keeps_other_cores_aligned() {
        let mut scheduler = Scheduler::default();
        let second = scheduler.add_core(&mut Vec::new());
        let third = scheduler.add_core(&mut Vec::new());
        scheduler.set_algorithm(third, Algorithm::RoundRobin).unwrap();
        scheduler.set_time_quantum(third, 9).unwrap();
        scheduler
            .enqueue(third, Process::new(ProcessId(42), 3), &mut Vec::new())
            .unwrap();

        scheduler.remove_core(second, &mut Vec::new()).unwrap();

        let shifted = scheduler.core(CoreId(1)).unwrap();
        assert_eq!(shifted.algorithm(), Algorithm::RoundRobin);
        assert_eq!(shifted.time_quantum(), 9);
        assert_eq!(shifted.running_process_id(), Some(ProcessId(42)));
        assert_eq!(shifted.queue_len(), 1);
    }

    #[traced_test]
    #[test]
    fn test_reset_restores_single_default_core() {
        let mut scheduler = scheduler_with(Algorithm::ShortestJobFirst);
        scheduler.add_core(&mut Vec::new());
        submit(&mut scheduler, 1, 3);

        scheduler.reset(&mut Vec::new());
        assert_eq!(scheduler.core_count(), 1);
        assert!(scheduler.core(CORE).unwrap().is_idle());
        assert_eq!(
            scheduler.core(CORE).unwrap().algorithm(),
            Algorithm::FirstComeFirstServe
        );
    }

    #[traced_test]
    #[test]
    fn test_missing_running_process_is_a_logic_error() {
        let mut scheduler = Scheduler::default();
        submit(&mut scheduler, 1, 3);
        scheduler.cores[0].running = Some(ProcessId(99));

        let err = scheduler.step(CORE, &mut Vec::new()).unwrap_err();
        assert_eq!(
            err,
            SchedError::ProcNotFound {
                core: CORE,
                expected: Some(ProcessId(99))
            }
        );
        assert!(err.is_logic_error());
        assert!(logs_contain("Running process is not the queue head"));
    }
}
