//! The per-core record.

use crate::SchedulerConfig;
use procsim_types::{Algorithm, Process, ProcessId};
use std::collections::VecDeque;

/// Everything the scheduler knows about one core.
///
/// A core's identity is its position in the scheduler's core list. Keeping
/// all per-core state in this one record means adding or removing a core
/// moves every field together.
#[derive(Debug, Clone)]
pub struct Core {
    /// Dispatch policy.
    pub(crate) algorithm: Algorithm,

    /// Round Robin quantum (ticks per turn).
    pub(crate) time_quantum: u64,

    /// Ticks since the last Round Robin rotation, capped at `time_quantum`.
    pub(crate) round_robin_counter: u64,

    /// Id of the queue head, `None` when the queue is empty.
    pub(crate) running: Option<ProcessId>,

    /// Scheduling order. The head is the running process.
    pub(crate) queue: VecDeque<Process>,
}

impl Core {
    /// Create an empty core with the configured defaults.
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            algorithm: config.default_algorithm,
            time_quantum: config.default_time_quantum,
            round_robin_counter: 0,
            running: None,
            queue: VecDeque::new(),
        }
    }

    /// Dispatch policy.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Round Robin quantum.
    pub fn time_quantum(&self) -> u64 {
        self.time_quantum
    }

    /// Ticks since the last Round Robin rotation.
    pub fn round_robin_counter(&self) -> u64 {
        self.round_robin_counter
    }

    /// Id of the running process.
    pub fn running_process_id(&self) -> Option<ProcessId> {
        self.running
    }

    /// The queue in scheduling order.
    pub fn queue(&self) -> &VecDeque<Process> {
        &self.queue
    }

    /// Number of queued processes, running one included.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is queued.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn is_queued(&self, id: ProcessId) -> bool {
        self.queue.iter().any(|p| p.id == id)
    }

    /// Index of the queued process with the smallest original burst length.
    ///
    /// Ties go to the earliest in queue order.
    pub(crate) fn shortest_job_index(&self) -> Option<usize> {
        self.queue
            .iter()
            .enumerate()
            .min_by_key(|(_, p)| p.burst_length)
            .map(|(i, _)| i)
    }
}
