//! The synthetic process record.

use crate::ProcessId;
use serde::{Deserialize, Serialize};

/// A synthetic process queued on a core.
///
/// `burst_length` is fixed at creation. `remaining` is only ever decremented
/// by the scheduler, one unit per step, and the process leaves its queue
/// once it reaches zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    /// Unique, monotonically assigned id.
    pub id: ProcessId,
    /// Total service units required.
    pub burst_length: u64,
    /// Service units still owed.
    pub remaining: u64,
}

impl Process {
    /// Create a fresh process with `remaining == burst_length`.
    pub fn new(id: ProcessId, burst_length: u64) -> Self {
        Self {
            id,
            burst_length,
            remaining: burst_length,
        }
    }

    /// Consume one service unit. Never goes below zero.
    pub fn run_for_one_unit(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    /// Whether the process has received all of its service.
    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    /// Service units consumed so far.
    pub fn served(&self) -> u64 {
        self.burst_length - self.remaining
    }
}
