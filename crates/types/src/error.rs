//! Error types shared by every per-core operation.

use crate::{CoreId, ProcessId};
use thiserror::Error;

/// Errors returned by scheduler and analytics operations.
///
/// None of these are fatal: callers log them and keep the simulation going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SchedError {
    /// A per-core operation named a core that does not exist.
    #[error("{core} is out of bounds ({core_count} cores)")]
    CoreOutOfBound { core: CoreId, core_count: usize },

    /// A step was requested on a core with an empty queue (an idle tick).
    #[error("No process queued on {core}")]
    NoProcessInQueue { core: CoreId },

    /// The recorded running process is not at the head of its queue.
    ///
    /// This means a structural invariant was broken.
    #[error("Running process {expected:?} not found at the head of {core}")]
    ProcNotFound {
        core: CoreId,
        expected: Option<ProcessId>,
    },

    /// A quantum or window was below its minimum.
    #[error("Value {value} is below the minimum of {min}")]
    ValueTooSmall { value: u64, min: u64 },

    /// A quantum or speed was above its maximum.
    #[error("Value {value} is above the maximum of {max}")]
    ValueTooLarge { value: u64, max: u64 },
}

impl SchedError {
    /// Whether this error signals a broken invariant rather than a bad request.
    pub fn is_logic_error(&self) -> bool {
        matches!(self, SchedError::ProcNotFound { .. })
    }
}
