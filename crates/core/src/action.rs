//! Actions returned by state machines for the runner to perform.

use crate::{Lifecycle, TimerId};
use std::time::Duration;

/// Side effects requested by a state machine.
///
/// State machines never touch clocks or timers themselves; the runner
/// interprets these.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Arm `id` to fire after `duration`, replacing any live timer with the same id.
    SetTimer { id: TimerId, duration: Duration },

    /// Disarm `id`. A no-op if it is not armed.
    CancelTimer { id: TimerId },

    /// Surface a lifecycle transition to whoever drives the node.
    EmitLifecycle { event: Lifecycle },
}

impl Action {
    /// Get a human-readable name for this action type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::SetTimer { .. } => "SetTimer",
            Action::CancelTimer { .. } => "CancelTimer",
            Action::EmitLifecycle { .. } => "EmitLifecycle",
        }
    }

    /// Whether this action changes timer state.
    pub fn is_timer(&self) -> bool {
        matches!(self, Action::SetTimer { .. } | Action::CancelTimer { .. })
    }
}
