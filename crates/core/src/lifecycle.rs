//! Lifecycle notifications emitted by the scheduler.

use procsim_types::{CoreId, ProcessId};

/// A process or core state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// The process joined (or rejoined) a queue behind the running process.
    Waiting { process: ProcessId, core: CoreId },

    /// The process became the head of its queue.
    Running { process: ProcessId, core: CoreId },

    /// The process received all of its service and left the queue.
    Finished { process: ProcessId, core: CoreId },

    /// The core had nothing to run.
    CoreIdle { core: CoreId },

    /// The core ran a process.
    CoreBusy { core: CoreId },
}

impl Lifecycle {
    /// The core this transition happened on.
    pub fn core(&self) -> CoreId {
        match *self {
            Lifecycle::Waiting { core, .. }
            | Lifecycle::Running { core, .. }
            | Lifecycle::Finished { core, .. }
            | Lifecycle::CoreIdle { core }
            | Lifecycle::CoreBusy { core } => core,
        }
    }

    /// The process involved, if any.
    pub fn process(&self) -> Option<ProcessId> {
        match *self {
            Lifecycle::Waiting { process, .. }
            | Lifecycle::Running { process, .. }
            | Lifecycle::Finished { process, .. } => Some(process),
            Lifecycle::CoreIdle { .. } | Lifecycle::CoreBusy { .. } => None,
        }
    }
}

/// A change to the set of cores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreChange {
    /// A core was appended at `core`.
    Added { core: CoreId },
    /// The core at `core` was removed and every higher core shifted down.
    Removed { core: CoreId },
    /// Everything was torn down to a single default core.
    Reset,
}

/// Receives the scheduler's notifications.
///
/// The scheduler owns the core count; observers mirror it through
/// [`on_core_change`](LifecycleObserver::on_core_change) and never read
/// the scheduler's queues.
pub trait LifecycleObserver {
    /// A process or core transition happened.
    fn on_lifecycle(&mut self, event: Lifecycle);

    /// The set of cores changed.
    fn on_core_change(&mut self, _change: CoreChange) {}
}

/// Collects lifecycle events in order. Core changes are dropped.
impl LifecycleObserver for Vec<Lifecycle> {
    fn on_lifecycle(&mut self, event: Lifecycle) {
        self.push(event);
    }
}
