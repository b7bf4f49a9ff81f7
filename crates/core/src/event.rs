//! Events delivered to state machines and the timers that produce them.

use procsim_types::CoreId;

/// Identifies a timer owned by the runner.
///
/// The runner keeps at most one live timer per id: setting a timer that is
/// already armed replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerId {
    /// Per-core step stream.
    CoreStep(CoreId),
    /// The single system-wide arrival stream.
    Arrival,
    /// Periodic utilization recompute.
    Utilization,
}

impl TimerId {
    /// The event delivered when this timer fires.
    pub fn fire_event(&self) -> Event {
        match *self {
            TimerId::CoreStep(core) => Event::CoreStepTimer { core },
            TimerId::Arrival => Event::ArrivalTimer,
            TimerId::Utilization => Event::UtilizationTimer,
        }
    }
}

/// Inputs to the node state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Advance `core` by one scheduling step.
    CoreStepTimer { core: CoreId },

    /// Generate one arrival.
    ArrivalTimer,

    /// Reconcile windowed utilization.
    UtilizationTimer,
}

impl Event {
    /// Get a human-readable name for this event type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::CoreStepTimer { .. } => "CoreStepTimer",
            Event::ArrivalTimer => "ArrivalTimer",
            Event::UtilizationTimer => "UtilizationTimer",
        }
    }

    /// The timer that produced this event.
    pub fn timer_id(&self) -> TimerId {
        match *self {
            Event::CoreStepTimer { core } => TimerId::CoreStep(core),
            Event::ArrivalTimer => TimerId::Arrival,
            Event::UtilizationTimer => TimerId::Utilization,
        }
    }
}
