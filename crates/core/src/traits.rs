//! Core traits for state machines.

use crate::{Action, Event};
use std::time::Duration;

/// A state machine that processes events.
///
/// This is the core abstraction of the simulator. The scheduling node is
/// implemented as a state machine that is:
///
/// - **Synchronous**: No async, no `.await`
/// - **Deterministic**: Same state + event (+ seed) = same actions
/// - **Pure-ish**: Mutates self, but never sleeps or owns a timer
///
/// # Example
///
/// ```ignore
/// impl StateMachine for SchedulerNode {
///     fn handle(&mut self, event: Event) -> Vec<Action> {
///         match event {
///             Event::CoreStepTimer { core } => self.on_core_step_timer(core),
///             Event::ArrivalTimer => self.on_arrival_timer(),
///             Event::UtilizationTimer => self.on_utilization_timer(),
///         }
///     }
///
///     fn set_time(&mut self, now: Duration) {
///         self.now = now;
///     }
/// }
/// ```
pub trait StateMachine {
    /// Process an event, returning actions to perform.
    ///
    /// # Guarantees
    ///
    /// - **Synchronous**: This method never blocks or awaits
    /// - **Deterministic**: Given the same state and event, always returns the same actions
    /// - **No waiting**: All deferred work is requested via `Action::SetTimer`
    fn handle(&mut self, event: Event) -> Vec<Action>;

    /// Set the current time.
    ///
    /// Called by the runner before each `handle()` call to provide the
    /// current simulation or wall-clock time.
    fn set_time(&mut self, now: Duration);

    /// Get the current time.
    ///
    /// Returns the time that was last set via `set_time()`.
    fn now(&self) -> Duration;
}
