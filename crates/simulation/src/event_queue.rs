//! Event queue ordering.

use std::time::Duration;

/// Key for ordering events in the simulation queue.
///
/// Events fire in time order. Ties are broken by the order in which the
/// timers were armed, so a run never depends on map iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    /// When the event fires.
    pub time: Duration,
    /// Monotonic counter assigned when the timer was armed.
    pub sequence: u64,
}

impl EventKey {
    pub fn new(time: Duration, sequence: u64) -> Self {
        Self { time, sequence }
    }
}
