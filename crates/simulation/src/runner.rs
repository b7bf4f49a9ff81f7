//! Simulation runner.

use crate::EventKey;
use procsim_core::{Action, Event, Lifecycle, StateMachine, TimerId};
use procsim_node::{NodeConfig, SchedulerNode};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, trace};

/// A lifecycle transition and when it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub time: Duration,
    pub event: Lifecycle,
}

/// Counters kept while a simulation runs.
#[derive(Debug, Clone, Default)]
pub struct SimulationStats {
    /// Events delivered to the node.
    pub events_processed: u64,

    /// Events delivered, by event type.
    pub events_by_type: HashMap<&'static str, u64>,

    /// Timers armed, replacements included.
    pub timers_set: u64,

    /// Timers disarmed while still live, replacements included.
    pub timers_cancelled: u64,

    /// Lifecycle notifications surfaced by the node.
    pub notifications: u64,
}

/// Deterministic driver for a [`SchedulerNode`].
///
/// Owns a virtual clock and the node's timers. Time only moves when an
/// event is popped or [`run_until`](SimulationRunner::run_until) reaches its
/// horizon, so runs are reproducible.
pub struct SimulationRunner {
    node: SchedulerNode,

    now: Duration,

    /// Pending timer firings.
    queue: BTreeMap<EventKey, Event>,

    /// Where each live timer sits in `queue`.
    timers: HashMap<TimerId, EventKey>,

    sequence: u64,

    /// Lifecycle notifications not yet taken.
    notifications: Vec<Notification>,

    stats: SimulationStats,
}

impl SimulationRunner {
    /// Create a runner for a fresh node and arm its boot timers.
    pub fn new(config: NodeConfig) -> Self {
        let mut runner = Self {
            node: SchedulerNode::new(config),
            now: Duration::ZERO,
            queue: BTreeMap::new(),
            timers: HashMap::new(),
            sequence: 0,
            notifications: Vec::new(),
            stats: SimulationStats::default(),
        };
        runner.node.set_time(runner.now);
        let boot = runner.node.boot();
        runner.apply_actions(boot);
        runner
    }

    pub fn node(&self) -> &SchedulerNode {
        &self.node
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Whether `id` is armed.
    pub fn is_armed(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    /// When `id` will fire, if armed.
    pub fn deadline(&self, id: TimerId) -> Option<Duration> {
        self.timers.get(&id).map(|key| key.time)
    }

    /// Number of queued timer firings.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Take the lifecycle notifications recorded so far.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Run a control operation on the node at the current time.
    ///
    /// Timer actions the operation queued are applied before returning.
    pub fn control<R>(&mut self, operation: impl FnOnce(&mut SchedulerNode) -> R) -> R {
        self.node.set_time(self.now);
        let result = operation(&mut self.node);
        let actions = self.node.take_actions();
        self.apply_actions(actions);
        result
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Running
    // ═══════════════════════════════════════════════════════════════════════════

    /// Deliver the next event. Returns `false` if nothing is pending.
    pub fn step(&mut self) -> bool {
        let Some((key, event)) = self.queue.pop_first() else {
            return false;
        };

        let id = event.timer_id();
        if self.timers.get(&id) == Some(&key) {
            self.timers.remove(&id);
        }

        self.now = key.time;
        self.node.set_time(self.now);
        trace!(time = ?self.now, event = event.type_name(), "Delivering event");

        self.stats.events_processed += 1;
        *self.stats.events_by_type.entry(event.type_name()).or_insert(0) += 1;

        let actions = self.node.handle(event);
        self.apply_actions(actions);
        true
    }

    /// Deliver every event due at or before `end`, then move the clock to `end`.
    pub fn run_until(&mut self, end: Duration) {
        while let Some((key, _)) = self.queue.first_key_value() {
            if key.time > end {
                break;
            }
            self.step();
        }
        if end > self.now {
            self.now = end;
            self.node.set_time(end);
        }
        debug!(
            time = ?self.now,
            events = self.stats.events_processed,
            pending = self.queue.len(),
            "Simulation advanced"
        );
    }

    /// Run for `duration` of simulated time.
    pub fn run_for(&mut self, duration: Duration) {
        self.run_until(self.now + duration);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Actions
    // ═══════════════════════════════════════════════════════════════════════════

    fn apply_actions(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::SetTimer { id, duration } => {
                    self.cancel_timer(id);
                    let key = EventKey::new(self.now + duration, self.sequence);
                    self.sequence += 1;
                    self.queue.insert(key, id.fire_event());
                    self.timers.insert(id, key);
                    self.stats.timers_set += 1;
                    trace!(?id, fire_at = ?key.time, "Timer armed");
                }
                Action::CancelTimer { id } => {
                    self.cancel_timer(id);
                }
                Action::EmitLifecycle { event } => {
                    self.notifications.push(Notification {
                        time: self.now,
                        event,
                    });
                    self.stats.notifications += 1;
                }
            }
        }
    }

    fn cancel_timer(&mut self, id: TimerId) {
        if let Some(key) = self.timers.remove(&id) {
            self.queue.remove(&key);
            self.stats.timers_cancelled += 1;
            trace!(?id, "Timer cancelled");
        }
    }
}
