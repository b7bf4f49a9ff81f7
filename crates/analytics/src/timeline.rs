//! Idle/busy history of a single core.

use std::collections::VecDeque;
use std::time::Duration;

/// Whether a core had work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreState {
    Idle,
    Busy,
}

/// A maximal interval during which a core stayed in one state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeBlock {
    /// State held for the whole block.
    pub state: CoreState,
    /// When the state was entered.
    pub from: Duration,
    /// When it was left. `None` while this is still the current state.
    pub to: Option<Duration>,
    /// How much of this block the running totals currently include.
    pub factored_in: Duration,
}

impl TimeBlock {
    fn open(state: CoreState, from: Duration) -> Self {
        Self {
            state,
            from,
            to: None,
            factored_in: Duration::ZERO,
        }
    }

    /// Whether the block is still the core's current state.
    pub fn is_open(&self) -> bool {
        self.to.is_none()
    }

    /// Length of the part of this block inside `[window_start, now]`.
    pub fn overlap(&self, window_start: Duration, now: Duration) -> Duration {
        let end = self.to.unwrap_or(now).min(now);
        let start = self.from.max(window_start);
        end.saturating_sub(start)
    }

    /// Whether no part of the block can ever fall inside a window starting at `window_start` again.
    fn is_expired(&self, window_start: Duration) -> bool {
        self.to.is_some_and(|to| to <= window_start)
    }
}

/// Running totals of in-window idle and busy time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Totals {
    busy: Duration,
    idle: Duration,
}

impl Totals {
    /// Bring `block`'s contribution up to date with the window.
    fn refactor(&mut self, block: &mut TimeBlock, window_start: Duration, now: Duration) {
        let target = block.overlap(window_start, now);
        if target == block.factored_in {
            return;
        }

        let total = match block.state {
            CoreState::Busy => &mut self.busy,
            CoreState::Idle => &mut self.idle,
        };
        if target > block.factored_in {
            *total += target - block.factored_in;
        } else {
            *total = total.saturating_sub(block.factored_in - target);
        }
        block.factored_in = target;
    }
}

/// Chronological idle/busy history of one core plus its windowed totals.
///
/// Blocks are ordered and non-overlapping; only the last one may be open.
#[derive(Debug, Clone, Default)]
pub struct CoreTimeline {
    blocks: VecDeque<TimeBlock>,

    /// Blocks before this index lie wholly before the window and contribute nothing.
    expired_until: usize,

    /// Blocks in `expired_until + 1 .. settled_until` are closed and fully counted.
    settled_until: usize,

    totals: Totals,
}

impl CoreTimeline {
    /// Record that the core is in `state` as of `now`.
    ///
    /// Returns `false` without touching the history if the core was already
    /// in that state.
    pub fn transition(&mut self, state: CoreState, now: Duration) -> bool {
        if let Some(last) = self.blocks.back_mut() {
            if last.state == state {
                return false;
            }
            if last.to.is_none() {
                last.to = Some(now.max(last.from));
            }
        }
        self.blocks.push_back(TimeBlock::open(state, now));
        true
    }

    /// Current state, if any transition has been recorded.
    pub fn current_state(&self) -> Option<CoreState> {
        self.blocks.back().map(|b| b.state)
    }

    /// Bring the totals up to date with the window `[now - core_window, now]`.
    pub fn reconcile(&mut self, core_window: Duration, now: Duration) {
        let window_start = now.saturating_sub(core_window);

        // Blocks sliding out of the window, oldest first.
        while let Some(block) = self.blocks.get_mut(self.expired_until) {
            self.totals.refactor(block, window_start, now);
            if !block.is_expired(window_start) {
                break;
            }
            self.expired_until += 1;
        }

        // Newly closed blocks, then the open one.
        self.settled_until = self.settled_until.max(self.expired_until);
        while let Some(block) = self.blocks.get_mut(self.settled_until) {
            self.totals.refactor(block, window_start, now);
            if block.is_open() {
                break;
            }
            self.settled_until += 1;
        }
    }

    /// Forget the reconciliation cursors so the next reconcile revisits
    /// every retained block. Needed when the window length changes.
    pub fn rewind(&mut self) {
        self.expired_until = 0;
        self.settled_until = 0;
    }

    /// Drop blocks that lie wholly before the window. Returns how many went.
    pub fn prune(&mut self) -> usize {
        let pruned = self.expired_until;
        self.blocks.drain(..pruned);
        self.expired_until = 0;
        self.settled_until -= pruned;
        pruned
    }

    /// Busy share of the counted time, in `[0, 1]`.
    pub fn utilization(&self) -> f64 {
        let busy = self.totals.busy.as_secs_f64();
        let total = busy + self.totals.idle.as_secs_f64();
        if total <= 0.0 {
            return 0.0;
        }
        (busy / total).clamp(0.0, 1.0)
    }

    /// In-window busy time as of the last reconcile.
    pub fn busy_time(&self) -> Duration {
        self.totals.busy
    }

    /// In-window idle time as of the last reconcile.
    pub fn idle_time(&self) -> Duration {
        self.totals.idle
    }

    /// Retained blocks, oldest first.
    pub fn blocks(&self) -> impl Iterator<Item = &TimeBlock> {
        self.blocks.iter()
    }

    /// Number of retained blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether no transition has been recorded.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
