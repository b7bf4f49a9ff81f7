//! Live performance statistics for the scheduling simulator.
//!
//! The [`AnalyticsEngine`] observes the scheduler's lifecycle notifications
//! and maintains:
//!
//! - per-core and overall waiting time, as a [`RunningAverage`] whose
//!   sample count saturates at a configured window
//! - per-core and overall turnaround time, the same way
//! - per-core utilization over a trailing window of wall time, built from a
//!   [`CoreTimeline`] of idle/busy [`TimeBlock`]s
//!
//! # Incremental utilization
//!
//! ```text
//!   expired            straddling   settled (closed, fully inside)   open
//! ┌────┬────┬────┐   ┌──────────┐   ┌────┬────┬────┐               ┌──────┐
//! │ B0 │ B1 │ B2 │   │    B3    │   │ B4 │ B5 │ B6 │               │  B7  │
//! └────┴────┴────┘   └──────────┘   └────┴────┴────┘               └──────┘
//!                 ▲        ▲                          ▲
//!          expired_until   window start        settled_until
//! ```
//!
//! Each block remembers how much of it is already counted (`factored_in`).
//! A recompute only revisits the block at `expired_until` (which may be
//! sliding out of the window) and everything from `settled_until` on (the
//! open block), so each block is touched a bounded number of times over
//! its life.

mod average;
mod config;
mod state;
mod timeline;

pub use average::RunningAverage;
pub use config::AnalyticsConfig;
pub use state::AnalyticsEngine;
pub use timeline::{CoreState, CoreTimeline, TimeBlock};
