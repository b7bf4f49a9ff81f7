//! Deterministic simulation runner.
//!
//! This crate drives a [`SchedulerNode`](procsim_node::SchedulerNode) on a
//! virtual clock. Given the same seed and the same control calls, it
//! produces identical results every run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SimulationRunner                       │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Event Queue (BTreeMap<EventKey, Event>)        │ │
//! │  │     Ordered by: time, sequence                     │ │
//! │  │     At most one entry per TimerId                  │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     SchedulerNode                                  │ │
//! │  │     step / arrival / utilization handlers          │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Actions → (re)arm timers, record lifecycle     │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod event_queue;
mod runner;

pub use event_queue::EventKey;
pub use runner::{Notification, SimulationRunner, SimulationStats};
