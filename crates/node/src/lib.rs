//! Combined node state machine.
//!
//! This crate composes the scheduler, analytics engine, probability
//! distributor and arrival generator into a single deterministic
//! [`StateMachine`](procsim_core::StateMachine) driven by three kinds of
//! timer: per-core steps, arrivals and utilization recomputes.

mod config;
mod state;

pub use config::{ConfigError, NodeConfig};
pub use state::SchedulerNode;
