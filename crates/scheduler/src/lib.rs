//! Per-core dispatch state machine.
//!
//! The [`Scheduler`] owns one [`Core`] record per core and applies a single
//! step of that core's dispatch policy on request:
//!
//! - `FirstComeFirstServe` → run the head until it finishes
//! - `ShortestJobFirst` → keep the smallest original burst at the head
//! - `RoundRobin` → rotate the head to the tail every quantum
//!
//! Every transition is reported to a [`LifecycleObserver`], which is how the
//! analytics engine learns about waiting, running and finished processes
//! without ever reading the queues.
//!
//! [`LifecycleObserver`]: procsim_core::LifecycleObserver

mod config;
mod cores;
mod state;

pub use config::SchedulerConfig;
pub use cores::Core;
pub use state::{Scheduler, StepOutcome};
