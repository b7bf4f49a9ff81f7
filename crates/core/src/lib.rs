//! Core types for the scheduling simulator.
//!
//! Every component is a synchronous state machine: it is handed an
//! [`Event`], mutates itself, and returns [`Action`]s for the runner to
//! perform. Timers are never owned by components directly. A component asks
//! for one with [`Action::SetTimer`] and the runner guarantees at most one
//! live timer per [`TimerId`].

mod action;
mod event;
mod lifecycle;
mod traits;

pub use action::Action;
pub use event::{Event, TimerId};
pub use lifecycle::{CoreChange, Lifecycle, LifecycleObserver};
pub use traits::StateMachine;
