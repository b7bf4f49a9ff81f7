//! Core types for the process scheduling simulator.
//!
//! Everything here is plain data: identifiers, the [`Process`] record, the
//! dispatch policies a core can run, the arrival-model enums and the shared
//! [`SchedError`] taxonomy. Behaviour lives in the `procsim-scheduler`,
//! `procsim-analytics` and `procsim-workload` crates.

mod algorithm;
mod arrival;
mod error;
mod identifiers;
mod process;

pub mod millis;

pub use algorithm::Algorithm;
pub use arrival::{GenerationParadigm, TimeUnit};
pub use error::SchedError;
pub use identifiers::{CoreId, ProcessId};
pub use process::Process;
