//! Dispatch policies a core can run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dispatch policy for a single core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Run the queue head to completion, in arrival order.
    #[default]
    FirstComeFirstServe,

    /// Keep the process with the smallest original burst length at the head.
    ///
    /// Re-evaluated on every step, so a shorter arrival displaces the
    /// current head before it finishes.
    ShortestJobFirst,

    /// Rotate the head to the tail every `time_quantum` steps.
    RoundRobin,
}

impl Algorithm {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Algorithm::FirstComeFirstServe => "First Come First Serve",
            Algorithm::ShortestJobFirst => "Shortest Job First",
            Algorithm::RoundRobin => "Round Robin",
        }
    }

    /// Short name used on the command line.
    pub fn short_name(&self) -> &'static str {
        match self {
            Algorithm::FirstComeFirstServe => "fcfs",
            Algorithm::ShortestJobFirst => "sjf",
            Algorithm::RoundRobin => "rr",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fcfs" | "first-come-first-serve" => Ok(Algorithm::FirstComeFirstServe),
            "sjf" | "shortest-job-first" => Ok(Algorithm::ShortestJobFirst),
            "rr" | "round-robin" | "roundrobin" => Ok(Algorithm::RoundRobin),
            _ => Err(format!("Unknown scheduling algorithm: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_short_and_long_names() {
        assert_eq!("RR".parse::<Algorithm>(), Ok(Algorithm::RoundRobin));
        assert_eq!(
            "shortest-job-first".parse::<Algorithm>(),
            Ok(Algorithm::ShortestJobFirst)
        );
        assert!("lottery".parse::<Algorithm>().is_err());
    }

    #[test]
    fn test_default_is_fcfs() {
        assert_eq!(Algorithm::default().label(), "First Come First Serve");
    }
}
