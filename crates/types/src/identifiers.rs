//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Process identifier.
///
/// Assigned from a single monotonic counter, so ids are unique across
/// generated and manually submitted processes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProcessId(pub u64);

impl ProcessId {
    /// First id handed out after init or reset.
    pub const FIRST: Self = ProcessId(1);

    /// Get the next process id.
    pub fn next(self) -> Self {
        ProcessId(self.0 + 1)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Core identifier.
///
/// This is a positional index: removing a core shifts every higher core
/// down by one, the same way the core collection itself is compacted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CoreId(pub usize);

impl CoreId {
    /// Get the raw index.
    pub fn index(self) -> usize {
        self.0
    }

    /// The id this core takes after `removed` is taken out of the collection.
    ///
    /// Returns `None` for the removed core itself.
    pub fn after_removal_of(self, removed: CoreId) -> Option<CoreId> {
        match self.0.cmp(&removed.0) {
            std::cmp::Ordering::Less => Some(self),
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Greater => Some(CoreId(self.0 - 1)),
        }
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Core({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_renumbering_after_removal() {
        let removed = CoreId(1);
        assert_eq!(CoreId(0).after_removal_of(removed), Some(CoreId(0)));
        assert_eq!(CoreId(1).after_removal_of(removed), None);
        assert_eq!(CoreId(2).after_removal_of(removed), Some(CoreId(1)));
    }

    #[test]
    fn test_process_ids_are_sequential() {
        let id = ProcessId::FIRST;
        assert_eq!(id.next(), ProcessId(2));
        assert_eq!(id.next().next().to_string(), "P3");
    }
}
