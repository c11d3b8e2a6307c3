//! Per-resource ordered record of lock holders and waiters.
//!
//! An entry exists from the moment a ticket is issued until the lock is
//! released or the wait abandoned, so the registry covers both active
//! holders and queued waiters. Insertion order reflects arrival order,
//! which is what the deadlock detector's position checks rely on.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::state::Ticket;

/// Identifier of an independent caller (process, task, transaction).
///
/// Distinct from a handle: one caller may hold several open handles, and
/// deadlock analysis works at caller granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallerId(u64);

impl CallerId {
    /// Wrap a raw caller identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw identifier value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "caller-{}", self.0)
    }
}

/// One `(caller, ticket)` pair in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HolderEntry {
    caller: CallerId,
    ticket: Ticket,
}

/// Ordered sequence of holders and waiters for one resource.
#[derive(Debug, Default)]
pub struct HolderRegistry {
    entries: Vec<HolderEntry>,
}

impl HolderRegistry {
    /// Append an entry at ticket-issue time.
    pub fn insert(&mut self, caller: CallerId, ticket: Ticket) {
        self.entries.push(HolderEntry { caller, ticket });
    }

    /// Whether `caller` currently holds or waits on this resource.
    #[must_use]
    pub fn contains(&self, caller: CallerId) -> bool {
        self.entries.iter().any(|e| e.caller == caller)
    }

    /// Position of the most recent entry for `caller`, if any.
    #[must_use]
    pub fn last_position(&self, caller: CallerId) -> Option<usize> {
        self.entries.iter().rposition(|e| e.caller == caller)
    }

    /// Whether `caller` has an entry at or before position `pos`.
    #[must_use]
    pub fn appears_at_or_before(&self, caller: CallerId, pos: usize) -> bool {
        self.entries
            .iter()
            .take(pos.saturating_add(1))
            .any(|e| e.caller == caller)
    }

    /// Remove the entry matching both caller and ticket (cancel path).
    /// Returns whether an entry was removed.
    pub fn remove_exact(&mut self, caller: CallerId, ticket: Ticket) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.caller == caller && e.ticket == ticket));
        self.entries.len() != before
    }

    /// Snapshot of the callers currently registered, in arrival order.
    #[must_use]
    pub fn callers(&self) -> Vec<CallerId> {
        self.entries.iter().map(|e| e.caller).collect()
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no callers hold or wait on this resource.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_preserves_arrival_order() {
        let mut reg = HolderRegistry::default();
        reg.insert(CallerId::new(7), 0);
        reg.insert(CallerId::new(3), 1);
        reg.insert(CallerId::new(7), 2);

        assert_eq!(reg.len(), 3);
        assert_eq!(
            reg.callers(),
            vec![CallerId::new(7), CallerId::new(3), CallerId::new(7)]
        );
    }

    #[test]
    fn test_contains_and_positions() {
        let mut reg = HolderRegistry::default();
        reg.insert(CallerId::new(1), 0);
        reg.insert(CallerId::new(2), 1);
        reg.insert(CallerId::new(1), 2);

        assert!(reg.contains(CallerId::new(2)));
        assert!(!reg.contains(CallerId::new(9)));

        assert_eq!(reg.last_position(CallerId::new(1)), Some(2));
        assert_eq!(reg.last_position(CallerId::new(2)), Some(1));
        assert_eq!(reg.last_position(CallerId::new(9)), None);

        assert!(reg.appears_at_or_before(CallerId::new(1), 0));
        assert!(reg.appears_at_or_before(CallerId::new(2), 1));
        assert!(!reg.appears_at_or_before(CallerId::new(2), 0));
    }

    #[test]
    fn test_remove_exact_only_matching_pair() {
        let mut reg = HolderRegistry::default();
        reg.insert(CallerId::new(5), 10);
        reg.insert(CallerId::new(5), 11);

        assert!(reg.remove_exact(CallerId::new(5), 11));
        assert!(!reg.remove_exact(CallerId::new(5), 11));
        assert_eq!(reg.last_position(CallerId::new(5)), Some(0));
        assert!(reg.contains(CallerId::new(5)));

        assert!(reg.remove_exact(CallerId::new(5), 10));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_caller_id_display() {
        assert_eq!(CallerId::new(42).to_string(), "caller-42");
        assert_eq!(CallerId::new(42).get(), 42);
    }
}
