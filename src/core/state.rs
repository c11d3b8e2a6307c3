//! Per-resource lock counters and ticket bookkeeping.
//!
//! `LockState` is the foundational shared mutable state of one resource:
//! reader/writer counters plus the two ticket cursors that establish the
//! serving order for blocking requests. `AbandonedTicketSet` records the
//! tickets of waiters that gave up, so the serving cursor can skip over
//! them instead of stalling the queue.
//!
//! All mutation happens while the owning resource's mutex is held; these
//! types carry no synchronization of their own.

use std::collections::BTreeSet;

use crate::core::manager::LockMode;

/// A monotonically increasing value establishing a request's place in line.
pub type Ticket = u64;

/// Counters and ticket cursors for one resource.
///
/// Invariants (checked by callers under the resource mutex):
/// `ticket_tail <= ticket_head`; at most one writer; never a writer and a
/// reader at the same time.
#[derive(Debug, Default)]
pub struct LockState {
    /// Next ticket value to issue.
    ticket_head: Ticket,
    /// Ticket value whose turn it currently is to be served.
    ticket_tail: Ticket,
    /// Number of active read holders.
    read_count: u32,
    /// Number of active write holders (0 or 1).
    write_count: u32,
}

impl LockState {
    /// Take the current head as a local ticket and advance the head.
    pub fn issue_ticket(&mut self) -> Ticket {
        let ticket = self.ticket_head;
        self.ticket_head += 1;
        ticket
    }

    /// Whether the counters alone allow a grant in `mode` right now.
    ///
    /// Readers are excluded only by a writer; a writer is excluded by
    /// anybody.
    #[must_use]
    pub const fn admits(&self, mode: LockMode) -> bool {
        self.write_count == 0 && (matches!(mode, LockMode::Read) || self.read_count == 0)
    }

    /// Whether `ticket` is the one currently being served.
    #[must_use]
    pub const fn is_turn(&self, ticket: Ticket) -> bool {
        self.ticket_tail == ticket
    }

    /// Record a new holder of the given mode.
    pub fn grant(&mut self, mode: LockMode) {
        match mode {
            LockMode::Read => self.read_count += 1,
            LockMode::Write => self.write_count += 1,
        }
    }

    /// Drop one holder of the given mode.
    pub fn revoke(&mut self, mode: LockMode) {
        match mode {
            LockMode::Read => self.read_count = self.read_count.saturating_sub(1),
            LockMode::Write => self.write_count = self.write_count.saturating_sub(1),
        }
    }

    /// Next ticket value to issue.
    #[must_use]
    pub const fn ticket_head(&self) -> Ticket {
        self.ticket_head
    }

    /// Ticket value currently being served.
    #[must_use]
    pub const fn ticket_tail(&self) -> Ticket {
        self.ticket_tail
    }

    /// Move the serving cursor. Callers pass a value already skipped past
    /// any abandoned run; see [`AbandonedTicketSet::skip_from`].
    pub fn set_ticket_tail(&mut self, tail: Ticket) {
        debug_assert!(tail <= self.ticket_head);
        self.ticket_tail = tail;
    }

    /// Number of active read holders.
    #[must_use]
    pub const fn read_count(&self) -> u32 {
        self.read_count
    }

    /// Number of active write holders.
    #[must_use]
    pub const fn write_count(&self) -> u32 {
        self.write_count
    }
}

/// Sorted set of tickets whose waiter cancelled before being served.
///
/// Entries are removed as the serving cursor advances past them, so the
/// set only ever holds tickets in `(ticket_tail, ticket_head)`.
#[derive(Debug, Default)]
pub struct AbandonedTicketSet {
    tickets: BTreeSet<Ticket>,
}

impl AbandonedTicketSet {
    /// Record a ticket whose waiter gave up.
    pub fn insert(&mut self, ticket: Ticket) {
        self.tickets.insert(ticket);
    }

    /// Starting at `candidate`, consume any contiguous run of abandoned
    /// tickets and return the first value not in the set.
    ///
    /// This is the gap-skipping step: a ticket abandoned mid-wait must
    /// never permanently block progress for later tickets. Entries below
    /// the candidate were jumped over by a non-blocking grant and can
    /// never be served; they are purged here so the set stays bounded.
    pub fn skip_from(&mut self, candidate: Ticket) -> Ticket {
        self.tickets = self.tickets.split_off(&candidate);
        let mut next = candidate;
        while self.tickets.remove(&next) {
            next += 1;
        }
        next
    }

    /// Whether `ticket` is currently recorded as abandoned.
    #[must_use]
    pub fn contains(&self, ticket: Ticket) -> bool {
        self.tickets.contains(&ticket)
    }

    /// Number of recorded abandoned tickets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    /// Whether no abandoned tickets are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}
