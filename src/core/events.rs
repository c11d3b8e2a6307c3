//! Lock event sink implementations.
//!
//! Provides a bounded in-memory sink for observing admission decisions
//! (enqueue, grant, busy, cancel, deadlock, release) in tests and dev.

use std::collections::VecDeque;

use crate::core::holders::CallerId;
use crate::core::state::Ticket;
use crate::util::clock::now_ms;

/// Lock event structure.
#[derive(Debug, Clone)]
pub struct LockEvent {
    /// Event identifier.
    pub event_id: String,
    /// Resource index the event applies to.
    pub resource: usize,
    /// Caller involved.
    pub caller: CallerId,
    /// Action taken (enqueue, grant, try_grant, busy, cancel, deadlock, release).
    pub action: String,
    /// Ticket involved, when one was issued.
    pub ticket: Option<Ticket>,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
}

/// Lock event sink abstraction.
pub trait EventSink: Send {
    /// Record a lock event.
    fn record(&mut self, event: LockEvent);
}

/// In-memory event sink for testing and dev.
pub struct InMemoryEventSink {
    events: VecDeque<LockEvent>,
    max_events: usize,
}

impl InMemoryEventSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<LockEvent> {
        self.events.iter().cloned().collect()
    }
}

impl EventSink for InMemoryEventSink {
    fn record(&mut self, event: LockEvent) {
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Helper to build a lock event from context.
#[must_use]
pub fn build_lock_event(
    resource: usize,
    caller: CallerId,
    action: impl Into<String>,
    ticket: Option<Ticket>,
) -> LockEvent {
    let action = action.into();
    let created_at_ms = now_ms();
    LockEvent {
        event_id: format!("{resource}-{caller}-{action}-{created_at_ms}"),
        resource,
        caller,
        action,
        ticket,
        created_at_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_records_and_snapshots() {
        let mut sink = InMemoryEventSink::new(8);
        sink.record(build_lock_event(0, CallerId::new(1), "enqueue", Some(0)));
        sink.record(build_lock_event(0, CallerId::new(1), "grant", Some(0)));

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, "enqueue");
        assert_eq!(events[1].action, "grant");
        assert_eq!(events[1].ticket, Some(0));
    }

    #[test]
    fn test_sink_evicts_oldest_when_full() {
        let mut sink = InMemoryEventSink::new(2);
        for i in 0..3 {
            sink.record(build_lock_event(0, CallerId::new(i), "grant", None));
        }
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].caller, CallerId::new(1));
        assert_eq!(events[1].caller, CallerId::new(2));
    }
}
