//! Admission protocol over a fixed registry of lockable resources.
//!
//! The manager owns one slot per resource: a mutex-guarded bundle of
//! [`LockState`], [`AbandonedTicketSet`] and [`HolderRegistry`], plus a
//! condition variable for broadcast wakes. Blocking requests take a
//! ticket and park on the condition variable until their grant predicate
//! holds; every mutation that can change any waiter's predicate is
//! followed by a broadcast so each waiter re-checks its own condition.
//!
//! Serving order: blocking acquires are granted in strictly increasing
//! ticket order, except that `try_acquire` jumps the queue (unfair by
//! design) and abandoned tickets are skipped.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use crate::core::deadlock;
use crate::core::events::{build_lock_event, EventSink};
use crate::core::holders::{CallerId, HolderRegistry};
use crate::core::state::{AbandonedTicketSet, LockState, Ticket};
use crate::core::LockError;

/// Read or write intent of a lock request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// Shared access; excludes writers only.
    Read,
    /// Exclusive access; excludes everybody else.
    Write,
}

/// Everything mutable about one resource, guarded by the slot mutex.
pub(crate) struct ResourceState {
    pub(crate) lock: LockState,
    pub(crate) abandoned: AbandonedTicketSet,
    pub(crate) holders: HolderRegistry,
}

/// One lockable resource: guarded state plus its wait queue.
pub(crate) struct ResourceSlot {
    pub(crate) state: Mutex<ResourceState>,
    pub(crate) available: Condvar,
}

impl ResourceSlot {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(ResourceState {
                lock: LockState::default(),
                abandoned: AbandonedTicketSet::default(),
                holders: HolderRegistry::default(),
            }),
            available: Condvar::new(),
        }
    }
}

/// Lock currently held through a handle.
#[derive(Debug, Clone, Copy)]
struct HeldLock {
    mode: LockMode,
    ticket: Ticket,
}

#[derive(Debug)]
struct HandleShared {
    id: u64,
    resource: usize,
    caller: CallerId,
    /// Set under the resource mutex when a lock is granted, cleared on
    /// release. Mirrors the original's per-file locked flag.
    held: Mutex<Option<HeldLock>>,
    /// Set once by the first `handle_closed` so clones of a retired
    /// handle are only counted out of the open-handle budget once.
    closed: AtomicBool,
}

/// An open handle onto one managed resource.
///
/// A handle identifies the caller to the admission protocol and records
/// whether it currently holds a lock. Handles are cheap to clone; clones
/// share the same lock-holding state.
#[derive(Debug, Clone)]
pub struct LockHandle {
    shared: Arc<HandleShared>,
}

impl LockHandle {
    /// Unique identifier of this handle.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    /// Index of the resource this handle is open on.
    #[must_use]
    pub fn resource(&self) -> usize {
        self.shared.resource
    }

    /// Caller this handle belongs to.
    #[must_use]
    pub fn caller(&self) -> CallerId {
        self.shared.caller
    }

    /// Whether the handle currently holds a lock. Advisory snapshot; a
    /// concurrent release can invalidate it immediately.
    #[must_use]
    pub fn is_holding(&self) -> bool {
        self.shared.held.lock().is_some()
    }

    /// Mode of the lock currently held, if any. Advisory snapshot.
    #[must_use]
    pub fn held_mode(&self) -> Option<LockMode> {
        self.shared.held.lock().map(|h| h.mode)
    }
}

struct CancelInner {
    cancelled: AtomicBool,
    /// Slot the owning wait is parked on, registered for the duration of
    /// that wait so `cancel` knows whom to wake.
    target: Mutex<Option<Arc<ResourceSlot>>>,
}

/// Cancellation token for one blocking [`LockManager::acquire`] call.
///
/// Delivering a cancel aborts only the wait it is attached to; the
/// waiter's ticket and registry entry are cleaned up before the call
/// returns [`LockError::Cancelled`], and later tickets keep progressing.
///
/// Tokens are cheap to clone; clones share the cancelled flag. Use a
/// fresh token per wait.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl Default for CancelInner {
    fn default() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            target: Mutex::new(None),
        }
    }
}

impl CancelToken {
    /// Create a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Cancel the attached wait, if any.
    ///
    /// Safe to call at any time, including before the wait starts or
    /// after it finished. The slot mutex round-trip below serializes with
    /// the waiter's predicate check, so a cancel delivered between that
    /// check and the park cannot be lost.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let target = self.inner.target.lock().clone();
        if let Some(slot) = target {
            drop(slot.state.lock());
            slot.available.notify_all();
        }
    }

    fn attach(&self, slot: Arc<ResourceSlot>) {
        *self.inner.target.lock() = Some(slot);
    }

    fn detach(&self) {
        *self.inner.target.lock() = None;
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Ticket-ordered reader/writer lock manager over a fixed collection of
/// resources.
///
/// Resources are created at construction and addressed by index; there
/// are no hidden singletons. All per-resource mutation happens under that
/// resource's own mutex, and the deadlock detector inspects other
/// resources one mutex at a time in fixed index order.
pub struct LockManager {
    slots: Vec<Arc<ResourceSlot>>,
    /// Serializes deadlock check + ticket issue across blocking requests.
    /// The original did this under a single per-device spinlock section;
    /// with the one-mutex-at-a-time rule for cross-resource reads, two
    /// racing requests could otherwise both slip past the detector.
    admission: Mutex<()>,
    next_handle_id: AtomicU64,
    /// Handles opened and not yet closed, checked against `max_handles`.
    open_handles: AtomicUsize,
    max_handles: Option<usize>,
    events: Option<Mutex<Box<dyn EventSink>>>,
}

impl LockManager {
    /// Create a manager for `resource_count` independent resources.
    #[must_use]
    pub fn new(resource_count: usize) -> Self {
        Self {
            slots: (0..resource_count)
                .map(|_| Arc::new(ResourceSlot::new()))
                .collect(),
            admission: Mutex::new(()),
            next_handle_id: AtomicU64::new(1),
            open_handles: AtomicUsize::new(0),
            max_handles: None,
            events: None,
        }
    }

    /// Attach an event sink recording admission decisions.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.events = Some(Mutex::new(sink));
        self
    }

    /// Bound the number of concurrently open handles across all
    /// resources. Unbounded when never set.
    #[must_use]
    pub fn with_max_handles(mut self, limit: usize) -> Self {
        self.max_handles = Some(limit);
        self
    }

    /// Number of managed resources.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.slots.len()
    }

    /// Open a handle for `caller` onto the resource at `resource`.
    ///
    /// # Errors
    ///
    /// - [`LockError::UnknownResource`] when the index is outside the
    ///   managed collection.
    /// - [`LockError::HandleLimit`] when the open-handle bound is
    ///   reached; closing a handle frees a slot.
    pub fn open(&self, resource: usize, caller: CallerId) -> Result<LockHandle, LockError> {
        if resource >= self.slots.len() {
            return Err(LockError::UnknownResource(resource));
        }
        let open_now = self.open_handles.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(limit) = self.max_handles {
            if open_now > limit {
                self.open_handles.fetch_sub(1, Ordering::SeqCst);
                return Err(LockError::HandleLimit(limit));
            }
        }
        let id = self.next_handle_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(handle = id, resource, caller = %caller, "handle opened");
        Ok(LockHandle {
            shared: Arc::new(HandleShared {
                id,
                resource,
                caller,
                held: Mutex::new(None),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Acquire a lock in `mode`, blocking until granted or cancelled.
    ///
    /// Requests are served in ticket order: the call parks until no
    /// writer is active, no reader is active if `mode` is `Write`, and
    /// its ticket is the one being served.
    ///
    /// # Errors
    ///
    /// - [`LockError::Deadlock`] when the request would close a wait
    ///   cycle; returned synchronously, no ticket is issued.
    /// - [`LockError::Cancelled`] when `cancel` fires before the grant;
    ///   all bookkeeping is undone and the caller may retry.
    pub fn acquire(
        &self,
        handle: &LockHandle,
        mode: LockMode,
        cancel: &CancelToken,
    ) -> Result<(), LockError> {
        let resource = handle.resource();
        let caller = handle.caller();
        let slot = Arc::clone(&self.slots[resource]);

        // Deadlock check and ticket issue are atomic with respect to
        // other blocking requests.
        let local_ticket = {
            let _admission = self.admission.lock();
            if deadlock::would_deadlock(&self.slots, resource, caller) {
                tracing::debug!(resource, caller = %caller, "acquire rejected: deadlock");
                self.record(resource, caller, "deadlock", None);
                return Err(LockError::Deadlock);
            }
            let mut state = slot.state.lock();
            let ticket = state.lock.issue_ticket();
            state.holders.insert(caller, ticket);
            ticket
        };
        self.record(resource, caller, "enqueue", Some(local_ticket));
        tracing::trace!(resource, caller = %caller, ticket = local_ticket, "queued");

        cancel.attach(Arc::clone(&slot));
        let mut state = slot.state.lock();
        loop {
            if cancel.is_cancelled() {
                state.abandoned.insert(local_ticket);
                let serving = state.lock.ticket_tail();
                let tail = state.abandoned.skip_from(serving);
                state.lock.set_ticket_tail(tail);
                state.holders.remove_exact(caller, local_ticket);
                drop(state);
                cancel.detach();
                slot.available.notify_all();
                self.record(resource, caller, "cancel", Some(local_ticket));
                tracing::debug!(resource, caller = %caller, ticket = local_ticket, "wait cancelled");
                return Err(LockError::Cancelled);
            }
            if state.lock.admits(mode) && state.lock.is_turn(local_ticket) {
                state.lock.grant(mode);
                *handle.shared.held.lock() = Some(HeldLock {
                    mode,
                    ticket: local_ticket,
                });
                let served = state.lock.ticket_tail() + 1;
                let tail = state.abandoned.skip_from(served);
                state.lock.set_ticket_tail(tail);
                break;
            }
            slot.available.wait(&mut state);
        }
        drop(state);
        cancel.detach();
        slot.available.notify_all();
        self.record(resource, caller, "grant", Some(local_ticket));
        tracing::debug!(resource, caller = %caller, ticket = local_ticket, ?mode, "lock granted");
        Ok(())
    }

    /// Attempt to acquire a lock in `mode` without blocking.
    ///
    /// On success the request jumps ahead of any queued waiters: the
    /// serving cursor is pulled up to the ticket head so the fairness
    /// counters stay consistent. Try-acquire is unfair by design.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Busy`] when the resource is unavailable; no
    /// state is changed.
    pub fn try_acquire(&self, handle: &LockHandle, mode: LockMode) -> Result<(), LockError> {
        let resource = handle.resource();
        let caller = handle.caller();
        let slot = &self.slots[resource];

        let ticket;
        {
            let mut state = slot.state.lock();
            if !state.lock.admits(mode) {
                self.record(resource, caller, "busy", None);
                tracing::trace!(resource, caller = %caller, ?mode, "try_acquire busy");
                return Err(LockError::Busy);
            }
            ticket = state.lock.issue_ticket();
            state.lock.grant(mode);
            state.holders.insert(caller, ticket);
            *handle.shared.held.lock() = Some(HeldLock { mode, ticket });
            // Jump the queue: serving cursor catches up to the head.
            let head = state.lock.ticket_head();
            state.lock.set_ticket_tail(head);
        }
        slot.available.notify_all();
        self.record(resource, caller, "try_grant", Some(ticket));
        tracing::debug!(resource, caller = %caller, ticket, ?mode, "lock granted without queuing");
        Ok(())
    }

    /// Release the lock held through `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::NotHeld`] when the handle holds no lock; no
    /// state is changed.
    pub fn release(&self, handle: &LockHandle) -> Result<(), LockError> {
        let resource = handle.resource();
        let caller = handle.caller();
        let slot = &self.slots[resource];

        let held = {
            let mut state = slot.state.lock();
            let mut held_guard = handle.shared.held.lock();
            let Some(held) = held_guard.take() else {
                return Err(LockError::NotHeld);
            };
            state.lock.revoke(held.mode);
            state.holders.remove_exact(caller, held.ticket);
            held
        };
        slot.available.notify_all();
        self.record(resource, caller, "release", Some(held.ticket));
        tracing::debug!(resource, caller = %caller, ticket = held.ticket, "lock released");
        Ok(())
    }

    /// Cleanup hook for the surrounding I/O layer: invoked when the last
    /// copy of a handle closes. Releases any lock the handle still holds
    /// and frees its slot in the open-handle budget. Closing a handle
    /// that holds nothing, or closing the same handle again, changes no
    /// lock state.
    pub fn handle_closed(&self, handle: &LockHandle) {
        if self.release(handle).is_ok() {
            tracing::debug!(handle = handle.id(), "lock released on handle close");
        }
        if !handle.shared.closed.swap(true, Ordering::SeqCst) {
            self.open_handles.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn record(&self, resource: usize, caller: CallerId, action: &str, ticket: Option<Ticket>) {
        if let Some(sink) = &self.events {
            sink.lock()
                .record(build_lock_event(resource, caller, action, ticket));
        }
    }

    /// Reader/writer counters of one resource, for introspection.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::UnknownResource`] for out-of-range indexes.
    pub fn counters(&self, resource: usize) -> Result<(u32, u32), LockError> {
        let slot = self
            .slots
            .get(resource)
            .ok_or(LockError::UnknownResource(resource))?;
        let state = slot.state.lock();
        Ok((state.lock.read_count(), state.lock.write_count()))
    }
}
