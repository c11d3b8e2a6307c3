//! Core lock state, holder registries, deadlock detection, and admission.

pub mod error;
pub mod state;
pub mod holders;
pub(crate) mod deadlock;
pub mod manager;
pub mod events;

pub use error::{AppResult, LockError};
pub use events::{build_lock_event, EventSink, InMemoryEventSink, LockEvent};
pub use holders::{CallerId, HolderRegistry};
pub use manager::{CancelToken, LockHandle, LockManager, LockMode};
pub use state::{AbandonedTicketSet, LockState, Ticket};
