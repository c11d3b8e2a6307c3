//! Error types for lock admission operations.

use thiserror::Error;

/// Errors produced by the admission protocol.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LockError {
    /// Granting the request would close a wait cycle.
    #[error("deadlock: request would close a wait cycle")]
    Deadlock,
    /// The blocked wait was cancelled before the lock was granted.
    /// Ticket and registry bookkeeping are fully cleaned up; the caller
    /// may resubmit.
    #[error("wait cancelled before the lock was granted")]
    Cancelled,
    /// The resource is unavailable for a non-blocking request. No state
    /// was changed.
    #[error("resource busy")]
    Busy,
    /// The handle does not currently hold a lock. No state was changed.
    #[error("no lock held by this handle")]
    NotHeld,
    /// The resource index is outside the managed collection.
    #[error("unknown resource index {0}")]
    UnknownResource(usize),
    /// The bound on concurrently open handles is reached. No state was
    /// changed; closing a handle frees a slot.
    #[error("open handle limit {0} reached")]
    HandleLimit(usize),
    /// Configuration rejected at build time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
