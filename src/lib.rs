//! # Ticketgate
//!
//! A ticket-ordered reader/writer lock manager for a fixed collection of
//! shared resources, accessed concurrently by many independent callers.
//!
//! Each resource hands out monotonically increasing tickets to blocking
//! lock requests and serves them strictly in ticket order. Readers share
//! the resource; writers get it exclusively. Requests that would close a
//! two-resource wait cycle are rejected up front instead of hanging, and
//! a waiter that gives up mid-queue leaves a gap the scheduler skips over.
//!
//! ## Core Problem Solved
//!
//! Independent processes sharing a small set of lockable resources (the
//! original deployment: block devices behind an ioctl surface) need:
//!
//! - **Fair admission**: blocking lock requests served first-come, first-served
//! - **Reader/writer exclusion**: many readers or exactly one writer
//! - **Interruptible blocking**: a cancelled wait cleans up fully and
//!   never wedges the queue for later arrivals
//! - **Deadlock rejection**: two callers each holding what the other
//!   wants must not both hang forever
//!
//! ## Key Features
//!
//! - **Ticket scheduling**: per-resource head/tail cursors with gap
//!   skipping over abandoned tickets
//! - **Two-hop deadlock detector**: a cross-resource walk over holder
//!   registries, bounded to cycles spanning two resources by design
//! - **Non-blocking path**: `try_acquire` grants immediately or fails
//!   with `Busy`, never queuing (and, documented trade-off, never fair)
//! - **Handle-close hook**: a closing handle that still holds a lock is
//!   released on its behalf
//!
//! ## Example
//!
//! ```
//! use ticketgate::{CallerId, CancelToken, LockManager, LockMode};
//!
//! let manager = LockManager::new(2);
//! let handle = manager.open(0, CallerId::new(100)).unwrap();
//!
//! // Non-blocking path.
//! manager.try_acquire(&handle, LockMode::Write).unwrap();
//! manager.release(&handle).unwrap();
//!
//! // Blocking path with a cancellation token.
//! let token = CancelToken::new();
//! manager.acquire(&handle, LockMode::Read, &token).unwrap();
//! manager.release(&handle).unwrap();
//! ```
//!
//! For complete examples, see:
//! - `tests/admission_test.rs` - Full integration tests
//! - `tests/deadlock_test.rs` - Cross-resource deadlock scenarios

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core lock state, holder registries, deadlock detection, and admission.
pub mod core;
/// Configuration models for the lock manager.
pub mod config;
/// Builders to construct a lock manager from configuration.
pub mod builders;
/// Transport-facing command models mapping onto the admission protocol.
pub mod api;
/// Shared utilities.
pub mod util;

pub use crate::core::{
    CallerId, CancelToken, LockError, LockHandle, LockManager, LockMode, Ticket,
};
