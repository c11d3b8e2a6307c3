//! Transport-facing command models.
//!
//! The surrounding system maps whatever transport it uses (a file-control
//! call, an RPC endpoint) onto these models; [`dispatch`] then drives the
//! admission protocol for an open handle. The handle-close collaborator
//! is [`LockManager::handle_closed`], invoked by the I/O layer when the
//! last copy of a handle goes away.

use serde::{Deserialize, Serialize};

use crate::core::{CancelToken, LockError, LockHandle, LockManager, LockMode};

/// Lock command addressed to one open handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum LockCommand {
    /// Block until a lock in `mode` is granted or the wait is cancelled.
    Acquire {
        /// Read or write intent.
        mode: LockMode,
    },
    /// Grant a lock in `mode` immediately or fail with busy.
    TryAcquire {
        /// Read or write intent.
        mode: LockMode,
    },
    /// Release the lock held through the handle.
    Release,
}

/// Serializable outcome of a dispatched command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockOutcome {
    /// Whether the command succeeded.
    pub ok: bool,
    /// Error description when it did not.
    pub error: Option<String>,
}

/// Execute `command` against `handle` on `manager`.
///
/// # Errors
///
/// Propagates the admission protocol's error for the command: `Deadlock`
/// or `Cancelled` for `Acquire`, `Busy` for `TryAcquire`, `NotHeld` for
/// `Release`.
pub fn dispatch(
    manager: &LockManager,
    handle: &LockHandle,
    command: LockCommand,
    cancel: &CancelToken,
) -> Result<(), LockError> {
    match command {
        LockCommand::Acquire { mode } => manager.acquire(handle, mode, cancel),
        LockCommand::TryAcquire { mode } => manager.try_acquire(handle, mode),
        LockCommand::Release => manager.release(handle),
    }
}

/// Fold a dispatch result into a serializable outcome.
#[must_use]
pub fn outcome(result: &Result<(), LockError>) -> LockOutcome {
    match result {
        Ok(()) => LockOutcome {
            ok: true,
            error: None,
        },
        Err(e) => LockOutcome {
            ok: false,
            error: Some(e.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CallerId;

    #[test]
    fn test_dispatch_maps_commands() {
        let manager = LockManager::new(1);
        let handle = manager.open(0, CallerId::new(1)).unwrap();
        let token = CancelToken::new();

        dispatch(
            &manager,
            &handle,
            LockCommand::TryAcquire {
                mode: LockMode::Write,
            },
            &token,
        )
        .unwrap();
        assert!(handle.is_holding());

        dispatch(&manager, &handle, LockCommand::Release, &token).unwrap();
        assert!(!handle.is_holding());

        dispatch(
            &manager,
            &handle,
            LockCommand::Acquire {
                mode: LockMode::Read,
            },
            &token,
        )
        .unwrap();
        dispatch(&manager, &handle, LockCommand::Release, &token).unwrap();
    }

    #[test]
    fn test_outcome_carries_error_text() {
        let manager = LockManager::new(1);
        let handle = manager.open(0, CallerId::new(1)).unwrap();
        let result = dispatch(
            &manager,
            &handle,
            LockCommand::Release,
            &CancelToken::new(),
        );

        let out = outcome(&result);
        assert!(!out.ok);
        assert_eq!(out.error.as_deref(), Some("no lock held by this handle"));

        let out = outcome(&Ok(()));
        assert!(out.ok);
        assert!(out.error.is_none());
    }

    #[test]
    fn test_command_round_trips_through_json() {
        let cmd = LockCommand::Acquire {
            mode: LockMode::Write,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(json, r#"{"command":"acquire","mode":"write"}"#);
        let parsed: LockCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, cmd);
    }
}
