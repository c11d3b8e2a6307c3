//! Cross-resource deadlock scenarios.
//!
//! These tests validate:
//! 1. Re-requesting a held resource is rejected synchronously
//! 2. A mutual two-resource wait never hangs both callers
//! 3. Disjoint holders on different resources are not flagged

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ticketgate::{CallerId, CancelToken, LockError, LockManager, LockMode};

#[test]
fn test_re_request_held_resource_is_deadlock() {
    let manager = LockManager::new(2);
    let handle = manager.open(0, CallerId::new(1)).unwrap();

    manager
        .acquire(&handle, LockMode::Write, &CancelToken::new())
        .unwrap();
    assert_eq!(
        manager
            .acquire(&handle, LockMode::Write, &CancelToken::new())
            .unwrap_err(),
        LockError::Deadlock
    );

    // No ticket was issued for the rejected request: release and a fresh
    // acquire still work.
    manager.release(&handle).unwrap();
    manager
        .acquire(&handle, LockMode::Read, &CancelToken::new())
        .unwrap();
    manager.release(&handle).unwrap();
}

#[test]
fn test_mutual_two_resource_wait_does_not_hang() {
    let manager = Arc::new(LockManager::new(2));
    let a = CallerId::new(1);
    let b = CallerId::new(2);

    // A holds r0; B holds r1.
    let a_r0 = manager.open(0, a).unwrap();
    manager.acquire(&a_r0, LockMode::Write, &CancelToken::new()).unwrap();

    let b_r1 = manager.open(1, b).unwrap();
    manager.acquire(&b_r1, LockMode::Write, &CancelToken::new()).unwrap();

    // A blocks waiting for r1.
    let a_wait = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || {
            let a_r1 = manager.open(1, a).unwrap();
            let r = manager.acquire(&a_r1, LockMode::Write, &CancelToken::new());
            if r.is_ok() {
                manager.release(&a_r1).unwrap();
            }
            r
        })
    };
    thread::sleep(Duration::from_millis(50));

    // B closing the cycle on r0 is rejected instead of queued.
    let b_r0 = manager.open(0, b).unwrap();
    assert_eq!(
        manager
            .acquire(&b_r0, LockMode::Write, &CancelToken::new())
            .unwrap_err(),
        LockError::Deadlock
    );

    // B backs off; A's wait completes.
    manager.release(&b_r1).unwrap();
    assert!(a_wait.join().unwrap().is_ok());
    manager.release(&a_r0).unwrap();

    assert_eq!(manager.counters(0).unwrap(), (0, 0));
    assert_eq!(manager.counters(1).unwrap(), (0, 0));
}

#[test]
fn test_waiters_count_as_dependencies() {
    // The registry covers waiters, not just holders: C waits on r0 behind
    // A, so A requesting what C holds is still a cycle.
    let manager = Arc::new(LockManager::new(2));
    let a = CallerId::new(1);
    let c = CallerId::new(3);

    let a_r0 = manager.open(0, a).unwrap();
    manager.acquire(&a_r0, LockMode::Write, &CancelToken::new()).unwrap();

    let c_r1 = manager.open(1, c).unwrap();
    manager.acquire(&c_r1, LockMode::Write, &CancelToken::new()).unwrap();

    let (tx, rx) = mpsc::channel();
    let c_wait = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || {
            let c_r0 = manager.open(0, c).unwrap();
            tx.send(()).unwrap();
            let r = manager.acquire(&c_r0, LockMode::Write, &CancelToken::new());
            if r.is_ok() {
                manager.release(&c_r0).unwrap();
            }
            r
        })
    };
    rx.recv().unwrap();
    thread::sleep(Duration::from_millis(50));

    let a_r1 = manager.open(1, a).unwrap();
    assert_eq!(
        manager
            .acquire(&a_r1, LockMode::Write, &CancelToken::new())
            .unwrap_err(),
        LockError::Deadlock
    );

    manager.release(&a_r0).unwrap();
    assert!(c_wait.join().unwrap().is_ok());
    manager.release(&c_r1).unwrap();
}

#[test]
fn test_disjoint_holders_are_not_flagged() {
    let manager = LockManager::new(3);
    let a = manager.open(0, CallerId::new(1)).unwrap();
    let b = manager.open(1, CallerId::new(2)).unwrap();
    let c = manager.open(2, CallerId::new(3)).unwrap();

    manager.acquire(&a, LockMode::Write, &CancelToken::new()).unwrap();
    manager.acquire(&b, LockMode::Write, &CancelToken::new()).unwrap();
    manager.acquire(&c, LockMode::Read, &CancelToken::new()).unwrap();

    manager.release(&a).unwrap();
    manager.release(&b).unwrap();
    manager.release(&c).unwrap();
}
