//! Cross-resource deadlock detection.
//!
//! The detector runs before a prospective waiter is queued. It walks the
//! holder registries of all resources looking for a two-hop cycle:
//! `caller -> resource -> p -> other resource -> caller`. The walk is an
//! approximation bounded to cycles spanning two resources; longer chains
//! are deliberately not detected (see the crate documentation).
//!
//! Locking discipline: each registry is read while briefly holding that
//! resource's own mutex, one at a time in fixed index order, never two
//! simultaneously. The admission mutex held by the caller keeps the check
//! and the subsequent ticket issue atomic with respect to other blocking
//! requests, so two racing requests cannot both slip past the detector.

use std::sync::Arc;

use crate::core::holders::CallerId;
use crate::core::manager::ResourceSlot;

/// Report whether granting `caller` a queued request on `resource` could
/// close a wait cycle.
pub(crate) fn would_deadlock(
    slots: &[Arc<ResourceSlot>],
    resource: usize,
    caller: CallerId,
) -> bool {
    // A caller may not re-request a resource it already holds or waits on.
    let deps = {
        let state = slots[resource].state.lock();
        if state.holders.contains(caller) {
            return true;
        }
        state.holders.callers()
    };

    if deps.is_empty() {
        return false;
    }

    // Two-hop walk: if a dependency of `resource` is itself queued behind
    // `caller` somewhere else, both would wait on each other.
    for (index, slot) in slots.iter().enumerate() {
        if index == resource {
            continue;
        }
        let state = slot.state.lock();
        for p in &deps {
            if let Some(pos) = state.holders.last_position(*p) {
                if state.holders.appears_at_or_before(caller, pos) {
                    tracing::debug!(
                        resource,
                        other = index,
                        caller = %caller,
                        dependency = %p,
                        "two-hop wait cycle detected"
                    );
                    return true;
                }
            }
        }
    }

    false
}
