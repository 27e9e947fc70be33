//! Instance Registry - Uid allocation and instance lifecycle bookkeeping.
//!
//! Every component instance gets a uid when it is created:
//! - uid → weak instance handle, for lookups by uid
//! - ReactiveSet of live uids (effects can react to mounts and unmounts)
//! - The render effect's stop function, run on release
//! - Destroy callbacks registered per uid

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use spark_signals::ReactiveSet;

use super::instance::{Instance, InstanceHandle};

// =============================================================================
// Registry State
// =============================================================================

thread_local! {
    /// Live instances by uid.
    static INSTANCES: RefCell<HashMap<u64, Weak<RefCell<Instance>>>> = RefCell::new(HashMap::new());

    /// Set of currently live uids.
    static ALLOCATED_UIDS: RefCell<ReactiveSet<u64>> = RefCell::new(ReactiveSet::new());

    /// Next uid. Uids are never reused, so parents always sort before children.
    static NEXT_UID: RefCell<u64> = const { RefCell::new(0) };

    /// Stop functions for render effects.
    static EFFECT_STOPS: RefCell<HashMap<u64, Box<dyn FnOnce()>>> = RefCell::new(HashMap::new());

    /// Destroy callbacks registered per uid.
    static DESTROY_CALLBACKS: RefCell<HashMap<u64, Vec<Box<dyn FnOnce()>>>> = RefCell::new(HashMap::new());
}

// =============================================================================
// Allocation
// =============================================================================

/// Allocate a uid for a new instance.
pub fn allocate_uid() -> u64 {
    let uid = NEXT_UID.with(|next| {
        let mut next = next.borrow_mut();
        let uid = *next;
        *next += 1;
        uid
    });
    ALLOCATED_UIDS.with(|set| {
        set.borrow_mut().insert(uid);
    });
    uid
}

/// Record the instance behind a uid.
pub fn register_instance(uid: u64, instance: &InstanceHandle) {
    INSTANCES.with(|map| {
        map.borrow_mut().insert(uid, Rc::downgrade(instance));
    });
}

/// Store the render effect's stop function. Replaces (and runs) any previous one.
pub fn set_effect_stop(uid: u64, stop: Box<dyn FnOnce()>) {
    let previous = EFFECT_STOPS.with(|stops| stops.borrow_mut().insert(uid, stop));
    if let Some(previous) = previous {
        previous();
    }
}

/// Release a uid: stop its render effect, run destroy callbacks, forget it.
pub fn release_instance(uid: u64) {
    let stop = EFFECT_STOPS.with(|stops| stops.borrow_mut().remove(&uid));
    if let Some(stop) = stop {
        stop();
    }

    run_destroy_callbacks(uid);

    INSTANCES.with(|map| {
        map.borrow_mut().remove(&uid);
    });
    ALLOCATED_UIDS.with(|set| {
        set.borrow_mut().remove(&uid);
    });
    log::trace!("released instance {uid}");
}

// =============================================================================
// Destroy Callbacks
// =============================================================================

/// Register a callback to run when the instance with `uid` is released.
pub fn on_destroy(uid: u64, callback: impl FnOnce() + 'static) {
    DESTROY_CALLBACKS.with(|callbacks| {
        callbacks
            .borrow_mut()
            .entry(uid)
            .or_default()
            .push(Box::new(callback));
    });
}

fn run_destroy_callbacks(uid: u64) {
    let callbacks = DESTROY_CALLBACKS.with(|callbacks| callbacks.borrow_mut().remove(&uid));
    if let Some(callbacks) = callbacks {
        for callback in callbacks {
            callback();
        }
    }
}

// =============================================================================
// Lookups
// =============================================================================

/// Get a live instance by uid.
pub fn get_instance(uid: u64) -> Option<InstanceHandle> {
    INSTANCES.with(|map| map.borrow().get(&uid).and_then(Weak::upgrade))
}

/// Check if a uid is currently live.
pub fn is_allocated(uid: u64) -> bool {
    ALLOCATED_UIDS.with(|set| set.borrow().contains(&uid))
}

/// Get the count of live instances.
///
/// Note: This creates a reactive dependency when called from an effect.
pub fn get_allocated_count() -> usize {
    ALLOCATED_UIDS.with(|set| set.borrow().len())
}

// =============================================================================
// Reset (for testing)
// =============================================================================

/// Reset all registry state (for testing). Pending effect stops are run.
pub fn reset_registry() {
    let stops: Vec<_> = EFFECT_STOPS.with(|stops| stops.borrow_mut().drain().map(|(_, stop)| stop).collect());
    for stop in stops {
        stop();
    }
    INSTANCES.with(|map| map.borrow_mut().clear());
    ALLOCATED_UIDS.with(|set| set.borrow_mut().clear());
    NEXT_UID.with(|next| *next.borrow_mut() = 0);
    DESTROY_CALLBACKS.with(|callbacks| callbacks.borrow_mut().clear());
}
