//! Emitted-event tracking.
//!
//! A mixin installed last on the app subscribes to every instance's emits
//! and records them per instance uid.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::engine::Mixin;
use crate::types::Value;

/// Event name → argument lists, in emission order.
pub type EmittedEvents = IndexMap<String, Vec<Vec<Value>>>;

#[derive(Debug, Clone, Default)]
pub struct EmittedLog {
    events: Rc<RefCell<IndexMap<u64, EmittedEvents>>>,
}

impl EmittedLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, uid: u64, event: &str, args: &[Value]) {
        self.events
            .borrow_mut()
            .entry(uid)
            .or_default()
            .entry(event.to_string())
            .or_default()
            .push(args.to_vec());
    }

    /// Everything `uid` emitted.
    pub fn for_instance(&self, uid: u64) -> EmittedEvents {
        self.events.borrow().get(&uid).cloned().unwrap_or_default()
    }

    /// Argument lists of one event emitted by `uid`.
    pub fn events(&self, uid: u64, event: &str) -> Option<Vec<Vec<Value>>> {
        self.events
            .borrow()
            .get(&uid)
            .and_then(|events| events.get(event))
            .cloned()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

/// Mixin that records every emit into `log`.
pub fn attach_emit_listener(log: &EmittedLog) -> Mixin {
    let log = log.clone();
    Mixin::named("emitted-events").before_create(move |instance| {
        let log = log.clone();
        instance.on_emit(move |uid, event, args| log.record(uid, event, args));
    })
}
