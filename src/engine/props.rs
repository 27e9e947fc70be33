//! Reactive Props - Signal-backed props bag.
//!
//! Each key is its own signal, so a render that reads `msg` re-runs when
//! `msg` is written and not otherwise. Adding a key bumps a shape signal so
//! renders that enumerate the bag see new keys.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use spark_signals::{signal, Signal};

use crate::types::{PropsMap, Value};

#[derive(Clone)]
pub struct ReactiveProps {
    entries: Rc<RefCell<IndexMap<String, Signal<Value>>>>,
    shape: Signal<u64>,
}

impl ReactiveProps {
    pub fn new(initial: PropsMap) -> Self {
        let entries = initial
            .into_iter()
            .map(|(key, value)| (key, signal(value)))
            .collect();
        Self {
            entries: Rc::new(RefCell::new(entries)),
            shape: signal(0),
        }
    }

    /// Tracked read of one key.
    pub fn get(&self, key: &str) -> Option<Value> {
        let entry = self.entries.borrow().get(key).cloned();
        match entry {
            Some(signal) => Some(signal.get()),
            None => {
                self.shape.get();
                None
            }
        }
    }

    /// Write one key in place. Never replaces the bag.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        let existing = self.entries.borrow().get(&key).cloned();
        match existing {
            Some(signal) => {
                signal.set(value);
            }
            None => {
                self.entries.borrow_mut().insert(key, signal(value));
                self.shape.set(self.shape.get() + 1);
            }
        }
    }

    /// Tracked read of every key.
    pub fn snapshot(&self) -> PropsMap {
        self.shape.get();
        let entries: Vec<(String, Signal<Value>)> = self
            .entries
            .borrow()
            .iter()
            .map(|(key, signal)| (key.clone(), signal.clone()))
            .collect();
        entries
            .into_iter()
            .map(|(key, signal)| (key, signal.get()))
            .collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl fmt::Debug for ReactiveProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.entries.borrow().keys())
            .finish()
    }
}
