//! One-shot gates for response metadata and the final outcome.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// A one-shot, multi-waiter gate holding the value it opened with.
///
/// The first `open` wins; later opens are ignored so an early failure is
/// never overwritten by a later terminal event.
pub(crate) struct Latch<T> {
    slot: Mutex<Option<T>>,
    opened: Condvar,
}

impl<T: Clone> Latch<T> {
    pub(crate) fn new() -> Self {
        Latch {
            slot: Mutex::new(None),
            opened: Condvar::new(),
        }
    }

    /// Opens the gate with `value` unless it is already open.
    pub(crate) fn open(&self, value: T) {
        let mut slot = self.slot.lock().unwrap();
        if slot.is_none() {
            *slot = Some(value);
            self.opened.notify_all();
        }
    }

    /// Blocks until the gate opens, returning `None` if `timeout` elapses
    /// first.
    pub(crate) fn wait(&self, timeout: Duration) -> Option<T> {
        let slot = self.slot.lock().unwrap();
        let (slot, _) = self
            .opened
            .wait_timeout_while(slot, timeout, |slot| slot.is_none())
            .unwrap();
        slot.clone()
    }
}
