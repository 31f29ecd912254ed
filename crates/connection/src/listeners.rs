//! Subscriber list for connection lifecycle events.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::warn;

use crate::types::ConnectionEvent;

/// Callback invoked for every lifecycle event.
pub type EventListener = Arc<dyn Fn(&ConnectionEvent) + Send + Sync>;

type Slots = Mutex<Vec<(u64, EventListener)>>;

/// Fire-and-forget fan-out. A listener that panics is logged and skipped;
/// it never affects the controller or the other listeners.
#[derive(Default)]
pub(crate) struct ListenerSet {
    next_id: AtomicU64,
    slots: Arc<Slots>,
}

impl ListenerSet {
    pub(crate) fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ConnectionEvent) + Send + Sync + 'static,
    {
        let listener: EventListener = Arc::new(listener);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        Subscription {
            id,
            slots: Arc::downgrade(&self.slots),
        }
    }

    pub(crate) fn clear(&self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn emit(&self, event: &ConnectionEvent) {
        // Copy out so listeners may (un)subscribe from inside the callback.
        let listeners: Vec<EventListener> = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                warn!(event = ?event, "connection event listener panicked");
            }
        }
    }
}

/// Handle returned by `on_event`; call [`unsubscribe`](Self::unsubscribe)
/// to stop receiving events. Dropping it keeps the listener registered.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    slots: Weak<Slots>,
}

impl Subscription {
    /// Removes the listener. No-op if it was already removed.
    pub fn unsubscribe(&self) {
        if let Some(slots) = self.slots.upgrade() {
            slots
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> ConnectionEvent {
        ConnectionEvent::Connecting {
            network_name: "RX-1".into(),
        }
    }

    #[test]
    fn delivers_to_all_listeners() {
        let set = ListenerSet::default();
        let seen = Arc::new(Mutex::new(0));
        for _ in 0..3 {
            let s = Arc::clone(&seen);
            set.subscribe(move |_| *s.lock().unwrap() += 1);
        }
        set.emit(&event());
        assert_eq!(*seen.lock().unwrap(), 3);
    }

    #[test]
    fn unsubscribe_removes_only_that_listener() {
        let set = ListenerSet::default();
        let a = set.subscribe(|_| {});
        let _b = set.subscribe(|_| {});
        assert_eq!(set.len(), 2);
        a.unsubscribe();
        a.unsubscribe();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn panicking_listener_is_isolated() {
        let set = ListenerSet::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        set.subscribe(|_| panic!("listener bug"));
        let s = Arc::clone(&seen);
        set.subscribe(move |e| s.lock().unwrap().push(e.clone()));

        set.emit(&event());
        set.emit(&event());
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn unsubscribe_after_set_dropped_is_noop() {
        let set = ListenerSet::default();
        let sub = set.subscribe(|_| {});
        drop(set);
        sub.unsubscribe();
    }

    #[test]
    fn clear_removes_everything() {
        let set = ListenerSet::default();
        set.subscribe(|_| {});
        set.subscribe(|_| {});
        set.clear();
        assert_eq!(set.len(), 0);
    }
}
