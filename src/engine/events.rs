//! Synchronous in-process event bus.
//!
//! Subscribers run inline on the publishing thread, in registration order.
//! A panicking subscriber is isolated so the remaining subscribers still see
//! the event.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;

use tracing::error;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<T> = Box<dyn Fn(&T) + Send + Sync>;

struct Subscriber<T> {
    id: SubscriptionId,
    callback: Callback<T>,
}

/// Topic-per-instance event bus. Create one bus per event type.
pub struct EventBus<T> {
    inner: Mutex<BusInner<T>>,
}

struct BusInner<T> {
    next_id: u64,
    subscribers: Vec<Subscriber<T>>,
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventBus<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BusInner {
                next_id: 0,
                subscribers: Vec::new(),
            }),
        }
    }

    /// Register a callback. Callbacks fire in registration order.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.subscribers.push(Subscriber {
            id,
            callback: Box::new(callback),
        });
        id
    }

    /// Remove a subscriber. Returns false when the id is unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let before = inner.subscribers.len();
        inner.subscribers.retain(|s| s.id != id);
        inner.subscribers.len() != before
    }

    /// Deliver `event` to every subscriber synchronously. A panic in one
    /// callback is caught and logged; delivery continues.
    pub fn publish(&self, event: &T) {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        for sub in &inner.subscribers {
            let result = panic::catch_unwind(AssertUnwindSafe(|| (sub.callback)(event)));
            if result.is_err() {
                error!(subscription = sub.id.0, "event subscriber panicked");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .subscribers
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn delivers_in_registration_order() {
        let bus = EventBus::<u32>::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            bus.subscribe(move |_e: &u32| log.lock().unwrap().push(tag));
        }

        bus.publish(&7);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = EventBus::<u32>::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&count);
        let id = bus.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(&1);
        assert!(bus.unsubscribe(id));
        bus.publish(&2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!bus.unsubscribe(id));
    }

    #[test]
    fn panicking_subscriber_does_not_block_others() {
        let bus = EventBus::<u32>::new();
        let count = Arc::new(AtomicUsize::new(0));

        bus.subscribe(|_| panic!("boom"));
        let c = Arc::clone(&count);
        bus.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(&1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
