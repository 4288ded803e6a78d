//! Subscription table shared by transport implementations

use crate::transport::EventHandler;
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

/// Event name → handler, one handler per name
#[derive(Default)]
pub struct Subscriptions {
    handlers: DashMap<String, EventHandler>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a handler; returns true if it replaced an earlier one
    pub fn insert(&self, event: &str, handler: EventHandler) -> bool {
        self.handlers.insert(event.to_string(), handler).is_some()
    }

    /// Remove a handler; returns whether one was installed
    pub fn remove(&self, event: &str) -> bool {
        self.handlers.remove(event).is_some()
    }

    pub fn contains(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Deliver an event to its handler, if any
    ///
    /// The handler runs after the table lock is released, so it may
    /// subscribe or unsubscribe freely.
    pub fn dispatch(&self, event: &str, args: Vec<Value>) -> bool {
        let handler = self.handlers.get(event).map(|entry| entry.value().clone());
        match handler {
            Some(handler) => {
                handler(args);
                true
            }
            None => {
                debug!("Dropping event with no subscriber: {}", event);
                false
            }
        }
    }
}

impl std::fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut events: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        events.sort();
        f.debug_struct("Subscriptions").field("events", &events).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::handler;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_last_subscriber_wins() {
        let subs = Subscriptions::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let f = first.clone();
        let count_first = handler(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });
        let s = second.clone();
        let count_second = handler(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!subs.insert("ch:m", count_first));
        assert!(subs.insert("ch:m", count_second));

        assert!(subs.dispatch("ch:m", vec![json!(1)]));
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(subs.len(), 1);
    }

    #[test]
    fn test_handler_can_unsubscribe_itself() {
        let subs = Arc::new(Subscriptions::new());
        let inner = subs.clone();
        let once = handler(move |_| {
            inner.remove("once");
        });
        subs.insert("once", once);

        assert!(subs.dispatch("once", Vec::new()));
        assert!(!subs.contains("once"));
        assert!(!subs.dispatch("once", Vec::new()));
    }

    #[test]
    fn test_unknown_event_is_dropped() {
        let subs = Subscriptions::new();
        assert!(!subs.dispatch("nobody:home", vec![json!("x")]));
        assert!(!subs.remove("nobody:home"));
    }
}
