//! In-memory loopback transport
//!
//! Two endpoints wired back to back: whatever one publishes is delivered to
//! the other's subscriptions. Stands in for the host engine's event channel
//! when both peers live in the same process.

use crate::subscriptions::Subscriptions;
use crate::transport::{EventHandler, Transport};
use async_trait::async_trait;
use gmproxy_core::Result;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// One end of an in-memory transport pair
#[derive(Debug)]
pub struct LoopbackTransport {
    /// Handlers for events arriving at this end
    local: Arc<Subscriptions>,
    /// Handlers at the other end
    peer: Arc<Subscriptions>,
    /// Number of events published from this end
    published: AtomicUsize,
}

impl LoopbackTransport {
    /// Create two connected endpoints
    pub fn pair() -> (Arc<Self>, Arc<Self>) {
        let a = Arc::new(Subscriptions::new());
        let b = Arc::new(Subscriptions::new());
        let left = Arc::new(Self {
            local: a.clone(),
            peer: b.clone(),
            published: AtomicUsize::new(0),
        });
        let right = Arc::new(Self {
            local: b,
            peer: a,
            published: AtomicUsize::new(0),
        });
        (left, right)
    }

    /// Subscriptions installed at this end
    pub fn subscriptions(&self) -> &Subscriptions {
        &self.local
    }

    /// Events published from this end so far
    pub fn published(&self) -> usize {
        self.published.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    fn subscribe(&self, event: &str, handler: EventHandler) {
        if self.local.insert(event, handler) {
            debug!("Replaced subscription: {}", event);
        }
    }

    fn unsubscribe(&self, event: &str) -> bool {
        self.local.remove(event)
    }

    async fn publish(&self, event: &str, args: Vec<Value>) -> Result<()> {
        self.published.fetch_add(1, Ordering::SeqCst);
        debug!("[loopback] {} args={}", event, args.len());
        self.peer.dispatch(event, args);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::handler;
    use serde_json::json;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_publish_reaches_peer_only() {
        let (left, right) = LoopbackTransport::pair();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let record = handler(move |args| {
            sink.lock().unwrap().push(args);
        });
        right.subscribe("door1:open", record);
        // Same name on the publishing side must not fire
        left.subscribe("door1:open", handler(|_| panic!("delivered to sender")));

        left.publish("door1:open", vec![json!("1"), json!("[]")])
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], vec![json!("1"), json!("[]")]);
        assert_eq!(left.published(), 1);
        assert_eq!(right.published(), 0);
    }

    #[tokio::test]
    async fn test_unsubscribed_event_is_dropped() {
        let (left, right) = LoopbackTransport::pair();
        right.subscribe("x:y", handler(|_| panic!("should be gone")));
        assert!(right.unsubscribe("x:y"));

        // At-most-once with no acknowledgment: publishing still succeeds
        left.publish("x:y", Vec::new()).await.unwrap();
        assert!(right.subscriptions().is_empty());
    }
}
