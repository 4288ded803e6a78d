//! Demo door served over a gmproxy channel

use gmproxy::GMProxy;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// A door whose open state is shared by every connected peer
#[derive(Debug)]
pub struct Door {
    id: String,
    open: AtomicBool,
}

impl Door {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            open: AtomicBool::new(false),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn set_open(&self, open: bool, by: Option<&Value>) -> Value {
        self.open.store(open, Ordering::SeqCst);
        let by = by.map(|who| who.to_string()).unwrap_or_else(|| "unknown".into());
        let action = if open { "opened" } else { "closed" };
        info!("Door {} {} by {}", self.id, action, by);
        json!({ "ok": true, "open": open })
    }

    fn state(&self) -> Value {
        json!({ "id": self.id, "open": self.is_open() })
    }

    /// Serve `open`, `close` and `state` on the proxy's channel
    pub fn serve(self: &Arc<Self>, proxy: &GMProxy) {
        let door = self.clone();
        proxy.register_fn("open", move |args| Some(door.set_open(true, args.first())));

        let door = self.clone();
        proxy.register_fn("close", move |args| Some(door.set_open(false, args.first())));

        let door = self.clone();
        proxy.register_fn("state", move |_| Some(door.state()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmproxy_transport::LoopbackTransport;

    #[tokio::test]
    async fn test_door_over_channel() {
        let (server_side, client_side) = LoopbackTransport::pair();
        let server = GMProxy::new("door1", server_side).unwrap();
        let client = GMProxy::new("door1", client_side).unwrap();

        let door = Arc::new(Door::new("door1"));
        door.serve(&server);
        assert_eq!(server.methods(), vec!["close", "open", "state"]);

        let opened = client.invoke("open", vec![json!("player-1")]).await.unwrap();
        assert_eq!(opened, json!({ "ok": true, "open": true }));
        assert!(door.is_open());

        let state = client.invoke("state", vec![]).await.unwrap();
        assert_eq!(state, json!({ "id": "door1", "open": true }));

        client.invoke("close", vec![]).await.unwrap();
        assert!(!door.is_open());
    }
}
