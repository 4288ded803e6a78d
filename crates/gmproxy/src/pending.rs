//! Pending remote calls
//!
//! Each in-flight call owns one entry in the pending table and one
//! subscription on its response event. Both go away together: when the
//! response arrives, on timeout, on cancellation, or when the `PendingCall`
//! is dropped.

use dashmap::DashMap;
use gmproxy_core::{CallId, ProxyError, Result, codec};
use gmproxy_transport::{Transport, handler};
use serde_json::Value;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

struct PendingEntry {
    method: String,
    call_id: CallId,
    response_tx: oneshot::Sender<Value>,
}

/// Table of in-flight calls for one proxy, keyed by response event
pub(crate) struct PendingCalls {
    transport: Arc<dyn Transport>,
    entries: DashMap<String, PendingEntry>,
}

impl PendingCalls {
    pub(crate) fn new(transport: Arc<dyn Transport>) -> Arc<Self> {
        Arc::new(Self {
            transport,
            entries: DashMap::new(),
        })
    }

    /// Register a call and listen for its one-shot response
    pub(crate) fn open(
        self: &Arc<Self>,
        method: &str,
        call_id: CallId,
        response_event: String,
        timeout: Option<Duration>,
    ) -> PendingCall {
        let (response_tx, response_rx) = oneshot::channel();
        self.entries.insert(
            response_event.clone(),
            PendingEntry {
                method: method.to_string(),
                call_id: call_id.clone(),
                response_tx,
            },
        );

        let calls: Weak<Self> = Arc::downgrade(self);
        let event = response_event.clone();
        self.transport.subscribe(
            &response_event,
            handler(move |args| {
                let Some(calls) = calls.upgrade() else {
                    return;
                };
                calls.transport.unsubscribe(&event);
                let value = codec::decode(args.first());
                calls.settle(&event, value);
            }),
        );

        PendingCall {
            method: method.to_string(),
            call_id,
            response_event,
            response_rx,
            timeout,
            calls: self.clone(),
        }
    }

    fn settle(&self, response_event: &str, value: Value) {
        match self.entries.remove(response_event) {
            Some((_, entry)) => {
                debug!("Call {}#{} resolved", entry.method, entry.call_id);
                // Receiver may already be gone; the call was abandoned
                let _ = entry.response_tx.send(value);
            }
            None => debug!("Late response on {}", response_event),
        }
    }

    /// Drop a call and its response subscription; returns whether it was
    /// still pending
    pub(crate) fn evict(&self, response_event: &str) -> bool {
        match self.entries.remove(response_event) {
            Some((_, entry)) => {
                self.transport.unsubscribe(response_event);
                debug!("Evicted call {}#{}", entry.method, entry.call_id);
                true
            }
            None => false,
        }
    }

    /// Evict every pending call; waiting callers see `Cancelled`
    pub(crate) fn evict_all(&self) -> usize {
        let events: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        events.iter().filter(|event| self.evict(event)).count()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Caller-side handle for one remote call
///
/// Await it (or call [`PendingCall::wait`]) for the decoded response.
/// Without a timeout it stays pending for as long as the peer stays silent.
/// Dropping the handle evicts the call.
pub struct PendingCall {
    method: String,
    call_id: CallId,
    response_event: String,
    response_rx: oneshot::Receiver<Value>,
    timeout: Option<Duration>,
    calls: Arc<PendingCalls>,
}

impl PendingCall {
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }

    /// Event name the response is expected on
    pub fn response_event(&self) -> &str {
        &self.response_event
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Give up with `ProxyError::Timeout` if no response arrives in time
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Wait for as long as it takes
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Abandon the call, releasing its pending entry and subscription
    pub fn cancel(self) {
        debug!("Cancelling call {}#{}", self.method, self.call_id);
    }

    /// Wait for the decoded response
    pub async fn wait(mut self) -> Result<Value> {
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut self.response_rx).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    self.calls.evict(&self.response_event);
                    warn!(
                        "Call {}#{} got no response within {:?}",
                        self.method, self.call_id, limit
                    );
                    return Err(ProxyError::Timeout {
                        method: self.method.clone(),
                        call_id: self.call_id.to_string(),
                        after: limit,
                    });
                }
            },
            None => (&mut self.response_rx).await,
        };

        outcome.map_err(|_| ProxyError::Cancelled {
            method: self.method.clone(),
            call_id: self.call_id.to_string(),
        })
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        self.calls.evict(&self.response_event);
    }
}

impl IntoFuture for PendingCall {
    type Output = Result<Value>;
    type IntoFuture = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}

impl std::fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCall")
            .field("method", &self.method)
            .field("call_id", &self.call_id)
            .field("response_event", &self.response_event)
            .field("timeout", &self.timeout)
            .finish()
    }
}
