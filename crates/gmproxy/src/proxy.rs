//! One endpoint of a gmproxy channel

use crate::config::ProxyConfig;
use crate::pending::{PendingCall, PendingCalls};
use crate::registry::{Handler, HandlerRegistry, async_handler, sync_handler};
use crate::surface::{LocalSurface, RemoteSurface};
use gmproxy_core::{
    CallId, CallIdGenerator, ProxyError, Result, call_event, call_id_from, codec, response_event,
};
use gmproxy_transport::{Transport, handler};
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, error, warn};

/// RPC endpoint layered over a one-way event transport
///
/// Both ends of a channel construct a `GMProxy` with the same channel id
/// over a shared transport. Either end may serve methods
/// ([`GMProxy::register_handler`]) and call the other's
/// ([`GMProxy::invoke`]).
pub struct GMProxy {
    /// Channel id prefixed onto every event name
    channel: String,
    /// Underlying event transport
    transport: Arc<dyn Transport>,
    /// Locally served methods
    handlers: HandlerRegistry,
    /// In-flight outgoing calls
    pending: Arc<PendingCalls>,
    /// Call id source
    call_ids: CallIdGenerator,
    /// Configuration
    config: ProxyConfig,
}

impl GMProxy {
    /// Create a proxy with the default configuration
    pub fn new(channel: impl Into<String>, transport: Arc<dyn Transport>) -> Result<Self> {
        Self::with_config(channel, transport, ProxyConfig::default())
    }

    /// Create a proxy with custom configuration
    pub fn with_config(
        channel: impl Into<String>,
        transport: Arc<dyn Transport>,
        config: ProxyConfig,
    ) -> Result<Self> {
        let channel = channel.into();
        if channel.is_empty() {
            return Err(ProxyError::MissingChannelId);
        }

        debug!("GMProxy ready on channel {}", channel);
        Ok(Self {
            pending: PendingCalls::new(transport.clone()),
            call_ids: CallIdGenerator::new(config.call_ids),
            handlers: HandlerRegistry::new(),
            channel,
            transport,
            config,
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Registration surface: methods this endpoint serves
    pub fn local(&self) -> LocalSurface<'_> {
        LocalSurface::new(self)
    }

    /// Alias for [`GMProxy::local`]
    pub fn add(&self) -> LocalSurface<'_> {
        LocalSurface::new(self)
    }

    /// Invocation surface: methods the peer serves
    pub fn remote(&self) -> RemoteSurface<'_> {
        RemoteSurface::new(self)
    }

    /// Serve `method` with an async handler
    ///
    /// Replaces any handler already registered under the same name. Returns
    /// the stored handler.
    pub fn register_handler<F, Fut>(&self, method: &str, f: F) -> Handler
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<Value>> + Send + 'static,
    {
        self.install(method, async_handler(f))
    }

    /// Serve `method` with a synchronous handler
    pub fn register_fn<F>(&self, method: &str, f: F) -> Handler
    where
        F: Fn(Vec<Value>) -> Option<Value> + Send + Sync + 'static,
    {
        self.install(method, sync_handler(f))
    }

    /// Serve `method` with an already wrapped handler
    pub fn install(&self, method: &str, handler: Handler) -> Handler {
        if self.handlers.insert(method, handler.clone()).is_some() {
            debug!("Replacing handler {}:{}", self.channel, method);
        }

        let event = call_event(&self.channel, method);
        self.transport.subscribe(
            &event,
            dispatcher(
                self.channel.clone(),
                method.to_string(),
                handler.clone(),
                Arc::downgrade(&self.transport),
            ),
        );
        handler
    }

    /// Stop serving `method`
    pub fn unregister_handler(&self, method: &str) -> Option<Handler> {
        let handler = self.handlers.remove(method)?;
        self.transport.unsubscribe(&call_event(&self.channel, method));
        Some(handler)
    }

    /// Current handler for `method`
    pub fn handler(&self, method: &str) -> Option<Handler> {
        self.handlers.get(method)
    }

    /// Methods this endpoint serves
    pub fn methods(&self) -> Vec<String> {
        self.handlers.methods()
    }

    /// Issue a call to the peer and return its pending handle
    ///
    /// Publish failures are logged rather than returned; the handle then
    /// stays pending until its timeout, cancellation or drop.
    pub async fn call(&self, method: &str, args: Vec<Value>) -> PendingCall {
        let call_id = self.call_ids.next_id();
        let pending = self.pending.open(
            method,
            call_id.clone(),
            response_event(&self.channel, method, &call_id),
            self.config.call_timeout,
        );

        let event = call_event(&self.channel, method);
        let payload = vec![Value::String(call_id.to_string()), codec::encode_args(&args)];
        debug!("Calling {}#{} args={}", event, call_id, args.len());
        if let Err(e) = self.transport.publish(&event, payload).await {
            error!("ProxyError: failed to call {}#{}: {}", event, call_id, e);
        }

        pending
    }

    /// Call `method` on the peer and wait for the decoded result
    pub async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        self.call(method, args).await.wait().await
    }

    /// Like [`GMProxy::invoke`] with an explicit timeout
    pub async fn invoke_with_timeout(
        &self,
        method: &str,
        args: Vec<Value>,
        timeout: Duration,
    ) -> Result<Value> {
        self.call(method, args)
            .await
            .with_timeout(timeout)
            .wait()
            .await
    }

    /// Number of outgoing calls still waiting for a response
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    /// Cancel every outgoing call; waiting callers get `ProxyError::Cancelled`
    pub fn cancel_pending(&self) -> usize {
        let cancelled = self.pending.evict_all();
        if cancelled > 0 {
            debug!("Cancelled {} pending calls on {}", cancelled, self.channel);
        }
        cancelled
    }
}

impl Drop for GMProxy {
    fn drop(&mut self) {
        for method in self.handlers.methods() {
            self.transport.unsubscribe(&call_event(&self.channel, &method));
        }
    }
}

impl std::fmt::Debug for GMProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GMProxy")
            .field("channel", &self.channel)
            .field("methods", &self.handlers.methods())
            .field("pending_calls", &self.pending.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Build the transport callback serving one method
///
/// Each inbound call runs on its own task so a slow handler only delays its
/// own response. Calls without a call id still run, but nothing is sent back.
fn dispatcher(
    channel: String,
    method: String,
    serve: Handler,
    transport: Weak<dyn Transport>,
) -> gmproxy_transport::EventHandler {
    handler(move |args| {
        let call_id: Option<CallId> = args.first().and_then(call_id_from);
        let params = codec::decode_args(args.get(1));
        let reply_to = call_id
            .as_ref()
            .map(|id| response_event(&channel, &method, id));
        if reply_to.is_none() {
            warn!("Call on {}:{} without a call id, response dropped", channel, method);
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!("ProxyError: no runtime to serve {}:{}: {}", channel, method, e);
                return;
            }
        };

        let serve = serve.clone();
        let transport = transport.clone();
        runtime.spawn(async move {
            let result = serve(params).await;
            let (Some(value), Some(reply_to)) = (result, reply_to) else {
                return;
            };
            if value.is_null() {
                debug!("Handler returned null, no response on {}", reply_to);
                return;
            }
            let Some(transport) = transport.upgrade() else {
                debug!("Transport gone before responding on {}", reply_to);
                return;
            };
            if let Err(e) = transport.publish(&reply_to, vec![codec::encode(&value)]).await {
                error!("ProxyError: failed to respond on {}: {}", reply_to, e);
            }
        });
    })
}
