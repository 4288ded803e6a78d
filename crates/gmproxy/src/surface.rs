//! Registration and invocation surfaces
//!
//! Thin views over a [`GMProxy`]: `local()` for methods this endpoint serves,
//! `remote()` for methods the peer serves.

use crate::pending::PendingCall;
use crate::proxy::GMProxy;
use crate::registry::Handler;
use gmproxy_core::Result;
use serde_json::Value;
use std::future::Future;
use tracing::warn;

/// Methods served by this endpoint
#[derive(Debug, Clone, Copy)]
pub struct LocalSurface<'a> {
    proxy: &'a GMProxy,
}

impl<'a> LocalSurface<'a> {
    pub(crate) fn new(proxy: &'a GMProxy) -> Self {
        Self { proxy }
    }

    /// Serve `method` with an async handler; returns the stored handler
    pub fn set<F, Fut>(&self, method: &str, f: F) -> Handler
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<Value>> + Send + 'static,
    {
        self.proxy.register_handler(method, f)
    }

    /// Serve `method` with a synchronous handler
    pub fn set_fn<F>(&self, method: &str, f: F) -> Handler
    where
        F: Fn(Vec<Value>) -> Option<Value> + Send + Sync + 'static,
    {
        self.proxy.register_fn(method, f)
    }

    /// Current handler for `method`, if any
    pub fn get(&self, method: &str) -> Option<Handler> {
        self.proxy.handler(method)
    }
}

/// Methods served by the peer
#[derive(Debug, Clone, Copy)]
pub struct RemoteSurface<'a> {
    proxy: &'a GMProxy,
}

impl<'a> RemoteSurface<'a> {
    pub(crate) fn new(proxy: &'a GMProxy) -> Self {
        Self { proxy }
    }

    /// Callable for the peer's `method`
    pub fn get(&self, method: &str) -> RemoteMethod<'a> {
        RemoteMethod {
            proxy: self.proxy,
            method: method.to_string(),
        }
    }

    /// Remote methods can't be defined from the calling side; logs and
    /// does nothing
    pub fn set<F>(&self, method: &str, _f: F) {
        warn!(
            "ProxyError: can't define remote method {}:{} from the calling side",
            self.proxy.channel(),
            method
        );
    }
}

/// One method on the peer
#[derive(Debug, Clone)]
pub struct RemoteMethod<'a> {
    proxy: &'a GMProxy,
    method: String,
}

impl RemoteMethod<'_> {
    pub fn name(&self) -> &str {
        &self.method
    }

    /// Issue the call and return its pending handle
    pub async fn call(&self, args: Vec<Value>) -> PendingCall {
        self.proxy.call(&self.method, args).await
    }

    /// Issue the call and wait for the decoded result
    pub async fn invoke(&self, args: Vec<Value>) -> Result<Value> {
        self.proxy.invoke(&self.method, args).await
    }
}
