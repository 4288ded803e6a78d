//! Transport abstractions for gmproxy
//!
//! A transport is a one-way named-event channel: publishing is best-effort
//! and at-most-once, there is no acknowledgment and no ordering between
//! distinct event names. Subscriptions are always local to the endpoint.

use async_trait::async_trait;
use gmproxy_core::Result;
use serde_json::Value;
use std::sync::Arc;

/// Callback invoked with the positional arguments of a delivered event
pub type EventHandler = Arc<dyn Fn(Vec<Value>) + Send + Sync>;

/// Wrap a closure as an `EventHandler`
pub fn handler<F>(f: F) -> EventHandler
where
    F: Fn(Vec<Value>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// One-way named-event messaging primitive
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Listen for `event` on this endpoint
    ///
    /// Subscribing an event name that already has a handler replaces it.
    fn subscribe(&self, event: &str, handler: EventHandler);

    /// Stop listening for `event`; returns whether a handler was removed
    fn unsubscribe(&self, event: &str) -> bool;

    /// Send `event` with `args` to the peer endpoint
    async fn publish(&self, event: &str, args: Vec<Value>) -> Result<()>;
}

/// Trait for async reading from a byte stream
#[async_trait]
pub trait FrameReader: Send {
    /// Read a complete frame from the stream
    /// Frames are length-prefixed: 4-byte little-endian length + JSON payload
    async fn read_frame(&mut self) -> Result<Vec<u8>>;
}

/// Trait for async writing to a byte stream
#[async_trait]
pub trait FrameWriter: Send + Sync {
    /// Write a complete frame to the stream
    /// Frames are length-prefixed: 4-byte little-endian length + JSON payload
    async fn write_frame(&mut self, data: &[u8]) -> Result<()>;

    /// Shut down the write half
    async fn shutdown(&mut self) -> Result<()>;
}
