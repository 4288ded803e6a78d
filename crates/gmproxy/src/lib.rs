//! # gmproxy
//!
//! Request/response RPC between two endpoints that can only exchange
//! one-way named events.
//!
//! This crate provides:
//! - `GMProxy`, one endpoint of a channel
//! - Handler registry for locally served methods
//! - Pending calls with opt-in timeout and cancellation
//! - Registration and invocation surfaces
//!
//! ```no_run
//! use gmproxy::GMProxy;
//! use gmproxy_transport::LoopbackTransport;
//! use serde_json::json;
//!
//! # async fn demo() -> gmproxy::Result<()> {
//! let (server_side, client_side) = LoopbackTransport::pair();
//! let server = GMProxy::new("door1", server_side)?;
//! let client = GMProxy::new("door1", client_side)?;
//!
//! server.register_fn("open", |_| Some(json!({ "ok": true })));
//! let reply = client.invoke("open", vec![]).await?;
//! assert_eq!(reply, json!({ "ok": true }));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod pending;
pub mod proxy;
pub mod registry;
pub mod surface;

pub use config::ProxyConfig;
pub use gmproxy_core::{CallId, CallIdStrategy, ProxyError, Result};
pub use pending::PendingCall;
pub use proxy::GMProxy;
pub use registry::{Handler, HandlerFuture, HandlerRegistry, async_handler, sync_handler};
pub use surface::{LocalSurface, RemoteMethod, RemoteSurface};
