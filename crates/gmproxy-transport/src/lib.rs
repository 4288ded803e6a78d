//! One-way named-event transports for gmproxy
//!
//! This crate provides:
//! - The `Transport` trait every proxy endpoint is layered over
//! - A shared subscription table
//! - An in-memory loopback pair for tests and local peers
//! - Length-prefixed JSON event frames over TCP and Unix sockets

pub mod loopback;
pub mod protocol;
pub mod stream;
pub mod subscriptions;
pub mod tcp;
pub mod transport;
#[cfg(unix)]
pub mod unix;

pub use loopback::LoopbackTransport;
pub use protocol::{EventFrame, MAX_FRAME_LEN, deserialize, serialize};
pub use stream::StreamTransport;
pub use subscriptions::Subscriptions;
pub use transport::{EventHandler, FrameReader, FrameWriter, Transport, handler};
