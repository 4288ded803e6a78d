//! # gmproxy-core
//!
//! Core types for the gmproxy protocol.
//!
//! This crate provides the pieces shared by every gmproxy endpoint:
//! - Error types
//! - Event naming and call identifiers
//! - JSON payload codec with raw fallback

pub mod codec;
pub mod error;
pub mod naming;

pub use codec::{call_id_from, decode, decode_args, encode, encode_args};
pub use error::{ProxyError, Result};
pub use naming::{CallId, CallIdGenerator, CallIdStrategy, call_event, response_event};
