//! Unix socket frame wrappers
//!
//! Used when both endpoints run on the same host.

use crate::protocol::{read_frame, write_frame};
use crate::transport::{FrameReader, FrameWriter};
use async_trait::async_trait;
use gmproxy_core::{ProxyError, Result};
use tokio::io::AsyncWriteExt;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

/// Unix socket read wrapper
pub struct UnixReadWrapper(pub OwnedReadHalf);

#[async_trait]
impl FrameReader for UnixReadWrapper {
    async fn read_frame(&mut self) -> Result<Vec<u8>> {
        read_frame(&mut self.0, "Unix").await
    }
}

/// Unix socket write wrapper
pub struct UnixWriteWrapper(pub OwnedWriteHalf);

#[async_trait]
impl FrameWriter for UnixWriteWrapper {
    async fn write_frame(&mut self, data: &[u8]) -> Result<()> {
        write_frame(&mut self.0, data, "Unix").await
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.0
            .shutdown()
            .await
            .map_err(|e| ProxyError::Transport(format!("Unix shutdown failed: {}", e)))
    }
}
