//! TCP frame wrappers
//!
//! Used when the peer endpoint lives in another process or on another host.

use crate::protocol::{read_frame, write_frame};
use crate::transport::{FrameReader, FrameWriter};
use async_trait::async_trait;
use gmproxy_core::{ProxyError, Result};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// TCP read wrapper
pub struct TcpReadWrapper(pub OwnedReadHalf);

#[async_trait]
impl FrameReader for TcpReadWrapper {
    async fn read_frame(&mut self) -> Result<Vec<u8>> {
        read_frame(&mut self.0, "TCP").await
    }
}

/// TCP write wrapper
pub struct TcpWriteWrapper(pub OwnedWriteHalf);

#[async_trait]
impl FrameWriter for TcpWriteWrapper {
    async fn write_frame(&mut self, data: &[u8]) -> Result<()> {
        write_frame(&mut self.0, data, "TCP").await
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.0
            .shutdown()
            .await
            .map_err(|e| ProxyError::Transport(format!("TCP shutdown failed: {}", e)))
    }
}
