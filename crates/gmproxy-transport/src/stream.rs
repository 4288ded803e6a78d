//! Byte-stream transport
//!
//! Carries events as length-prefixed JSON frames over any split stream
//! (TCP, Unix sockets). A background reader task delivers inbound frames to
//! the local subscriptions.

use crate::protocol::{EventFrame, deserialize, serialize};
use crate::subscriptions::Subscriptions;
use crate::tcp::{TcpReadWrapper, TcpWriteWrapper};
use crate::transport::{EventHandler, FrameReader, FrameWriter, Transport};
use async_trait::async_trait;
use gmproxy_core::{ProxyError, Result};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Transport over a framed byte stream
pub struct StreamTransport {
    /// Handlers for inbound events
    subscriptions: Arc<Subscriptions>,
    /// Writer half of the connection
    writer: Mutex<Option<Box<dyn FrameWriter>>>,
    /// Flips to true once the reader sees EOF or an error, or on close()
    closed: Arc<watch::Sender<bool>>,
    /// Background reader task handle
    reader_handle: JoinHandle<()>,
}

impl StreamTransport {
    /// Wrap an already split stream and start the reader task
    pub fn new<R, W>(reader: R, writer: W) -> Arc<Self>
    where
        R: FrameReader + 'static,
        W: FrameWriter + 'static,
    {
        let subscriptions = Arc::new(Subscriptions::new());
        let closed = Arc::new(watch::channel(false).0);
        let reader_handle =
            tokio::spawn(reader_task(reader, subscriptions.clone(), closed.clone()));

        Arc::new(Self {
            subscriptions,
            writer: Mutex::new(Some(Box::new(writer))),
            closed,
            reader_handle,
        })
    }

    /// Connect to a TCP peer
    pub async fn connect_tcp(addr: &str) -> Result<Arc<Self>> {
        info!("Connecting to peer at {}", addr);
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| ProxyError::Transport(format!("Failed to connect to {}: {}", addr, e)))?;
        Ok(Self::from_tcp(stream))
    }

    /// Use an accepted or connected TCP stream
    pub fn from_tcp(stream: TcpStream) -> Arc<Self> {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }
        let (read_half, write_half) = stream.into_split();
        Self::new(TcpReadWrapper(read_half), TcpWriteWrapper(write_half))
    }

    /// Connect to a Unix socket peer
    #[cfg(unix)]
    pub async fn connect_unix(path: &str) -> Result<Arc<Self>> {
        info!("Connecting to peer at {}", path);
        let stream = tokio::net::UnixStream::connect(path)
            .await
            .map_err(|e| ProxyError::Transport(format!("Failed to connect to {}: {}", path, e)))?;
        Ok(Self::from_unix(stream))
    }

    /// Use an accepted or connected Unix stream
    #[cfg(unix)]
    pub fn from_unix(stream: tokio::net::UnixStream) -> Arc<Self> {
        use crate::unix::{UnixReadWrapper, UnixWriteWrapper};
        let (read_half, write_half) = stream.into_split();
        Self::new(UnixReadWrapper(read_half), UnixWriteWrapper(write_half))
    }

    /// Whether the connection has gone away
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Wait until the connection goes away
    pub async fn wait_closed(&self) {
        let mut closed = self.closed.subscribe();
        let _ = closed.wait_for(|closed| *closed).await;
    }

    /// Subscriptions installed at this end
    pub fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    /// Shut down the write half and stop delivering events
    pub async fn close(&self) {
        self.closed.send_replace(true);
        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.shutdown().await {
                debug!("Shutdown after close: {}", e);
            }
        }
        self.reader_handle.abort();
        info!("Stream transport closed");
    }
}

impl Drop for StreamTransport {
    fn drop(&mut self) {
        self.reader_handle.abort();
    }
}

#[async_trait]
impl Transport for StreamTransport {
    fn subscribe(&self, event: &str, handler: EventHandler) {
        if self.subscriptions.insert(event, handler) {
            debug!("Replaced subscription: {}", event);
        }
    }

    fn unsubscribe(&self, event: &str) -> bool {
        self.subscriptions.remove(event)
    }

    async fn publish(&self, event: &str, args: Vec<Value>) -> Result<()> {
        if self.is_closed() {
            return Err(ProxyError::Closed);
        }

        let frame = EventFrame {
            event: event.to_string(),
            args,
        };
        let data = serialize(&frame)?;

        let json_preview: String = String::from_utf8_lossy(&data).chars().take(200).collect();
        debug!("[send] len={} json={}", data.len(), json_preview);

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(ProxyError::Closed)?;
        writer.write_frame(&data).await
    }
}

/// Background reader task delivering inbound frames
///
/// Exits on EOF or a read failure and marks the transport closed. Frames
/// that fail to deserialize are logged and skipped.
async fn reader_task<R: FrameReader>(
    mut reader: R,
    subscriptions: Arc<Subscriptions>,
    closed: Arc<watch::Sender<bool>>,
) {
    loop {
        match reader.read_frame().await {
            Ok(data) => {
                let json_preview: String =
                    String::from_utf8_lossy(&data).chars().take(200).collect();
                debug!("[recv] len={} json={}", data.len(), json_preview);

                match deserialize(&data) {
                    Ok(frame) => {
                        subscriptions.dispatch(&frame.event, frame.args);
                    }
                    Err(e) => {
                        error!("Failed to deserialize frame: {}", e);
                    }
                }
            }
            Err(ProxyError::Closed) => {
                info!("Peer closed the stream");
                break;
            }
            Err(e) => {
                error!("Reader task failed: {}", e);
                break;
            }
        }
    }
    closed.send_replace(true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::handler;
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use tokio::time::{Duration, timeout};

    async fn tcp_pair() -> (Arc<StreamTransport>, Arc<StreamTransport>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (client, accepted) =
            tokio::join!(StreamTransport::connect_tcp(&addr), listener.accept());
        let (stream, _) = accepted.unwrap();
        (client.unwrap(), StreamTransport::from_tcp(stream))
    }

    #[tokio::test]
    async fn test_events_cross_the_socket() {
        let (client, server) = tcp_pair().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let forward = handler(move |args| {
            let _ = tx.send(args);
        });
        server.subscribe("door1:open", forward);

        client
            .publish("door1:open", vec![json!("1"), json!("[true]")])
            .await
            .unwrap();

        let args = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(args, vec![json!("1"), json!("[true]")]);
    }

    #[tokio::test]
    async fn test_publish_after_close_fails() {
        let (client, _server) = tcp_pair().await;
        client.close().await;
        assert!(client.is_closed());
        assert!(matches!(
            client.publish("x:y", Vec::new()).await,
            Err(ProxyError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_peer_hangup_marks_closed() {
        let (client, server) = tcp_pair().await;
        server.close().await;
        drop(server);

        timeout(Duration::from_secs(5), client.wait_closed())
            .await
            .unwrap();
        assert!(client.is_closed());
    }
}
