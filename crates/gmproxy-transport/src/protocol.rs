//! Wire format for stream transports
//!
//! Each event travels as one frame: a 4-byte little-endian length followed
//! by a JSON object `{"Event": "...", "Args": [...]}`.

use gmproxy_core::{ProxyError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest frame accepted in either direction (16MB)
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// One published event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventFrame {
    pub event: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Serialize a frame to JSON bytes
pub fn serialize(frame: &EventFrame) -> std::result::Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(frame)
}

/// Deserialize a frame from JSON bytes
pub fn deserialize(bytes: &[u8]) -> std::result::Result<EventFrame, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Read one length-prefixed frame
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R, label: &str) -> Result<Vec<u8>> {
    // Read 4-byte length prefix (little-endian)
    let mut len_bytes = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut len_bytes).await {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            return Err(ProxyError::Closed);
        }
        return Err(ProxyError::Transport(format!(
            "{} read length failed: {}",
            label, e
        )));
    }
    let len = u32::from_le_bytes(len_bytes) as usize;

    if len > MAX_FRAME_LEN {
        return Err(ProxyError::Transport(format!(
            "Frame too large: {} bytes",
            len
        )));
    }

    let mut data = vec![0u8; len];
    reader
        .read_exact(&mut data)
        .await
        .map_err(|e| ProxyError::Transport(format!("{} read data failed: {}", label, e)))?;

    Ok(data)
}

/// Write one length-prefixed frame and flush
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
    label: &str,
) -> Result<()> {
    if data.len() > MAX_FRAME_LEN {
        return Err(ProxyError::Transport(format!(
            "Frame too large: {} bytes",
            data.len()
        )));
    }

    let len = (data.len() as u32).to_le_bytes();
    writer
        .write_all(&len)
        .await
        .map_err(|e| ProxyError::Transport(format!("{} write length failed: {}", label, e)))?;
    writer
        .write_all(data)
        .await
        .map_err(|e| ProxyError::Transport(format!("{} write data failed: {}", label, e)))?;
    writer
        .flush()
        .await
        .map_err(|e| ProxyError::Transport(format!("{} flush failed: {}", label, e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_frame_from_peer() {
        // Exact JSON format expected from peers
        let json = r#"{"Event":"door1:open","Args":["3","[1,\"a\"]"]}"#;
        let frame = deserialize(json.as_bytes()).unwrap();
        assert_eq!(frame.event, "door1:open");
        assert_eq!(frame.args, vec![json!("3"), json!("[1,\"a\"]")]);
    }

    #[test]
    fn test_frame_without_args() {
        let frame = deserialize(br#"{"Event":"door1:open:3"}"#).unwrap();
        assert!(frame.args.is_empty());
    }

    #[test]
    fn test_frame_field_names() {
        let frame = EventFrame {
            event: "x:ping".into(),
            args: vec![json!("1")],
        };
        let text = String::from_utf8(serialize(&frame).unwrap()).unwrap();
        assert_eq!(text, r#"{"Event":"x:ping","Args":["1"]}"#);
    }

    #[tokio::test]
    async fn test_length_prefix() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        write_frame(&mut a, b"{}", "test").await.unwrap();

        let data = read_frame(&mut b, "test").await.unwrap();
        assert_eq!(data, b"{}");
    }

    #[tokio::test]
    async fn test_oversized_length_is_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&((MAX_FRAME_LEN as u32) + 1).to_le_bytes())
            .await
            .unwrap();

        match read_frame(&mut b, "test").await {
            Err(ProxyError::Transport(msg)) => assert!(msg.contains("too large")),
            other => panic!("expected frame size error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_eof_reports_closed() {
        let (a, mut b) = tokio::io::duplex(64);
        drop(a);
        assert!(matches!(
            read_frame(&mut b, "test").await,
            Err(ProxyError::Closed)
        ));
    }
}
