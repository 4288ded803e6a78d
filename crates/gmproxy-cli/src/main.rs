//! gmproxy command line
//!
//! - `gmproxy serve` accepts TCP peers and serves a demo door on a channel
//! - `gmproxy call` connects to a peer and invokes one remote method

mod door;

use anyhow::Result;
use clap::{Parser, Subcommand};
use door::Door;
use gmproxy::{GMProxy, ProxyConfig};
use gmproxy_transport::StreamTransport;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "127.0.0.1:22005";

#[derive(Debug, Parser)]
#[command(name = "gmproxy", version, about = "RPC over one-way named events")]
struct Cli {
    /// Log filter, e.g. `debug` or `gmproxy=trace`
    #[arg(long, env = "GMPROXY_LOG", default_value = "info", global = true)]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve a demo door (`open`, `close`, `state`) to every peer
    Serve {
        /// Address to listen on
        #[arg(long, env = "GMPROXY_LISTEN", default_value = DEFAULT_ADDR)]
        listen: String,
        /// Channel id shared with peers
        #[arg(long, default_value = "door1")]
        channel: String,
    },
    /// Invoke one method on a peer and print the result
    Call {
        /// Peer address
        #[arg(long, env = "GMPROXY_CONNECT", default_value = DEFAULT_ADDR)]
        connect: String,
        /// Channel id shared with the peer
        #[arg(long, default_value = "door1")]
        channel: String,
        /// Give up after this many milliseconds; 0 waits forever
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
        /// Use random call ids instead of a counter
        #[arg(long)]
        random_ids: bool,
        /// Remote method name
        method: String,
        /// Arguments; each is parsed as JSON, or sent as a string if that fails
        args: Vec<String>,
    },
}

/// Parse a command line argument the way the codec treats payloads
fn parse_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

async fn serve(listen: &str, channel: String) -> Result<()> {
    let listener = TcpListener::bind(listen).await?;
    info!("Serving door on channel {} at {}", channel, listen);
    let door = Arc::new(Door::new(channel.clone()));

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => accepted?,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                return Ok(());
            }
        };
        info!("Peer {} connected", peer);

        let door = door.clone();
        let channel = channel.clone();
        tokio::spawn(async move {
            let transport = StreamTransport::from_tcp(stream);
            let proxy = match GMProxy::new(channel, transport.clone()) {
                Ok(proxy) => proxy,
                Err(e) => {
                    error!("Failed to create proxy for {}: {}", peer, e);
                    return;
                }
            };
            door.serve(&proxy);
            transport.wait_closed().await;
            info!("Peer {} disconnected", peer);
        });
    }
}

async fn call(
    connect: &str,
    channel: String,
    timeout_ms: u64,
    random_ids: bool,
    method: &str,
    args: &[String],
) -> Result<()> {
    let mut config = ProxyConfig::default();
    if timeout_ms > 0 {
        config.call_timeout = Some(Duration::from_millis(timeout_ms));
    }
    if random_ids {
        config = config.random_ids();
    }

    let transport = StreamTransport::connect_tcp(connect).await?;
    let proxy = GMProxy::with_config(channel, transport.clone(), config)?;
    let args = args.iter().map(|raw| parse_arg(raw)).collect();

    let result = proxy.invoke(method, args).await;
    transport.close().await;

    println!("{}", serde_json::to_string_pretty(&result?)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&cli.log).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { listen, channel } => serve(&listen, channel).await,
        Command::Call {
            connect,
            channel,
            timeout_ms,
            random_ids,
            method,
            args,
        } => call(&connect, channel, timeout_ms, random_ids, &method, &args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_arg_falls_back_to_string() {
        assert_eq!(parse_arg("42"), json!(42));
        assert_eq!(parse_arg(r#"{"ok":true}"#), json!({ "ok": true }));
        assert_eq!(parse_arg("player-1"), json!("player-1"));
    }

    #[test]
    fn test_cli_parses_call() {
        let cli =
            Cli::try_parse_from(["gmproxy", "call", "--channel", "x", "open", "1", "a"]).unwrap();
        match cli.command {
            Command::Call {
                channel,
                method,
                args,
                timeout_ms,
                ..
            } => {
                assert_eq!(channel, "x");
                assert_eq!(method, "open");
                assert_eq!(args, vec!["1", "a"]);
                assert_eq!(timeout_ms, 5000);
            }
            other => panic!("expected call, got {:?}", other),
        }
    }
}
