#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Runs the bridge against a throwaway in-process relay.
//!
//! The relay accepts one WebSocket connection, authenticates it, asks for
//! the roster, and forwards a Discord chat line. Run with:
//!
//! ```text
//! cargo run --example local_bridge
//! ```

use std::sync::Arc;
use std::time::Duration;

use chat_bridge_client::{
    main_task_channel, BridgeClient, BridgeConfig, HostServer, OnlinePlayer, WebSocketConnector,
};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

/// A stand-in for a live game server with two players online.
struct DemoServer {
    players: Vec<OnlinePlayer>,
}

impl HostServer for DemoServer {
    fn server_name(&self) -> String {
        "DemoServer".into()
    }

    fn server_version(&self) -> String {
        "1.21.4".into()
    }

    fn online_count(&self) -> u32 {
        self.players.len() as u32
    }

    fn max_players(&self) -> u32 {
        20
    }

    fn online_players(&self) -> Vec<OnlinePlayer> {
        self.players.clone()
    }

    fn broadcast(&self, message: &str) {
        println!("[game chat] {message}");
    }
}

/// Accept one bridge connection and script a short relay session.
async fn run_relay(listener: tokio::net::TcpListener) {
    let (tcp, peer) = listener.accept().await.expect("accept");
    println!("[relay] bridge connected from {peer}");
    let mut ws = tokio_tungstenite::accept_async(tcp).await.expect("handshake");

    ws.send(Message::Text(r#"{"type":"auth","status":"success"}"#.into()))
        .await
        .expect("send auth result");
    ws.send(Message::Text(r#"{"type":"request_players"}"#.into()))
        .await
        .expect("send roster request");
    ws.send(Message::Text(
        r#"{"type":"chat","username":"Dave","content":"hello from Discord"}"#.into(),
    ))
    .await
    .expect("send chat");

    while let Some(Ok(frame)) = ws.next().await {
        match frame {
            Message::Text(text) => println!("[relay] received: {text}"),
            Message::Close(_) => break,
            _ => {}
        }
    }
    println!("[relay] bridge disconnected");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_bridge_client=debug".into()),
        )
        .init();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let endpoint = format!("ws://{}", listener.local_addr()?);
    let relay = tokio::spawn(run_relay(listener));

    let host = Arc::new(DemoServer {
        players: vec![
            OnlinePlayer {
                id: Uuid::new_v4(),
                name: "Alice".into(),
            },
            OnlinePlayer {
                id: Uuid::new_v4(),
                name: "Bob".into(),
            },
        ],
    });

    let (main_tx, mut main_rx) = main_task_channel(32);
    let config = BridgeConfig::new(endpoint).with_auth_token("demo-token");
    let mut client = BridgeClient::start(WebSocketConnector::new(), config, host, main_tx)?;

    // Stand-in for the game server's main-thread tick loop.
    let ticker = tokio::spawn(async move {
        while let Some(task) = main_rx.recv().await {
            task();
        }
    });

    tokio::time::sleep(Duration::from_millis(300)).await;
    client.relay_join("Carol");
    client.relay_chat("Carol", "hi Discord!");
    client.relay_leave("Carol");
    tokio::time::sleep(Duration::from_millis(300)).await;

    client.shutdown().await;
    relay.await?;
    ticker.abort();
    Ok(())
}
