//! # Chat Bridge Client
//!
//! Transport-agnostic bridge client connecting a live game server to a
//! Discord relay server over a persistent bidirectional connection.
//!
//! The client relays player chat, join/leave presence and roster queries
//! outward as flat JSON envelopes, and relays inbound Discord chat back
//! into the game world. The core is the connection machinery: an auth
//! handshake before any application traffic is trusted, a typed message
//! protocol, and reconnection with exponential backoff under a bounded
//! attempt budget.
//!
//! ## Features
//!
//! - **Transport-agnostic** — implement [`Transport`] and [`Connector`]
//!   for any backend
//! - **WebSocket built-in** — the default `transport-websocket` feature
//!   provides [`WebSocketTransport`] and [`WebSocketConnector`]
//! - **Host-neutral** — the game server is reached only through the
//!   [`HostServer`] trait and a bounded main-context task queue
//!
//! ## What it does not do
//!
//! No chat history, no Discord protocol (the relay server speaks that),
//! and no delivery guarantee: messages produced while disconnected are
//! dropped, never queued.

pub mod client;
pub mod config;
pub mod error;
pub mod host;
pub mod protocol;
pub mod transport;
pub mod transports;

mod reconnect;

// Re-export primary types for ergonomic imports.
pub use client::{BridgeClient, ConnectionState};
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use host::{main_task_channel, HostServer, MainTask, OnlinePlayer};
pub use protocol::{ClientMessage, ServerMessage};
pub use transport::{Connector, Transport};

#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnector, WebSocketTransport};
