//! Wire-compatible envelope types for the bridge protocol.
//!
//! Every frame on the wire is one flat JSON object with a string `type`
//! discriminator, matching what the relay server parses. Messages are split
//! by direction: [`ClientMessage`] is everything this client sends,
//! [`ServerMessage`] is everything it receives. Envelopes are immutable —
//! constructed fresh per send, never touched after encoding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{BridgeError, Result};

/// Unique identifier for an online player.
pub type PlayerId = Uuid;

/// The `status` value the relay sends when authentication succeeds.
pub const AUTH_STATUS_SUCCESS: &str = "success";

// ── Outbound messages ───────────────────────────────────────────────

/// Message types sent from the bridge client to the relay server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Present the shared secret immediately after the connection opens.
    Auth { token: String },
    /// Announce host identity and capacity on open. Sent unconditionally,
    /// before any auth result arrives.
    ServerInfo {
        name: String,
        version: String,
        online: u32,
        max: u32,
    },
    /// Relay an in-game chat line outward.
    Chat { username: String, content: String },
    /// A player joined the game server.
    PlayerJoin {
        username: String,
        online: u32,
        max: u32,
    },
    /// A player left the game server. `online` is pre-decremented: the
    /// departing player is still in the host roster when this fires.
    PlayerLeave {
        username: String,
        online: u32,
        max: u32,
    },
    /// Roster reply: stable player id → display name.
    /// `BTreeMap` keeps the encoded form deterministic.
    PlayerList { players: BTreeMap<PlayerId, String> },
}

impl ClientMessage {
    /// Encode this envelope to its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Decode`] if serialization fails, which would
    /// indicate a bug rather than bad input.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(BridgeError::from)
    }
}

// ── Inbound messages ────────────────────────────────────────────────

/// Message types received from the relay server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Authentication result. `message` accompanies a failure.
    Auth {
        status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// External chat to be broadcast into the game world.
    Chat { username: String, content: String },
    /// The relay wants the current roster.
    RequestPlayers,
    /// Any frame whose `type` is missing, empty, or unrecognized.
    /// Dispatch treats this as a silent no-op, not an error.
    Unknown,
}

impl ServerMessage {
    /// Decode one wire frame.
    ///
    /// A frame that is not a JSON object fails with [`BridgeError::Decode`].
    /// A JSON object with a missing or unrecognized `type` decodes to
    /// [`ServerMessage::Unknown`]. A recognized `type` with a malformed
    /// payload fails with [`BridgeError::Decode`].
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(BridgeError::Decode(serde::de::Error::custom(
                "frame is not a JSON object",
            )));
        }
        match value.get("type").and_then(Value::as_str).unwrap_or("") {
            "auth" | "chat" | "request_players" => {
                serde_json::from_value(value).map_err(BridgeError::from)
            }
            _ => Ok(Self::Unknown),
        }
    }
}
