//! Error types for the bridge client.

use thiserror::Error;

/// Errors that can occur when using the bridge client.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The configuration is missing or invalid (e.g. no endpoint set).
    /// Fatal to the current connect attempt; no retry is scheduled.
    #[error("configuration error: {0}")]
    Config(String),

    /// Failed to open a connection to the relay server.
    #[error("transport open error: {0}")]
    TransportOpen(String),

    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to decode an inbound frame. The frame is discarded;
    /// the connection survives.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The relay server rejected our credentials. Fatal to the current
    /// connection, which is closed and re-enters the reconnection policy.
    #[error("authentication rejected: {0}")]
    AuthRejected(String),

    /// All reconnect attempts have been used. Terminal until the client
    /// is restarted.
    #[error("reconnect attempts exhausted")]
    RetryExhausted,

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for bridge client operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
