//! Transport abstraction for the bridge protocol.
//!
//! The bridge speaks flat JSON text frames over any bidirectional
//! connection. [`Transport`] is one live connection; [`Connector`] knows how
//! to open a fresh one, which is what the reconnection logic needs — every
//! retry mints a brand-new transport rather than reviving a dead one.
//!
//! Frame delimitation is the transport's problem (WebSocket frames,
//! length-prefixed TCP, whatever); one `send`/`recv` is one complete frame.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BridgeError;

/// A bidirectional text frame transport to the relay server.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) **MUST** be cancel-safe: it runs inside
/// `tokio::select!` in the session loop, and a cancelled call must not lose
/// a frame. Channel-backed implementations are naturally cancel-safe.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send one JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::TransportSend`] if the frame could not be
    /// written (connection broken, buffer gone).
    async fn send(&mut self, message: String) -> Result<(), BridgeError>;

    /// Receive the next JSON text frame.
    ///
    /// Returns:
    /// - `Some(Ok(text))` — a complete frame arrived
    /// - `Some(Err(e))` — the transport failed
    /// - `None` — the connection closed cleanly
    async fn recv(&mut self) -> Option<Result<String, BridgeError>>;

    /// Close the connection gracefully. Must be idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails; resources are
    /// released regardless.
    async fn close(&mut self) -> Result<(), BridgeError>;
}

/// A factory for [`Transport`] connections.
///
/// The client calls [`connect`](Connector::connect) once per attempt: on
/// startup, on the fixed-delay retry after an initiation failure, and on
/// every exponential reconnect after a session dies. Implement this for
/// test doubles to script whole connection lifetimes.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The transport type this connector produces.
    type Transport: Transport;

    /// Open a new connection to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::TransportOpen`] (or [`BridgeError::Io`]) when
    /// the connection cannot be established. The caller treats any error
    /// here as an initiation failure, never as a session close.
    async fn connect(&self, endpoint: &str) -> Result<Self::Transport, BridgeError>;
}

#[async_trait]
impl<C: Connector> Connector for Arc<C> {
    type Transport = C::Transport;

    async fn connect(&self, endpoint: &str) -> Result<Self::Transport, BridgeError> {
        C::connect(self, endpoint).await
    }
}
