//! WebSocket transport over `tokio-tungstenite`.
//!
//! [`WebSocketTransport`] carries the bridge's JSON frames as WebSocket text
//! messages; [`WebSocketConnector`] is the [`Connector`] the client uses to
//! open a fresh connection per attempt. Both `ws://` and `wss://` endpoints
//! work — TLS is handled by [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream).
//!
//! Only available with the `transport-websocket` feature (on by default).

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::BridgeError;
use crate::transport::{Connector, Transport};

/// The underlying WebSocket stream type.
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`Transport`] backed by one live WebSocket connection.
///
/// `recv` is cancel-safe: dropping its future mid-poll loses no frames, so
/// it is safe inside `tokio::select!`.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Open a WebSocket connection to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::TransportOpen`] when the endpoint is malformed
    /// or the connection is rejected.
    pub async fn connect(endpoint: &str) -> Result<Self, BridgeError> {
        tracing::debug!(endpoint = %endpoint, "opening WebSocket connection");

        let (stream, _response) = tokio_tungstenite::connect_async(endpoint)
            .await
            .map_err(|e| BridgeError::TransportOpen(e.to_string()))?;

        tracing::info!(endpoint = %endpoint, "WebSocket connection established");

        Ok(Self {
            stream,
            closed: false,
        })
    }

    /// Like [`connect`](Self::connect), but bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Timeout`] when the deadline elapses, or any
    /// error [`connect`](Self::connect) may return.
    pub async fn connect_with_timeout(
        endpoint: &str,
        timeout: Duration,
    ) -> Result<Self, BridgeError> {
        tokio::time::timeout(timeout, Self::connect(endpoint))
            .await
            .map_err(|_| BridgeError::Timeout)?
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), BridgeError> {
        if self.closed {
            return Err(BridgeError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| BridgeError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, BridgeError>> {
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    return Some(Err(BridgeError::TransportReceive(e.to_string())));
                }
                None => return None,
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(frame) => {
                    tracing::debug!(?frame, "received WebSocket close frame");
                    return None;
                }
                // tungstenite answers pings itself; pong needs nothing from us.
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Binary(_) => {
                    tracing::warn!("skipping unexpected binary WebSocket frame");
                }
                // Never produced by the read half; kept for exhaustiveness.
                Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), BridgeError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| BridgeError::TransportSend(e.to_string()))
    }
}

/// [`Connector`] producing [`WebSocketTransport`]s.
///
/// An optional per-attempt timeout guards against endpoints that accept TCP
/// but never finish the handshake.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector {
    connect_timeout: Option<Duration>,
}

impl WebSocketConnector {
    /// Connector with no handshake timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every connect attempt by `timeout`.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn connect(&self, endpoint: &str) -> Result<WebSocketTransport, BridgeError> {
        match self.connect_timeout {
            Some(timeout) => WebSocketTransport::connect_with_timeout(endpoint, timeout).await,
            None => WebSocketTransport::connect(endpoint).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    /// Start a local WebSocket server running `handler` on the first
    /// accepted connection; returns the endpoint to dial.
    async fn start_mock_relay<F, Fut>(handler: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn connect_fails_with_malformed_endpoint() {
        let err = WebSocketTransport::connect("not-a-url").await.unwrap_err();
        assert!(matches!(err, BridgeError::TransportOpen(_)));
    }

    #[tokio::test]
    async fn connect_fails_with_unreachable_host() {
        let err = WebSocketTransport::connect("ws://127.0.0.1:1")
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::TransportOpen(_)));
    }

    #[tokio::test]
    async fn recv_yields_text_frames_in_order() {
        let endpoint = start_mock_relay(|mut ws| async move {
            ws.send(Message::Text(r#"{"type":"request_players"}"#.into()))
                .await
                .unwrap();
            ws.send(Message::Text("second".into())).await.unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&endpoint).await.unwrap();
        assert_eq!(
            transport.recv().await.unwrap().unwrap(),
            r#"{"type":"request_players"}"#
        );
        assert_eq!(transport.recv().await.unwrap().unwrap(), "second");
    }

    #[tokio::test]
    async fn recv_returns_none_on_close_frame() {
        let endpoint = start_mock_relay(|mut ws| async move {
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&endpoint).await.unwrap();
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn recv_skips_binary_frames() {
        let endpoint = start_mock_relay(|mut ws| async move {
            ws.send(Message::Binary(vec![1, 2, 3].into())).await.unwrap();
            ws.send(Message::Text("after".into())).await.unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&endpoint).await.unwrap();
        assert_eq!(transport.recv().await.unwrap().unwrap(), "after");
    }

    #[tokio::test]
    async fn send_after_close_is_transport_closed() {
        let endpoint = start_mock_relay(|mut ws| async move {
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut transport = WebSocketTransport::connect(&endpoint).await.unwrap();
        transport.close().await.unwrap();
        // Idempotent close.
        transport.close().await.unwrap();

        let err = transport.send("late".to_string()).await.unwrap_err();
        assert!(matches!(err, BridgeError::TransportClosed));
    }

    #[tokio::test]
    async fn connector_honors_timeout() {
        // Non-routable TEST-NET address guarantees the handshake hangs.
        let connector =
            WebSocketConnector::new().with_connect_timeout(Duration::from_millis(50));
        let err = connector.connect("ws://192.0.2.1:1").await.unwrap_err();
        assert!(matches!(err, BridgeError::Timeout));
    }

    #[tokio::test]
    async fn send_round_trip_through_echo() {
        let endpoint = start_mock_relay(|mut ws| async move {
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                ws.send(Message::Text(text)).await.unwrap();
            }
            ws.close(None).await.unwrap();
        })
        .await;

        let connector = WebSocketConnector::new();
        let mut transport = connector.connect(&endpoint).await.unwrap();
        transport
            .send(r#"{"type":"chat","username":"a","content":"b"}"#.to_string())
            .await
            .unwrap();
        assert_eq!(
            transport.recv().await.unwrap().unwrap(),
            r#"{"type":"chat","username":"a","content":"b"}"#
        );
    }
}
