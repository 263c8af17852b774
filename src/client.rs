//! The bridge client: connection lifecycle, auth handshake, inbound
//! dispatch, and reconnection.
//!
//! [`BridgeClient`] is a thin handle owned by the host plugin. It queues
//! outbound envelopes to a background connection task over an unbounded
//! channel; the task owns the live [`Transport`], multiplexes send/receive
//! with `tokio::select!`, and re-dials through its [`Connector`] whenever a
//! session dies.
//!
//! # Example
//!
//! ```rust,ignore
//! let (main_tx, mut main_rx) = main_task_channel(64);
//! let config = BridgeConfig::new("ws://localhost:8080").with_auth_token("secret");
//! let mut client = BridgeClient::start(WebSocketConnector::new(), config, host, main_tx)?;
//!
//! // from the host's event pipeline:
//! client.relay_chat("Alice", "hello from the game");
//!
//! // each simulation tick, on the main thread:
//! while let Ok(task) = main_rx.try_recv() {
//!     task();
//! }
//! ```

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::host::{HostServer, MainTask};
use crate::protocol::{ClientMessage, ServerMessage, AUTH_STATUS_SUCCESS};
use crate::reconnect::{ReconnectPolicy, MAX_ATTEMPTS};
use crate::transport::{Connector, Transport};

/// Fixed delay before retrying a connection that failed to initiate.
/// Distinct from the exponential reconnection policy, which only engages
/// once a connection has been open and later closes.
const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(10);

// ── Connection state ────────────────────────────────────────────────

/// Lifecycle state of the relay connection.
///
/// Mutated only by the connection task (and by shutdown); read by every
/// outbound adapter before it queues a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// No transport exists.
    Disconnected = 0,
    /// A connect attempt is in flight.
    Connecting = 1,
    /// The transport is open; authentication (if required) is pending.
    Open = 2,
    /// The transport is open and inbound application traffic is trusted.
    Authenticated = 3,
    /// Shutdown in progress.
    Closing = 4,
}

impl ConnectionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Connecting,
            2 => Self::Open,
            3 => Self::Authenticated,
            4 => Self::Closing,
            _ => Self::Disconnected,
        }
    }

    /// Whether outbound envelopes may be sent in this state.
    pub fn is_sendable(self) -> bool {
        matches!(self, Self::Open | Self::Authenticated)
    }
}

/// State shared between the handle and the connection task. Plain scalar
/// writes from the task, reads from the host thread before each send.
struct SharedState {
    state: AtomicU8,
}

impl SharedState {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
        }
    }

    fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

// ── Client handle ───────────────────────────────────────────────────

/// Handle to the bridge connection, owned by the host plugin.
///
/// The outbound adapters ([`relay_chat`](Self::relay_chat),
/// [`relay_join`](Self::relay_join), [`relay_leave`](Self::relay_leave))
/// never block and never fail: when the connection is not in a sendable
/// state they log a warning and drop the message. There is no outbound
/// queue across connections — what cannot be sent now is gone.
pub struct BridgeClient {
    /// Outbound envelopes to the connection task.
    cmd_tx: mpsc::UnboundedSender<ClientMessage>,
    /// Connection state shared with the task.
    state: Arc<SharedState>,
    /// Host collaborator, consulted for live counts at event time.
    host: Arc<dyn HostServer>,
    /// Immutable configuration snapshot.
    config: BridgeConfig,
    /// The background connection task.
    task: Option<tokio::task::JoinHandle<()>>,
    /// Signals the connection task to shut down gracefully.
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl BridgeClient {
    /// Start the bridge: spawn the connection task and return the handle.
    ///
    /// `main_tasks` is the bounded queue of deferred closures the host
    /// drains once per simulation tick; inbound chat broadcasts go through
    /// it because game-world mutation must not happen on the network task.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] when the endpoint is empty. Nothing
    /// is spawned and no retry is scheduled in that case.
    pub fn start<C: Connector>(
        connector: C,
        config: BridgeConfig,
        host: Arc<dyn HostServer>,
        main_tasks: mpsc::Sender<MainTask>,
    ) -> Result<Self> {
        if config.endpoint.is_empty() {
            warn!("relay endpoint is not configured, bridge disabled");
            return Err(BridgeError::Config("relay endpoint is not configured".into()));
        }

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let state = Arc::new(SharedState::new());

        let task = tokio::spawn(connection_task(
            connector,
            config.clone(),
            Arc::clone(&host),
            main_tasks,
            cmd_rx,
            Arc::clone(&state),
            shutdown_rx,
        ));

        Ok(Self {
            cmd_tx,
            state,
            host,
            config,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
        })
    }

    // ── Outbound event adapters ─────────────────────────────────────

    /// Relay an in-game chat line to Discord.
    pub fn relay_chat(&self, username: &str, message: &str) {
        if !self.check_sendable("chat") {
            return;
        }
        if self.config.log_console {
            info!(%username, "relaying chat to Discord");
        }
        self.queue(ClientMessage::Chat {
            username: username.to_string(),
            content: message.to_string(),
        });
    }

    /// Relay a player-join presence event.
    pub fn relay_join(&self, username: &str) {
        if !self.check_sendable("player_join") {
            return;
        }
        if self.config.log_console {
            info!(%username, "relaying join notification to Discord");
        }
        self.queue(ClientMessage::PlayerJoin {
            username: username.to_string(),
            online: self.host.online_count(),
            max: self.host.max_players(),
        });
    }

    /// Relay a player-leave presence event.
    ///
    /// The departing player is still counted by the host when this fires,
    /// so the reported `online` is decremented by one.
    pub fn relay_leave(&self, username: &str) {
        if !self.check_sendable("player_leave") {
            return;
        }
        if self.config.log_console {
            info!(%username, "relaying leave notification to Discord");
        }
        self.queue(ClientMessage::PlayerLeave {
            username: username.to_string(),
            online: self.host.online_count().saturating_sub(1),
            max: self.host.max_players(),
        });
    }

    // ── State accessors ─────────────────────────────────────────────

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Whether the transport is open (authenticated or not).
    pub fn is_connected(&self) -> bool {
        self.state.get().is_sendable()
    }

    /// Whether inbound application traffic is currently trusted.
    pub fn is_authenticated(&self) -> bool {
        self.state.get() == ConnectionState::Authenticated
    }

    // ── Shutdown ────────────────────────────────────────────────────

    /// Shut the bridge down: close the transport, cancel any pending
    /// reconnect, and stop the connection task. Idempotent; does not wait
    /// for in-flight sends to flush.
    pub async fn shutdown(&mut self) {
        debug!("BridgeClient: shutdown requested");
        self.state.set(ConnectionState::Closing);

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        // Await the connection task with a timeout, then abort it so it
        // cannot detach and keep running on a dead handle.
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.config.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("connection task terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("connection task did not exit within timeout; aborting");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("connection task aborted: {join_err}");
                    }
                }
            }
        }

        self.state.set(ConnectionState::Disconnected);
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn check_sendable(&self, kind: &str) -> bool {
        let state = self.state.get();
        if state.is_sendable() {
            true
        } else {
            warn!(%kind, ?state, "dropping outbound message: bridge not connected");
            false
        }
    }

    fn queue(&self, msg: ClientMessage) {
        if self.cmd_tx.send(msg).is_err() {
            warn!("bridge connection task is gone, message dropped");
        }
    }
}

impl std::fmt::Debug for BridgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeClient")
            .field("state", &self.state.get())
            .field("endpoint", &self.config.endpoint)
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for BridgeClient {
    fn drop(&mut self) {
        // `Drop` is synchronous, so the graceful path (which awaits
        // `transport.close()`) is unavailable. Abort the task instead; the
        // connection simply drops on the floor.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Connection task ─────────────────────────────────────────────────

/// Why a session ended.
enum SessionEnd {
    /// Shutdown was requested or every handle was dropped. Do not reconnect.
    Shutdown,
    /// The connection closed or failed for any other reason, locally or
    /// remotely. Enters the reconnection policy.
    Closed,
}

/// What the dispatcher wants done after one inbound frame.
enum Flow {
    Continue,
    Close,
}

/// Owns the transport for the client's whole lifetime: dials, runs a
/// session until it dies, applies the reconnection policy, repeats.
async fn connection_task<C: Connector>(
    connector: C,
    config: BridgeConfig,
    host: Arc<dyn HostServer>,
    main_tasks: mpsc::Sender<MainTask>,
    mut cmd_rx: mpsc::UnboundedReceiver<ClientMessage>,
    state: Arc<SharedState>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    debug!(endpoint = %config.endpoint, "bridge connection task started");

    let mut policy = ReconnectPolicy::new();
    let mut ever_opened = false;

    loop {
        state.set(ConnectionState::Connecting);
        let connect_result = tokio::select! {
            result = connector.connect(&config.endpoint) => result,
            _ = &mut shutdown_rx => {
                debug!("shutdown during connect attempt");
                break;
            }
        };
        let mut transport = match connect_result {
            Ok(transport) => transport,
            Err(e) => {
                state.set(ConnectionState::Disconnected);
                if ever_opened {
                    // A failed reconnect counts like another close.
                    error!(error = %e, "reconnect attempt failed");
                    if backoff_or_give_up(&mut policy, &mut shutdown_rx).await {
                        continue;
                    }
                    break;
                }
                error!(error = %e, "failed to open relay connection");
                tokio::select! {
                    () = tokio::time::sleep(INITIAL_RETRY_DELAY) => continue,
                    _ = &mut shutdown_rx => break,
                }
            }
        };

        // Open: reset the attempt budget, authenticate, announce ourselves.
        ever_opened = true;
        info!("relay connection established");
        state.set(ConnectionState::Open);
        policy.reset();

        if config.auth_required() {
            let auth = ClientMessage::Auth {
                token: config.auth_token.clone(),
            };
            if let Err(e) = send_frame(&mut transport, &auth).await {
                error!(error = %e, "failed to send auth envelope");
            }
        } else {
            state.set(ConnectionState::Authenticated);
        }

        // server_info goes out regardless of authentication state.
        let server_info = ClientMessage::ServerInfo {
            name: host.server_name(),
            version: host.server_version(),
            online: host.online_count(),
            max: host.max_players(),
        };
        if let Err(e) = send_frame(&mut transport, &server_info).await {
            error!(error = %e, "failed to send server_info envelope");
        }

        let end = run_session(
            &mut transport,
            &mut cmd_rx,
            &mut shutdown_rx,
            &config,
            &host,
            &main_tasks,
            &state,
        )
        .await;

        state.set(ConnectionState::Disconnected);

        // No delivery guarantee: anything queued while the session was
        // dying is dropped, not carried into the next connection.
        while cmd_rx.try_recv().is_ok() {}

        match end {
            SessionEnd::Shutdown => break,
            SessionEnd::Closed => {
                if !backoff_or_give_up(&mut policy, &mut shutdown_rx).await {
                    break;
                }
            }
        }
    }

    state.set(ConnectionState::Disconnected);
    debug!("bridge connection task exited");
}

/// Wait out the next reconnect delay. Returns `false` when the budget is
/// exhausted or shutdown arrived during the wait.
async fn backoff_or_give_up(
    policy: &mut ReconnectPolicy,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> bool {
    match policy.next_delay() {
        Ok(delay) => {
            info!(
                attempt = policy.attempts(),
                max_attempts = MAX_ATTEMPTS,
                delay_secs = delay.as_secs(),
                "scheduling reconnect"
            );
            tokio::select! {
                () = tokio::time::sleep(delay) => true,
                _ = &mut *shutdown_rx => {
                    debug!("shutdown during reconnect wait");
                    false
                }
            }
        }
        Err(err) => {
            error!(error = %err, "not reconnecting; restart the bridge to try again");
            false
        }
    }
}

/// Multiplex one live connection until it dies or shutdown arrives.
async fn run_session<T: Transport>(
    transport: &mut T,
    cmd_rx: &mut mpsc::UnboundedReceiver<ClientMessage>,
    shutdown_rx: &mut oneshot::Receiver<()>,
    config: &BridgeConfig,
    host: &Arc<dyn HostServer>,
    main_tasks: &mpsc::Sender<MainTask>,
    state: &SharedState,
) -> SessionEnd {
    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(msg) => {
                    if let Err(e) = send_frame(transport, &msg).await {
                        error!(error = %e, "outbound send failed, dropping connection");
                        return SessionEnd::Closed;
                    }
                }
                None => {
                    debug!("all handles dropped, closing connection");
                    let _ = transport.close().await;
                    return SessionEnd::Shutdown;
                }
            },

            _ = &mut *shutdown_rx => {
                debug!("shutdown signal received");
                let _ = transport.close().await;
                return SessionEnd::Shutdown;
            }

            incoming = transport.recv() => match incoming {
                Some(Ok(text)) => {
                    if let Flow::Close =
                        dispatch_frame(&text, transport, config, host, main_tasks, state).await
                    {
                        let _ = transport.close().await;
                        return SessionEnd::Closed;
                    }
                }
                Some(Err(e)) => {
                    error!(error = %e, "relay connection failed");
                    return SessionEnd::Closed;
                }
                None => {
                    info!("relay closed the connection");
                    return SessionEnd::Closed;
                }
            },
        }
    }
}

/// Classify one decoded frame and route it.
async fn dispatch_frame<T: Transport>(
    text: &str,
    transport: &mut T,
    config: &BridgeConfig,
    host: &Arc<dyn HostServer>,
    main_tasks: &mpsc::Sender<MainTask>,
    state: &SharedState,
) -> Flow {
    let msg = match ServerMessage::decode(text) {
        Ok(msg) => msg,
        Err(e) => {
            // One bad frame never takes the connection down.
            error!(error = %e, raw = text, "discarding undecodable frame");
            return Flow::Continue;
        }
    };

    match msg {
        ServerMessage::Auth { status, message } => {
            if status == AUTH_STATUS_SUCCESS {
                state.set(ConnectionState::Authenticated);
                info!("authenticated with relay server");
                Flow::Continue
            } else {
                let err = BridgeError::AuthRejected(message.unwrap_or_default());
                error!(error = %err, "closing connection");
                Flow::Close
            }
        }

        // Application traffic is untrusted until the relay confirms our
        // secret. Discard silently; this is expected during the handshake.
        _ if config.auth_required() && state.get() != ConnectionState::Authenticated => {
            Flow::Continue
        }

        ServerMessage::Chat { username, content } => {
            let line = format!("{}{}: {}", config.chat_prefix, username, content);
            if config.log_console {
                info!(%username, "broadcasting Discord chat in game");
            }
            // World mutation must happen on the host's simulation thread;
            // we only enqueue, never block.
            let host = Arc::clone(host);
            match main_tasks.try_send(Box::new(move || host.broadcast(&line))) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("main task queue full, dropping relay chat");
                }
                Err(TrySendError::Closed(_)) => {
                    warn!("main task queue closed, dropping relay chat");
                }
            }
            Flow::Continue
        }

        ServerMessage::RequestPlayers => {
            let players = host
                .online_players()
                .into_iter()
                .map(|p| (p.id, p.name))
                .collect();
            let reply = ClientMessage::PlayerList { players };
            if let Err(e) = send_frame(transport, &reply).await {
                error!(error = %e, "failed to send roster reply");
                return Flow::Close;
            }
            Flow::Continue
        }

        ServerMessage::Unknown => Flow::Continue,
    }
}

/// Encode and write one outbound envelope.
async fn send_frame<T: Transport>(transport: &mut T, msg: &ClientMessage) -> Result<()> {
    let json = msg.encode()?;
    transport.send(json).await
}

// ── Tests ───────────────────────────────────────────────────────────
