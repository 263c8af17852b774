#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Shared test utilities for bridge client integration tests.
//!
//! Provides a scripted [`MockConnector`]/[`MockTransport`] pair that can
//! play out whole connection lifetimes (open, frames, close, refuse), a
//! recording [`FakeHost`], and helpers for relay-side JSON frames.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use chat_bridge_client::{BridgeError, Connector, HostServer, OnlinePlayer, Transport};
use uuid::Uuid;

/// Scripted incoming frames for one connection. `Some(result)` delivers a
/// frame or a transport error; `None` signals a clean remote close; an
/// exhausted script leaves the connection open (recv pends forever).
pub type Script = Vec<Option<Result<String, BridgeError>>>;

// ── MockTransport ───────────────────────────────────────────────────

pub struct MockTransport {
    incoming: VecDeque<Option<Result<String, BridgeError>>>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicU32>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), BridgeError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, BridgeError>> {
        match self.incoming.pop_front() {
            Some(item) => item,
            // Script exhausted — stay open until the client hangs up.
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), BridgeError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ── MockConnector ───────────────────────────────────────────────────

/// Hands out one scripted [`MockTransport`] per connect attempt.
///
/// Once the scripts run out, further attempts either fail with a
/// transport-open error (`fail_when_empty`) or never complete.
pub struct MockConnector {
    scripts: StdMutex<VecDeque<Script>>,
    fail_when_empty: bool,
    connects: AtomicU32,
    /// Every frame sent by the client, across all connections, in order.
    pub sent: Arc<StdMutex<Vec<String>>>,
    /// Number of transports the client has closed.
    pub closed: Arc<AtomicU32>,
}

impl MockConnector {
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        Self::build(scripts, false)
    }

    /// Like [`new`](Self::new), but refuses connections once scripts run out.
    pub fn failing_when_empty(scripts: Vec<Script>) -> Arc<Self> {
        Self::build(scripts, true)
    }

    fn build(scripts: Vec<Script>, fail_when_empty: bool) -> Arc<Self> {
        Arc::new(Self {
            scripts: StdMutex::new(VecDeque::from(scripts)),
            fail_when_empty,
            connects: AtomicU32::new(0),
            sent: Arc::new(StdMutex::new(Vec::new())),
            closed: Arc::new(AtomicU32::new(0)),
        })
    }

    /// Connect attempts made so far.
    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    /// All frames sent so far, decoded from JSON for assertions.
    pub fn sent_frames(&self) -> Vec<serde_json::Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|s| serde_json::from_str(s).unwrap())
            .collect()
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&self, _endpoint: &str) -> Result<MockTransport, BridgeError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(script) => Ok(MockTransport {
                incoming: VecDeque::from(script),
                sent: Arc::clone(&self.sent),
                closed: Arc::clone(&self.closed),
            }),
            None if self.fail_when_empty => {
                Err(BridgeError::TransportOpen("connection refused".into()))
            }
            None => std::future::pending().await,
        }
    }
}

// ── FakeHost ────────────────────────────────────────────────────────

/// A game server stand-in that records broadcasts.
pub struct FakeHost {
    pub name: String,
    pub version: String,
    pub online: u32,
    pub max: u32,
    pub players: Vec<OnlinePlayer>,
    pub broadcasts: StdMutex<Vec<String>>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self {
            name: "TestServer".into(),
            version: "1.21".into(),
            online: 0,
            max: 20,
            players: Vec::new(),
            broadcasts: StdMutex::new(Vec::new()),
        }
    }
}

impl FakeHost {
    pub fn with_players(players: Vec<(Uuid, &str)>) -> Self {
        Self {
            online: players.len() as u32,
            players: players
                .into_iter()
                .map(|(id, name)| OnlinePlayer {
                    id,
                    name: name.to_string(),
                })
                .collect(),
            ..Default::default()
        }
    }
}

impl HostServer for FakeHost {
    fn server_name(&self) -> String {
        self.name.clone()
    }

    fn server_version(&self) -> String {
        self.version.clone()
    }

    fn online_count(&self) -> u32 {
        self.online
    }

    fn max_players(&self) -> u32 {
        self.max
    }

    fn online_players(&self) -> Vec<OnlinePlayer> {
        self.players.clone()
    }

    fn broadcast(&self, message: &str) {
        self.broadcasts.lock().unwrap().push(message.to_string());
    }
}

// ── Relay frame helpers ─────────────────────────────────────────────

pub fn auth_success_json() -> String {
    r#"{"type":"auth","status":"success"}"#.to_string()
}

pub fn auth_failure_json(message: &str) -> String {
    format!(r#"{{"type":"auth","status":"failure","message":"{message}"}}"#)
}

pub fn chat_json(username: &str, content: &str) -> String {
    format!(r#"{{"type":"chat","username":"{username}","content":"{content}"}}"#)
}

pub fn request_players_json() -> String {
    r#"{"type":"request_players"}"#.to_string()
}

// ── Polling helper ──────────────────────────────────────────────────

/// Poll `cond` every `interval_ms` until it holds, panicking after
/// `max_polls` attempts. Works under both real and paused time.
pub async fn wait_for<F: Fn() -> bool>(cond: F, interval_ms: u64, max_polls: u32) {
    for _ in 0..max_polls {
        if cond() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(interval_ms)).await;
    }
    panic!("condition not reached after {max_polls} polls");
}
