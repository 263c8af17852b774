//! Bridge configuration.
//!
//! Loaded once at startup and read-only for the plugin's lifetime. All
//! fields except the endpoint have working defaults, so a minimal TOML
//! source only needs one line:
//!
//! ```
//! use chat_bridge_client::BridgeConfig;
//!
//! let config: BridgeConfig = toml::from_str(r#"endpoint = "ws://localhost:8080""#).unwrap();
//! assert_eq!(config.chat_prefix, "&b[Discord] &f");
//! assert!(config.log_console);
//! ```

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_CHAT_PREFIX: &str = "&b[Discord] &f";

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration for a [`BridgeClient`](crate::BridgeClient).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Relay server endpoint, e.g. `ws://localhost:8080`. An empty endpoint
    /// makes [`BridgeClient::start`](crate::BridgeClient::start) fail with
    /// a configuration error instead of connecting.
    pub endpoint: String,
    /// Shared secret presented after the connection opens. Empty means the
    /// relay requires no authentication and the client treats itself as
    /// authenticated as soon as the connection is open.
    pub auth_token: String,
    /// Display prefix for chat relayed into the game, in `&`-style color
    /// codes. The host translates the codes when broadcasting.
    pub chat_prefix: String,
    /// Log every relayed message at info level. Lifecycle logging is
    /// unaffected by this toggle.
    pub log_console: bool,
    /// How long [`BridgeClient::shutdown`](crate::BridgeClient::shutdown)
    /// waits for the connection task before aborting it.
    pub shutdown_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            auth_token: String::new(),
            chat_prefix: DEFAULT_CHAT_PREFIX.to_string(),
            log_console: true,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl BridgeConfig {
    /// Configuration for `endpoint` with defaults everywhere else.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Set the shared secret.
    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = token.into();
        self
    }

    /// Set the chat display prefix.
    #[must_use]
    pub fn with_chat_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.chat_prefix = prefix.into();
        self
    }

    /// Enable or disable per-message console logging.
    #[must_use]
    pub fn with_log_console(mut self, log_console: bool) -> Self {
        self.log_console = log_console;
        self
    }

    /// Set the graceful shutdown timeout.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Whether a shared secret is configured, i.e. whether inbound
    /// application traffic requires a prior auth success.
    pub fn auth_required(&self) -> bool {
        !self.auth_token.is_empty()
    }
}
