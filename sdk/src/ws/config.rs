//! WebSocket configuration.
//!
//! Provides configuration options for the streaming client, including the
//! reconnection policy applied after an abnormal close.

use std::time::Duration;

use super::error::WsError;

/// Default server base URL.
pub const DEFAULT_BASE_URL: &str = "ws://localhost:8000";

/// Path prefix of the streaming endpoint; the client id is appended.
pub const STREAM_PATH: &str = "/api/v1/ws";

/// Default maximum number of consecutive reconnect attempts.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Default delay between reconnect attempts in milliseconds.
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 5_000;

/// Default heartbeat interval in seconds.
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Delay schedule between reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconnectPolicy {
    /// Constant delay equal to the configured reconnect interval.
    #[default]
    Fixed,

    /// Reconnect interval doubled per attempt, capped at `max_delay`.
    Exponential {
        /// Upper bound for the delay.
        max_delay: Duration,
    },
}

impl ReconnectPolicy {
    /// Returns the delay before the reconnect that follows `attempt`
    /// previous consecutive failures.
    #[must_use]
    pub fn delay(&self, interval: Duration, attempt: u32) -> Duration {
        match self {
            Self::Fixed => interval,
            Self::Exponential { max_delay } => {
                let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
                interval.saturating_mul(factor).min(*max_delay)
            }
        }
    }
}

/// WebSocket configuration.
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Server base URL (`ws://`, `wss://`, `http://` or `https://`).
    pub base_url: String,

    /// Opaque client identifier appended to the endpoint path.
    pub client_id: String,

    /// Whether to reconnect after an abnormal close.
    pub auto_reconnect: bool,

    /// Maximum consecutive reconnect attempts.
    pub max_reconnect_attempts: u32,

    /// Base delay between reconnect attempts.
    pub reconnect_interval: Duration,

    /// Delay schedule.
    pub reconnect_policy: ReconnectPolicy,

    /// Application-level ping interval (None = disabled).
    pub heartbeat_interval: Option<Duration>,

    /// Upper bound for a single connect attempt.
    pub connect_timeout: Duration,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client_id: uuid::Uuid::new_v4().to_string(),
            auto_reconnect: true,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_interval: Duration::from_millis(DEFAULT_RECONNECT_INTERVAL_MS),
            reconnect_policy: ReconnectPolicy::Fixed,
            heartbeat_interval: Some(Duration::from_secs(DEFAULT_HEARTBEAT_SECS)),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl WsConfig {
    /// Creates a new configuration with the given base URL and a random
    /// client id.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Sets the client id.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Enables or disables automatic reconnection.
    #[must_use]
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Sets the maximum reconnection attempts.
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Sets the reconnect interval.
    #[must_use]
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Sets the reconnect delay policy.
    #[must_use]
    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect_policy = policy;
        self
    }

    /// Sets the heartbeat interval.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = Some(interval);
        self
    }

    /// Disables the application-level heartbeat.
    #[must_use]
    pub fn without_heartbeat(mut self) -> Self {
        self.heartbeat_interval = None;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Returns the full streaming endpoint URL.
    ///
    /// `http` schemes are mapped to their websocket counterparts.
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{}{}/{}", base, STREAM_PATH, self.client_id)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), WsError> {
        if self.base_url.is_empty() {
            return Err(WsError::InvalidConfig(
                "base_url cannot be empty".to_string(),
            ));
        }

        let scheme_ok = ["ws://", "wss://", "http://", "https://"]
            .iter()
            .any(|scheme| self.base_url.starts_with(scheme));
        if !scheme_ok {
            return Err(WsError::InvalidConfig(
                "base_url must start with ws://, wss://, http:// or https://".to_string(),
            ));
        }

        if self.client_id.is_empty() {
            return Err(WsError::InvalidConfig(
                "client_id cannot be empty".to_string(),
            ));
        }

        if self.client_id.contains(['/', '?', '#']) {
            return Err(WsError::InvalidConfig(
                "client_id cannot contain '/', '?' or '#'".to_string(),
            ));
        }

        if self.heartbeat_interval.is_some_and(|d| d.is_zero()) {
            return Err(WsError::InvalidConfig(
                "heartbeat_interval must be > 0".to_string(),
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(WsError::InvalidConfig(
                "connect_timeout must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}
