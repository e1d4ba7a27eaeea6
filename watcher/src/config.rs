//! Watcher configuration.
//!
//! Provides configuration options for the watch service, loadable from the
//! process environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tickstream_sdk::ws::config::{
    DEFAULT_BASE_URL, DEFAULT_HEARTBEAT_SECS, DEFAULT_MAX_RECONNECT_ATTEMPTS,
    DEFAULT_RECONNECT_INTERVAL_MS,
};
use tickstream_sdk::ws::WsConfig;
use tickstream_sdk::{SdkError, Symbol};

/// Server base URL.
pub const ENV_URL: &str = "TICKSTREAM_URL";
/// Client id; a random one is used when unset.
pub const ENV_CLIENT_ID: &str = "TICKSTREAM_CLIENT_ID";
/// Comma-separated watch-list.
pub const ENV_SYMBOLS: &str = "TICKSTREAM_SYMBOLS";
/// Reconnect attempt cap.
pub const ENV_MAX_RECONNECTS: &str = "TICKSTREAM_MAX_RECONNECTS";
/// Reconnect delay in milliseconds.
pub const ENV_RECONNECT_INTERVAL_MS: &str = "TICKSTREAM_RECONNECT_INTERVAL_MS";
/// Heartbeat period in seconds; `0` disables it.
pub const ENV_HEARTBEAT_SECS: &str = "TICKSTREAM_HEARTBEAT_SECS";

/// Configuration for the watch service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Server base URL.
    pub url: String,

    /// Client id (random when `None`).
    pub client_id: Option<String>,

    /// Symbols to watch.
    pub symbols: Vec<String>,

    /// Maximum consecutive reconnect attempts.
    pub max_reconnect_attempts: u32,

    /// Reconnect delay in milliseconds.
    pub reconnect_interval_ms: u64,

    /// Heartbeat period in seconds (0 = disabled).
    pub heartbeat_secs: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BASE_URL.to_string(),
            client_id: None,
            symbols: Vec::new(),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_interval_ms: DEFAULT_RECONNECT_INTERVAL_MS,
            heartbeat_secs: DEFAULT_HEARTBEAT_SECS,
        }
    }
}

impl WatcherConfig {
    /// Creates a new configuration with the given watch-list.
    #[must_use]
    pub fn with_symbols(symbols: Vec<String>) -> Self {
        Self {
            symbols,
            ..Default::default()
        }
    }

    /// Sets the server URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the client id.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the reconnect budget.
    #[must_use]
    pub fn with_reconnect(mut self, max_attempts: u32, interval_ms: u64) -> Self {
        self.max_reconnect_attempts = max_attempts;
        self.reconnect_interval_ms = interval_ms;
        self
    }

    /// Sets the heartbeat period in seconds.
    #[must_use]
    pub fn with_heartbeat_secs(mut self, secs: u64) -> Self {
        self.heartbeat_secs = secs;
        self
    }

    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through `lookup`, falling back to defaults for
    /// unset variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_URL) {
            config.url = url;
        }
        config.client_id = lookup(ENV_CLIENT_ID).filter(|id| !id.trim().is_empty());
        if let Some(symbols) = lookup(ENV_SYMBOLS) {
            config.symbols = symbols
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(value) = lookup(ENV_MAX_RECONNECTS) {
            config.max_reconnect_attempts = parse_number(ENV_MAX_RECONNECTS, &value)?;
        }
        if let Some(value) = lookup(ENV_RECONNECT_INTERVAL_MS) {
            config.reconnect_interval_ms = parse_number(ENV_RECONNECT_INTERVAL_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_HEARTBEAT_SECS) {
            config.heartbeat_secs = parse_number(ENV_HEARTBEAT_SECS, &value)?;
        }

        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl);
        }

        if self.symbols.is_empty() {
            return Err(ConfigError::NoSymbols);
        }

        if self.reconnect_interval_ms == 0 {
            return Err(ConfigError::InvalidReconnectInterval);
        }

        self.parse_symbols()?;
        self.ws_config()
            .validate()
            .map_err(|e| ConfigError::InvalidClient(e.to_string()))
    }

    /// Parses the watch-list.
    ///
    /// # Errors
    ///
    /// Returns an error if any symbol is invalid.
    pub fn parse_symbols(&self) -> Result<Vec<Symbol>, ConfigError> {
        self.symbols
            .iter()
            .map(|s| Symbol::new(s).map_err(ConfigError::from))
            .collect()
    }

    /// Builds the streaming client configuration.
    #[must_use]
    pub fn ws_config(&self) -> WsConfig {
        let mut ws = WsConfig::new(self.url.clone())
            .with_max_reconnect_attempts(self.max_reconnect_attempts)
            .with_reconnect_interval(Duration::from_millis(self.reconnect_interval_ms));
        if let Some(client_id) = &self.client_id {
            ws = ws.with_client_id(client_id.clone());
        }
        if self.heartbeat_secs == 0 {
            ws.without_heartbeat()
        } else {
            ws.with_heartbeat_interval(Duration::from_secs(self.heartbeat_secs))
        }
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: value.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Empty server URL.
    #[error("url cannot be empty")]
    EmptyUrl,

    /// Empty watch-list.
    #[error("at least one symbol is required")]
    NoSymbols,

    /// Zero reconnect interval.
    #[error("reconnect_interval_ms must be > 0")]
    InvalidReconnectInterval,

    /// Environment variable with a non-numeric value.
    #[error("{var} must be a valid number, got {value:?}")]
    InvalidNumber {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },

    /// Invalid watch-list entry.
    #[error(transparent)]
    InvalidSymbol(#[from] SdkError),

    /// Client configuration rejected.
    #[error("invalid client configuration: {0}")]
    InvalidClient(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = WatcherConfig::default();
        assert_eq!(config.url, "ws://localhost:8000");
        assert!(config.symbols.is_empty());
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.reconnect_interval_ms, 5_000);
        assert_eq!(config.heartbeat_secs, 30);
    }

    #[test]
    fn test_config_builder() {
        let config = WatcherConfig::with_symbols(vec!["AAPL".to_string()])
            .with_url("wss://quotes.example.com")
            .with_client_id("desk-1")
            .with_reconnect(3, 250)
            .with_heartbeat_secs(0);

        assert_eq!(config.url, "wss://quotes.example.com");
        assert_eq!(config.client_id.as_deref(), Some("desk-1"));
        assert_eq!(config.max_reconnect_attempts, 3);
        assert_eq!(config.reconnect_interval_ms, 250);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = WatcherConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config, WatcherConfig::default());
    }

    #[test]
    fn test_from_lookup_reads_all_variables() {
        let config = WatcherConfig::from_lookup(lookup(&[
            (ENV_URL, "http://quotes.internal:9000"),
            (ENV_CLIENT_ID, "watcher"),
            (ENV_SYMBOLS, " aapl, MSFT ,,goog "),
            (ENV_MAX_RECONNECTS, "7"),
            (ENV_RECONNECT_INTERVAL_MS, "1500"),
            (ENV_HEARTBEAT_SECS, "0"),
        ]))
        .expect("config");

        assert_eq!(config.url, "http://quotes.internal:9000");
        assert_eq!(config.client_id.as_deref(), Some("watcher"));
        assert_eq!(config.symbols, vec!["aapl", "MSFT", "goog"]);
        assert_eq!(config.max_reconnect_attempts, 7);
        assert_eq!(config.reconnect_interval_ms, 1500);
        assert_eq!(config.heartbeat_secs, 0);
    }

    #[test]
    fn test_from_lookup_rejects_bad_number() {
        let err = WatcherConfig::from_lookup(lookup(&[(ENV_MAX_RECONNECTS, "many")]))
            .expect_err("invalid");
        assert!(matches!(
            err,
            ConfigError::InvalidNumber {
                var: ENV_MAX_RECONNECTS,
                ..
            }
        ));
        assert!(err.to_string().contains("TICKSTREAM_MAX_RECONNECTS"));
    }

    #[test]
    fn test_blank_client_id_is_ignored() {
        let config = WatcherConfig::from_lookup(lookup(&[(ENV_CLIENT_ID, "  ")])).expect("config");
        assert!(config.client_id.is_none());
    }

    #[test]
    fn test_validate_requires_symbols() {
        let config = WatcherConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::NoSymbols)));
    }

    #[test]
    fn test_validate_rejects_bad_symbol() {
        let config = WatcherConfig::with_symbols(vec!["AAPL".to_string(), "NOT VALID".to_string()]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSymbol(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = WatcherConfig::with_symbols(vec!["AAPL".to_string()]).with_url("ftp://x");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidClient(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = WatcherConfig::with_symbols(vec!["AAPL".to_string()]).with_reconnect(3, 0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidReconnectInterval)
        ));
    }

    #[test]
    fn test_ws_config_mapping() {
        let ws = WatcherConfig::with_symbols(vec!["AAPL".to_string()])
            .with_client_id("desk-1")
            .with_reconnect(2, 100)
            .with_heartbeat_secs(0)
            .ws_config();

        assert_eq!(ws.client_id, "desk-1");
        assert_eq!(ws.max_reconnect_attempts, 2);
        assert_eq!(ws.reconnect_interval, Duration::from_millis(100));
        assert!(ws.heartbeat_interval.is_none());
        assert_eq!(ws.endpoint_url(), "ws://localhost:8000/api/v1/ws/desk-1");
    }

    #[test]
    fn test_config_serialize() {
        let config = WatcherConfig::with_symbols(vec!["AAPL".to_string()]);
        let json = serde_json::to_value(&config).expect("serialize");
        assert_eq!(json["symbols"][0], "AAPL");
        assert!(json["client_id"].is_null());
    }
}
