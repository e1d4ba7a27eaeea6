//! Main watch service.
//!
//! Subscribes the configured watch-list, opens the connection and logs every
//! quote and connection change until the shutdown future resolves.

use std::future::Future;
use std::sync::Arc;

use tickstream_sdk::ws::{ConnectionStatus, MarketDataClient, WsError, WsMetrics};
use tickstream_sdk::{QuoteRecord, Symbol};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::config::{ConfigError, WatcherConfig};

/// Watch service errors.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Streaming client failure.
    #[error("client error: {0}")]
    Client(#[from] WsError),
}

/// The watch service.
#[derive(Debug)]
pub struct WatchService {
    /// Configuration.
    config: WatcherConfig,

    /// Parsed watch-list.
    symbols: Vec<Symbol>,

    /// Streaming client.
    client: MarketDataClient,
}

impl WatchService {
    /// Creates a new watch service. Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: WatcherConfig) -> Result<Self, ServiceError> {
        config.validate()?;
        let symbols = config.parse_symbols()?;
        let client = MarketDataClient::new(config.ws_config())?;

        Ok(Self {
            config,
            symbols,
            client,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Returns the parsed watch-list.
    #[must_use]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Returns the streaming client.
    #[must_use]
    pub const fn client(&self) -> &MarketDataClient {
        &self.client
    }

    /// Returns the client metrics.
    #[must_use]
    pub fn metrics(&self) -> Arc<WsMetrics> {
        self.client.metrics()
    }

    /// Runs until `shutdown` resolves, then disconnects.
    ///
    /// # Errors
    ///
    /// Returns an error if the client worker stopped unexpectedly.
    pub async fn run<F>(&self, shutdown: F) -> Result<(), ServiceError>
    where
        F: Future<Output = ()>,
    {
        let mut tasks = JoinSet::new();
        for symbol in &self.symbols {
            tasks.spawn(log_quotes(symbol.clone(), self.client.watch_quote(symbol)));
        }
        tasks.spawn(log_status(self.client.status_changes()));

        self.client.subscribe(self.symbols.iter().map(Symbol::as_str))?;
        self.client.connect()?;
        info!(
            symbols = self.symbols.len(),
            client_id = %self.client.client_id(),
            "watch service started"
        );

        shutdown.await;

        info!("watch service stopping");
        self.client.disconnect()?;
        tasks.shutdown().await;

        for quote in self.client.quotes() {
            debug!(quote = %quote, "last quote");
        }
        info!(metrics = %self.client.metrics().snapshot(), "watch service stopped");
        Ok(())
    }
}

async fn log_quotes(symbol: Symbol, mut updates: watch::Receiver<Option<QuoteRecord>>) {
    while updates.changed().await.is_ok() {
        match updates.borrow_and_update().as_ref() {
            Some(quote) => info!(
                symbol = %quote.symbol,
                price = %quote.price,
                change = %quote.change,
                change_percent = %quote.change_percent,
                volume = %quote.volume,
                "quote"
            ),
            None => debug!(symbol = %symbol, "quote cleared"),
        }
    }
}

async fn log_status(mut changes: watch::Receiver<ConnectionStatus>) {
    while changes.changed().await.is_ok() {
        let status = changes.borrow_and_update().clone();
        if status.is_stopped() {
            if let Some(error) = &status.last_error {
                warn!(error = %error, "connection stopped");
                continue;
            }
        }
        info!(
            state = %status.state,
            reconnecting = status.reconnecting,
            attempt = status.attempt,
            "connection status"
        );
    }
}
