//! Market-data client facade.
//!
//! [`MarketDataClient`] is a cheap, cloneable handle to one streaming
//! connection. Construction spawns a worker task that owns the
//! [`ConnectionManager`] and the [`SubscriptionCoordinator`]; every handle
//! method either sends a command to that task or reads state the task
//! publishes through `watch` channels. Dropping the last handle closes the
//! socket and stops the worker.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, Instrument};

use super::config::WsConfig;
use super::connection::ConnectionManager;
use super::coordinator::{self, SubscriptionCoordinator, SubscriptionState};
use super::error::WsError;
use super::metrics::WsMetrics;
use super::state::ConnectionStatus;
use super::store::QuoteStore;
use crate::types::{QuoteRecord, Symbol};

/// Commands sent from handles to the worker.
#[derive(Debug)]
enum Command {
    Connect,
    Disconnect,
    SetDesired(BTreeSet<Symbol>),
    Subscribe(Vec<Symbol>),
    Unsubscribe(Vec<Symbol>),
}

/// Handle to a streaming market-data connection.
#[derive(Debug, Clone)]
pub struct MarketDataClient {
    config: Arc<WsConfig>,
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<ConnectionStatus>,
    desired: watch::Receiver<BTreeSet<Symbol>>,
    store: QuoteStore,
    metrics: Arc<WsMetrics>,
}

impl MarketDataClient {
    /// Creates a client and spawns its worker on the current runtime.
    ///
    /// The client starts idle; call [`connect`](Self::connect) to open the
    /// connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or no tokio runtime
    /// is running.
    pub fn new(config: WsConfig) -> Result<Self, WsError> {
        config.validate()?;
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|e| WsError::Runtime(e.to_string()))?;

        let metrics = Arc::new(WsMetrics::new());
        let store = QuoteStore::new();
        let (status_tx, status) = watch::channel(ConnectionStatus::default());
        let (commands, command_rx) = mpsc::unbounded_channel();

        let coordinator = SubscriptionCoordinator::new(store.clone(), Arc::clone(&metrics));
        let desired = coordinator.desired_receiver();
        let manager = ConnectionManager::new(config.clone(), status_tx, Arc::clone(&metrics));

        let span = tracing::info_span!("market_data", client_id = %config.client_id);
        runtime.spawn(run_worker(manager, coordinator, command_rx).instrument(span));

        Ok(Self {
            config: Arc::new(config),
            commands,
            status,
            desired,
            store,
            metrics,
        })
    }

    /// Creates a client for the given base URL with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or no tokio runtime is running.
    pub fn with_url(url: impl Into<String>) -> Result<Self, WsError> {
        Self::new(WsConfig::new(url))
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &WsConfig {
        &self.config
    }

    /// Returns the client id used in the endpoint path.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    /// Opens the connection. No-op while connecting or connected.
    ///
    /// # Errors
    ///
    /// Returns [`WsError::Closed`] if the worker has stopped.
    pub fn connect(&self) -> Result<(), WsError> {
        self.dispatch(Command::Connect)
    }

    /// Closes the connection and cancels any pending reconnect.
    ///
    /// # Errors
    ///
    /// Returns [`WsError::Closed`] if the worker has stopped.
    pub fn disconnect(&self) -> Result<(), WsError> {
        self.dispatch(Command::Disconnect)
    }

    /// Adds symbols to the desired set.
    ///
    /// # Errors
    ///
    /// Returns an error if any symbol is invalid (nothing is applied) or the
    /// worker has stopped.
    pub fn subscribe<I, S>(&self, symbols: I) -> Result<(), WsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let symbols = parse_symbols(symbols)?;
        self.dispatch(Command::Subscribe(symbols.into_iter().collect()))
    }

    /// Removes symbols from the desired set and evicts their quotes.
    ///
    /// # Errors
    ///
    /// Returns an error if any symbol is invalid (nothing is applied) or the
    /// worker has stopped.
    pub fn unsubscribe<I, S>(&self, symbols: I) -> Result<(), WsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let symbols = parse_symbols(symbols)?;
        self.dispatch(Command::Unsubscribe(symbols.into_iter().collect()))
    }

    /// Replaces the desired set.
    ///
    /// # Errors
    ///
    /// Returns an error if any symbol is invalid (nothing is applied) or the
    /// worker has stopped.
    pub fn set_desired_symbols<I, S>(&self, symbols: I) -> Result<(), WsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let symbols = parse_symbols(symbols)?;
        self.dispatch(Command::SetDesired(symbols))
    }

    /// Returns true if the transport is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status.borrow().is_connected()
    }

    /// Returns the most recent transport error.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.status.borrow().last_error.clone()
    }

    /// Returns the current connection status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    /// Returns a receiver that observes connection status changes.
    #[must_use]
    pub fn status_changes(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Waits until the connection status satisfies `predicate`.
    ///
    /// # Errors
    ///
    /// Returns [`WsError::Closed`] if the worker stops first.
    pub async fn wait_for_status<F>(&self, predicate: F) -> Result<ConnectionStatus, WsError>
    where
        F: FnMut(&ConnectionStatus) -> bool,
    {
        let mut status = self.status.clone();
        let current = status.wait_for(predicate).await.map_err(|_| WsError::Closed)?;
        Ok(current.clone())
    }

    /// Returns the latest quote for a symbol.
    #[must_use]
    pub fn quote(&self, symbol: &Symbol) -> Option<QuoteRecord> {
        self.store.get(symbol)
    }

    /// Returns all held quotes ordered by symbol.
    #[must_use]
    pub fn quotes(&self) -> Vec<QuoteRecord> {
        self.store.snapshot()
    }

    /// Returns a receiver that observes one symbol's quote.
    #[must_use]
    pub fn watch_quote(&self, symbol: &Symbol) -> watch::Receiver<Option<QuoteRecord>> {
        self.store.watch(symbol)
    }

    /// Returns a handle to the quote store.
    #[must_use]
    pub fn store(&self) -> QuoteStore {
        self.store.clone()
    }

    /// Returns the desired set as last applied by the worker.
    #[must_use]
    pub fn desired_symbols(&self) -> BTreeSet<Symbol> {
        self.desired.borrow().clone()
    }

    /// Returns a receiver that observes the desired set.
    #[must_use]
    pub fn desired_changes(&self) -> watch::Receiver<BTreeSet<Symbol>> {
        self.desired.clone()
    }

    /// Returns the consumer-facing state of one symbol.
    #[must_use]
    pub fn subscription_state(&self, symbol: &Symbol) -> SubscriptionState {
        coordinator::subscription_state(&self.desired.borrow(), &self.store, symbol)
    }

    /// Returns the client metrics.
    #[must_use]
    pub fn metrics(&self) -> Arc<WsMetrics> {
        Arc::clone(&self.metrics)
    }

    fn dispatch(&self, command: Command) -> Result<(), WsError> {
        self.commands.send(command).map_err(|_| WsError::Closed)
    }
}

fn parse_symbols<I, S>(symbols: I) -> Result<BTreeSet<Symbol>, WsError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    symbols
        .into_iter()
        .map(|s| Symbol::new(s.as_ref()).map_err(WsError::from))
        .collect()
}

async fn run_worker(
    mut manager: ConnectionManager,
    mut coordinator: SubscriptionCoordinator,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    debug!("worker started");
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => handle_command(command, &mut manager, &mut coordinator).await,
                None => break,
            },
            event = manager.next_event() => manager.handle_event(event, &mut coordinator).await,
        }
    }
    manager.disconnect(&mut coordinator).await;
    debug!("worker stopped");
}

async fn handle_command(
    command: Command,
    manager: &mut ConnectionManager,
    coordinator: &mut SubscriptionCoordinator,
) {
    let outbound = match command {
        Command::Connect => {
            manager.connect();
            return;
        }
        Command::Disconnect => {
            manager.disconnect(coordinator).await;
            return;
        }
        Command::SetDesired(symbols) => coordinator.set_desired_symbols(symbols),
        Command::Subscribe(symbols) => coordinator.subscribe(symbols),
        Command::Unsubscribe(symbols) => coordinator.unsubscribe(symbols),
    };
    for message in outbound {
        manager.send(&message).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sym(s: &str) -> Symbol {
        Symbol::new(s).expect("symbol")
    }

    #[test]
    fn test_new_requires_runtime() {
        let err = MarketDataClient::new(WsConfig::default()).expect_err("no runtime");
        assert!(matches!(err, WsError::Runtime(_)));
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let err = MarketDataClient::with_url("ftp://example.com").expect_err("invalid");
        assert!(matches!(err, WsError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_client_starts_idle() {
        let client = MarketDataClient::new(WsConfig::default()).expect("client");
        assert!(!client.is_connected());
        assert!(client.last_error().is_none());
        assert!(client.quotes().is_empty());
        assert!(client.desired_symbols().is_empty());
        assert!(!client.client_id().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_symbol_rejects_whole_batch() {
        let client = MarketDataClient::new(WsConfig::default()).expect("client");
        let err = client.subscribe(["AAPL", "BAD SYMBOL"]).expect_err("invalid");
        assert!(matches!(err, WsError::InvalidSymbol(_)));

        tokio::task::yield_now().await;
        assert!(client.desired_symbols().is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_while_disconnected_updates_desired_set() {
        let client = MarketDataClient::new(WsConfig::default()).expect("client");
        let mut desired = client.desired_changes();

        client.subscribe(["msft", " aapl "]).expect("subscribe");
        tokio::time::timeout(Duration::from_secs(1), desired.changed())
            .await
            .expect("timely")
            .expect("worker alive");

        let expected: BTreeSet<Symbol> = [sym("AAPL"), sym("MSFT")].into_iter().collect();
        assert_eq!(client.desired_symbols(), expected);
        assert_eq!(
            client.subscription_state(&sym("AAPL")),
            SubscriptionState::Pending
        );
        assert_eq!(
            client.subscription_state(&sym("TSLA")),
            SubscriptionState::Unsubscribed
        );
        assert_eq!(client.metrics().sends_dropped(), 0);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let client = MarketDataClient::new(WsConfig::default()).expect("client");
        let other = client.clone();
        let mut desired = other.desired_changes();

        client.set_desired_symbols(["GOOG"]).expect("set");
        tokio::time::timeout(Duration::from_secs(1), desired.changed())
            .await
            .expect("timely")
            .expect("worker alive");

        assert!(other.desired_symbols().contains(&sym("GOOG")));
        assert_eq!(client.client_id(), other.client_id());
    }
}
