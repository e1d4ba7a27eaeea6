//! Subscription coordination.
//!
//! Tracks which symbols the consumer wants, which ones the server has been
//! told about on the current connection, and turns changes to either into
//! the minimal set of subscribe/unsubscribe messages. The coordinator never
//! touches the socket; every mutating call returns the messages to send.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, trace, warn};

use super::connection::ConnectionHandler;
use super::messages::{ClientMessage, ServerMessage};
use super::metrics::WsMetrics;
use super::store::QuoteStore;
use crate::types::{QuoteRecord, Symbol};

/// Per-symbol subscription state as seen by a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionState {
    /// Not in the desired set.
    Unsubscribed,
    /// Desired, no quote received yet.
    Pending,
    /// Desired, at least one quote held.
    Active,
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsubscribed => write!(f, "unsubscribed"),
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
        }
    }
}

/// Reconciles the desired symbol set with the server.
#[derive(Debug)]
pub struct SubscriptionCoordinator {
    desired: BTreeSet<Symbol>,
    active: BTreeSet<Symbol>,
    connected: bool,
    store: QuoteStore,
    desired_tx: watch::Sender<BTreeSet<Symbol>>,
    metrics: Arc<WsMetrics>,
}

impl SubscriptionCoordinator {
    /// Creates a coordinator writing into `store`.
    #[must_use]
    pub fn new(store: QuoteStore, metrics: Arc<WsMetrics>) -> Self {
        let (desired_tx, _) = watch::channel(BTreeSet::new());
        Self {
            desired: BTreeSet::new(),
            active: BTreeSet::new(),
            connected: false,
            store,
            desired_tx,
            metrics,
        }
    }

    /// Returns the desired set.
    #[must_use]
    pub fn desired(&self) -> &BTreeSet<Symbol> {
        &self.desired
    }

    /// Returns the symbols announced to the server on this connection.
    #[must_use]
    pub fn active(&self) -> &BTreeSet<Symbol> {
        &self.active
    }

    /// Returns the quote store.
    #[must_use]
    pub fn store(&self) -> &QuoteStore {
        &self.store
    }

    /// Returns a receiver that observes the desired set.
    #[must_use]
    pub fn desired_receiver(&self) -> watch::Receiver<BTreeSet<Symbol>> {
        self.desired_tx.subscribe()
    }

    /// Returns the consumer-facing state of one symbol.
    #[must_use]
    pub fn subscription_state(&self, symbol: &Symbol) -> SubscriptionState {
        subscription_state(&self.desired, &self.store, symbol)
    }

    /// Replaces the desired set.
    ///
    /// Symbols that left the set are evicted from the store right away.
    /// While connected, returns at most one subscribe message for the added
    /// symbols followed by at most one unsubscribe message for the removed
    /// ones. While disconnected, returns nothing; the next open announces
    /// the whole set.
    pub fn set_desired_symbols(&mut self, next: BTreeSet<Symbol>) -> Vec<ClientMessage> {
        if next == self.desired {
            trace!(count = next.len(), "desired set unchanged");
            return Vec::new();
        }

        let added: Vec<Symbol> = next.difference(&self.desired).cloned().collect();
        let removed: Vec<Symbol> = self.desired.difference(&next).cloned().collect();

        for symbol in &removed {
            if self.store.evict(symbol).is_some() {
                debug!(symbol = %symbol, "evicted quote");
            }
        }

        self.desired = next;
        self.desired_tx.send_replace(self.desired.clone());

        debug!(
            added = added.len(),
            removed = removed.len(),
            desired = self.desired.len(),
            connected = self.connected,
            "desired set changed"
        );

        if !self.connected {
            return Vec::new();
        }

        let mut messages = Vec::with_capacity(2);
        if !added.is_empty() {
            self.active.extend(added.iter().cloned());
            messages.push(ClientMessage::subscribe(added));
        }
        if !removed.is_empty() {
            for symbol in &removed {
                self.active.remove(symbol);
            }
            messages.push(ClientMessage::unsubscribe(removed));
        }
        messages
    }

    /// Adds symbols to the desired set.
    pub fn subscribe(&mut self, symbols: impl IntoIterator<Item = Symbol>) -> Vec<ClientMessage> {
        let mut next = self.desired.clone();
        next.extend(symbols);
        self.set_desired_symbols(next)
    }

    /// Removes symbols from the desired set.
    pub fn unsubscribe(&mut self, symbols: impl IntoIterator<Item = Symbol>) -> Vec<ClientMessage> {
        let mut next = self.desired.clone();
        for symbol in symbols {
            next.remove(&symbol);
        }
        self.set_desired_symbols(next)
    }

    /// Applies one inbound message.
    pub fn on_inbound_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::MarketData { symbol, data } => {
                if !self.desired.contains(&symbol) {
                    trace!(symbol = %symbol, "ignoring quote for undesired symbol");
                    return;
                }
                let record = QuoteRecord::from_data(symbol, data);
                trace!(quote = %record, "quote update");
                self.store.upsert(record);
                self.metrics.record_quote_applied();
            }
            ServerMessage::ConnectionStatus { status, client_id } => {
                debug!(status = %status, client_id = ?client_id, "server connection status");
            }
            ServerMessage::Ping | ServerMessage::Pong => {
                debug!("keepalive");
            }
            ServerMessage::Error { message } => {
                warn!(error = %message, "server reported error");
            }
            ServerMessage::Unknown => {
                debug!("ignoring unknown message type");
            }
        }
    }
}

impl ConnectionHandler for SubscriptionCoordinator {
    fn on_connected(&mut self) -> Vec<ClientMessage> {
        self.connected = true;
        self.active = self.desired.clone();
        if self.active.is_empty() {
            return Vec::new();
        }
        debug!(count = self.active.len(), "announcing desired set");
        vec![ClientMessage::subscribe(self.active.iter().cloned())]
    }

    fn on_disconnected(&mut self) {
        self.connected = false;
        self.active.clear();
    }

    fn on_message(&mut self, message: ServerMessage) {
        self.on_inbound_message(message);
    }
}

/// Derives a symbol's state from the desired set and the store.
pub(crate) fn subscription_state(
    desired: &BTreeSet<Symbol>,
    store: &QuoteStore,
    symbol: &Symbol,
) -> SubscriptionState {
    if !desired.contains(symbol) {
        SubscriptionState::Unsubscribed
    } else if store.contains(symbol) {
        SubscriptionState::Active
    } else {
        SubscriptionState::Pending
    }
}
