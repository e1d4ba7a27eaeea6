//! WebSocket message types.
//!
//! Defines the JSON text frames exchanged with the market-data server.

use serde::{Deserialize, Serialize};

use super::error::WsError;
use crate::types::{QuoteData, Symbol};

/// Client-to-server messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start streaming the given symbols.
    Subscribe {
        /// Symbols to add.
        symbols: Vec<Symbol>,
    },
    /// Stop streaming the given symbols.
    Unsubscribe {
        /// Symbols to remove.
        symbols: Vec<Symbol>,
    },
    /// Application-level keepalive; the server answers with `pong`.
    Ping,
}

impl ClientMessage {
    /// Creates a subscribe message.
    #[must_use]
    pub fn subscribe(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        Self::Subscribe {
            symbols: symbols.into_iter().collect(),
        }
    }

    /// Creates an unsubscribe message.
    #[must_use]
    pub fn unsubscribe(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        Self::Unsubscribe {
            symbols: symbols.into_iter().collect(),
        }
    }

    /// Returns the message type tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Subscribe { .. } => "subscribe",
            Self::Unsubscribe { .. } => "unsubscribe",
            Self::Ping => "ping",
        }
    }

    /// Serializes the message into a JSON text frame payload.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, WsError> {
        serde_json::to_string(self).map_err(|e| WsError::Serialization(e.to_string()))
    }
}

/// Server-to-client messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Latest quote for one symbol.
    MarketData {
        /// Symbol the quote belongs to.
        symbol: Symbol,
        /// Quote payload.
        data: QuoteData,
    },
    /// Sent by the server right after accepting the connection.
    ConnectionStatus {
        /// Status text (e.g. `connected`).
        status: String,
        /// Echo of the client id.
        #[serde(default)]
        client_id: Option<String>,
    },
    /// Server keepalive.
    Ping,
    /// Answer to a client ping.
    Pong,
    /// Error reported by the server.
    Error {
        /// Error text.
        #[serde(default)]
        message: String,
    },
    /// Any other message type.
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    /// Parses a text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a well-formed message.
    pub fn parse(text: &str) -> Result<Self, WsError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Returns the symbol for `market_data` messages.
    #[must_use]
    pub fn symbol(&self) -> Option<&Symbol> {
        match self {
            Self::MarketData { symbol, .. } => Some(symbol),
            _ => None,
        }
    }
}
