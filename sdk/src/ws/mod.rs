//! WebSocket client for real-time market data.
//!
//! This module provides the streaming client: one logical connection to the
//! market-data server with bounded automatic reconnection, a coordinator that
//! keeps the server's subscriptions in line with the symbols the application
//! wants, and a per-symbol quote store.
//!
//! # Example
//!
//! ```rust,no_run
//! use tickstream_sdk::ws::{MarketDataClient, WsConfig};
//! use tickstream_sdk::Symbol;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MarketDataClient::new(WsConfig::new("ws://localhost:8000"))?;
//!
//!     client.subscribe(["AAPL", "MSFT"])?;
//!     client.connect()?;
//!
//!     let mut aapl = client.watch_quote(&Symbol::new("AAPL")?);
//!     while aapl.changed().await.is_ok() {
//!         if let Some(quote) = aapl.borrow_and_update().as_ref() {
//!             println!("{quote}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod coordinator;
pub mod error;
pub mod messages;
pub mod metrics;
pub mod state;
pub mod store;

pub use client::MarketDataClient;
pub use config::{ReconnectPolicy, WsConfig};
pub use connection::{ConnectionHandler, ConnectionManager, SendOutcome, TransportEvent};
pub use coordinator::{SubscriptionCoordinator, SubscriptionState};
pub use error::WsError;
pub use messages::{ClientMessage, ServerMessage};
pub use metrics::{WsMetrics, WsMetricsSnapshot};
pub use state::{ConnectionState, ConnectionStatus, RetryState};
pub use store::QuoteStore;
