//! Tickstream SDK - streaming market-data client.
//!
//! This crate maintains a single live connection to a market-data server,
//! keeps the server's symbol subscriptions in line with what the application
//! wants to watch, and fans incoming quotes out to consumers keyed by symbol.
//!
//! # Core Types
//!
//! - [`Symbol`] — Validated, uppercase ticker
//! - [`QuoteRecord`] — Latest known values for one symbol
//!
//! # Streaming
//!
//! - [`ws::MarketDataClient`] — Cloneable handle to the connection
//! - [`ws::QuoteStore`] — Per-symbol latest-value store
//! - [`ws::ConnectionStatus`] — Observable connection state
//!
//! # Example
//!
//! ```rust
//! use tickstream_sdk::Symbol;
//!
//! let symbol = Symbol::new(" aapl ").unwrap();
//! assert_eq!(symbol.as_str(), "AAPL");
//! ```

pub mod error;
pub mod types;
pub mod ws;

pub use error::SdkError;
pub use types::{QuoteData, QuoteRecord, Symbol};
