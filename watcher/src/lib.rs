//! Tickstream Watcher - headless consumer of the streaming client.
//!
//! This crate drives a [`tickstream_sdk::ws::MarketDataClient`] for a fixed
//! watch-list and logs every quote update until shut down.
//!
//! # Components
//!
//! - [`config`]: Watcher configuration
//! - [`service`]: Main watch service

pub mod config;
pub mod service;

pub use config::{ConfigError, WatcherConfig};
pub use service::{ServiceError, WatchService};
