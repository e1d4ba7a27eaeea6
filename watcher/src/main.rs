//! Tickstream Watcher binary.
//!
//! Entry point for the headless quote watcher.

use anyhow::Context;
use tickstream_watcher::{WatchService, WatcherConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tickstream_sdk=debug,tickstream_watcher=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = WatcherConfig::from_env().context("failed to load configuration")?;
    tracing::info!("Starting Tickstream Watcher");
    tracing::info!("Configuration: {}", serde_json::to_string(&config)?);

    let service = WatchService::new(config).context("failed to start watch service")?;

    service
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for ctrl-c: {}", e);
            }
        })
        .await?;

    tracing::info!("Shutting down watcher");
    Ok(())
}
