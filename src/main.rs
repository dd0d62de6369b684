//! showdown-relay server entry point.
//!
//! Starts the Axum HTTP server with the relay, status, and WebSocket
//! endpoints.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use showdown_relay::app_state::AppState;
use showdown_relay::config::{LogFormat, RelayConfig};
use showdown_relay::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config =
        RelayConfig::from_env().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    tracing::info!(
        addr = %config.listen_addr,
        upstream = %config.showdown_ws_url,
        "starting showdown-relay"
    );

    // Build application state and router
    let state = AppState::new(&config)?;
    let app = server::build_app(state, &config);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "relay listening");

    server::serve(listener, app).await?;

    Ok(())
}
