//! Multi-room WebSocket Chat Relay - Entry Point
//!
//! Parses configuration, starts logging and runs the relay until Ctrl-C.

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chat_relay::{Config, RelayServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_relay=info")),
        )
        .init();

    let config = Config::parse();

    let server = RelayServer::bind(config).await?;
    info!("WebSocket Chat Relay listening on {}", server.local_addr()?);

    server.run_until_ctrl_c().await;

    Ok(())
}
