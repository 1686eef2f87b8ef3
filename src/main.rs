//! ollama-relay: HTTP relay for a local Ollama inference server.
//!
//! Serves a small REST surface for a browser chat client and forwards chat
//! requests to Ollama, streaming replies back token-by-token.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use ollama_relay::config::{Cli, Config};
use ollama_relay::server::chat_api::{build_router, AppState};
use ollama_relay::upstream::OllamaClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "ollama_relay=debug,tower_http=debug"
    } else {
        "ollama_relay=info,tower_http=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    info!("ollama-relay v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let config = Arc::new(Config::from_cli(&cli));

    info!(
        ollama_url = config.ollama_url,
        chat_timeout_secs = config.chat_timeout_secs,
        "Configuration loaded"
    );

    // One shared upstream client; each request borrows a pooled connection.
    let ollama = OllamaClient::new(
        config.ollama_url.clone(),
        Duration::from_secs(config.chat_timeout_secs),
    );

    // Build application state.
    let state = Arc::new(AppState {
        config: config.clone(),
        ollama,
    });

    // Build the HTTP router.
    let app = build_router(state);

    // Start the server.
    let listen_addr = config.listen.clone();
    info!(addr = listen_addr, "Starting server");

    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
