//! Main Entrypoint for the Switchboard Gateway
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Loading the phone-to-account mapping and constructing the shared
//!    capabilities (call control, HTTP client).
//! 4. Constructing the Axum router and starting the web server with
//!    graceful shutdown.

use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};
use switchboard_api::{
    call::control::TwilioCallControl, config::Config, router::create_router, state::AppState,
};
use switchboard_core::lookup::StaticLookup;
use tracing::info;

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Shared Capabilities ---
    let http = reqwest::Client::new();
    let lookup = Arc::new(
        StaticLookup::from_file(&config.phone_accounts_path)
            .context("Failed to load phone account mapping")?,
    );
    info!(accounts = lookup.len(), "Phone account mapping loaded.");
    let call_control = Arc::new(TwilioCallControl::new(http.clone(), &config));

    let app_state = Arc::new(AppState {
        config: Arc::new(config.clone()),
        http,
        call_control,
        lookup,
    });

    // --- 4. Create Router and Start Server ---
    let app = create_router(app_state);

    info!(
        bind_address = %config.bind_address,
        public_host = %config.public_host,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
