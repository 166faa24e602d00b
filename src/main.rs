//! Relay service.
//!
//! Main entry point. Loads configuration, initializes logging, serves the
//! HTTP API and drains background deliveries on shutdown.

use anyhow::{Context, Result};
use relay_api::{server::drain_background_tasks, AppState, Config};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("Failed to read .env file");
        }
    }

    let config = Config::load()?;
    init_tracing(&config)?;

    info!(
        service_name = %config.service_name,
        version = %config.service_version,
        alerts_configured = config.alert_webhook_url.is_some() && config.alert_api_key.is_some(),
        "Starting relay service"
    );

    let addr = config.parse_server_addr()?;
    let grace = config.shutdown_grace();
    let state = AppState::new(config).context("Failed to build application state")?;
    let tasks = state.tasks.clone();

    relay_api::start_server(state, addr).await.context("HTTP server failed")?;

    if !drain_background_tasks(&tasks, grace).await {
        warn!("Exiting with background deliveries still pending");
    }

    info!("Relay shutdown complete");
    Ok(())
}

/// Initializes tracing from the configured level and format.
///
/// `RUST_LOG`, when set, takes precedence over `LOG_LEVEL`.
fn init_tracing(config: &Config) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.tracing_directive()))
        .context("Invalid log filter")?;

    let registry = tracing_subscriber::registry().with(filter);

    if config.json_logs() {
        registry
            .with(fmt::layer().json().with_current_span(true).with_target(true))
            .try_init()
            .context("Failed to initialize logging")?;
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .try_init()
            .context("Failed to initialize logging")?;
    }

    Ok(())
}
