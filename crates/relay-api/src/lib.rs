//! Relay HTTP API.
//!
//! Accepts operation and step requests, processes them in detached
//! background tasks and reports results to caller-supplied webhooks.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::{sync::Arc, time::Instant};

use relay_core::{Clock, RealClock};
use relay_delivery::{AlertClient, WebhookClient};
use tokio_util::task::TaskTracker;

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod services;

pub use config::Config;
pub use error::ApiError;
pub use server::{create_router, start_server};
pub use services::{OperationService, TextProcessingService};

/// Response header carrying the generated operation identifier.
pub const OPERATION_ID_HEADER: &str = "x-operation-id";

/// Shared state for all handlers.
///
/// Cloning is cheap; clones share the HTTP clients and the task tracker.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<Config>,
    /// Operation processing service.
    pub operations: OperationService,
    /// Text pipeline service.
    pub text: TextProcessingService,
    /// Alert dispatcher.
    pub alerts: AlertClient,
    /// Time source for timestamps and uptime.
    pub clock: Arc<dyn Clock>,
    /// When the service started.
    pub started_at: Instant,
    /// Tracks spawned background tasks for graceful shutdown.
    pub tasks: TaskTracker,
}

impl AppState {
    /// Builds application state using the system clock.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        Self::with_clock(config, Arc::new(RealClock::new()))
    }

    /// Builds application state with an explicit clock.
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let webhook = WebhookClient::new(config.to_client_config())?;
        let alerts = AlertClient::new(config.to_alert_config(), clock.clone())?;

        Ok(Self {
            operations: OperationService::new(webhook.clone(), clock.clone()),
            text: TextProcessingService::new(webhook, clock.clone()),
            alerts,
            started_at: clock.now(),
            clock,
            config: Arc::new(config),
            tasks: TaskTracker::new(),
        })
    }
}
