//! Health and service information endpoints.

use std::{sync::Arc, time::{Duration, Instant}};

use axum::{extract::State, Json};
use relay_core::{Clock, HealthResponse, HealthStatus};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::AppState;

/// Health service that reads uptime and timestamps from the injected clock.
pub struct HealthService {
    clock: Arc<dyn Clock>,
    started_at: Instant,
}

impl HealthService {
    /// Creates a health service measuring uptime from `started_at`.
    pub fn new(clock: Arc<dyn Clock>, started_at: Instant) -> Self {
        Self { clock, started_at }
    }

    /// Builds the health report.
    pub fn health_check(&self, service_name: &str, version: &str) -> HealthResponse {
        let uptime = self.clock.now().saturating_duration_since(self.started_at);

        HealthResponse {
            status: HealthStatus::Healthy,
            service_name: service_name.to_string(),
            version: version.to_string(),
            uptime: format_uptime(uptime),
            timestamp: self.clock.now_utc(),
        }
    }
}

/// Formats a duration as `1d 2h 3m 4s`, omitting zero components.
///
/// Seconds are always shown when every other component is zero.
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let (days, hours, minutes, seconds) =
        (total / 86_400, (total % 86_400) / 3_600, (total % 3_600) / 60, total % 60);

    let mut parts = Vec::with_capacity(4);
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{seconds}s"));
    }

    parts.join(" ")
}

/// Health check endpoint handler. Served without authentication.
#[instrument(name = "health_check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let service = HealthService::new(state.clock.clone(), state.started_at);
    let response = service.health_check(&state.config.service_name, &state.config.service_version);

    debug!(uptime = %response.uptime, "Health check completed");

    Json(response)
}

/// Body of `GET /`.
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    /// Greeting naming the service.
    pub message: String,
    /// Service version.
    pub version: String,
    /// Path of the health endpoint.
    pub health: &'static str,
}

/// Service information endpoint.
#[instrument(name = "service_info", skip(state))]
pub async fn service_info(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: format!("Welcome to {}", state.config.service_name),
        version: state.config.service_version.clone(),
        health: "/health",
    })
}

#[cfg(test)]
mod tests {
    use std::time::UNIX_EPOCH;

    use relay_core::TestClock;

    use super::*;

    #[test]
    fn uptime_omits_zero_components() {
        assert_eq!(format_uptime(Duration::ZERO), "0s");
        assert_eq!(format_uptime(Duration::from_secs(59)), "59s");
        assert_eq!(format_uptime(Duration::from_secs(60)), "1m");
        assert_eq!(format_uptime(Duration::from_secs(3_600 + 5)), "1h 5s");
        assert_eq!(format_uptime(Duration::from_secs(93_784)), "1d 2h 3m 4s");
        assert_eq!(format_uptime(Duration::from_secs(2 * 86_400)), "2d");
    }

    #[test]
    fn health_check_reports_clock_uptime() {
        let clock = TestClock::with_start_time(UNIX_EPOCH + Duration::from_secs(1_705_314_600));
        let service = HealthService::new(Arc::new(clock.clone()), clock.now());

        clock.advance(Duration::from_secs(3_723));
        let response = service.health_check("relay", "1.2.3");

        assert_eq!(response.status, HealthStatus::Healthy);
        assert_eq!(response.service_name, "relay");
        assert_eq!(response.version, "1.2.3");
        assert_eq!(response.uptime, "1h 2m 3s");
        assert_eq!(response.timestamp.timestamp(), 1_705_314_600 + 3_723);
    }
}
