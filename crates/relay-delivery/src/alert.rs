//! Side-channel alerts for HTTP-layer failures.
//!
//! Alerts are best effort: when the alert endpoint is not configured they are
//! skipped with a warning, and delivery failures are logged and swallowed.

use std::{fmt, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use relay_core::Clock;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{DispatchError, Result};

/// Alert urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    /// Needs attention now.
    High,
    /// Needs attention soon.
    Medium,
    /// Informational.
    Low,
}

impl fmt::Display for AlertPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Body POSTed to the alert endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AlertPayload {
    /// Alert description.
    pub text: String,
    /// Alert priority.
    pub priority: AlertPriority,
    /// When the alert was raised.
    pub timestamp: DateTime<Utc>,
    /// Alert tags.
    pub tags: Vec<String>,
    /// Additional debug information.
    pub debug_logs: Option<String>,
}

/// Alert to raise, before defaults are applied.
#[derive(Debug, Clone)]
pub struct Alert {
    /// Alert description.
    pub text: String,
    /// Alert priority.
    pub priority: AlertPriority,
    /// Tags; `None` selects `incident`, `critical` and the service name.
    pub tags: Option<Vec<String>>,
    /// Additional debug information.
    pub debug_logs: Option<String>,
    /// Operation the alert relates to, appended as an `operation:<id>` tag.
    pub operation_id: Option<String>,
}

impl Alert {
    /// Creates a high-priority alert with default tags.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            priority: AlertPriority::High,
            tags: None,
            debug_logs: None,
            operation_id: None,
        }
    }
}

/// Where a failing request was headed, for error alerts.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext<'a> {
    /// Operation identifier taken from the request, if any.
    pub operation_id: Option<&'a str>,
    /// Request path.
    pub endpoint: Option<&'a str>,
}

/// What happened to an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    /// The alert endpoint accepted the alert.
    Sent,
    /// Alerting is not configured.
    Skipped,
    /// The alert could not be delivered.
    Failed,
}

/// Alert endpoint settings.
#[derive(Clone, Default)]
pub struct AlertConfig {
    /// Alert endpoint URL.
    pub webhook_url: Option<String>,
    /// Bearer token for the alert endpoint.
    pub api_key: Option<String>,
    /// Service name used in texts and tags.
    pub service_name: String,
    /// Timeout for each alert request.
    pub timeout: Duration,
}

impl fmt::Debug for AlertConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertConfig")
            .field("webhook_url", &self.webhook_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("service_name", &self.service_name)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Client for the alert endpoint.
#[derive(Debug, Clone)]
pub struct AlertClient {
    client: reqwest::Client,
    config: AlertConfig,
    clock: Arc<dyn Clock>,
}

impl AlertClient {
    /// Creates a new alert client.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Configuration` if the HTTP client cannot be
    /// built.
    pub fn new(config: AlertConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DispatchError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config, clock })
    }

    /// Whether both the alert URL and API key are configured.
    pub fn is_configured(&self) -> bool {
        self.endpoint().is_some()
    }

    fn endpoint(&self) -> Option<(&str, &str)> {
        match (&self.config.webhook_url, &self.config.api_key) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => Some((url, key)),
            _ => None,
        }
    }

    /// Builds the payload for `alert`, applying default tags.
    pub fn build_payload(&self, alert: Alert) -> AlertPayload {
        let mut tags = alert.tags.unwrap_or_else(|| {
            vec!["incident".to_string(), "critical".to_string(), self.config.service_name.clone()]
        });
        if let Some(operation_id) = &alert.operation_id {
            tags.push(format!("operation:{operation_id}"));
        }

        AlertPayload {
            text: alert.text,
            priority: alert.priority,
            timestamp: self.clock.now_utc(),
            tags,
            debug_logs: alert.debug_logs,
        }
    }

    /// Sends an alert. Never fails; the outcome is returned for callers that
    /// want to log it.
    pub async fn send_alert(&self, alert: Alert) -> AlertOutcome {
        let Some((url, api_key)) = self.endpoint() else {
            warn!(
                alert_text = %alert.text,
                priority = %alert.priority,
                "Alert webhook not configured, skipping alert"
            );
            return AlertOutcome::Skipped;
        };

        let operation_id = alert.operation_id.clone().unwrap_or_else(|| "unknown".to_string());
        let payload = self.build_payload(alert);

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .json(&payload)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                info!(
                    operation_id = %operation_id,
                    alert_text = %payload.text,
                    priority = %payload.priority,
                    "Alert sent"
                );
                AlertOutcome::Sent
            },
            Ok(response) => {
                let status_code = response.status().as_u16();
                let response_text = response.text().await.unwrap_or_default();
                error!(
                    alert_text = %payload.text,
                    status_code,
                    response_text = %response_text,
                    "Alert HTTP error"
                );
                AlertOutcome::Failed
            },
            Err(e) => {
                error!(alert_text = %payload.text, error = %e, "Alert request error");
                AlertOutcome::Failed
            },
        }
    }

    /// Sends a high-priority alert describing `error`.
    pub async fn send_error_alert(
        &self,
        error: &str,
        error_kind: &str,
        context: ErrorContext<'_>,
    ) -> AlertOutcome {
        let alert = self.error_alert(error, error_kind, &context);
        self.send_alert(alert).await
    }

    /// Builds the alert used by [`AlertClient::send_error_alert`].
    pub fn error_alert(&self, error: &str, error_kind: &str, context: &ErrorContext<'_>) -> Alert {
        let service = &self.config.service_name;

        let mut text = format!("Error in {service}");
        if let Some(endpoint) = context.endpoint {
            text.push_str(&format!(" at {endpoint}"));
        }
        text.push_str(&format!(": {error}"));

        let mut debug_logs = format!("Error type: {error_kind}");
        if let Some(endpoint) = context.endpoint {
            debug_logs.push_str(&format!("\nEndpoint: {endpoint}"));
        }
        if let Some(operation_id) = context.operation_id {
            debug_logs.push_str(&format!("\nOperation ID: {operation_id}"));
        }

        Alert {
            text,
            priority: AlertPriority::High,
            tags: Some(vec!["error".to_string(), "incident".to_string(), service.clone()]),
            debug_logs: Some(debug_logs),
            operation_id: context.operation_id.map(str::to_string),
        }
    }
}
