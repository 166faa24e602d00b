//! HTTP client for webhook dispatch with a fixed timeout.
//!
//! Each result is POSTed once as JSON with the static webhook bearer token.
//! Transport errors and non-2xx responses are logged and returned to the
//! caller; nothing is retried.

use std::{fmt, time::Duration};

use bytes::Bytes;
use relay_core::OperationId;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use tracing::{info_span, Instrument};

use crate::error::{DispatchError, ErrorCategory, Result};

/// Maximum number of response body bytes kept for logs and errors.
const MAX_LOGGED_BODY_SIZE: usize = 1024;

/// Configuration for the webhook client.
#[derive(Clone)]
pub struct ClientConfig {
    /// Timeout for each outbound request.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Bearer token sent to every webhook receiver.
    pub auth_token: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(crate::DEFAULT_TIMEOUT_SECONDS),
            user_agent: "Relay-Webhook/1.0".to_string(),
            auth_token: String::new(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("auth_token", &"***")
            .finish()
    }
}

/// Response from a successful webhook dispatch.
#[derive(Debug, Clone)]
pub struct DeliveryResponse {
    /// HTTP status code (always 2xx).
    pub status_code: u16,
    /// Response body, truncated.
    pub body: String,
}

/// Long-lived webhook client shared by all background tasks.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl WebhookClient {
    /// Creates a new webhook client.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Configuration` if the HTTP client cannot be
    /// built with the provided settings.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| DispatchError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// POSTs `payload` as JSON to `url`.
    ///
    /// # Errors
    ///
    /// - `Serialization` if the payload cannot be encoded
    /// - `Timeout` if the receiver does not answer in time
    /// - `Network` for connection failures
    /// - `HttpStatus` for any non-2xx response
    pub async fn send_webhook<T>(
        &self,
        url: &str,
        payload: &T,
        operation_id: OperationId,
    ) -> Result<DeliveryResponse>
    where
        T: Serialize + ?Sized,
    {
        let span = info_span!("webhook_dispatch", operation_id = %operation_id, webhook_url = %url);

        async move {
            let body = serde_json::to_vec(payload)
                .map(Bytes::from)
                .map_err(|e| DispatchError::serialization(e.to_string()))?;

            tracing::debug!(payload_size = body.len(), "Sending webhook");
            let start_time = std::time::Instant::now();

            let response = self
                .client
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .header(AUTHORIZATION, format!("Bearer {}", self.config.auth_token))
                .header("X-Operation-ID", operation_id.to_string())
                .body(body)
                .send()
                .await
                .map_err(|e| {
                    let error = if e.is_timeout() {
                        DispatchError::timeout(self.config.timeout.as_secs())
                    } else if e.is_connect() {
                        DispatchError::network(format!("connection failed: {e}"))
                    } else {
                        DispatchError::network(e.to_string())
                    };
                    tracing::error!(
                        error = %error,
                        category = %ErrorCategory::from(&error),
                        "Webhook request error"
                    );
                    error
                })?;

            let duration = start_time.elapsed();
            let status = response.status();
            let body = read_body(response).await;

            tracing::info!(
                status_code = status.as_u16(),
                duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                "Webhook sent"
            );

            if !status.is_success() {
                let error = DispatchError::http_status(status.as_u16(), body);
                tracing::error!(
                    status_code = status.as_u16(),
                    category = %ErrorCategory::from(&error),
                    response_text = %error_body(&error),
                    "Webhook HTTP error"
                );
                return Err(error);
            }

            Ok(DeliveryResponse { status_code: status.as_u16(), body })
        }
        .instrument(span)
        .await
    }
}

/// Reads a response body, keeping at most `MAX_LOGGED_BODY_SIZE` bytes.
async fn read_body(response: reqwest::Response) -> String {
    match response.bytes().await {
        Ok(bytes) if bytes.len() > MAX_LOGGED_BODY_SIZE => {
            let truncated = String::from_utf8_lossy(&bytes[..MAX_LOGGED_BODY_SIZE]);
            format!("{truncated}... (truncated)")
        },
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::warn!("Failed to read response body: {}", e);
            format!("[Failed to read response body: {e}]")
        },
    }
}

fn error_body(error: &DispatchError) -> &str {
    match error {
        DispatchError::HttpStatus { body, .. } => body,
        _ => "",
    }
}
