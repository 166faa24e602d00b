//! Test harness for relay integration and end-to-end tests.
//!
//! [`TestEnv`] wires a full router against wiremock receivers for webhooks
//! and alerts, with a manually driven clock. Requests go through the router
//! in-process via `tower::ServiceExt::oneshot`.

pub mod http;

use std::{
    sync::Arc,
    time::{Duration, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    Router,
};
use bytes::Bytes;
use ::http::{header, HeaderMap, Request, StatusCode};
use relay_api::{create_router, AppState, Config, OPERATION_ID_HEADER};
use relay_core::TestClock;
use serde_json::Value;
use tower::ServiceExt;
use tracing_subscriber::EnvFilter;

pub use crate::http::{MockEndpoint, MockServer};

/// Bearer token accepted by the router under test.
pub const TEST_AUTH_TOKEN: &str = "test-auth-token";

/// Bearer token the service sends to webhook receivers.
pub const TEST_WEBHOOK_TOKEN: &str = "test-webhook-token";

/// Bearer token the service sends to the alert receiver.
pub const TEST_ALERT_API_KEY: &str = "test-alert-key";

/// Path of the alert receiver on the alert mock server.
pub const ALERT_PATH: &str = "/alerts";

/// Fixed start time for the test clock: 2024-01-15T10:30:00Z.
pub const TEST_START_SECS: u64 = 1_705_314_600;

/// Test environment with all necessary infrastructure.
pub struct TestEnv {
    /// Receiver for operation and step results.
    pub webhook: MockServer,
    /// Receiver for alerts; always answers `200`.
    pub alerts: MockServer,
    /// Clock injected into the application state.
    pub clock: TestClock,
    /// Application state behind the router.
    pub state: AppState,
    router: Router,
}

impl TestEnv {
    /// Creates a new test environment with defaults.
    pub async fn new() -> Result<Self> {
        Self::with_config(|_| {}).await
    }

    /// Creates a test environment, letting `customize` adjust the config.
    pub async fn with_config(customize: impl FnOnce(&mut Config)) -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("warn,relay_api=debug,relay_delivery=debug")),
            )
            .with_test_writer()
            .try_init();

        let webhook = MockServer::start().await;
        let alerts = MockServer::start().await;
        alerts.mock_endpoint(MockEndpoint::success(ALERT_PATH)).await;

        let mut config = Config {
            service_name: "relay-test".to_string(),
            auth_token: TEST_AUTH_TOKEN.to_string(),
            webhook_auth_token: TEST_WEBHOOK_TOKEN.to_string(),
            alert_webhook_url: Some(alerts.endpoint_url(ALERT_PATH)),
            alert_api_key: Some(TEST_ALERT_API_KEY.to_string()),
            webhook_timeout_seconds: 5,
            alert_timeout_seconds: 5,
            ..Config::default()
        };
        customize(&mut config);
        config.normalize();
        config.validate().context("invalid test configuration")?;

        let clock = TestClock::with_start_time(UNIX_EPOCH + Duration::from_secs(TEST_START_SECS));
        let state = AppState::with_clock(config, Arc::new(clock.clone()))?;
        let router = create_router(state.clone());

        Ok(Self { webhook, alerts, clock, state, router })
    }

    /// Advances test time by the specified duration.
    pub fn advance_time(&self, duration: Duration) {
        self.clock.advance(duration);
    }

    /// Absolute URL of `path` on the webhook receiver.
    pub fn webhook_url(&self, path: &str) -> String {
        self.webhook.endpoint_url(path)
    }

    /// Sends a raw request through the router.
    pub async fn request(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await?;

        Ok(TestResponse { status, headers, body })
    }

    /// POSTs `body` as JSON with the test bearer token.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<TestResponse> {
        self.post_json_with_token(path, body, Some(TEST_AUTH_TOKEN)).await
    }

    /// POSTs `body` as JSON with an optional bearer token.
    pub async fn post_json_with_token(
        &self,
        path: &str,
        body: &Value,
        token: Option<&str>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        self.request(builder.body(Body::from(serde_json::to_vec(body)?))?).await
    }

    /// GETs `path` with the test bearer token.
    pub async fn get(&self, path: &str) -> Result<TestResponse> {
        self.get_with_token(path, Some(TEST_AUTH_TOKEN)).await
    }

    /// GETs `path` with an optional bearer token.
    pub async fn get_with_token(&self, path: &str, token: Option<&str>) -> Result<TestResponse> {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        self.request(builder.body(Body::empty())?).await
    }

    /// Waits for every spawned background task to finish.
    pub async fn wait_for_background_tasks(&self) -> Result<()> {
        let tasks = &self.state.tasks;
        tasks.close();
        let result = tokio::time::timeout(Duration::from_secs(10), tasks.wait()).await;
        tasks.reopen();
        result.context("background tasks did not finish in time")
    }
}

/// Response captured from the router.
#[derive(Debug, Clone)]
pub struct TestResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl TestResponse {
    /// Parses the body as JSON.
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    /// Value of the `X-Operation-ID` header, if present.
    pub fn operation_id(&self) -> Option<&str> {
        self.header(OPERATION_ID_HEADER)
    }

    /// Value of a response header, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
