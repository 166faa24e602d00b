//! HTTP mocking utilities for webhook and alert receivers.

use std::time::Duration;

use http::StatusCode;
use serde_json::Value;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer as WiremockServer, Request, ResponseTemplate,
};

/// Mock receiver recording every request it gets.
pub struct MockServer {
    server: WiremockServer,
}

impl MockServer {
    /// Starts a new mock server on a random port.
    pub async fn start() -> Self {
        Self { server: WiremockServer::start().await }
    }

    /// Returns the base URL of the mock server.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Returns the absolute URL for `path` on this server.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}{path}", self.server.uri())
    }

    /// Configures an endpoint to return a specific response.
    pub async fn mock_endpoint(&self, endpoint: MockEndpoint) {
        let mut response = ResponseTemplate::new(endpoint.status.as_u16());
        if let Some(delay) = endpoint.delay {
            response = response.set_delay(delay);
        }

        let mut mock = Mock::given(method("POST")).and(path(endpoint.path.clone()));
        for (key, value) in &endpoint.expected_headers {
            mock = mock.and(header(key.as_str(), value.as_str()));
        }

        mock.respond_with(response).mount(&self.server).await;
    }

    /// Configures every POST to fail with the given status code.
    pub async fn mock_endpoint_always_fail(&self, status: u16) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Returns all requests received by the server.
    pub async fn received_requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Returns the JSON bodies of all received requests, in arrival order.
    pub async fn received_json_bodies(&self) -> Vec<Value> {
        self.received_requests()
            .await
            .iter()
            .filter_map(|request| serde_json::from_slice(&request.body).ok())
            .collect()
    }

    /// Polls until at least `expected` requests arrived or `timeout` elapses,
    /// then returns the JSON bodies received so far.
    pub async fn wait_for_requests(&self, expected: usize, timeout: Duration) -> Vec<Value> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let bodies = self.received_json_bodies().await;
            if bodies.len() >= expected || tokio::time::Instant::now() >= deadline {
                return bodies;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Asserts that exactly n requests were received.
    pub async fn assert_request_count(&self, expected: usize) {
        let requests = self.received_requests().await;
        assert_eq!(
            requests.len(),
            expected,
            "Expected {} requests, received {}",
            expected,
            requests.len()
        );
    }
}

/// Configuration for a mock endpoint.
#[derive(Debug, Clone)]
pub struct MockEndpoint {
    /// Path to match.
    pub path: String,
    /// Headers the request must carry.
    pub expected_headers: Vec<(String, String)>,
    /// Response status.
    pub status: StatusCode,
    /// Delay before responding.
    pub delay: Option<Duration>,
}

impl MockEndpoint {
    /// Creates a mock endpoint that returns `200 OK`.
    pub fn success(path: impl Into<String>) -> Self {
        Self::with_status(path, StatusCode::OK)
    }

    /// Creates a mock endpoint that returns the given failure status.
    pub fn failure(path: impl Into<String>, status: StatusCode) -> Self {
        Self::with_status(path, status)
    }

    fn with_status(path: impl Into<String>, status: StatusCode) -> Self {
        Self {
            path: path.into(),
            expected_headers: Vec::new(),
            status,
            delay: None,
        }
    }

    /// Adds an expected header to the mock.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.expected_headers.push((key.into(), value.into()));
        self
    }

    /// Delays the response, e.g. to trigger client timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// HTTP assertions for webhook testing.
pub mod assertions {
    use super::*;

    /// Asserts that a request contains the expected header.
    pub fn assert_header_present(request: &Request, key: &str, value: &str) {
        let header_value =
            request.headers.get(key).unwrap_or_else(|| panic!("Header '{key}' not present"));

        assert_eq!(header_value.to_str().unwrap(), value, "Header '{key}' has unexpected value");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_server_starts() {
        let server = MockServer::start().await;
        assert!(server.url().starts_with("http://"));
        assert_eq!(server.endpoint_url("/hook"), format!("{}/hook", server.url()));
    }

    #[tokio::test]
    async fn records_json_bodies() {
        let server = MockServer::start().await;
        server
            .mock_endpoint(MockEndpoint::success("/webhook").with_header("x-custom", "yes"))
            .await;

        let response = reqwest::Client::new()
            .post(server.endpoint_url("/webhook"))
            .header("x-custom", "yes")
            .json(&serde_json::json!({"a": 1}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);

        let bodies = server.wait_for_requests(1, Duration::from_secs(1)).await;
        assert_eq!(bodies, vec![serde_json::json!({"a": 1})]);
        server.assert_request_count(1).await;
    }
}
