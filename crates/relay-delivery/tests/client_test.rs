//! Integration tests for webhook dispatch failure modes.

use std::time::Duration;

use relay_core::{OperationId, WebhookPayload};
use relay_delivery::{ClientConfig, DispatchError, ErrorCategory, WebhookClient};
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

fn client(timeout: Duration) -> WebhookClient {
    WebhookClient::new(ClientConfig {
        timeout,
        auth_token: "integration-token".to_string(),
        ..ClientConfig::default()
    })
    .expect("client should build")
}

fn payload(operation_id: OperationId) -> WebhookPayload {
    WebhookPayload::failed(operation_id, "boom", chrono::Utc::now())
}

#[tokio::test]
async fn slow_receiver_is_a_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let operation_id = OperationId::new();
    let err = client(Duration::from_millis(200))
        .send_webhook(&mock_server.uri(), &payload(operation_id), operation_id)
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Timeout { .. }), "unexpected error: {err:?}");
    assert_eq!(ErrorCategory::from(&err), ErrorCategory::Network);
}

#[tokio::test]
async fn refused_connection_is_a_network_error() {
    let mock_server = MockServer::start().await;
    let url = mock_server.uri();
    drop(mock_server);

    let operation_id = OperationId::new();
    let err = client(Duration::from_secs(2))
        .send_webhook(&url, &payload(operation_id), operation_id)
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Network { .. }), "unexpected error: {err:?}");
}

#[tokio::test]
async fn not_found_is_a_client_error() {
    let mock_server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such hook"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let operation_id = OperationId::new();
    let err = client(Duration::from_secs(2))
        .send_webhook(&mock_server.uri(), &payload(operation_id), operation_id)
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(404));
    assert_eq!(ErrorCategory::from(&err), ErrorCategory::Client);
}

#[tokio::test]
async fn payload_serialized_as_sent() {
    let mock_server = MockServer::start().await;
    let operation_id = OperationId::new();

    Mock::given(matchers::method("POST"))
        .and(matchers::body_partial_json(serde_json::json!({
            "operation_id": operation_id.to_string(),
            "status": "failed",
            "result": null,
            "error": "boom",
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = client(Duration::from_secs(2))
        .send_webhook(&mock_server.uri(), &payload(operation_id), operation_id)
        .await
        .expect("dispatch should succeed");

    assert_eq!(response.status_code, 202);
}
