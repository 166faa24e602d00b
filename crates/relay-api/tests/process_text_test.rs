//! Integration tests for `POST /example/process-text`.

use axum::http::StatusCode;
use relay_testing::{MockEndpoint, TestEnv};
use serde_json::{json, Value};

const STEP_ID: &str = "0b8f6a3e-5c1d-4e2f-9a7b-3c4d5e6f7a8b";

fn step_call(env: &TestEnv, input: Value) -> Value {
    json!({
        "step": {"id": STEP_ID},
        "webhook": {"url": env.webhook_url("/step")},
        "initial": {"input": input},
        "variables": {"pipeline": "demo"},
    })
}

async fn run(env: &TestEnv, body: &Value) -> (String, Vec<Value>) {
    env.webhook.mock_endpoint(MockEndpoint::success("/step")).await;

    let response = env.post_json("/example/process-text", body).await.expect("request execution");
    assert_eq!(response.status, StatusCode::ACCEPTED);
    let operation_id = response.operation_id().expect("missing X-Operation-ID").to_string();

    env.wait_for_background_tasks().await.expect("background tasks");
    (operation_id, env.webhook.received_json_bodies().await)
}

/// Test uppercase with the default timestamp prefix.
#[tokio::test]
async fn uppercase_is_delivered_with_timestamp() {
    let env = TestEnv::new().await.expect("test env setup");

    let body = step_call(&env, json!({"text": "hello world", "operation": "uppercase"}));
    let (operation_id, bodies) = run(&env, &body).await;

    assert_eq!(bodies.len(), 1);
    let result = &bodies[0];
    assert_eq!(result["step"]["id"], STEP_ID);
    assert_eq!(result["operation"]["operation_id"], operation_id);
    assert_eq!(result["variables"], json!({"pipeline": "demo"}));

    let data = &result["outputs"][0]["data"];
    assert_eq!(data["processed_text"], "[2024-01-15T10:30:00.000000Z] HELLO WORLD");
    assert_eq!(data["original_text"], "hello world");
    assert_eq!(data["length"], 41);
    assert_eq!(data["language"], "en");
    assert_eq!(
        data["processing_options"],
        json!({
            "max_length": 1000,
            "preserve_spaces": true,
            "remove_punctuation": false,
            "add_timestamp": true,
            "custom_delimiter": " ",
        })
    );
}

/// Test reverse without a timestamp.
#[tokio::test]
async fn reverse_is_delivered() {
    let env = TestEnv::new().await.expect("test env setup");

    let body = step_call(
        &env,
        json!({"text": "Hello World", "operation": "reverse", "add_timestamp": false}),
    );
    let (_, bodies) = run(&env, &body).await;

    assert_eq!(bodies[0]["outputs"][0]["data"]["processed_text"], "dlroW olleH");
}

/// Test omitted variables default to an empty object.
#[tokio::test]
async fn omitted_variables_default_to_empty_object() {
    let env = TestEnv::new().await.expect("test env setup");

    let mut body = step_call(&env, json!({"text": "x", "add_timestamp": false}));
    body.as_object_mut().expect("object").remove("variables");
    let (_, bodies) = run(&env, &body).await;

    assert_eq!(bodies[0]["variables"], json!({}));
}

/// Test missing text is reported to the webhook rather than the caller.
#[tokio::test]
async fn missing_text_is_reported_as_error_output() {
    let env = TestEnv::new().await.expect("test env setup");

    let body = step_call(&env, json!({"operation": "uppercase"}));
    let (_, bodies) = run(&env, &body).await;

    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["outputs"], json!([{"data": {"error": "Text is required"}}]));
    assert_eq!(bodies[0]["variables"], json!({"pipeline": "demo"}));
}

/// Test wrongly typed options are reported to the webhook.
#[tokio::test]
async fn wrongly_typed_option_is_reported_as_error_output() {
    let env = TestEnv::new().await.expect("test env setup");

    let body = step_call(&env, json!({"text": "abc", "max_length": "ten"}));
    let (_, bodies) = run(&env, &body).await;

    let error = bodies[0]["outputs"][0]["data"]["error"].as_str().expect("error message");
    assert!(error.starts_with("Invalid input"), "unexpected error: {error}");
}

/// Test an invalid step id fails validation.
#[tokio::test]
async fn invalid_step_id_is_unprocessable() {
    let env = TestEnv::new().await.expect("test env setup");

    let mut body = step_call(&env, json!({"text": "x"}));
    body["step"]["id"] = json!("not-a-uuid");

    let response = env.post_json("/example/process-text", &body).await.expect("request execution");

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.operation_id().is_none());
}

/// Test a missing webhook URL fails validation.
#[tokio::test]
async fn missing_webhook_is_unprocessable() {
    let env = TestEnv::new().await.expect("test env setup");

    let mut body = step_call(&env, json!({"text": "x"}));
    body.as_object_mut().expect("object").remove("webhook");

    let response = env.post_json("/example/process-text", &body).await.expect("request execution");

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json()["detail"], "Validation error");
}
