//! Request and result schemas exchanged with callers and webhook receivers.
//!
//! Every value here lives for a single request: requests are deserialized by
//! the HTTP layer, results are built once by a background service and handed
//! to the dispatcher unchanged.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;
use uuid::Uuid;

use crate::error::FieldError;

/// Arbitrary JSON object payload.
pub type JsonObject = Map<String, Value>;

/// Identifier generated for each accepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(pub Uuid);

impl OperationId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for OperationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Identifier of a pipeline step, supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub Uuid);

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for StepId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Semantic checks that run after a body has been deserialized.
pub trait Validate {
    /// Returns every violation found, or `Ok(())` when the value is usable.
    fn validate(&self) -> Result<(), Vec<FieldError>>;
}

/// Checks that a webhook destination is an absolute http(s) URL.
fn check_webhook_url(url: &Url, loc: &[&str], errors: &mut Vec<FieldError>) {
    if !matches!(url.scheme(), "http" | "https") {
        errors.push(FieldError::new(
            loc,
            format!("URL scheme should be 'http' or 'https', got '{}'", url.scheme()),
            "url_scheme",
        ));
    }
}

/// Body of `POST /operations/process`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRequest {
    /// Destination for the operation result.
    pub webhook_url: Url,
    /// Operation input.
    pub data: JsonObject,
}

impl Validate for OperationRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        check_webhook_url(&self.webhook_url, &["webhook_url"], &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Step being executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRef {
    /// Step identifier.
    pub id: StepId,
}

/// Webhook target of a step call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepWebhook {
    /// Destination for the step result.
    pub url: Url,
}

/// Output of the previous pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviousResult {
    /// Previous step output.
    pub output: JsonObject,
}

/// Initial pipeline input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialInput {
    /// Input payload for this step.
    pub input: JsonObject,
}

/// Body of `POST /example/process-text`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepCall {
    /// Step being executed.
    pub step: StepRef,
    /// Where to report the result.
    pub webhook: StepWebhook,
    /// Previous step output, if any.
    #[serde(default)]
    pub previous: Option<PreviousResult>,
    /// Initial input.
    pub initial: InitialInput,
    /// Free-form pipeline variables, echoed back in the result.
    #[serde(default)]
    pub variables: JsonObject,
}

impl Validate for StepCall {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        check_webhook_url(&self.webhook.url, &["webhook", "url"], &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Terminal status reported for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    /// Processing finished and `result` is set.
    Completed,
    /// Processing failed and `error` is set.
    Failed,
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Result of operation processing: the input echoed with a timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult {
    /// The original `data` object.
    pub processed_data: JsonObject,
    /// When processing finished.
    pub processed_at: DateTime<Utc>,
    /// Operation this result belongs to.
    pub operation_id: OperationId,
}

/// Webhook body reporting the outcome of an operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Operation identifier, equal to the `X-Operation-ID` response header.
    pub operation_id: OperationId,
    /// Outcome of the operation.
    pub status: OperationStatus,
    /// Result data on success.
    pub result: Option<Value>,
    /// Error message on failure.
    pub error: Option<String>,
    /// When the payload was built.
    pub timestamp: DateTime<Utc>,
}

impl WebhookPayload {
    /// Builds a success payload.
    pub fn completed(operation_id: OperationId, result: Value, timestamp: DateTime<Utc>) -> Self {
        Self {
            operation_id,
            status: OperationStatus::Completed,
            result: Some(result),
            error: None,
            timestamp,
        }
    }

    /// Builds a failure payload.
    pub fn failed(
        operation_id: OperationId,
        error: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            operation_id,
            status: OperationStatus::Failed,
            result: None,
            error: Some(error.into()),
            timestamp,
        }
    }
}

/// Operation reference inside a step result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRef {
    /// Operation identifier.
    pub operation_id: OperationId,
}

/// One output record of a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutput {
    /// Output data.
    pub data: JsonObject,
}

/// Webhook body reporting the outcome of a step call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Step that produced the result.
    pub step: StepRef,
    /// Operation the step ran under.
    pub operation: OperationRef,
    /// Variables from the originating call.
    pub variables: JsonObject,
    /// Output records.
    pub outputs: Vec<StepOutput>,
}

impl StepResult {
    /// Builds a result with a single output record.
    pub fn single(
        step_id: StepId,
        operation_id: OperationId,
        variables: JsonObject,
        data: JsonObject,
    ) -> Self {
        Self {
            step: StepRef { id: step_id },
            operation: OperationRef { operation_id },
            variables,
            outputs: vec![StepOutput { data }],
        }
    }

    /// Builds a result whose only output is `{"error": <message>}`.
    pub fn error(
        step_id: StepId,
        operation_id: OperationId,
        variables: JsonObject,
        message: impl Into<String>,
    ) -> Self {
        let mut data = JsonObject::new();
        data.insert("error".to_string(), Value::String(message.into()));
        Self::single(step_id, operation_id, variables, data)
    }

    /// Returns the operation identifier.
    pub fn operation_id(&self) -> OperationId {
        self.operation.operation_id
    }
}

/// Health status reported by `GET /health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Service is operational.
    Healthy,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    /// Configured service name.
    pub service_name: String,
    /// Configured service version.
    pub version: String,
    /// Human-readable uptime, e.g. `1d 2h 3m 4s`.
    pub uptime: String,
    /// When the check ran.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn step_call(body: Value) -> StepCall {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn operation_request_requires_webhook_url() {
        let result = serde_json::from_value::<OperationRequest>(json!({"data": {"input": "x"}}));
        assert!(result.is_err());
    }

    #[test]
    fn operation_request_rejects_non_http_scheme() {
        let request: OperationRequest = serde_json::from_value(json!({
            "webhook_url": "ftp://files.example.com/drop",
            "data": {}
        }))
        .unwrap();

        let errors = request.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].loc, vec!["body", "webhook_url"]);
        assert_eq!(errors[0].kind, "url_scheme");
    }

    #[test]
    fn step_call_defaults_optional_fields() {
        let call = step_call(json!({
            "step": {"id": "550e8400-e29b-41d4-a716-446655440000"},
            "webhook": {"url": "https://test.example.com/webhook"},
            "initial": {"input": {"text": "Hello"}}
        }));

        assert!(call.previous.is_none());
        assert!(call.variables.is_empty());
        assert!(call.validate().is_ok());
    }

    #[test]
    fn step_call_rejects_invalid_step_id() {
        let result = serde_json::from_value::<StepCall>(json!({
            "step": {"id": "not-a-uuid"},
            "webhook": {"url": "https://test.example.com/webhook"},
            "initial": {"input": {}},
            "variables": {}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn webhook_payload_serializes_nulls() {
        let operation_id = OperationId::new();
        let payload = WebhookPayload::failed(operation_id, "boom", Utc::now());
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["operation_id"], operation_id.to_string());
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");
        assert!(json["result"].is_null());
    }

    #[test]
    fn step_error_result_wraps_message() {
        let step_id = StepId(Uuid::new_v4());
        let operation_id = OperationId::new();
        let result = StepResult::error(step_id, operation_id, JsonObject::new(), "Text is required");
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["step"]["id"], step_id.to_string());
        assert_eq!(json["operation"]["operation_id"], operation_id.to_string());
        assert_eq!(json["outputs"], json!([{"data": {"error": "Text is required"}}]));
    }
}
