//! Background processing for `POST /operations/process`.

use std::sync::Arc;

use relay_core::{
    Clock, JsonObject, OperationId, OperationRequest, OperationResult, ProcessingError,
    WebhookPayload,
};
use relay_delivery::WebhookClient;
use serde_json::Value;
use tracing::{error, info, instrument};

/// Echoes operation input back to the caller's webhook.
#[derive(Debug, Clone)]
pub struct OperationService {
    webhook: WebhookClient,
    clock: Arc<dyn Clock>,
}

impl OperationService {
    /// Creates a new operation service.
    pub fn new(webhook: WebhookClient, clock: Arc<dyn Clock>) -> Self {
        Self { webhook, clock }
    }

    /// Builds the result record for `data`.
    pub fn build_result(
        &self,
        operation_id: OperationId,
        data: JsonObject,
    ) -> relay_core::Result<Value> {
        let result =
            OperationResult { processed_data: data, processed_at: self.clock.now_utc(), operation_id };

        serde_json::to_value(result).map_err(|e| ProcessingError::ResultEncoding(e.to_string()))
    }

    /// Processes an accepted operation and reports the outcome.
    ///
    /// Never fails: a processing or dispatch failure is logged and reported
    /// once as a `failed` payload, and a failure of that report is logged.
    #[instrument(
        name = "process_operation",
        skip(self, request),
        fields(operation_id = %operation_id, webhook_url = %request.webhook_url)
    )]
    pub async fn process(&self, operation_id: OperationId, request: OperationRequest) {
        info!("Processing operation");
        let webhook_url = request.webhook_url.as_str();

        let failure = match self.build_result(operation_id, request.data) {
            Ok(result) => {
                let payload = WebhookPayload::completed(operation_id, result, self.clock.now_utc());
                match self.webhook.send_webhook(webhook_url, &payload, operation_id).await {
                    Ok(_) => {
                        info!("Operation processed");
                        return;
                    },
                    Err(e) => e.to_string(),
                }
            },
            Err(e) => {
                error!(error = %e, code = e.code(), "Operation processing failed");
                e.to_string()
            },
        };

        error!(error = %failure, "Operation failed, reporting error to webhook");
        let payload = WebhookPayload::failed(operation_id, failure, self.clock.now_utc());
        if let Err(e) = self.webhook.send_webhook(webhook_url, &payload, operation_id).await {
            error!(error = %e, "Failed to send error webhook");
        }
    }
}
