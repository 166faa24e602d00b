//! Background processing for `POST /example/process-text`.

use std::sync::Arc;

use relay_core::{process_text, Clock, OperationId, StepCall, StepResult};
use relay_delivery::WebhookClient;
use tracing::{error, info, instrument};

/// Runs the text pipeline for step calls and reports a [`StepResult`].
#[derive(Debug, Clone)]
pub struct TextProcessingService {
    webhook: WebhookClient,
    clock: Arc<dyn Clock>,
}

impl TextProcessingService {
    /// Creates a new text processing service.
    pub fn new(webhook: WebhookClient, clock: Arc<dyn Clock>) -> Self {
        Self { webhook, clock }
    }

    /// Builds the step result for `call` without dispatching it.
    pub fn build_result(
        &self,
        operation_id: OperationId,
        call: &StepCall,
    ) -> relay_core::Result<StepResult> {
        let data = process_text(&call.initial.input, self.clock.now_utc())?.into_object()?;
        Ok(StepResult::single(call.step.id, operation_id, call.variables.clone(), data))
    }

    /// Processes a step call and reports the outcome.
    ///
    /// Any failure is reported once as a step result whose only output is
    /// `{"error": ...}`; a failure of that report is logged.
    #[instrument(
        name = "process_text",
        skip(self, call),
        fields(operation_id = %operation_id, step_id = %call.step.id, webhook_url = %call.webhook.url)
    )]
    pub async fn process(&self, operation_id: OperationId, call: StepCall) {
        info!("Processing text");
        let webhook_url = call.webhook.url.as_str();

        let failure = match self.build_result(operation_id, &call) {
            Ok(result) => match self.webhook.send_webhook(webhook_url, &result, operation_id).await {
                Ok(_) => {
                    info!("Text processed");
                    return;
                },
                Err(e) => e.to_string(),
            },
            Err(e) => {
                error!(error = %e, code = e.code(), "Text processing failed");
                e.to_string()
            },
        };

        let result = StepResult::error(call.step.id, operation_id, call.variables.clone(), failure);
        if let Err(e) = self.webhook.send_webhook(webhook_url, &result, operation_id).await {
            error!(error = %e, "Failed to send error webhook");
        }
    }
}
