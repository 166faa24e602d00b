//! Asynchronous operation intake.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use relay_core::{OperationId, OperationRequest};
use tracing::{info, instrument};

use crate::{extract::ValidatedJson, AppState, OPERATION_ID_HEADER};

/// Accepts an operation, spawns its processing and returns `204`.
///
/// The generated identifier is returned in `X-Operation-ID` and repeated as
/// `operation_id` in the webhook payload.
#[instrument(name = "accept_operation", skip_all, fields(webhook_url = %request.webhook_url))]
pub async fn process_operation(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<OperationRequest>,
) -> impl IntoResponse {
    let operation_id = OperationId::new();
    info!(operation_id = %operation_id, "Operation accepted");

    let service = state.operations.clone();
    state.tasks.spawn(async move { service.process(operation_id, request).await });

    (StatusCode::NO_CONTENT, [(OPERATION_ID_HEADER, operation_id.to_string())])
}
