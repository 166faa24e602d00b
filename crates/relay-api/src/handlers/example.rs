//! Step call intake for the example text pipeline.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use relay_core::{OperationId, StepCall};
use tracing::{info, instrument};

use crate::{extract::ValidatedJson, AppState, OPERATION_ID_HEADER};

/// Accepts a step call, spawns text processing and returns `202`.
#[instrument(
    name = "accept_step_call",
    skip_all,
    fields(step_id = %call.step.id, webhook_url = %call.webhook.url)
)]
pub async fn process_text(
    State(state): State<AppState>,
    ValidatedJson(call): ValidatedJson<StepCall>,
) -> impl IntoResponse {
    let operation_id = OperationId::new();
    info!(operation_id = %operation_id, "Step call accepted");

    let service = state.text.clone();
    state.tasks.spawn(async move { service.process(operation_id, call).await });

    (StatusCode::ACCEPTED, [(OPERATION_ID_HEADER, operation_id.to_string())])
}
