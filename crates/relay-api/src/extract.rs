//! JSON body extraction with validation.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use relay_core::{FieldError, Validate};
use relay_delivery::ErrorContext;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::{error::ApiError, AppState, OPERATION_ID_HEADER};

/// JSON body that has been deserialized and passed [`Validate`].
///
/// Every rejection becomes a `422` with the field errors, and raises a
/// best-effort alert.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T> FromRequest<AppState> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let endpoint = req.uri().path().to_string();
        let operation_id = req
            .headers()
            .get(OPERATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        let result = match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => value.validate().map(|()| value),
            Err(rejection) => Err(vec![rejection_error(&rejection)]),
        };

        result.map(Self).map_err(|errors| {
            warn!(endpoint = %endpoint, errors = ?errors, "Validation error");
            alert_validation_error(state, &errors, &endpoint, &operation_id);
            ApiError::Validation { errors }
        })
    }
}

fn rejection_error(rejection: &JsonRejection) -> FieldError {
    let kind = match rejection {
        JsonRejection::JsonDataError(_) => "value_error",
        JsonRejection::JsonSyntaxError(_) => "json_invalid",
        JsonRejection::MissingJsonContentType(_) => "content_type",
        _ => "body",
    };
    FieldError::new(&[], rejection.body_text(), kind)
}

fn alert_validation_error(state: &AppState, errors: &[FieldError], endpoint: &str, operation_id: &str) {
    let message = format!(
        "Validation error: {}",
        errors.iter().map(|e| e.msg.as_str()).collect::<Vec<_>>().join("; ")
    );
    let alerts = state.alerts.clone();
    let endpoint = endpoint.to_string();
    let operation_id = operation_id.to_string();

    state.tasks.spawn(async move {
        let context = ErrorContext { operation_id: Some(&operation_id), endpoint: Some(&endpoint) };
        alerts.send_error_alert(&message, "validation_error", context).await;
    });
}

