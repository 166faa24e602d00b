//! HTTP error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use relay_core::FieldError;
use serde::Serialize;
use thiserror::Error;

/// Errors returned to HTTP callers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body failed schema validation.
    #[error("Validation error")]
    Validation {
        /// Every violation found.
        errors: Vec<FieldError>,
    },

    /// An unexpected failure while serving the request.
    #[error("Internal server error")]
    Internal {
        /// Message shown to the caller.
        message: String,
    },
}

impl ApiError {
    /// Creates an internal error, hiding `message` unless `debug` is set.
    pub fn internal(message: impl Into<String>, debug: bool) -> Self {
        let message = if debug { message.into() } else { "An error occurred".to_string() };
        Self::Internal { message }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [FieldError]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();

        let body = match &self {
            Self::Validation { errors } => {
                ErrorBody { detail, errors: Some(errors), error: None }
            },
            Self::Internal { message } => ErrorBody { detail, errors: None, error: Some(message) },
        };

        (status, Json(body)).into_response()
    }
}
