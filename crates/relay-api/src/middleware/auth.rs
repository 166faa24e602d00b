//! Static bearer token authentication.
//!
//! Every path except `/health` requires `Authorization: Bearer <token>`
//! matching the configured `AUTH_TOKEN`.

use axum::{
    body::Body,
    extract::State,
    http::{header::WWW_AUTHENTICATE, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::AppState;

/// Paths served without authentication.
const PUBLIC_PATHS: [&str; 1] = ["/health"];

/// Extracts the raw Authorization header value.
fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers.get("authorization").and_then(|v| v.to_str().ok())
}

/// Extracts the token from a `Bearer <token>` header value.
fn extract_bearer_token(value: &str) -> Option<&str> {
    value.strip_prefix("Bearer ")
}

/// Errors that can occur during token authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The Authorization header is missing from the request.
    #[error("Missing Authorization header")]
    MissingHeader,
    /// The header does not use the Bearer scheme.
    #[error("Invalid Authorization header format")]
    InvalidFormat,
    /// The token does not match.
    #[error("Invalid authentication token")]
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let mut response =
            (StatusCode::UNAUTHORIZED, Json(json!({ "detail": self.to_string() }))).into_response();
        response.headers_mut().insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        response
    }
}

/// Checks the request's bearer token against `expected`.
fn authenticate(headers: &HeaderMap, expected: &str) -> Result<(), AuthError> {
    let value = authorization_header(headers).ok_or(AuthError::MissingHeader)?;
    let token = extract_bearer_token(value).ok_or(AuthError::InvalidFormat)?;

    if token == expected {
        Ok(())
    } else {
        Err(AuthError::InvalidToken)
    }
}

/// Axum middleware that authenticates requests with the static token.
pub async fn auth_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    if PUBLIC_PATHS.contains(&req.uri().path()) {
        return Ok(next.run(req).await);
    }

    if let Err(e) = authenticate(req.headers(), &state.config.auth_token) {
        warn!(path = %req.uri().path(), reason = %e, "Authentication failed");
        return Err(e);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn extract_token_from_bearer_header() {
        assert_eq!(extract_bearer_token("Bearer test-token-12345"), Some("test-token-12345"));
        assert_eq!(extract_bearer_token("Basic dXNlcjpwYXNz"), None);
    }

    #[test]
    fn authenticate_accepts_matching_token() {
        assert_eq!(authenticate(&headers("Bearer secret"), "secret"), Ok(()));
    }

    #[test]
    fn authenticate_distinguishes_failures() {
        assert_eq!(authenticate(&HeaderMap::new(), "secret"), Err(AuthError::MissingHeader));
        assert_eq!(authenticate(&headers("Token secret"), "secret"), Err(AuthError::InvalidFormat));
        assert_eq!(authenticate(&headers("Bearer wrong"), "secret"), Err(AuthError::InvalidToken));
    }
}
