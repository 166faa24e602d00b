//! Error types for request validation and background processing.
//!
//! Processing errors never reach the HTTP caller: background services turn
//! them into error payloads for the caller's webhook. Each variant carries a
//! stable code for log correlation.

use serde::Serialize;
use thiserror::Error;

/// Result type alias using `ProcessingError`.
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Failures raised while transforming an accepted payload.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The `text` input was missing or empty.
    #[error("Text is required")]
    TextRequired,

    /// An input field had the wrong shape or type.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A result could not be assembled into JSON.
    #[error("Failed to build result: {0}")]
    ResultEncoding(String),
}

impl ProcessingError {
    /// Returns the stable error code for this failure.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::TextRequired => "text_required",
            Self::InvalidInput(_) => "invalid_input",
            Self::ResultEncoding(_) => "result_encoding",
        }
    }
}

/// One request validation failure, located by its path in the body.
///
/// Serializes as `{"loc": [...], "msg": "...", "type": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Path to the offending field, starting at `body`.
    pub loc: Vec<String>,
    /// Human-readable description.
    pub msg: String,
    /// Machine-readable error kind.
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    /// Creates a field error for the given body path.
    pub fn new(loc: &[&str], msg: impl Into<String>, kind: impl Into<String>) -> Self {
        let loc = std::iter::once("body").chain(loc.iter().copied()).map(String::from).collect();
        Self { loc, msg: msg.into(), kind: kind.into() }
    }
}
