//! Error types for webhook dispatch.
//!
//! Dispatch is attempted exactly once; every variant is terminal. The
//! category is kept for log fields so failures can be grouped.

use std::fmt;

use thiserror::Error;

/// Result type alias for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Failures of a single outbound webhook POST.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// Connection could not be established or was interrupted.
    #[error("network connection failed: {message}")]
    Network {
        /// Description of the transport failure
        message: String,
    },

    /// The request exceeded the configured timeout.
    #[error("request timeout after {timeout_seconds}s")]
    Timeout {
        /// Timeout that was exceeded
        timeout_seconds: u64,
    },

    /// The receiver answered with a non-2xx status.
    #[error("webhook returned HTTP {status_code}")]
    HttpStatus {
        /// HTTP status code
        status_code: u16,
        /// Response body, truncated
        body: String,
    },

    /// The payload could not be serialized.
    #[error("failed to serialize payload: {message}")]
    Serialization {
        /// Serializer error message
        message: String,
    },

    /// The HTTP client could not be built.
    #[error("invalid client configuration: {message}")]
    Configuration {
        /// Configuration error message
        message: String,
    },
}

impl DispatchError {
    /// Creates a network error from a message.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(timeout_seconds: u64) -> Self {
        Self::Timeout { timeout_seconds }
    }

    /// Creates an error for a non-2xx response.
    pub fn http_status(status_code: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus { status_code, body: body.into() }
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Returns the HTTP status code when the receiver answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

/// Category of dispatch error for log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transport failures and timeouts.
    Network,
    /// 4xx responses.
    Client,
    /// 5xx responses.
    Server,
    /// Any other status outside 2xx.
    Unexpected,
    /// Payload or client setup problems.
    Internal,
}

impl From<&DispatchError> for ErrorCategory {
    fn from(error: &DispatchError) -> Self {
        match error {
            DispatchError::Network { .. } | DispatchError::Timeout { .. } => Self::Network,
            DispatchError::HttpStatus { status_code: 400..=499, .. } => Self::Client,
            DispatchError::HttpStatus { status_code: 500..=599, .. } => Self::Server,
            DispatchError::HttpStatus { .. } => Self::Unexpected,
            DispatchError::Serialization { .. } | DispatchError::Configuration { .. } => {
                Self::Internal
            },
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Client => write!(f, "client"),
            Self::Server => write!(f, "server"),
            Self::Unexpected => write!(f, "unexpected"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
