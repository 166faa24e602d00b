//! Outbound HTTP for the relay service.
//!
//! Two clients live here:
//!
//! - [`WebhookClient`] POSTs operation and step results to the webhook URL
//!   supplied by the caller, authenticated with the static webhook token.
//! - [`AlertClient`] POSTs alerts about HTTP-layer failures to an optional
//!   alert endpoint.
//!
//! Each dispatch is a single attempt bounded by a timeout. There is no
//! retry queue and no persistence; failures are logged and reported to the
//! caller, which decides whether to send an error payload instead.
//!
//! # Example
//!
//! ```no_run
//! use relay_core::{OperationId, WebhookPayload};
//! use relay_delivery::{ClientConfig, DispatchError, WebhookClient};
//!
//! # async fn example() -> std::result::Result<(), DispatchError> {
//! let client = WebhookClient::new(ClientConfig {
//!     auth_token: "secret".to_string(),
//!     ..ClientConfig::default()
//! })?;
//!
//! let operation_id = OperationId::new();
//! let payload = WebhookPayload::failed(operation_id, "boom", chrono::Utc::now());
//! client.send_webhook("https://example.com/hook", &payload, operation_id).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod alert;
pub mod client;
pub mod error;

pub use alert::{
    Alert, AlertClient, AlertConfig, AlertOutcome, AlertPayload, AlertPriority, ErrorContext,
};
pub use client::{ClientConfig, DeliveryResponse, WebhookClient};
pub use error::{DispatchError, ErrorCategory, Result};

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
