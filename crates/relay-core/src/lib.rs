//! Core domain models and processing for the relay service.
//!
//! Provides the request and result schemas, request validation, the text
//! pipeline run for step calls, and the clock abstraction used for
//! timestamps. Nothing here performs I/O.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod text;
pub mod time;

pub use error::{FieldError, ProcessingError, Result};
pub use models::{
    HealthResponse, HealthStatus, JsonObject, OperationId, OperationRequest, OperationResult,
    OperationStatus, StepCall, StepId, StepResult, Validate, WebhookPayload,
};
pub use text::{process_text, TextOperation, TextOptions, TextResult};
pub use time::{format_timestamp, Clock, RealClock, TestClock};
