//! HTTP request handlers for the relay API.
//!
//! Intake handlers validate the body, generate an operation identifier,
//! spawn background processing on the shared task tracker and return
//! immediately with the identifier in `X-Operation-ID`.
//!
//! - `operations` - `POST /operations/process`
//! - `example` - `POST /example/process-text`
//! - `health` - `GET /health` and `GET /`

pub mod example;
pub mod health;
pub mod operations;

pub use example::process_text;
pub use health::{health_check, service_info};
pub use operations::process_operation;
