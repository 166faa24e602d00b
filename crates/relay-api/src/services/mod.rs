//! Background services run after a request has been accepted.
//!
//! Handlers spawn these on the shared task tracker and never await them.
//! Each service owns a clone of the webhook client and reports exactly one
//! result, or one error payload, per accepted request.

pub mod operation;
pub mod text;

pub use operation::OperationService;
pub use text::TextProcessingService;
