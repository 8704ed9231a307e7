//! Celery v1 wire protocol types.
//!
//! This module defines the two message shapes exchanged with a worker
//! fleet:
//!
//! - **Envelope**: the outbound transport wrapper around a base64-encoded
//!   task message, pushed onto the queue list
//! - **ResultMessage**: the result payload a worker stores under the task
//!   id key once it has processed the task
//!
//! The JSON field names of both shapes are a compatibility contract with
//! third-party consumers and must not be altered.

pub mod envelope;
pub mod result;

// Re-export main types for convenience
pub use envelope::{DeliveryInfo, Envelope, Properties, ProtocolError, TaskMessage};
pub use result::ResultMessage;
