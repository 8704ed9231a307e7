//! Outbound task message encoding.
//!
//! A task is serialized in two layers: the [`TaskMessage`] JSON is base64
//! encoded into the `body` of an [`Envelope`], which carries the transport
//! metadata a Celery worker expects. Encoding is pure: beyond identifier
//! generation there is no I/O, and a serialization failure aborts before
//! anything is published.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Content type advertised for the encoded body.
const CONTENT_TYPE: &str = "application/json";

/// Content encoding of the serialized task message.
const CONTENT_ENCODING: &str = "utf-8";

/// Encoding of the envelope body field.
const BODY_ENCODING: &str = "base64";

/// Persistent delivery, matching the Celery default.
const DELIVERY_MODE_PERSISTENT: u8 = 2;

/// Errors that can occur while encoding or decoding protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The task name was empty.
    #[error("task name cannot be empty")]
    EmptyTaskName,

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An envelope body was not valid base64.
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// The logical unit of work sent to a worker.
///
/// Keyword arguments are unsupported: `kwargs` is always an empty
/// mapping and the whole payload travels in `args`. `eta` is always
/// unset (serialized as an explicit `null`) and `retries` is always zero
/// at submission; both fields exist because consumers expect them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskMessage {
    /// Task name as registered with the worker fleet.
    pub task: String,
    /// Producer-generated unique id, the correlation key for result lookup.
    pub id: String,
    /// Ordered positional arguments; empty but never absent.
    pub args: Vec<serde_json::Value>,
    /// Always an empty mapping.
    pub kwargs: serde_json::Map<String, serde_json::Value>,
    /// Optional scheduled time; always unset by this client.
    pub eta: Option<String>,
    /// Retry counter; always zero at submission.
    pub retries: u32,
}

impl TaskMessage {
    /// Creates a task message with a fresh unique id.
    ///
    /// `args` is taken as-is; an empty vector encodes as `[]`, never as
    /// `null` or a missing field.
    pub fn new(task: impl Into<String>, args: Vec<serde_json::Value>) -> Self {
        Self {
            task: task.into(),
            id: Uuid::new_v4().to_string(),
            args,
            kwargs: serde_json::Map::new(),
            eta: None,
            retries: 0,
        }
    }

    /// Serializes the message and base64-encodes it into an envelope body.
    fn to_body(&self) -> Result<String, ProtocolError> {
        let json = serde_json::to_vec(self)?;
        Ok(BASE64.encode(json))
    }

    /// Decodes a task message back out of an envelope body.
    pub fn from_body(body: &str) -> Result<Self, ProtocolError> {
        let json = BASE64.decode(body)?;
        Ok(serde_json::from_slice(&json)?)
    }
}

/// Transport wrapper around an encoded task message.
///
/// Field names (including the hyphenated ones) are part of the wire
/// contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Base64 of the serialized task message.
    pub body: String,
    /// Always `application/json`.
    #[serde(rename = "content-type")]
    pub content_type: String,
    /// Always `utf-8`.
    #[serde(rename = "content-encoding")]
    pub content_encoding: String,
    /// Delivery metadata block.
    pub properties: Properties,
}

/// Delivery metadata carried by an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Properties {
    /// Always `base64`.
    pub body_encoding: String,
    /// Fresh unique id, distinct from the task id.
    pub correlation_id: String,
    /// Fresh unique id.
    pub reply_to: String,
    /// Routing block; see [`DeliveryInfo`].
    pub delivery_info: DeliveryInfo,
    /// Always 2 (persistent).
    pub delivery_mode: u8,
    /// Fresh unique id.
    pub delivery_tag: String,
}

/// Routing block of an envelope.
///
/// Delivery uses a single flat list per queue rather than a routed
/// exchange topology, so `routing_key` and `exchange` both carry the queue
/// name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryInfo {
    pub priority: u8,
    pub routing_key: String,
    pub exchange: String,
}

impl Envelope {
    /// Wraps a task message for delivery on `queue`.
    ///
    /// Fresh correlation, reply-to and delivery-tag identifiers are
    /// generated per envelope.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::EmptyTaskName` for a message with no task
    /// name, or a JSON error if an argument value cannot be serialized.
    pub fn wrap(message: &TaskMessage, queue: &str) -> Result<Self, ProtocolError> {
        if message.task.is_empty() {
            return Err(ProtocolError::EmptyTaskName);
        }

        Ok(Self {
            body: message.to_body()?,
            content_type: CONTENT_TYPE.to_string(),
            content_encoding: CONTENT_ENCODING.to_string(),
            properties: Properties {
                body_encoding: BODY_ENCODING.to_string(),
                correlation_id: Uuid::new_v4().to_string(),
                reply_to: Uuid::new_v4().to_string(),
                delivery_info: DeliveryInfo {
                    priority: 0,
                    routing_key: queue.to_string(),
                    exchange: queue.to_string(),
                },
                delivery_mode: DELIVERY_MODE_PERSISTENT,
                delivery_tag: Uuid::new_v4().to_string(),
            },
        })
    }

    /// Serializes the envelope to its wire form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }
}
