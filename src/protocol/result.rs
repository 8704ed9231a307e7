//! Result payload read back from the result backend.

use serde::{Deserialize, Serialize};

use super::envelope::ProtocolError;

/// The result object a worker stores under the task id key.
///
/// This client only interprets the *presence* of a decodable result;
/// `status`, `traceback` and `result` are carried opaquely for the caller
/// to inspect. Fields a worker omits default to their empty values, as
/// third-party backends are not uniform about which ones they write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMessage {
    #[serde(default)]
    pub task_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub traceback: serde_json::Value,
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default)]
    pub children: Vec<serde_json::Value>,
}

impl ResultMessage {
    /// Decodes a raw stored value.
    ///
    /// A malformed payload is a hard decode error. The not-yet-present
    /// state is signalled by the broker before decoding is attempted,
    /// never here.
    pub fn decode(raw: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(raw)?)
    }
}
