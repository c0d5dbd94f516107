use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A terminal-resize event carried on the resize channel.
///
/// Serialized as the JSON document the Kubernetes remoting protocol
/// sends on stream index 4: `{"Width":80,"Height":24}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSize {
    /// Terminal width in columns.
    #[serde(rename = "Width")]
    pub width: u16,
    /// Terminal height in rows.
    #[serde(rename = "Height")]
    pub height: u16,
}

impl TerminalSize {
    /// Create a resize event.
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Encode as a resize-channel payload.
    pub fn to_payload(&self) -> Result<Bytes> {
        Ok(serde_json::to_vec(self)?.into())
    }

    /// Decode from a resize-channel payload.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}
