use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Framing overhead per message: the stream-index prefix.
pub const INDEX_SIZE: usize = 1;

/// Default maximum message size (index byte + payload): 16 MiB.
///
/// Stands in for the transport's own message limit; callers whose
/// transport enforces a different limit pass it through [`FrameConfig`].
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// One unit of wire transfer: a stream index and its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The logical stream this payload belongs to.
    pub index: u8,
    /// The payload. May be empty — an empty write is a valid frame,
    /// distinct from end-of-stream.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(index: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            index,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (index byte + payload).
    pub fn wire_size(&self) -> usize {
        INDEX_SIZE + self.payload.len()
    }
}

/// Encode a payload into a single wire message for the given stream index.
///
/// Wire format (the transport provides the message boundary):
/// ```text
/// ┌────────────┬──────────────────┐
/// │ Index (1B) │ Payload (0..N B) │
/// └────────────┴──────────────────┘
/// ```
/// The caller's payload is copied verbatim and never mutated. Fails if
/// the index byte plus payload would exceed `max_message_size`.
pub fn encode_frame(index: u8, payload: &[u8], max_message_size: usize) -> Result<Bytes> {
    let wire_size = INDEX_SIZE + payload.len();
    if wire_size > max_message_size {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: max_message_size,
        });
    }
    let mut buf = BytesMut::with_capacity(wire_size);
    buf.put_u8(index);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Decode one received message into a frame.
///
/// The first byte is the stream index; the remainder (possibly empty) is
/// the payload, referenced without copying. A zero-byte message is
/// malformed — see [`FrameError::EmptyMessage`].
pub fn decode_frame(mut message: Bytes) -> Result<Frame> {
    if message.is_empty() {
        return Err(FrameError::EmptyMessage);
    }
    let index = message.split_to(INDEX_SIZE)[0];
    Ok(Frame {
        index,
        payload: message,
    })
}

/// Framing limits.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum message size (index byte + payload) the transport
    /// accepts. Default: 16 MiB.
    pub max_message_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}
