use std::sync::Arc;

use wsmux_frame::FrameError;
use wsmux_transport::TransportError;

/// Errors that can occur on a multiplexed connection.
#[derive(Debug, thiserror::Error)]
pub enum MuxError {
    /// Transport-level send/receive failure. Fatal to the connection.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame encoding/decoding failure.
    ///
    /// On the receive path this is fatal to the connection; on the send
    /// path (payload over the message limit) it is returned to the
    /// calling writer only.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A read stream is already registered for this index.
    #[error("stream index {0} already bound")]
    IndexAlreadyBound(u8),

    /// The operation was attempted after the connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// The connection faulted. Every logical stream the fault was
    /// broadcast to shares the original error.
    #[error("connection faulted: {0}")]
    Faulted(Arc<MuxError>),

    /// A structured control payload failed to encode or decode.
    #[error("control payload error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MuxError>;
