/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A zero-byte message was received where a frame was expected.
    ///
    /// Every frame carries at least its stream-index byte; the transport
    /// reports graceful close out of band, so no data message may be
    /// empty. Fatal to the connection.
    #[error("malformed frame: empty message")]
    EmptyMessage,

    /// The encoded frame would exceed the transport's maximum message size.
    #[error("payload too large ({size} bytes, frame limit {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
