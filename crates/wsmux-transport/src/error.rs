/// Errors that can occur in message transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection is closed; no further messages can be sent.
    #[error("transport closed")]
    Closed,

    /// An I/O error occurred on the underlying connection.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
