use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// The send half of a message-framed connection.
///
/// Each `send` call transmits one discrete message. The transport's own
/// framing preserves the message boundary, and a call is atomic with
/// respect to other calls on the same half: it either transmits the
/// whole message or fails without transmitting part of it.
#[async_trait]
pub trait MessageSender: Send + 'static {
    /// Send one message.
    async fn send(&mut self, message: Bytes) -> Result<()>;

    /// Close the connection gracefully.
    ///
    /// After close, the peer's receiver observes end-of-stream rather
    /// than an error. Sending after close fails with
    /// [`TransportError::Closed`](crate::TransportError::Closed).
    async fn close(&mut self) -> Result<()>;
}

/// The receive half of a message-framed connection.
#[async_trait]
pub trait MessageReceiver: Send + 'static {
    /// Receive the next message.
    ///
    /// Messages arrive in the order the peer sent them, one whole
    /// message per call. Returns `Ok(None)` when the peer closed the
    /// connection gracefully.
    async fn recv(&mut self) -> Result<Option<Bytes>>;
}

/// A full-duplex, message-framed connection that can be split into
/// independently owned send and receive halves.
///
/// The split is what lets one task own the receive path while another
/// serializes sends; neither half can interfere with the other.
pub trait MessageTransport {
    type Sender: MessageSender;
    type Receiver: MessageReceiver;

    /// Split into send and receive halves.
    fn into_split(self) -> (Self::Sender, Self::Receiver);
}
