//! In-process paired transport.
//!
//! Two endpoints connected back to back over bounded channels. Messages
//! sent on one endpoint arrive whole and in order on the other, which is
//! exactly the contract a real message-framed connection provides.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{MessageReceiver, MessageSender, MessageTransport};

/// Default per-direction message buffer depth for [`pair`].
pub const DEFAULT_PAIR_CAPACITY: usize = 64;

/// One endpoint of an in-process transport pair.
pub struct MemoryTransport {
    sender: MemorySender,
    receiver: MemoryReceiver,
}

/// Send half of a [`MemoryTransport`].
pub struct MemorySender {
    tx: Option<mpsc::Sender<Bytes>>,
}

/// Receive half of a [`MemoryTransport`].
pub struct MemoryReceiver {
    rx: mpsc::Receiver<Bytes>,
}

/// Create a connected transport pair with the default buffer depth.
pub fn pair() -> (MemoryTransport, MemoryTransport) {
    pair_with_capacity(DEFAULT_PAIR_CAPACITY)
}

/// Create a connected transport pair with an explicit per-direction
/// buffer depth.
pub fn pair_with_capacity(capacity: usize) -> (MemoryTransport, MemoryTransport) {
    let (left_tx, right_rx) = mpsc::channel(capacity.max(1));
    let (right_tx, left_rx) = mpsc::channel(capacity.max(1));
    (
        MemoryTransport {
            sender: MemorySender { tx: Some(left_tx) },
            receiver: MemoryReceiver { rx: left_rx },
        },
        MemoryTransport {
            sender: MemorySender { tx: Some(right_tx) },
            receiver: MemoryReceiver { rx: right_rx },
        },
    )
}

impl MessageTransport for MemoryTransport {
    type Sender = MemorySender;
    type Receiver = MemoryReceiver;

    fn into_split(self) -> (MemorySender, MemoryReceiver) {
        (self.sender, self.receiver)
    }
}

#[async_trait]
impl MessageSender for MemorySender {
    async fn send(&mut self, message: Bytes) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(message).await.map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the channel sender is what the peer observes as
        // graceful end-of-stream.
        if self.tx.take().is_some() {
            debug!("memory transport closed");
        }
        Ok(())
    }
}

#[async_trait]
impl MessageReceiver for MemoryReceiver {
    async fn recv(&mut self) -> Result<Option<Bytes>> {
        Ok(self.rx.recv().await)
    }
}
