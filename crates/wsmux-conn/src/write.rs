use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use wsmux_frame::encode_frame;

use crate::connection::{SendRequest, Shared};
use crate::error::Result;

/// A write-only logical stream bound to one stream index.
///
/// Every [`write`](Self::write) call transmits exactly one frame
/// carrying exactly the bytes passed in: writes are never split across
/// frames and never coalesced, so receivers can rely on message
/// boundaries. There is no read surface.
///
/// Handles are cheap to clone and may be used from any number of tasks;
/// the connection's send queue serializes the resulting frames. Write
/// streams are never closed individually — closing belongs to the
/// connection, since every writer shares its one transport.
#[derive(Clone)]
pub struct StreamWriter {
    index: u8,
    requests: mpsc::Sender<SendRequest>,
    shared: Arc<Shared>,
}

impl StreamWriter {
    pub(crate) fn new(index: u8, requests: mpsc::Sender<SendRequest>, shared: Arc<Shared>) -> Self {
        Self {
            index,
            requests,
            shared,
        }
    }

    /// The stream index this writer is bound to.
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Write one payload as a single frame.
    ///
    /// An empty payload is valid and produces an index-only frame; the
    /// receiver observes an empty chunk, not end-of-stream. Suspends
    /// while the frame is queued and transmitted. Fails with
    /// [`MuxError::ConnectionClosed`](crate::MuxError::ConnectionClosed)
    /// once the connection has closed, or with the recorded fault once
    /// it has faulted; never retries. Cancelling the returned future
    /// abandons the frame whole — it is either fully transmitted by the
    /// send task or not transmitted at all.
    pub async fn write(&self, payload: &[u8]) -> Result<()> {
        let frame = encode_frame(self.index, payload, self.shared.max_message_size())?;
        let (done, completion) = oneshot::channel();
        self.requests
            .send(SendRequest { frame, done })
            .await
            .map_err(|_| self.shared.closed_error())?;
        match completion.await {
            Ok(result) => result,
            // Send task dropped the request during shutdown.
            Err(_) => Err(self.shared.closed_error()),
        }
    }
}

impl fmt::Debug for StreamWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamWriter")
            .field("index", &self.index)
            .finish()
    }
}
