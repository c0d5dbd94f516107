use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::mpsc;

use crate::connection::Shared;
use crate::error::{MuxError, Result};

/// A read-only logical stream bound to one stream index.
///
/// Chunks arrive exactly as the sender framed them, in wire order —
/// one chunk per frame, never split, never merged. [`read`](Self::read)
/// yields `Ok(None)` at end-of-stream; after a connection fault, every
/// read past the already-delivered chunks surfaces the fault instead.
///
/// Dropping the reader detaches it from the connection: frames that
/// subsequently arrive for its index are dropped and counted. For
/// consumers that don't care about chunk boundaries, see
/// [`into_byte_reader`](Self::into_byte_reader).
pub struct StreamReader {
    index: u8,
    generation: u64,
    chunks: mpsc::Receiver<Bytes>,
    shared: Arc<Shared>,
    fault_yielded: bool,
}

impl StreamReader {
    pub(crate) fn new(
        index: u8,
        generation: u64,
        chunks: mpsc::Receiver<Bytes>,
        shared: Arc<Shared>,
    ) -> Self {
        Self {
            index,
            generation,
            chunks,
            shared,
            fault_yielded: false,
        }
    }

    /// The stream index this reader is bound to.
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Receive the next chunk.
    ///
    /// Suspends until the dispatch loop delivers a chunk, end-of-stream
    /// is reached, or the connection faults. An empty chunk is a valid
    /// delivery — the sender wrote an empty payload — and is distinct
    /// from the `Ok(None)` end-of-stream marker.
    pub async fn read(&mut self) -> Result<Option<Bytes>> {
        match self.chunks.recv().await {
            Some(chunk) => Ok(Some(chunk)),
            None => self.end_of_stream(),
        }
    }

    fn end_of_stream(&self) -> Result<Option<Bytes>> {
        match self.shared.fault_ref() {
            Some(fault) => Err(MuxError::Faulted(fault)),
            None => Ok(None),
        }
    }

    /// Detach from the connection without waiting for end-of-stream.
    ///
    /// Equivalent to dropping the reader; the index becomes free for
    /// re-registration.
    pub fn detach(self) {}

    /// Flatten into a byte stream implementing [`AsyncRead`], for
    /// consumers that treat the logical stream as a plain sequence of
    /// bytes (line readers, copy loops).
    pub fn into_byte_reader(self) -> ByteReader {
        ByteReader {
            reader: self,
            current: Bytes::new(),
            finished: false,
        }
    }
}

/// Chunk-by-chunk [`futures_core::Stream`] view.
///
/// Yields each delivered chunk as `Ok(Bytes)`. A connection fault is
/// yielded once as `Err`, after which the stream ends; plain
/// end-of-stream ends it without an error item.
impl futures_core::Stream for StreamReader {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.chunks.poll_recv(cx) {
            Poll::Ready(Some(chunk)) => Poll::Ready(Some(Ok(chunk))),
            Poll::Ready(None) => match self.shared.fault_ref() {
                Some(fault) if !self.fault_yielded => {
                    self.fault_yielded = true;
                    Poll::Ready(Some(Err(MuxError::Faulted(fault))))
                }
                _ => Poll::Ready(None),
            },
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for StreamReader {
    fn drop(&mut self) {
        self.shared.unregister_generation(self.index, self.generation);
    }
}

impl fmt::Debug for StreamReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamReader")
            .field("index", &self.index)
            .finish()
    }
}

/// Byte-stream view over a [`StreamReader`].
///
/// Concatenates chunks transparently; chunk boundaries are not
/// observable, and empty chunks are invisible. End-of-stream maps to
/// EOF; a connection fault maps to an `io::Error`.
pub struct ByteReader {
    reader: StreamReader,
    current: Bytes,
    finished: bool,
}

impl ByteReader {
    /// The stream index this reader is bound to.
    pub fn index(&self) -> u8 {
        self.reader.index()
    }
}

impl AsyncRead for ByteReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        loop {
            if !this.current.is_empty() {
                let take = this.current.len().min(buf.remaining());
                if take == 0 {
                    return Poll::Ready(Ok(()));
                }
                let chunk = this.current.split_to(take);
                buf.put_slice(&chunk);
                return Poll::Ready(Ok(()));
            }
            if this.finished {
                return Poll::Ready(Ok(()));
            }
            match this.reader.chunks.poll_recv(cx) {
                Poll::Ready(Some(chunk)) => this.current = chunk,
                Poll::Ready(None) => {
                    this.finished = true;
                    if let Some(fault) = this.reader.shared.fault_ref() {
                        return Poll::Ready(Err(std::io::Error::other(MuxError::Faulted(fault))));
                    }
                    return Poll::Ready(Ok(()));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures_core::Stream;
    use std::pin::Pin;
    use tokio::io::AsyncReadExt;
    use wsmux_transport::{pair, MessageSender, MessageTransport};

    use crate::connection::MuxConnection;
    use crate::error::MuxError;

    #[tokio::test]
    async fn chunk_boundaries_are_preserved() {
        let (local, remote) = pair();
        let connection = MuxConnection::open(local);
        let (mut remote_tx, _remote_rx) = remote.into_split();
        let mut reader = connection.read_stream(1).unwrap();

        remote_tx.send(Bytes::from_static(&[0x01, b'a'])).await.unwrap();
        remote_tx.send(Bytes::from_static(&[0x01, b'b', b'c'])).await.unwrap();

        assert_eq!(reader.read().await.unwrap().unwrap().as_ref(), b"a");
        assert_eq!(reader.read().await.unwrap().unwrap().as_ref(), b"bc");
    }

    #[tokio::test]
    async fn stream_impl_yields_chunks_then_ends() {
        let (local, remote) = pair();
        let connection = MuxConnection::open(local);
        let (mut remote_tx, _remote_rx) = remote.into_split();
        let mut reader = connection.read_stream(1).unwrap();

        remote_tx.send(Bytes::from_static(&[0x01, b'x'])).await.unwrap();
        remote_tx.close().await.unwrap();

        let first = std::future::poll_fn(|cx| Pin::new(&mut reader).poll_next(cx)).await;
        assert_eq!(first.unwrap().unwrap().as_ref(), b"x");
        let end = std::future::poll_fn(|cx| Pin::new(&mut reader).poll_next(cx)).await;
        assert!(end.is_none());
    }

    #[tokio::test]
    async fn stream_impl_yields_fault_once() {
        let (local, remote) = pair();
        let connection = MuxConnection::open(local);
        let (mut remote_tx, _remote_rx) = remote.into_split();
        let mut reader = connection.read_stream(1).unwrap();

        // Zero-byte message: protocol violation, faults the connection.
        remote_tx.send(Bytes::new()).await.unwrap();

        let item = std::future::poll_fn(|cx| Pin::new(&mut reader).poll_next(cx)).await;
        assert!(matches!(item, Some(Err(MuxError::Faulted(_)))));
        let item = std::future::poll_fn(|cx| Pin::new(&mut reader).poll_next(cx)).await;
        assert!(item.is_none());
    }

    #[tokio::test]
    async fn byte_reader_flattens_chunks() {
        let (local, remote) = pair();
        let connection = MuxConnection::open(local);
        let (mut remote_tx, _remote_rx) = remote.into_split();
        let reader = connection.read_stream(1).unwrap();

        remote_tx.send(Bytes::from_static(&[0x01, b'a', b'b'])).await.unwrap();
        remote_tx.send(Bytes::from_static(&[0x01])).await.unwrap();
        remote_tx.send(Bytes::from_static(&[0x01, b'c'])).await.unwrap();
        remote_tx.close().await.unwrap();

        let mut bytes = reader.into_byte_reader();
        let mut collected = Vec::new();
        bytes.read_to_end(&mut collected).await.unwrap();
        assert_eq!(collected, b"abc");
    }

    #[tokio::test]
    async fn byte_reader_surfaces_fault_as_io_error() {
        let (local, remote) = pair();
        let connection = MuxConnection::open(local);
        let (mut remote_tx, _remote_rx) = remote.into_split();
        let reader = connection.read_stream(1).unwrap();

        remote_tx.send(Bytes::new()).await.unwrap();

        let mut bytes = reader.into_byte_reader();
        let mut collected = Vec::new();
        let err = bytes.read_to_end(&mut collected).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::Other);
    }

    #[tokio::test]
    async fn detach_frees_the_index() {
        let (local, _remote) = pair();
        let connection = MuxConnection::open(local);

        let reader = connection.read_stream(7).unwrap();
        reader.detach();
        let _rebound = connection.read_stream(7).unwrap();
    }
}
