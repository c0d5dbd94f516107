use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wsmux_frame::{decode_frame, index_name, Frame, ERROR, RESIZE, STDERR, STDIN, STDOUT};
use wsmux_transport::{MessageReceiver, MessageSender, MessageTransport};

use crate::error::{MuxError, Result};
use crate::read::StreamReader;
use crate::resize::TerminalSize;
use crate::write::StreamWriter;

/// Lifecycle state of a multiplexed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// The dispatch loop is running; frames flow in both directions.
    Open,
    /// Close has been requested; the connection is shutting down.
    Closing,
    /// The connection closed cleanly. Terminal.
    Closed,
    /// The connection died on a transport error or protocol violation.
    /// Terminal; the fault is broadcast to every registered read stream.
    Faulted,
}

impl ConnectionState {
    /// True for [`Closed`](Self::Closed) and [`Faulted`](Self::Faulted).
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Faulted)
    }
}

/// Tuning knobs for a multiplexed connection.
#[derive(Debug, Clone)]
pub struct MuxConfig {
    /// Maximum message size (index byte + payload) the transport
    /// accepts. Writes over the limit fail without sending.
    pub max_message_size: usize,
    /// Per-index delivery queue depth, in chunks.
    ///
    /// When a consumer stops draining its stream and its queue fills,
    /// the dispatch loop suspends on the next frame for that index.
    /// Delivery to other indices continues until wire order reaches
    /// another frame for the congested one.
    pub delivery_capacity: usize,
    /// Outbound send queue depth, in frames.
    pub send_capacity: usize,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            max_message_size: wsmux_frame::DEFAULT_MAX_MESSAGE_SIZE,
            delivery_capacity: 32,
            send_capacity: 64,
        }
    }
}

/// One outbound frame plus its completion signal.
pub(crate) struct SendRequest {
    pub(crate) frame: Bytes,
    pub(crate) done: oneshot::Sender<Result<()>>,
}

struct Registration {
    delivery: mpsc::Sender<Bytes>,
    generation: u64,
}

#[derive(Default)]
struct Registry {
    streams: HashMap<u8, Registration>,
    /// Set when the dispatch loop has terminated. No registration made
    /// after that point could ever observe a frame, so `read_stream`
    /// refuses instead of parking a consumer forever.
    sealed: bool,
}

/// State shared between the connection handle, its logical streams, and
/// the two background tasks.
pub(crate) struct Shared {
    registry: Mutex<Registry>,
    state: watch::Sender<ConnectionState>,
    fault: OnceLock<Arc<MuxError>>,
    shutdown: CancellationToken,
    dropped_frames: AtomicU64,
    next_generation: AtomicU64,
    config: MuxConfig,
}

impl Shared {
    fn lock_registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn max_message_size(&self) -> usize {
        self.config.max_message_size
    }

    pub(crate) fn fault_ref(&self) -> Option<Arc<MuxError>> {
        self.fault.get().cloned()
    }

    /// The error a caller-facing operation should report once the
    /// connection is no longer usable.
    pub(crate) fn closed_error(&self) -> MuxError {
        match self.fault_ref() {
            Some(fault) => MuxError::Faulted(fault),
            None => MuxError::ConnectionClosed,
        }
    }

    /// Record a connection-wide fault and begin shutdown. The first
    /// fault wins; later ones are dropped.
    fn fault(&self, error: MuxError) -> Arc<MuxError> {
        let fault = Arc::clone(self.fault.get_or_init(|| Arc::new(error)));
        self.state.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = ConnectionState::Faulted;
                true
            }
        });
        self.shutdown.cancel();
        fault
    }

    fn note_dropped(&self, index: u8) {
        self.dropped_frames.fetch_add(1, Ordering::Relaxed);
        debug!(index, name = index_name(index), "dropped frame for unregistered index");
    }

    /// Remove a registration only if it is still the one `generation`
    /// created, so a dropped reader never evicts its replacement.
    pub(crate) fn unregister_generation(&self, index: u8, generation: u64) {
        let mut registry = self.lock_registry();
        if registry
            .streams
            .get(&index)
            .is_some_and(|existing| existing.generation == generation)
        {
            registry.streams.remove(&index);
            debug!(index, "read stream detached");
        }
    }

    /// Runs when the dispatch loop exits: seals the registry, releases
    /// every delivery queue (consumers observe end-of-stream, or the
    /// recorded fault), and settles the terminal state.
    fn finish_dispatch(&self) {
        {
            let mut registry = self.lock_registry();
            registry.sealed = true;
            registry.streams.clear();
        }
        self.state.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = ConnectionState::Closed;
                true
            }
        });
        self.shutdown.cancel();
        info!(state = ?*self.state.borrow(), "dispatch loop terminated");
    }
}

/// A multiplexed connection: one shared message-framed transport
/// carrying up to 256 independent logical byte-streams.
///
/// The connection owns two background tasks. The dispatch task is the
/// sole reader of the transport: it decodes each inbound frame and
/// routes the payload to the [`StreamReader`] registered for its index.
/// The send task is the sole writer: it drains a queue of pre-encoded
/// frames submitted by [`StreamWriter`]s, so concurrent writes are
/// serialized and a cancelled write can never leave a partially
/// transmitted frame on the wire.
///
/// Dropping the connection handle requests shutdown; [`close`](Self::close)
/// does the same but waits for it to complete.
pub struct MuxConnection {
    shared: Arc<Shared>,
    send_queue: mpsc::Sender<SendRequest>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl MuxConnection {
    /// Open a multiplexed connection over an established transport.
    ///
    /// The transport is assumed to have completed its own handshake;
    /// the connection starts in [`ConnectionState::Open`] with the
    /// dispatch loop running. Must be called within a Tokio runtime.
    pub fn open<T: MessageTransport>(transport: T) -> Self {
        Self::open_with_config(transport, MuxConfig::default())
    }

    /// Open with explicit configuration.
    pub fn open_with_config<T: MessageTransport>(transport: T, config: MuxConfig) -> Self {
        let (sender, receiver) = transport.into_split();
        let (send_queue, send_rx) = mpsc::channel(config.send_capacity.max(1));
        let (state, _) = watch::channel(ConnectionState::Open);

        let shared = Arc::new(Shared {
            registry: Mutex::new(Registry::default()),
            state,
            fault: OnceLock::new(),
            shutdown: CancellationToken::new(),
            dropped_frames: AtomicU64::new(0),
            next_generation: AtomicU64::new(1),
            config,
        });

        let tasks = vec![
            tokio::spawn(send_loop(sender, send_rx, Arc::clone(&shared))),
            tokio::spawn(dispatch_loop(receiver, Arc::clone(&shared))),
        ];

        Self {
            shared,
            send_queue,
            tasks: Mutex::new(tasks),
        }
    }

    /// Open a write stream bound to `index`.
    ///
    /// Always succeeds: the handle only binds the index to the shared
    /// send queue. Writes on it fail once the connection is closed or
    /// faulted. Any number of write streams may coexist, including
    /// several for the same index.
    pub fn write_stream(&self, index: u8) -> StreamWriter {
        StreamWriter::new(index, self.send_queue.clone(), Arc::clone(&self.shared))
    }

    /// Register a read stream for `index`.
    ///
    /// At most one read stream may be registered per index; a second
    /// registration fails with [`MuxError::IndexAlreadyBound`] until the
    /// first is dropped or [`unregister`](Self::unregister)ed. Frames
    /// that arrived before registration were dropped per the
    /// unregistered-index policy — register before the peer starts
    /// sending.
    pub fn read_stream(&self, index: u8) -> Result<StreamReader> {
        let mut registry = self.shared.lock_registry();
        if registry.sealed {
            return Err(self.shared.closed_error());
        }
        if registry.streams.contains_key(&index) {
            return Err(MuxError::IndexAlreadyBound(index));
        }

        let (delivery, chunks) = mpsc::channel(self.shared.config.delivery_capacity.max(1));
        let generation = self.shared.next_generation.fetch_add(1, Ordering::Relaxed);
        registry.streams.insert(
            index,
            Registration {
                delivery,
                generation,
            },
        );
        debug!(index, name = index_name(index), "read stream registered");
        Ok(StreamReader::new(
            index,
            generation,
            chunks,
            Arc::clone(&self.shared),
        ))
    }

    /// Remove the registration for `index`, if any. Idempotent.
    ///
    /// The detached reader drains whatever was already delivered and
    /// then observes end-of-stream; frames subsequently arriving for
    /// the index are dropped and counted.
    pub fn unregister(&self, index: u8) {
        let mut registry = self.shared.lock_registry();
        if registry.streams.remove(&index).is_some() {
            debug!(index, "read stream unregistered");
        }
    }

    /// Write stream for standard input (index 0).
    pub fn stdin(&self) -> StreamWriter {
        self.write_stream(STDIN)
    }

    /// Read stream for standard output (index 1).
    pub fn stdout(&self) -> Result<StreamReader> {
        self.read_stream(STDOUT)
    }

    /// Read stream for standard error (index 2).
    pub fn stderr(&self) -> Result<StreamReader> {
        self.read_stream(STDERR)
    }

    /// Read stream for the out-of-band error channel (index 3).
    pub fn error_channel(&self) -> Result<StreamReader> {
        self.read_stream(ERROR)
    }

    /// Send a terminal-resize event on the resize channel (index 4).
    pub async fn send_resize(&self, size: TerminalSize) -> Result<()> {
        let payload = size.to_payload()?;
        self.write_stream(RESIZE).write(&payload).await
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Number of inbound frames dropped because no read stream was
    /// registered for their index.
    pub fn dropped_frames(&self) -> u64 {
        self.shared.dropped_frames.load(Ordering::Relaxed)
    }

    /// Wait until the connection reaches a terminal state.
    pub async fn closed(&self) {
        let mut state = self.shared.state.subscribe();
        // The watch sender lives in `shared`, which we hold, so this
        // only resolves on an actual terminal transition.
        let _ = state.wait_for(|state| state.is_terminal()).await;
    }

    /// Close the connection.
    ///
    /// Transitions `Open -> Closing`, stops both background tasks,
    /// closes the transport send half so the peer observes a graceful
    /// end-of-stream, and propagates end-of-stream to every registered
    /// read stream. Resolves once shutdown is complete. Idempotent.
    pub async fn close(&self) {
        let requested = self.shared.state.send_if_modified(|state| {
            if matches!(state, ConnectionState::Open) {
                *state = ConnectionState::Closing;
                true
            } else {
                false
            }
        });
        if requested {
            info!("connection close requested");
        }
        self.shared.shutdown.cancel();

        let tasks: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            tasks.drain(..).collect()
        };
        for task in tasks {
            let _ = task.await;
        }
        self.closed().await;
    }
}

impl Drop for MuxConnection {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}

/// The sole reader of the shared transport: receives one message at a
/// time, decodes it, and routes the payload to the registered stream.
async fn dispatch_loop<R: MessageReceiver>(mut receiver: R, shared: Arc<Shared>) {
    let shutdown = shared.shutdown.clone();
    loop {
        let received = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            received = receiver.recv() => received,
        };

        match received {
            Ok(Some(message)) => {
                let Frame { index, payload } = match decode_frame(message) {
                    Ok(frame) => frame,
                    Err(error) => {
                        warn!(%error, "malformed inbound frame, faulting connection");
                        shared.fault(error.into());
                        break;
                    }
                };

                let delivery = {
                    let registry = shared.lock_registry();
                    registry
                        .streams
                        .get(&index)
                        .map(|registration| registration.delivery.clone())
                };
                let Some(delivery) = delivery else {
                    shared.note_dropped(index);
                    continue;
                };

                // Suspends only while this index's queue is full; other
                // indices are unaffected until wire order reaches
                // another frame for the congested one.
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    delivered = delivery.send(payload) => {
                        if delivered.is_err() {
                            // Reader detached between lookup and delivery.
                            shared.note_dropped(index);
                        }
                    }
                }
            }
            Ok(None) => {
                info!("transport closed by peer");
                break;
            }
            Err(error) => {
                warn!(%error, "transport receive failed, faulting connection");
                shared.fault(error.into());
                break;
            }
        }
    }
    shared.finish_dispatch();
}

/// The sole writer of the shared transport: drains the send queue one
/// frame at a time. Each frame is handed to the transport whole, so a
/// requester cancelling its write cannot abort a transmission in
/// progress.
async fn send_loop<S: MessageSender>(
    mut sender: S,
    mut requests: mpsc::Receiver<SendRequest>,
    shared: Arc<Shared>,
) {
    let shutdown = shared.shutdown.clone();
    loop {
        let request = tokio::select! {
            biased;
            _ = shutdown.cancelled() => None,
            request = requests.recv() => request,
        };
        let Some(SendRequest { frame, done }) = request else {
            break;
        };

        match sender.send(frame).await {
            Ok(()) => {
                let _ = done.send(Ok(()));
            }
            Err(error) => {
                warn!(%error, "transport send failed, faulting connection");
                let fault = shared.fault(MuxError::Transport(error));
                let _ = done.send(Err(MuxError::Faulted(fault)));
                break;
            }
        }
    }

    // Fail any writes still queued behind the shutdown.
    requests.close();
    while let Some(request) = requests.recv().await {
        let _ = request.done.send(Err(shared.closed_error()));
    }

    if let Err(error) = sender.close().await {
        debug!(%error, "transport close reported an error");
    }
}
