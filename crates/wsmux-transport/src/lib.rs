//! Message-framed transport boundary for wsmux.
//!
//! The multiplexing core never touches raw sockets. It consumes a
//! full-duplex transport that delivers discrete messages in order — a
//! WebSocket-style connection — and relies entirely on the transport's
//! own framing for message boundaries. This crate defines that boundary
//! and ships an in-process [`memory`] transport used by tests, examples,
//! and embedders that run both ends in one process.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, TransportError};
pub use memory::{pair, pair_with_capacity, MemoryReceiver, MemorySender, MemoryTransport};
pub use traits::{MessageReceiver, MessageSender, MessageTransport};
