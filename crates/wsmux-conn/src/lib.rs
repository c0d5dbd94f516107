//! Multiplexed logical streams over one message-framed connection.
//!
//! A [`MuxConnection`] wraps an established transport and fans it out
//! into up to 256 independent logical byte-streams keyed by a one-byte
//! index. One dispatch task owns the receive path and routes each
//! inbound frame to the [`StreamReader`] registered for its index; any
//! number of [`StreamWriter`]s submit frames through a single-writer
//! send queue, so concurrent writes never interleave on the wire.

pub mod connection;
pub mod error;
pub mod read;
pub mod resize;
pub mod write;

pub use connection::{ConnectionState, MuxConfig, MuxConnection};
pub use error::{MuxError, Result};
pub use read::{ByteReader, StreamReader};
pub use resize::TerminalSize;
pub use write::StreamWriter;
