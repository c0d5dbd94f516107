//! Stream multiplexing over a single message-framed connection.
//!
//! wsmux lets multiple independent logical byte-streams — stdin, stdout,
//! stderr, an out-of-band error channel, a terminal-resize channel —
//! share one full-duplex connection, using the one-byte stream-index
//! prefix framing of the Kubernetes remoting protocol.
//!
//! # Crate Structure
//!
//! - [`transport`] — Message-framed transport boundary (+ in-memory pair)
//! - [`frame`] — One-byte stream-index frame codec
//! - [`conn`] — Multiplexed connection manager and logical streams

/// Re-export transport types.
pub mod transport {
    pub use wsmux_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use wsmux_frame::*;
}

/// Re-export connection types.
pub mod conn {
    pub use wsmux_conn::*;
}
