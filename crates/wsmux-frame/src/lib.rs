//! One-byte stream-index framing for multiplexed connections.
//!
//! Every message on the shared connection is one frame: the first byte
//! names the logical stream, the rest is payload. The transport's own
//! message framing delimits frames, so there is no magic number and no
//! length prefix — just the index byte.

pub mod codec;
pub mod error;
pub mod index;

pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_MESSAGE_SIZE, INDEX_SIZE,
};
pub use error::{FrameError, Result};
pub use index::{index_name, is_standard, ERROR, RESIZE, STDERR, STDIN, STDOUT};
