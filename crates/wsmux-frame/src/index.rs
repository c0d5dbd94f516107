//! Standard stream indices.
//!
//! The Kubernetes remoting convention maps the low indices to semantic
//! channels. The mapping is convention only — the core routes any index
//! 0-255 to whatever stream is registered for it.

/// Standard input, written by the client.
pub const STDIN: u8 = 0;

/// Standard output, written by the server.
pub const STDOUT: u8 = 1;

/// Standard error, written by the server.
pub const STDERR: u8 = 2;

/// Out-of-band server error reports.
pub const ERROR: u8 = 3;

/// Terminal resize events, written by the client.
pub const RESIZE: u8 = 4;

/// Returns a human-readable name for a stream index.
pub fn index_name(index: u8) -> &'static str {
    match index {
        STDIN => "STDIN",
        STDOUT => "STDOUT",
        STDERR => "STDERR",
        ERROR => "ERROR",
        RESIZE => "RESIZE",
        _ => "USER",
    }
}

/// Returns true if the index is one of the standard semantic channels.
pub fn is_standard(index: u8) -> bool {
    index <= RESIZE
}
