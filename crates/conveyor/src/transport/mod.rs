//! Framed TCP transport to the execution backend.
//!
//! Every exchange opens its own connection, writes one frame, reads the
//! backend's reply until the backend closes its side, and closes the socket:
//!
//! ```text
//! request:  [u64 little-endian payload length][payload]
//! response: [payload ... EOF]
//! ```
//!
//! Only connecting is bounded by a timeout. Sending and receiving block until
//! the backend completes, so a stalled backend stalls the dispatcher.

mod connection;
mod errors;

pub use self::connection::{
    Connection, connect, encode_length_prefix, read_frame, write_frame,
};
pub use self::errors::TransportError;

/// Width of the length prefix in bytes.
pub const LENGTH_PREFIX_BYTES: usize = 8;

const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
