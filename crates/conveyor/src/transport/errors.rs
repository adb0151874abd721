//! Error types for backend transport operations.

use std::io;

use thiserror::Error;

use conveyor_config::ConnectionSettings;

/// Errors surfaced while exchanging a frame with the backend.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Host name resolution failed.
    #[error("failed to resolve backend address {settings}: {source}")]
    Resolve {
        /// Backend the dispatcher tried to reach.
        settings: ConnectionSettings,
        /// Underlying resolver error.
        #[source]
        source: io::Error,
    },
    /// Resolution returned no usable address.
    #[error("no addresses resolved for backend {settings}")]
    ResolveEmpty {
        /// Backend the dispatcher tried to reach.
        settings: ConnectionSettings,
    },
    /// Every resolved address refused or timed out.
    #[error("failed to connect to backend at {settings}: {source}")]
    Connect {
        /// Backend the dispatcher tried to reach.
        settings: ConnectionSettings,
        /// Error of the last connection attempt.
        #[source]
        source: io::Error,
    },
    /// The length prefix could not be written completely.
    #[error("failed to send frame length: {0}")]
    SendLength(#[source] io::Error),
    /// The payload could not be written completely.
    #[error("failed to send frame payload: {0}")]
    SendPayload(#[source] io::Error),
    /// Reading the response failed.
    #[error("failed to receive response: {0}")]
    Receive(#[source] io::Error),
    /// The backend closed the connection without replying.
    #[error("backend closed the connection without a response")]
    EmptyResponse,
    /// An incoming frame announced a length that does not fit in memory.
    #[error("frame length {0} exceeds addressable memory")]
    FrameTooLarge(u64),
}

impl TransportError {
    /// Returns true for errors raised before a connection existed.
    #[must_use]
    pub const fn is_connect_failure(&self) -> bool {
        matches!(
            self,
            Self::Resolve { .. } | Self::ResolveEmpty { .. } | Self::Connect { .. }
        )
    }
}
