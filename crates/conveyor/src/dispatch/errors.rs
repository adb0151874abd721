//! Error types for the dispatch worker.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::transport::TransportError;

/// Step of an exchange at which an envelope was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeStage {
    /// Writing the request frame.
    Send,
    /// Reading the response.
    Receive,
    /// The exchange panicked.
    Internal,
}

impl fmt::Display for ExchangeStage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Send => "send",
            Self::Receive => "receive",
            Self::Internal => "internal",
        })
    }
}

/// Failures after a connection was established. The envelope is dropped
/// without notifying its caller.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The request frame could not be written.
    #[error("send failed: {0}")]
    Send(#[source] TransportError),
    /// The response could not be read, or was empty.
    #[error("receive failed: {0}")]
    Receive(#[source] TransportError),
    /// The exchange panicked.
    #[error("exchange panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },
}

impl ExchangeError {
    /// The step the exchange was abandoned at.
    #[must_use]
    pub const fn stage(&self) -> ExchangeStage {
        match self {
            Self::Send(_) => ExchangeStage::Send,
            Self::Receive(_) => ExchangeStage::Receive,
            Self::Panicked { .. } => ExchangeStage::Internal,
        }
    }
}

/// Errors surfaced while starting or joining the dispatch worker.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// The worker thread could not be spawned.
    #[error("failed to spawn dispatch worker: {0}")]
    Spawn(#[source] io::Error),
    /// The worker thread panicked.
    #[error("dispatch worker panicked")]
    ThreadPanic,
}
