//! Error types
//!
//! Per-connection failures are contained in the connection task that hit
//! them. Only `ListenerFailure` ever reaches the caller of `Broker::start`.

use std::io;

use crate::protocol::ProtocolError;
use crate::registry::RegistryError;
use crate::server::Role;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Registry rejected the request (invalid topic name)
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Malformed frame or a frame not allowed for the connection role
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Read/write failure, EOF mid-delivery or delivery timeout
    #[error("connection lost: {0}")]
    ConnectionLost(#[source] io::Error),

    /// Subscriber could not keep up and was dropped by the registry
    #[error("subscriber pruned: delivery queue full or handle closed")]
    SlowSubscriber,

    /// Accept loop failed irrecoverably
    #[error("{role} listener failed: {source}")]
    ListenerFailure {
        role: Role,
        #[source]
        source: io::Error,
    },

    /// Other I/O (bootstrap, socket configuration)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// True for errors caused by the peer speaking the protocol wrong
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Error::Protocol(_) | Error::Registry(_))
    }
}
