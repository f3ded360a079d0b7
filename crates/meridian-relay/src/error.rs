//! Error types for the relay core.

use std::io;
use thiserror::Error;

/// Result type for relay operations
pub type RelayResult<T> = Result<T, RelayError>;

/// Relay errors
///
/// Every fallible relay operation returns one of these as a value. The OS
/// "would block" condition is never surfaced here: an empty non-blocking
/// receive is a successful `None`, and a full send buffer maps to the
/// retryable [`RelayError::SendBufferFull`].
#[derive(Debug, Error)]
pub enum RelayError {
    /// OS refused to allocate a new socket
    #[error("cannot create socket: {0}")]
    CannotCreateSocket(#[source] io::Error),

    /// Non-blocking mode or buffer sizing could not be applied
    #[error("cannot configure socket: {0}")]
    CannotConfigureSocket(#[source] io::Error),

    /// The socket could not be bound to the requested port
    #[error("cannot bind socket to port {port}: {source}")]
    CannotBindSocket {
        /// Requested relay port
        port: u16,
        /// Underlying bind failure
        #[source]
        source: io::Error,
    },

    /// `start` called while the relay is already running
    #[error("relay is already running")]
    AlreadyRunning,

    /// Receive or send attempted on a stopped relay
    #[error("relay is not running")]
    NotRunning,

    /// Transport-level read failure
    #[error("receive failed: {0}")]
    Recv(#[source] io::Error),

    /// Transport-level write failure, including short writes
    #[error("send failed: {0}")]
    Send(#[source] io::Error),

    /// OS send buffer exhausted; the caller may retry
    #[error("send buffer full")]
    SendBufferFull,

    /// Configuration rejected before any OS resource was touched
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
