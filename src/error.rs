//! Error types for kvlink
//!
//! Provides a unified error type for all client operations.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for kvlink operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // Connection Errors
    // -------------------------------------------------------------------------
    /// The socket could not be opened.
    #[error("Connection failed: {0}")]
    Connection(#[source] std::io::Error),

    /// An operation was attempted while the connection was not open.
    #[error("Not connected")]
    NotConnected,

    /// No complete reply arrived within the response timeout.
    #[error("Timed out after {0:?} waiting for reply")]
    Timeout(Duration),

    /// Fatal I/O on an open connection. The connection is closed afterwards.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// Reply bytes do not have the shape the decoder expects.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Well-formed reply reporting failure (non-OK status or `-ERR` reply).
    #[error("Command failed: {0}")]
    CommandFailed(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KvError {
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        KvError::Protocol(message.into())
    }
}
