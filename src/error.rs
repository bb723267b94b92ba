//! Error types for switch-audit.

use std::io;
use thiserror::Error;

/// Main error type for audit operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Interface block parsing errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Worker pool errors
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),
}

/// Transport layer errors (SSH connection, authentication, exec).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors produced while scanning interface blocks out of command output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// An `interface ...` block was opened but never closed by a bare `!`
    /// before end of input. The whole device output is rejected rather
    /// than returning a truncated block.
    #[error("Unterminated interface block '{interface}'")]
    UnterminatedBlock { interface: String },
}

/// Worker pool lifecycle errors.
#[derive(Error, Debug)]
pub enum PoolError {
    /// A worker task could not be joined.
    #[error("Worker {index} failed to join: {detail}")]
    WorkerJoin { index: usize, detail: String },
}

/// Result type alias using switch-audit's Error.
pub type Result<T> = std::result::Result<T, Error>;
