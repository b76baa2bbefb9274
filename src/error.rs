//! Unified error types for webkit-remote

use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for webkit-remote
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport failures (connection refused, unexpected close)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The connection was closed locally before or during the operation
    #[error("Connection closed")]
    ConnectionClosed,

    /// The peer violated the wire protocol; the connection has been closed
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The peer answered a specific call with an error object
    #[error("Remote call failed: {message} (code: {code})")]
    RemoteCall {
        /// Remote error code
        code: i64,
        /// Remote error message
        message: String,
        /// Additional error data
        data: Option<serde_json::Value>,
    },

    /// The caller asked for something that can never succeed; no I/O was performed
    #[error("Usage error: {0}")]
    Usage(String),

    /// A peer value that cannot be represented locally
    #[error("Unexpected remote value: {0}")]
    Decode(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Tab discovery errors
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Create a new transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Error::Transport(msg.into())
    }

    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        Error::Protocol(msg.into())
    }

    /// Create a new usage error
    pub fn usage<S: Into<String>>(msg: S) -> Self {
        Error::Usage(msg.into())
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Error::Decode(msg.into())
    }

    /// Create a new discovery error
    pub fn discovery<S: Into<String>>(msg: S) -> Self {
        Error::Discovery(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// True when the connection can no longer be used after this error
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::ConnectionClosed | Error::Protocol(_)
        )
    }
}
