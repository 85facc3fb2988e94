//! Error types for the ipsync system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for ipsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the ipsync system
#[derive(Error, Debug)]
pub enum Error {
    /// Connection or timeout failure while contacting the lookup service
    #[error("network error: {0}")]
    Network(String),

    /// The lookup service answered with a non-success status
    #[error("lookup service returned status {status}")]
    Protocol {
        /// HTTP status code of the response
        status: u16,
    },

    /// The lookup response body could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// The lookup service returned an empty address
    #[error("lookup service returned an empty address")]
    EmptyAddress,

    /// History store read/write failure
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Config record file read/write failure
    #[error("config record I/O error: {0}")]
    Io(String),

    /// The dependent-process restart command failed
    #[error("restart failed: {message}")]
    Restart {
        /// What went wrong (spawn failure, exit status)
        message: String,
        /// Combined stdout+stderr captured from the command
        output: String,
    },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a protocol error from a status code
    pub fn protocol(status: u16) -> Self {
        Self::Protocol { status }
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a config record I/O error
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Create a restart error with the captured command output
    pub fn restart(message: impl Into<String>, output: impl Into<String>) -> Self {
        Self::Restart {
            message: message.into(),
            output: output.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Config(err.to_string())
    }
}
