//! Protocol-level error types.

use thiserror::Error;

/// Errors raised while parsing or building wire-level values.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection string is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("malformed connection string segment: '{0}'")]
    MalformedSegment(String),

    #[error("invalid shared access key: {0}")]
    InvalidKey(String),
}

/// Convenience alias for protocol results.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
