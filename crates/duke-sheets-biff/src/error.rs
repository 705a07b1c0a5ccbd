//! XLS error types

use thiserror::Error;

/// Result type for XLS operations
pub type XlsResult<T> = std::result::Result<T, XlsError>;

/// Errors that can occur while reading, mutating or writing BIFF8 streams
#[derive(Debug, Error)]
pub enum XlsError {
    /// IO error (also covers CFB errors which use std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid file format
    #[error("Invalid XLS format: {0}")]
    InvalidFormat(String),

    /// Unsupported version
    #[error("Unsupported XLS version: {0}")]
    UnsupportedVersion(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// The record stream violates the BIFF8 structure. Not recoverable.
    #[error("Structural error at record 0x{sid:04X}: {message}")]
    Structural { sid: u16, message: String },

    /// `next()` was called on an exhausted record stream
    #[error("Unexpected end of record stream")]
    EndOfStream,

    /// Invalid caller input; nothing was mutated
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An internal invariant of a table did not hold
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Named lookup failed
    #[error("Not found: {0}")]
    NotFound(String),
}

impl XlsError {
    /// Structural error tied to the record type that triggered it.
    pub fn structural<S: Into<String>>(sid: u16, message: S) -> Self {
        XlsError::Structural {
            sid,
            message: message.into(),
        }
    }

    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        XlsError::InvalidArgument(message.into())
    }

    pub fn invalid_state<S: Into<String>>(message: S) -> Self {
        XlsError::InvalidState(message.into())
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        XlsError::NotFound(message.into())
    }
}
