//! Error types for MIME composition.

use std::string::FromUtf8Error;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller-correctable misuse of the message API (e.g. a reserved header name).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid content type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Invalid encoding.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Attachment contents could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// UTF-8 decode error.
    #[error("UTF-8 decode error: {0}")]
    Utf8Decode(#[from] FromUtf8Error),
}

impl Error {
    /// Creates an [`Error::InvalidArgument`] for a reserved header name.
    #[must_use]
    pub fn reserved_header(name: &str) -> Self {
        Self::InvalidArgument(format!(
            "\"{name}\" is a reserved header ({}), use the dedicated setters instead",
            crate::message::RESERVED_HEADERS.join(", ")
        ))
    }
}
