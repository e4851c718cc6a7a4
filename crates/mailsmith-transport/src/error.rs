//! Error types for delivery.

use std::io;

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Transport error: any failure to deliver a message.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Message could not be encoded (e.g. unreadable attachment).
    #[error("MIME error: {0}")]
    Mime(#[from] mailsmith_mime::Error),

    /// Server returned error response.
    #[error("SMTP error {code}: {message}")]
    SmtpError {
        /// Reply code (e.g., 550).
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// Protocol error (unexpected or malformed response).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Operation did not complete in time.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Feature not supported by server.
    #[error("Server does not support {0}")]
    NotSupported(String),

    /// Message has no sender to use in `MAIL FROM`.
    #[error("Message has no sender")]
    MissingSender,

    /// Message has no recipient at all.
    #[error("Message has no recipients")]
    NoRecipients,

    /// Message exceeds the size advertised by the server.
    #[error("Message exceeds size limit: {0} bytes")]
    MessageTooLarge(usize),
}

impl Error {
    /// Creates an SMTP error from a reply code and message.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::SmtpError {
            code,
            message: message.into(),
        }
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if *code >= 500 && *code < 600)
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if *code >= 400 && *code < 500)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert!(Error::smtp_error(550, "no such user").is_permanent());
        assert!(Error::smtp_error(451, "try later").is_transient());
        assert!(!Error::NoRecipients.is_permanent());
        assert_eq!(
            Error::smtp_error(554, "rejected").to_string(),
            "SMTP error 554: rejected"
        );
    }
}
