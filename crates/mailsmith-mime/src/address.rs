//! Email address values.

use crate::encoding::encode_rfc2047;
use std::fmt;

/// A mailbox as rendered in `From`/`To`/`Cc`/`Bcc` headers.
///
/// No syntax validation is performed; the value is rendered as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address {
    email: String,
    name: Option<String>,
}

impl Address {
    /// Creates an address without a display name.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    /// Creates an address with a display name.
    #[must_use]
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: Some(name.into()),
        }
    }

    /// Returns the bare mailbox (`user@host`).
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the display name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl From<&str> for Address {
    fn from(email: &str) -> Self {
        Self::new(email)
    }
}

impl From<String> for Address {
    fn from(email: String) -> Self {
        Self::new(email)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) if name.is_ascii() => {
                let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{escaped}\" <{}>", self.email)
            }
            // Encoded words must not be quoted.
            Some(name) => write!(f, "{} <{}>", encode_rfc2047(name, " "), self.email),
            None => f.write_str(&self.email),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_address() {
        let addr = Address::new("user@example.com");
        assert_eq!(addr.to_string(), "user@example.com");
        assert_eq!(addr.email(), "user@example.com");
        assert!(addr.name().is_none());
    }

    #[test]
    fn test_named_address() {
        let addr = Address::with_name("John Doe", "john@example.com");
        assert_eq!(addr.to_string(), "\"John Doe\" <john@example.com>");
    }

    #[test]
    fn test_named_address_escapes_quotes() {
        let addr = Address::with_name("The \"Boss\"", "boss@example.com");
        assert_eq!(addr.to_string(), "\"The \\\"Boss\\\"\" <boss@example.com>");
    }

    #[test]
    fn test_non_ascii_name_is_encoded() {
        let addr = Address::with_name("Zoë", "zoe@example.com");
        assert_eq!(addr.to_string(), "=?UTF-8?Q?Zo=C3=AB?= <zoe@example.com>");
    }

    #[test]
    fn test_empty_name_renders_bare() {
        let addr = Address::with_name("", "x@example.com");
        assert_eq!(addr.to_string(), "x@example.com");
    }
}
