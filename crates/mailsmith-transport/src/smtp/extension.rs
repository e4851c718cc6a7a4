//! SMTP extension types.

/// SMTP extensions discovered from EHLO response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// STARTTLS - TLS upgrade
    StartTls,
    /// AUTH - Authentication
    Auth(Vec<AuthMechanism>),
    /// SIZE - Maximum message size
    Size(Option<usize>),
    /// Any extension the transport does not act on
    Unknown(String),
}

impl Extension {
    /// Parses an extension line from EHLO response.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(keyword) = parts.first() else {
            return Self::Unknown(line.to_string());
        };

        match keyword.to_uppercase().as_str() {
            "STARTTLS" => Self::StartTls,
            "AUTH" => {
                let mechanisms = parts[1..]
                    .iter()
                    .filter_map(|m| AuthMechanism::parse(m))
                    .collect();
                Self::Auth(mechanisms)
            }
            "SIZE" => {
                let size = parts.get(1).and_then(|s| s.parse().ok());
                Self::Size(size)
            }
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// SASL authentication mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// PLAIN - plaintext authentication
    Plain,
    /// LOGIN - legacy plaintext
    Login,
}

impl AuthMechanism {
    /// Parses an authentication mechanism name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PLAIN" => Some(Self::Plain),
            "LOGIN" => Some(Self::Login),
            _ => None,
        }
    }

    /// Returns the mechanism name as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
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
    fn parse_starttls() {
        assert_eq!(Extension::parse("STARTTLS"), Extension::StartTls);
        assert_eq!(Extension::parse("starttls"), Extension::StartTls);
    }

    #[test]
    fn parse_auth() {
        assert_eq!(
            Extension::parse("AUTH PLAIN LOGIN CRAM-MD5 XOAUTH2"),
            Extension::Auth(vec![AuthMechanism::Plain, AuthMechanism::Login])
        );
    }

    #[test]
    fn parse_size() {
        assert_eq!(
            Extension::parse("SIZE 52428800"),
            Extension::Size(Some(52_428_800))
        );
        assert_eq!(Extension::parse("SIZE"), Extension::Size(None));
    }

    #[test]
    fn parse_unknown_and_empty() {
        assert_eq!(
            Extension::parse("SOMECUSTOMEXT"),
            Extension::Unknown("SOMECUSTOMEXT".to_string())
        );
        assert_eq!(
            Extension::parse("8BITMIME"),
            Extension::Unknown("8BITMIME".to_string())
        );
        assert!(matches!(Extension::parse(""), Extension::Unknown(_)));
    }

    #[test]
    fn mechanism_names() {
        assert_eq!(AuthMechanism::parse("login"), Some(AuthMechanism::Login));
        assert_eq!(AuthMechanism::parse("GSSAPI"), None);
        assert_eq!(AuthMechanism::parse("CRAM-MD5"), None);
        assert_eq!(AuthMechanism::Plain.as_str(), "PLAIN");
    }
}
