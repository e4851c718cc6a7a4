//! SMTP connection configuration.

use std::fmt;
use std::time::Duration;

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// No encryption. **Not recommended for production.**
    None,
    /// Start with plaintext, upgrade with STARTTLS (port 587).
    #[default]
    StartTls,
    /// TLS from the start (port 465).
    Implicit,
}

impl Security {
    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None | Self::StartTls => 587,
            Self::Implicit => 465,
        }
    }
}

/// Username and password for `AUTH PLAIN` / `AUTH LOGIN`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account name.
    pub username: String,
    /// Password or API key.
    pub password: String,
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// SMTP transport configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Login, if the server requires one.
    pub credentials: Option<Credentials>,
    /// Name announced in `EHLO`.
    pub hello_name: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Read/write timeout.
    pub io_timeout: Duration,
    /// Whether the `Bcc` header is kept in the transmitted payload.
    /// Bcc recipients are always part of the envelope.
    pub expose_bcc: bool,
}

impl SmtpConfig {
    /// Creates a new configuration with STARTTLS on port 587.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        SmtpConfigBuilder::new(host).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> SmtpConfigBuilder {
        SmtpConfigBuilder::new(host)
    }
}

/// Builder for SMTP configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfigBuilder {
    host: String,
    port: Option<u16>,
    security: Security,
    credentials: Option<Credentials>,
    hello_name: String,
    connect_timeout: Duration,
    io_timeout: Duration,
    expose_bcc: bool,
}

impl SmtpConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::default(),
            credentials: None,
            hello_name: "localhost".to_string(),
            connect_timeout: Duration::from_secs(30),
            io_timeout: Duration::from_secs(60),
            expose_bcc: false,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the login.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Sets the name announced in `EHLO`.
    #[must_use]
    pub fn hello_name(mut self, name: impl Into<String>) -> Self {
        self.hello_name = name.into();
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the I/O timeout.
    #[must_use]
    pub const fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Keeps the `Bcc` header in the transmitted payload.
    #[must_use]
    pub const fn expose_bcc(mut self, expose: bool) -> Self {
        self.expose_bcc = expose;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> SmtpConfig {
        SmtpConfig {
            host: self.host,
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            security: self.security,
            credentials: self.credentials,
            hello_name: self.hello_name,
            connect_timeout: self.connect_timeout,
            io_timeout: self.io_timeout,
            expose_bcc: self.expose_bcc,
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
    fn test_default_ports() {
        assert_eq!(Security::None.default_port(), 587);
        assert_eq!(Security::StartTls.default_port(), 587);
        assert_eq!(Security::Implicit.default_port(), 465);
    }

    #[test]
    fn test_config_new() {
        let config = SmtpConfig::new("smtp.example.com");
        assert_eq!(config.host, "smtp.example.com");
        assert_eq!(config.port, 587);
        assert_eq!(config.security, Security::StartTls);
        assert!(config.credentials.is_none());
        assert!(!config.expose_bcc);
    }

    #[test]
    fn test_config_builder() {
        let config = SmtpConfig::builder("smtp.example.com")
            .security(Security::Implicit)
            .credentials("user", "secret")
            .hello_name("client.example.com")
            .connect_timeout(Duration::from_secs(10))
            .expose_bcc(true)
            .build();

        assert_eq!(config.port, 465);
        assert_eq!(config.credentials, Some(Credentials::new("user", "secret")));
        assert_eq!(config.hello_name, "client.example.com");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.expose_bcc);
    }

    #[test]
    fn test_explicit_port_wins() {
        let config = SmtpConfig::builder("smtp.example.com")
            .security(Security::Implicit)
            .port(2465)
            .build();
        assert_eq!(config.port, 2465);
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let debug = format!("{:?}", Credentials::new("user", "hunter2"));
        assert!(debug.contains("user"));
        assert!(!debug.contains("hunter2"));
    }
}
