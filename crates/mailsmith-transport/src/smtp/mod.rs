//! SMTP delivery.
//!
//! [`SmtpTransport`] opens one connection per message: greeting, `EHLO`,
//! optional `STARTTLS`, optional `AUTH`, one mail transaction, `QUIT`.
//! Every `To`, `Cc` and `Bcc` address becomes a `RCPT TO`; the `Bcc`
//! header itself is left out of the payload unless
//! [`SmtpConfig::expose_bcc`] is set.

mod command;
mod config;
mod extension;
mod reply;
mod session;
mod stream;

pub use command::Command;
pub use config::{Credentials, Security, SmtpConfig, SmtpConfigBuilder};
pub use extension::{AuthMechanism, Extension};
pub use reply::{Reply, ReplyCode, is_last_reply_line, parse_reply};
pub use session::Envelope;

use crate::error::{Error, Result};
use crate::transport::Transport;
use mailsmith_mime::{Encoder, EncoderConfig, HeaderExtension, Message};
use session::Session;
use tokio::io::{AsyncRead, AsyncWrite};

/// Transport delivering over SMTP.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    config: SmtpConfig,
    encoder: Encoder,
}

impl SmtpTransport {
    /// Creates a transport from its configuration.
    #[must_use]
    pub fn new(config: SmtpConfig) -> Self {
        let mut encoder_config = EncoderConfig::default().line_feed("\r\n");
        if !config.expose_bcc {
            encoder_config = encoder_config.exclude("Bcc");
        }

        Self {
            config,
            encoder: Encoder::with_config(encoder_config),
        }
    }

    /// Adds a header extension to the transport's encoder.
    #[must_use]
    pub fn with_extension(mut self, extension: impl HeaderExtension + 'static) -> Self {
        self.encoder = self.encoder.extension(extension);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SmtpConfig {
        &self.config
    }

    /// Returns the encoder used to build payloads.
    #[must_use]
    pub const fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// Builds the SMTP envelope of a message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSender`] without a `From` address and
    /// [`Error::NoRecipients`] when `To`, `Cc` and `Bcc` are all empty.
    pub fn envelope(message: &Message) -> Result<Envelope> {
        let from = message.from().ok_or(Error::MissingSender)?;
        let recipients: Vec<String> = message
            .recipients()
            .map(|address| address.email().to_string())
            .collect();
        if recipients.is_empty() {
            return Err(Error::NoRecipients);
        }

        Ok(Envelope {
            from: from.email().to_string(),
            recipients,
        })
    }

    /// Delivers a message over an already connected, plaintext stream.
    ///
    /// TLS settings of the configuration are not applied; the stream is
    /// used as is.
    ///
    /// # Errors
    ///
    /// Returns an error on encoding, I/O or protocol failure.
    pub async fn send_on<S>(&self, stream: S, message: &Message) -> Result<Reply>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let envelope = Self::envelope(message)?;
        let payload = self.encoder.encode(message)?;

        let mut session = Session::new(stream, self.config.io_timeout);
        session.greeting().await?;
        session.ehlo(&self.config.hello_name).await?;
        self.transact(session, &envelope, payload.as_bytes()).await
    }

    async fn transact<S>(
        &self,
        mut session: Session<S>,
        envelope: &Envelope,
        payload: &[u8],
    ) -> Result<Reply>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if let Some(credentials) = &self.config.credentials {
            session.authenticate(credentials).await?;
        }

        let reply = session.deliver(envelope, payload).await?;
        if let Err(error) = session.quit().await {
            tracing::debug!(%error, "QUIT failed after delivery");
        }

        tracing::info!(
            host = %self.config.host,
            from = %envelope.from,
            recipients = envelope.recipients.len(),
            reply = %reply.message_text(),
            "message delivered"
        );
        Ok(reply)
    }
}

impl Transport for SmtpTransport {
    type Ok = Reply;

    async fn send(&self, message: &Message) -> Result<Reply> {
        let envelope = Self::envelope(message)?;
        let payload = self.encoder.encode(message)?;
        let config = &self.config;

        let tcp = stream::connect(config).await?;
        match config.security {
            Security::None => {
                let mut session = Session::new(tcp, config.io_timeout);
                session.greeting().await?;
                session.ehlo(&config.hello_name).await?;
                self.transact(session, &envelope, payload.as_bytes()).await
            }
            Security::StartTls => {
                let mut session = Session::new(tcp, config.io_timeout);
                session.greeting().await?;
                session.ehlo(&config.hello_name).await?;
                session.starttls().await?;

                let tls = stream::upgrade_to_tls(session.into_inner(), &config.host, config.io_timeout)
                    .await?;
                let mut session = Session::new(tls, config.io_timeout);
                session.ehlo(&config.hello_name).await?;
                self.transact(session, &envelope, payload.as_bytes()).await
            }
            Security::Implicit => {
                let tls = stream::upgrade_to_tls(tcp, &config.host, config.io_timeout).await?;
                let mut session = Session::new(tls, config.io_timeout);
                session.greeting().await?;
                session.ehlo(&config.hello_name).await?;
                self.transact(session, &envelope, payload.as_bytes()).await
            }
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
    use mailsmith_mime::Address;

    fn message() -> Message {
        let mut message = Message::new();
        message
            .set_from(Address::with_name("Sender", "sender@example.com"))
            .set_to(["to@example.com"])
            .set_cc(["cc@example.com"])
            .set_bcc(["hidden@example.com"])
            .set_subject("Hi")
            .set_text("Hello");
        message
    }

    #[test]
    fn test_envelope_includes_all_recipients() {
        let envelope = SmtpTransport::envelope(&message()).unwrap();
        assert_eq!(envelope.from, "sender@example.com");
        assert_eq!(
            envelope.recipients,
            vec!["to@example.com", "cc@example.com", "hidden@example.com"]
        );
    }

    #[test]
    fn test_envelope_errors() {
        let mut message = message();
        message.reset_recipients();
        assert!(matches!(
            SmtpTransport::envelope(&message),
            Err(Error::NoRecipients)
        ));

        let mut message = Message::new();
        message.set_to(["to@example.com"]);
        assert!(matches!(
            SmtpTransport::envelope(&message),
            Err(Error::MissingSender)
        ));
    }

    #[test]
    fn test_bcc_hidden_by_default() {
        let transport = SmtpTransport::new(SmtpConfig::new("smtp.example.com"));
        let payload = transport.encoder().encode(&message()).unwrap();
        assert!(!payload.contains("Bcc:"));
        assert!(payload.contains("Cc: cc@example.com\r\n"));
    }

    #[test]
    fn test_bcc_exposed_on_request() {
        let config = SmtpConfig::builder("smtp.example.com").expose_bcc(true).build();
        let payload = SmtpTransport::new(config).encoder().encode(&message()).unwrap();
        assert!(payload.contains("Bcc: hidden@example.com\r\n"));
    }

    #[test]
    fn test_line_feed() {
        let transport = SmtpTransport::new(SmtpConfig::new("smtp.example.com"));
        assert_eq!(transport.line_feed(), "\r\n");
        assert_eq!(transport.encoder().line_feed(), "\r\n");
    }
}
