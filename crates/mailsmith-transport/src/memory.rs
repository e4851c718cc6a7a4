//! In-memory transport.

use crate::error::Result;
use crate::smtp::{Envelope, SmtpTransport};
use crate::transport::Transport;
use mailsmith_mime::{Encoder, Message};
use std::sync::{Mutex, PoisonError};

/// A message accepted by [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Envelope the message would have been delivered with.
    pub envelope: Envelope,
    /// Encoded payload.
    pub payload: String,
}

/// Transport keeping every message in memory instead of delivering it.
///
/// Useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    encoder: Encoder,
    sent: Mutex<Vec<SentMessage>>,
}

impl MemoryTransport {
    /// Creates an empty transport with the default encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty transport with the given encoder.
    #[must_use]
    pub fn with_encoder(encoder: Encoder) -> Self {
        Self {
            encoder,
            sent: Mutex::default(),
        }
    }

    /// Returns a copy of every message sent so far.
    #[must_use]
    pub fn messages(&self) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drops all recorded messages.
    pub fn clear(&self) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Transport for MemoryTransport {
    /// Index of the message in [`MemoryTransport::messages`].
    type Ok = usize;

    fn line_feed(&self) -> &str {
        self.encoder.line_feed()
    }

    async fn send(&self, message: &Message) -> Result<usize> {
        let envelope = SmtpTransport::envelope(message)?;
        let payload = self.encoder.encode(message)?;

        let mut sent = self.sent.lock().unwrap_or_else(PoisonError::into_inner);
        sent.push(SentMessage { envelope, payload });
        tracing::debug!(index = sent.len() - 1, "message recorded");
        Ok(sent.len() - 1)
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
    use crate::error::Error;
    use mailsmith_mime::EncoderConfig;

    #[tokio::test]
    async fn test_records_messages() {
        let transport = MemoryTransport::new();
        let mut message = Message::new();
        message
            .set_from("sender@example.com")
            .set_to(["rcpt@example.com"])
            .set_text("Hello");

        assert_eq!(transport.send(&message).await.unwrap(), 0);
        assert_eq!(transport.send(&message).await.unwrap(), 1);

        let messages = transport.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].envelope.recipients, vec!["rcpt@example.com"]);
        assert!(messages[0].payload.starts_with("From: sender@example.com\r\n"));

        transport.clear();
        assert!(transport.messages().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_message_without_sender() {
        let transport = MemoryTransport::new();
        let mut message = Message::new();
        message.set_to(["rcpt@example.com"]);
        assert!(matches!(
            transport.send(&message).await,
            Err(Error::MissingSender)
        ));
        assert!(transport.messages().is_empty());
    }

    #[test]
    fn test_line_feed_follows_encoder() {
        let transport =
            MemoryTransport::with_encoder(Encoder::with_config(EncoderConfig::default().line_feed("\n")));
        assert_eq!(transport.line_feed(), "\n");
    }
}
