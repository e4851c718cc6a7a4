//! Message encoder.
//!
//! [`Encoder`] turns a [`Message`] into wire lines: the header serializer
//! produces the `Name: value` lines, the body serializer the multipart
//! structure. Transports hold one encoder configured with their line feed
//! and any [`HeaderExtension`] they need.

mod body;
mod headers;

use crate::boundary::{Boundaries, DEFAULT_BOUNDARY_LENGTH};
use crate::encoding::LINE_LENGTH;
use crate::error::Result;
use crate::message::Message;
use headers::Exclusions;
use std::fmt;
use std::sync::Arc;

/// Strategy adding transport-specific headers to the serialized output.
///
/// Headers named by [`HeaderExtension::excluded`] are suppressed from the
/// message's custom headers so the extension can regenerate them.
pub trait HeaderExtension: fmt::Debug + Send + Sync {
    /// Header names this extension takes over (case-insensitive).
    fn excluded(&self) -> Vec<String>;

    /// Appends the extension's header lines.
    fn extend(&self, message: &Message, lines: &mut Vec<String>);
}

/// Encoder configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Line terminator used on the wire.
    pub line_feed: String,
    /// Length of generated boundary tokens.
    pub boundary_length: usize,
    /// Column at which Base64 content is wrapped.
    pub line_length: usize,
    /// Header names never emitted (case-insensitive).
    pub exclude: Vec<String>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            line_feed: "\r\n".to_string(),
            boundary_length: DEFAULT_BOUNDARY_LENGTH,
            line_length: LINE_LENGTH,
            exclude: Vec::new(),
        }
    }
}

impl EncoderConfig {
    /// Sets the line terminator.
    #[must_use]
    pub fn line_feed(mut self, line_feed: impl Into<String>) -> Self {
        self.line_feed = line_feed.into();
        self
    }

    /// Sets the boundary token length. Values outside `1..=70` are clamped
    /// when boundaries are generated.
    #[must_use]
    pub const fn boundary_length(mut self, length: usize) -> Self {
        self.boundary_length = length;
        self
    }

    /// Sets the Base64 wrap column.
    #[must_use]
    pub const fn line_length(mut self, length: usize) -> Self {
        self.line_length = length;
        self
    }

    /// Adds a header name to leave out of the output.
    #[must_use]
    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.exclude.push(name.into());
        self
    }
}

/// MIME message encoder.
///
/// Stateless between calls: boundaries are generated per encode.
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    config: EncoderConfig,
    extensions: Vec<Arc<dyn HeaderExtension>>,
}

impl Encoder {
    /// Creates an encoder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an encoder with the given configuration.
    #[must_use]
    pub fn with_config(config: EncoderConfig) -> Self {
        Self {
            config,
            extensions: Vec::new(),
        }
    }

    /// Adds a header extension.
    #[must_use]
    pub fn extension(mut self, extension: impl HeaderExtension + 'static) -> Self {
        self.extensions.push(Arc::new(extension));
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Returns the line terminator.
    #[must_use]
    pub fn line_feed(&self) -> &str {
        &self.config.line_feed
    }

    /// Serializes the headers, honoring `exclude` on top of the configured
    /// and extension exclusions.
    #[must_use]
    pub fn headers(&self, message: &Message, exclude: &[&str]) -> Vec<String> {
        let mut excluded: Vec<String> = self.config.exclude.clone();
        excluded.extend(exclude.iter().map(ToString::to_string));
        for extension in &self.extensions {
            excluded.extend(extension.excluded());
        }

        let fold = format!("{} ", self.config.line_feed);
        let mut lines = headers::serialize(message, Exclusions::new(&excluded), &fold);
        for extension in &self.extensions {
            extension.extend(message, &mut lines);
        }
        lines
    }

    /// Serializes the body with a fresh set of boundaries.
    ///
    /// # Errors
    ///
    /// Returns an error if an attachment cannot be read.
    pub fn body(&self, message: &Message) -> Result<Vec<String>> {
        let mut boundaries = Boundaries::with_length(self.config.boundary_length);
        body::serialize(message, &mut boundaries, self.config.line_length)
    }

    /// Encodes the complete message: headers, then body, every line
    /// terminated by the configured line feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized.
    pub fn encode(&self, message: &Message) -> Result<String> {
        let mut lines = self.headers(message, &[]);
        lines.extend(self.body(message)?);

        let line_feed = self.line_feed();
        let mut payload = lines.join(line_feed);
        payload.push_str(line_feed);
        Ok(payload)
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
    use crate::Address;

    #[derive(Debug)]
    struct Tracking;

    impl HeaderExtension for Tracking {
        fn excluded(&self) -> Vec<String> {
            vec!["X-Track".to_string()]
        }

        fn extend(&self, message: &Message, lines: &mut Vec<String>) {
            let ids = message.header("X-Track").join("+");
            lines.push(format!("X-Track: merged({ids})"));
        }
    }

    fn sample() -> Message {
        let mut message = Message::new();
        message
            .set_from(Address::with_name("Sender", "sender@example.com"))
            .set_to(["rcpt@example.com"])
            .set_subject("Greetings")
            .set_text("Hello");
        message
    }

    #[test]
    fn test_encode_joins_with_line_feed() {
        let payload = Encoder::new().encode(&sample()).unwrap();
        assert_eq!(
            payload,
            "From: \"Sender\" <sender@example.com>\r\n\
             To: rcpt@example.com\r\n\
             MIME-Version: 1.0\r\n\
             Subject: Greetings\r\n\
             Content-Type: text/plain; charset=\"US-ASCII\"; format=flowed; delsp=yes\r\n\
             Content-Transfer-Encoding: base64\r\n\
             \r\n\
             SGVsbG8=\r\n\
             \r\n"
        );
    }

    #[test]
    fn test_custom_line_feed() {
        let encoder = Encoder::with_config(EncoderConfig::default().line_feed("\n"));
        let payload = encoder.encode(&sample()).unwrap();
        assert!(!payload.contains('\r'));
        assert!(payload.ends_with("SGVsbG8=\n\n"));
    }

    #[test]
    fn test_configured_exclusions() {
        let encoder = Encoder::with_config(EncoderConfig::default().exclude("from"));
        let lines = encoder.headers(&sample(), &["SUBJECT"]);
        assert_eq!(lines, vec!["To: rcpt@example.com", "MIME-Version: 1.0"]);
    }

    #[test]
    fn test_extension_replaces_header() {
        let mut message = sample();
        message.add_header("X-Track", "a", false).unwrap();
        message.add_header("X-Track", "b", false).unwrap();

        let lines = Encoder::new().extension(Tracking).headers(&message, &[]);
        let tracked: Vec<_> = lines.iter().filter(|l| l.starts_with("X-Track")).collect();
        assert_eq!(tracked, vec!["X-Track: merged(a+b)"]);
        assert_eq!(lines.last().map(String::as_str), Some("X-Track: merged(a+b)"));
    }

    #[test]
    fn test_boundaries_fresh_per_encode() {
        let mut message = sample();
        message.set_html("<p>Hello</p>");
        let encoder = Encoder::new();

        let first = encoder.body(&message).unwrap();
        let second = encoder.body(&message).unwrap();
        assert!(first[0].starts_with("Content-Type: multipart/alternative"));
        assert_ne!(first[0], second[0]);
    }

    #[test]
    fn test_zero_boundary_length_still_delimits() {
        let mut message = sample();
        message.set_html("<p>Hello</p>");
        let encoder = Encoder::with_config(EncoderConfig::default().boundary_length(0));

        let lines = encoder.body(&message).unwrap();
        assert!(!lines[0].contains("boundary=\"\""));
        assert!(lines.iter().all(|l| l != "--"));
    }

    #[test]
    fn test_long_subject_folded_with_line_feed() {
        let mut message = sample();
        message.set_subject("Überraschung! ".repeat(10));
        let lines = Encoder::new().headers(&message, &[]);
        let subject = lines.iter().find(|l| l.starts_with("Subject:")).unwrap();
        assert!(subject.contains("?=\r\n =?UTF-8?Q?"));
        assert!(subject.split("\r\n").all(|segment| segment.len() <= 998));
    }
}
