//! Outgoing message value.

use crate::address::Address;
use crate::attachment::Attachment;
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::html;

/// Header names that can only be produced by the dedicated setters.
pub const RESERVED_HEADERS: [&str; 5] = ["Subject", "From", "To", "Cc", "Bcc"];

fn is_reserved(name: &str) -> bool {
    RESERVED_HEADERS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name.trim()))
}

/// An email to be encoded and handed to a transport.
///
/// The value is fully populated by the caller before encoding. Recipient
/// fields may change between two encodes of the same message (see
/// [`Message::reset_recipients`]); everything else is expected to stay put.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    headers: Headers,
    from: Option<Address>,
    to: Vec<Address>,
    cc: Vec<Address>,
    bcc: Vec<Address>,
    subject: String,
    text: Option<String>,
    html: Option<String>,
    attachments: Vec<Attachment>,
}

impl Message {
    /// Creates an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the custom headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns every value of a custom header.
    #[must_use]
    pub fn header(&self, name: &str) -> Vec<&str> {
        self.headers.get_all(name)
    }

    /// Replaces all custom headers.
    ///
    /// Values are emitted as given apart from trimming and RFC 2047
    /// encoding of non-ASCII text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if any name is reserved; the
    /// message is left unchanged in that case.
    pub fn set_headers(&mut self, headers: Headers) -> Result<&mut Self> {
        if let Some((name, _)) = headers.entries().find(|(name, _)| is_reserved(name)) {
            return Err(Error::reserved_header(name));
        }
        self.headers = headers;
        Ok(self)
    }

    /// Adds a custom header value.
    ///
    /// With `replace` set, existing values of the header are discarded;
    /// otherwise the value is appended after them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `name` is reserved.
    pub fn add_header(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        replace: bool,
    ) -> Result<&mut Self> {
        let name = name.into();
        if is_reserved(&name) {
            return Err(Error::reserved_header(&name));
        }

        if replace {
            self.headers.set(name, value);
        } else {
            self.headers.add(name, value);
        }
        Ok(self)
    }

    /// Returns the sender.
    #[must_use]
    pub const fn from(&self) -> Option<&Address> {
        self.from.as_ref()
    }

    /// Sets the sender.
    pub fn set_from(&mut self, from: impl Into<Address>) -> &mut Self {
        self.from = Some(from.into());
        self
    }

    /// Returns the `To` recipients.
    #[must_use]
    pub fn to(&self) -> &[Address] {
        &self.to
    }

    /// Replaces the `To` recipients.
    pub fn set_to<I, A>(&mut self, to: I) -> &mut Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Address>,
    {
        self.to = to.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the `Cc` recipients.
    #[must_use]
    pub fn cc(&self) -> &[Address] {
        &self.cc
    }

    /// Replaces the `Cc` recipients.
    pub fn set_cc<I, A>(&mut self, cc: I) -> &mut Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Address>,
    {
        self.cc = cc.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the `Bcc` recipients.
    #[must_use]
    pub fn bcc(&self) -> &[Address] {
        &self.bcc
    }

    /// Replaces the `Bcc` recipients.
    pub fn set_bcc<I, A>(&mut self, bcc: I) -> &mut Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Address>,
    {
        self.bcc = bcc.into_iter().map(Into::into).collect();
        self
    }

    /// Clears `To`, `Cc` and `Bcc`. The sender is kept.
    pub fn reset_recipients(&mut self) -> &mut Self {
        self.to.clear();
        self.cc.clear();
        self.bcc.clear();
        self
    }

    /// Returns every recipient (`To`, then `Cc`, then `Bcc`).
    pub fn recipients(&self) -> impl Iterator<Item = &Address> {
        self.to.iter().chain(&self.cc).chain(&self.bcc)
    }

    /// Returns the subject (empty when unset).
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Sets the subject.
    pub fn set_subject(&mut self, subject: impl Into<String>) -> &mut Self {
        self.subject = subject.into();
        self
    }

    /// Returns the plain text body.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Returns true if the plain text body is non-empty.
    #[must_use]
    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Sets the plain text body.
    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(text.into());
        self
    }

    /// Returns the HTML body as set.
    #[must_use]
    pub fn html(&self) -> Option<&str> {
        self.html.as_deref()
    }

    /// Returns the HTML body with insignificant whitespace collapsed.
    #[must_use]
    pub fn minified_html(&self) -> Option<String> {
        self.html.as_deref().map(html::minify)
    }

    /// Returns true if the HTML body is non-empty.
    #[must_use]
    pub fn has_html(&self) -> bool {
        self.html.as_deref().is_some_and(|h| !h.is_empty())
    }

    /// Sets the HTML body.
    pub fn set_html(&mut self, html: impl Into<String>) -> &mut Self {
        self.html = Some(html.into());
        self
    }

    /// Returns the attachments in insertion order.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Replaces all attachments.
    pub fn set_attachments(&mut self, attachments: impl IntoIterator<Item = Attachment>) -> &mut Self {
        self.attachments = attachments.into_iter().collect();
        self
    }

    /// Appends an attachment.
    pub fn add_attachment(&mut self, attachment: Attachment) -> &mut Self {
        self.attachments.push(attachment);
        self
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
    fn test_reserved_header_rejected() {
        let mut message = Message::new();
        for name in ["Subject", "From", "To", "Cc", "Bcc", "subject", " BCC "] {
            let err = message.add_header(name, "x", false).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "{name} accepted");
        }
        assert!(message.headers().is_empty());
    }

    #[test]
    fn test_add_header_appends_values() {
        let mut message = Message::new();
        message.add_header("X-Custom", "v1", false).unwrap();
        message.add_header("X-Custom", "v2", false).unwrap();
        assert_eq!(message.header("x-custom"), vec!["v1", "v2"]);
    }

    #[test]
    fn test_add_header_replace() {
        let mut message = Message::new();
        message.add_header("X-Custom", "v1", false).unwrap();
        message.add_header("X-Custom", "v2", true).unwrap();
        assert_eq!(message.header("X-Custom"), vec!["v2"]);
    }

    #[test]
    fn test_set_headers_rejects_reserved() {
        let mut message = Message::new();
        message.add_header("X-Keep", "1", false).unwrap();

        let mut headers = Headers::new();
        headers.add("X-Other", "2");
        headers.add("To", "someone@example.com");
        assert!(message.set_headers(headers).is_err());
        assert_eq!(message.header("X-Keep"), vec!["1"]);

        let mut headers = Headers::new();
        headers.add("X-Other", "2");
        message.set_headers(headers).unwrap();
        assert!(message.header("X-Keep").is_empty());
        assert_eq!(message.header("X-Other"), vec!["2"]);
    }

    #[test]
    fn test_reset_recipients_keeps_sender() {
        let mut message = Message::new();
        message
            .set_from("sender@example.com")
            .set_to(["a@example.com", "b@example.com"])
            .set_cc(["c@example.com"])
            .set_bcc(["d@example.com"]);
        assert_eq!(message.recipients().count(), 4);

        message.reset_recipients();
        assert!(message.to().is_empty());
        assert!(message.cc().is_empty());
        assert!(message.bcc().is_empty());
        assert_eq!(message.from().map(Address::email), Some("sender@example.com"));
    }

    #[test]
    fn test_has_text_and_html() {
        let mut message = Message::new();
        assert!(!message.has_text());
        assert!(!message.has_html());

        message.set_text("").set_html("");
        assert!(!message.has_text());
        assert!(!message.has_html());

        message.set_text("hi").set_html("<p>hi</p>");
        assert!(message.has_text());
        assert!(message.has_html());
        assert_eq!(message.subject(), "");
    }

    #[test]
    fn test_attachments_order() {
        let mut message = Message::new();
        message
            .add_attachment(Attachment::new("a.txt", "text/plain", b"a".to_vec()))
            .add_attachment(Attachment::new("b.txt", "text/plain", b"b".to_vec()));
        let names: Vec<_> = message.attachments().iter().map(Attachment::name).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);

        message.set_attachments(Vec::new());
        assert!(message.attachments().is_empty());
    }
}
