//! Integration tests for the transports.
//!
//! SMTP tests drive a scripted mock stream; the server replies are fed in
//! order and everything the client writes is captured for inspection.

#![allow(clippy::unwrap_used)]

use std::io::{self, Cursor};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing_subscriber::EnvFilter;

use mailsmith_mime::{Address, Attachment, Message};
use mailsmith_transport::{
    Error, MemoryTransport, Recipient, SmtpConfig, SmtpTransport, Transport,
};

/// Mock stream that returns predefined responses.
struct MockStream {
    /// Responses to return (in order).
    responses: Cursor<Vec<u8>>,
    /// Captured commands sent by the client.
    sent: Vec<u8>,
}

impl MockStream {
    fn new(responses: &[u8]) -> Self {
        Self {
            responses: Cursor::new(responses.to_vec()),
            sent: Vec::new(),
        }
    }

    fn sent_text(&self) -> String {
        String::from_utf8(self.sent.clone()).unwrap()
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let data = self.responses.get_ref();
        let pos = usize::try_from(self.responses.position()).unwrap();

        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        // One line per read, like a server answering command by command.
        let remaining = &data[pos..];
        let line_end = remaining
            .iter()
            .position(|&b| b == b'\n')
            .map_or(remaining.len(), |i| i + 1);
        let to_read = line_end.min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.responses.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Routes logs to the test harness; `RUST_LOG=debug` shows the dialog.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

const DIALOG: &[u8] = b"220 mock ESMTP ready\r\n\
250-mock greets client.test\r\n\
250-AUTH PLAIN LOGIN\r\n\
250 8BITMIME\r\n\
235 2.7.0 Authentication successful\r\n\
250 2.1.0 Sender ok\r\n\
250 2.1.5 Recipient ok\r\n\
250 2.1.5 Recipient ok\r\n\
250 2.1.5 Recipient ok\r\n\
354 End data with <CR><LF>.<CR><LF>\r\n\
250 2.0.0 Ok: queued as ABC123\r\n\
221 2.0.0 Bye\r\n";

fn config() -> SmtpConfig {
    SmtpConfig::builder("smtp.example.com")
        .credentials("user", "pass")
        .hello_name("client.test")
        .build()
}

fn message() -> Message {
    let mut message = Message::new();
    message
        .set_from(Address::with_name("Sender", "sender@example.com"))
        .set_to(["to@example.com"])
        .set_cc(["cc@example.com"])
        .set_bcc(["hidden@example.com"])
        .set_subject("Report")
        .set_text("See attached.\n.leading dot")
        .set_html("<p>See <b>attached</b>.</p>")
        .add_attachment(Attachment::new("report.txt", "text/plain", b"line one\n".to_vec()));
    message
}

#[tokio::test]
async fn test_smtp_full_dialog() {
    init_tracing();
    let transport = SmtpTransport::new(config());
    let mut stream = MockStream::new(DIALOG);

    let reply = transport.send_on(&mut stream, &message()).await.unwrap();
    assert_eq!(reply.code.as_u16(), 250);
    assert_eq!(reply.message_text(), "2.0.0 Ok: queued as ABC123");

    let sent = stream.sent_text();
    let expected_prefix = "EHLO client.test\r\n\
AUTH PLAIN AHVzZXIAcGFzcw==\r\n\
MAIL FROM:<sender@example.com>\r\n\
RCPT TO:<to@example.com>\r\n\
RCPT TO:<cc@example.com>\r\n\
RCPT TO:<hidden@example.com>\r\n\
DATA\r\n";
    assert!(sent.starts_with(expected_prefix), "unexpected dialog: {sent}");
    assert!(sent.ends_with("\r\n.\r\nQUIT\r\n"));

    let data = &sent[expected_prefix.len()..sent.len() - "QUIT\r\n".len()];
    assert!(data.contains("From: \"Sender\" <sender@example.com>\r\n"));
    assert!(data.contains("Cc: cc@example.com\r\n"));
    assert!(!data.contains("Bcc:"));
    assert!(data.contains("Content-Type: multipart/mixed; boundary="));
    assert!(data.contains("Content-Disposition: attachment;\r\n    filename=\"report.txt\"\r\n"));

    // every line CRLF terminated, no bare LF
    assert!(!data.replace("\r\n", "").contains('\n'));
}

#[tokio::test]
async fn test_smtp_rejected_sender() {
    init_tracing();
    let transport = SmtpTransport::new(config());
    let mut stream = MockStream::new(
        b"220 mock\r\n\
250 mock\r\n\
235 ok\r\n\
553 5.7.1 Sender address rejected\r\n",
    );

    let err = transport.send_on(&mut stream, &message()).await.unwrap_err();
    assert!(err.is_permanent());
    assert!(matches!(err, Error::SmtpError { code: 553, .. }));
    assert!(!stream.sent_text().contains("DATA"));
}

#[tokio::test]
async fn test_smtp_without_credentials_skips_auth() {
    let config = SmtpConfig::builder("smtp.example.com")
        .hello_name("client.test")
        .build();
    let transport = SmtpTransport::new(config);
    let mut message = Message::new();
    message
        .set_from("sender@example.com")
        .set_to(["to@example.com"])
        .set_text("Hello");

    let mut stream = MockStream::new(
        b"220 mock\r\n\
250 mock\r\n\
250 ok\r\n\
250 ok\r\n\
354 go\r\n\
250 queued\r\n\
221 bye\r\n",
    );
    transport.send_on(&mut stream, &message).await.unwrap();

    let payload = transport.encoder().encode(&message).unwrap();
    let expected = format!(
        "EHLO client.test\r\n\
MAIL FROM:<sender@example.com>\r\n\
RCPT TO:<to@example.com>\r\n\
DATA\r\n\
{payload}.\r\n\
QUIT\r\n"
    );
    assert_eq!(stream.sent_text(), expected);
}

#[tokio::test]
async fn test_mass_send_one_copy_per_recipient() {
    let transport = MemoryTransport::new();
    let mut message = Message::new();
    message
        .set_from("newsletter@example.com")
        .set_subject("Monthly news")
        .set_text("News");

    let recipients = vec![
        Recipient::from(Address::with_name("Ann", "ann@example.com")),
        Recipient::from("bob@example.com"),
        Recipient::Group(vec![
            Address::new("team1@example.com"),
            Address::new("team2@example.com"),
        ]),
    ];

    let mut seen = Vec::new();
    let mut callback = |recipient: &Recipient, index: usize| {
        seen.push((index, recipient.addresses().len()));
    };
    let results = transport
        .mass_send(&mut message, &recipients, Some(&mut callback))
        .await;

    assert_eq!(results.into_iter().map(Result::unwrap).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert_eq!(seen, vec![(0, 1), (1, 1), (2, 2)]);

    let sent = transport.messages();
    assert!(sent[0].payload.contains("To: \"Ann\" <ann@example.com>\r\n"));
    assert!(sent[1].payload.contains("To: bob@example.com\r\n"));
    assert!(sent[2].payload.contains("To: team1@example.com, team2@example.com\r\n"));
    assert_eq!(sent[2].envelope.recipients, vec!["team1@example.com", "team2@example.com"]);

    assert!(message.to().is_empty());
    assert_eq!(message.subject(), "Monthly news");
}

#[tokio::test]
async fn test_mass_send_continues_after_failure() {
    let transport = MemoryTransport::new();
    let mut message = Message::new();
    message.set_from("sender@example.com").set_text("Hi");

    let recipients = vec![
        Recipient::from("a@example.com"),
        Recipient::Group(Vec::new()),
        Recipient::from("c@example.com"),
    ];

    let mut calls = 0;
    let mut callback = |_: &Recipient, _: usize| calls += 1;
    let results = transport
        .mass_send(&mut message, &recipients, Some(&mut callback))
        .await;

    assert_eq!(calls, 3);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(Error::NoRecipients)));
    assert!(results[2].is_ok());
    assert_eq!(transport.messages().len(), 2);
}
