//! Integration tests for message encoding.
//!
//! Messages are encoded through the public API and the wire output is
//! taken apart again to check structure and content.

#![allow(clippy::unwrap_used)]

use mailsmith_mime::encoding::{decode_base64, decode_quoted_printable, decode_rfc2047};
use mailsmith_mime::{Address, Attachment, ContentType, Encoder, EncoderConfig, Message};

/// Splits an encoded message into header lines and body lines.
fn split(payload: &str) -> Vec<&str> {
    payload.strip_suffix("\r\n").unwrap().split("\r\n").collect()
}

/// Returns the content lines of the part whose `Content-Type` line starts
/// with `content_type`: everything between the blank line after its
/// headers and the next blank line.
fn part_content<'a>(lines: &[&'a str], content_type: &str) -> Vec<&'a str> {
    let start = lines
        .iter()
        .position(|l| l.starts_with(&format!("Content-Type: {content_type}")))
        .unwrap();
    let body_start = start + lines[start..].iter().position(|l| l.is_empty()).unwrap() + 1;
    lines[body_start..]
        .iter()
        .take_while(|l| !l.is_empty())
        .copied()
        .collect()
}

fn boundary_of(lines: &[&str], sub_type: &str) -> String {
    let line = lines
        .iter()
        .find(|l| l.starts_with(&format!("Content-Type: multipart/{sub_type}")))
        .unwrap();
    let content_type = ContentType::parse(line.trim_start_matches("Content-Type: ")).unwrap();
    content_type.boundary().unwrap().to_string()
}

fn full_message() -> Message {
    let mut message = Message::new();
    message
        .set_from(Address::with_name("Jürgen Müller", "juergen@example.com"))
        .set_to([Address::with_name("Ann", "ann@example.com"), Address::new("bob@example.com")])
        .set_subject("Angebot für Ihr Büro")
        .set_text("Guten Tag,\nanbei das Angebot.")
        .set_html("<html>\n  <body>\n    <p>Guten   Tag</p>\n    <img src=\"cid:logo\">\n  </body>\n</html>")
        .add_attachment(Attachment::new("logo.png", "image/png", vec![0x89, b'P', b'N', b'G']).with_id("logo"))
        .add_attachment(Attachment::new("angebot.pdf", "application/pdf", b"%PDF-1.4".to_vec()));
    message.add_header("X-Mailer", "mailsmith", false).unwrap();
    message
}

#[test]
fn test_full_message_structure() {
    let payload = Encoder::new().encode(&full_message()).unwrap();
    let lines = split(&payload);

    assert_eq!(lines[0], "From: =?UTF-8?Q?J=C3=BCrgen_M=C3=BCller?= <juergen@example.com>");
    assert_eq!(lines[1], "To: \"Ann\" <ann@example.com>, bob@example.com");
    assert_eq!(lines[2], "X-Mailer: mailsmith");
    assert_eq!(lines[3], "MIME-Version: 1.0");
    assert!(lines[4].starts_with("Subject: =?UTF-8?Q?"));
    assert!(lines[5].starts_with("Content-Type: multipart/mixed"));

    let mixed = boundary_of(&lines, "mixed");
    let alternative = boundary_of(&lines, "alternative");
    let related = boundary_of(&lines, "related");
    assert_ne!(mixed, alternative);
    assert_ne!(alternative, related);

    let position = |needle: &str| lines.iter().position(|l| *l == needle).unwrap();
    assert!(position(&format!("--{alternative}")) < position(&format!("--{related}")));
    assert!(position(&format!("--{related}--")) < position(&format!("--{alternative}--")));
    assert!(position(&format!("--{alternative}--")) < position(&format!("--{mixed}--")));
    assert_eq!(lines.last().copied(), Some(format!("--{mixed}--").as_str()));
}

#[test]
fn test_parts_decode_to_original_content() {
    let message = full_message();
    let payload = Encoder::new().encode(&message).unwrap();
    let lines = split(&payload);

    let text = part_content(&lines, "text/plain").concat();
    assert_eq!(
        String::from_utf8(decode_base64(&text).unwrap()).unwrap(),
        "Guten Tag,\nanbei das Angebot."
    );

    let html = part_content(&lines, "text/html").join("\r\n");
    assert_eq!(
        decode_quoted_printable(&html).unwrap(),
        "<html> <body> <p>Guten Tag</p> <img src=\"cid:logo\"> </body> </html>"
    );

    let pdf = part_content(&lines, "application/pdf").concat();
    assert_eq!(decode_base64(&pdf).unwrap(), b"%PDF-1.4");
}

#[test]
fn test_subject_round_trip() {
    let subject = "Übersicht der Änderungen in diesem Quartal, bitte sorgfältig prüfen ✓";
    let mut message = Message::new();
    message.set_subject(subject).set_text("x");

    let payload = Encoder::new().encode(&message).unwrap();
    let start = payload.find("Subject: ").unwrap() + "Subject: ".len();
    let end = payload[start..].find("\r\nContent-Type").unwrap() + start;
    let encoded = &payload[start..end];

    assert!(encoded.contains("\r\n "));
    for word in encoded.split("\r\n ") {
        assert!(word.len() <= 75, "encoded word too long: {word}");
    }
    assert_eq!(decode_rfc2047(encoded).unwrap(), subject);
}

#[test]
fn test_line_lengths() {
    let mut message = full_message();
    message
        .set_text("word ".repeat(400))
        .set_html(format!("<p>{}</p>", "lorem ipsum ".repeat(200)));

    let payload = Encoder::new().encode(&message).unwrap();
    let lines = split(&payload);

    for line in part_content(&lines, "text/plain") {
        assert!(line.len() <= 76);
    }
    for line in part_content(&lines, "text/html") {
        assert!(line.len() <= 76);
    }
    assert!(lines.iter().all(|l| l.len() <= 998));
}

#[test]
fn test_custom_line_feed_and_wrap() {
    let encoder = Encoder::with_config(EncoderConfig::default().line_feed("\n").line_length(40));
    let mut message = Message::new();
    message.set_text("a".repeat(200));

    let payload = encoder.encode(&message).unwrap();
    assert!(!payload.contains('\r'));
    let lines: Vec<&str> = payload.lines().collect();
    let body = &lines[lines.iter().position(|l| l.is_empty()).unwrap() + 1..];
    assert!(body.iter().filter(|l| !l.is_empty()).all(|l| l.len() <= 40));
}

#[test]
fn test_attachment_parameters_survive_encoding() {
    let mut message = Message::new();
    message
        .set_text("two files")
        .add_attachment(Attachment::new(
            "my \"best\" file.txt",
            "application/x-foo; comment=\"a;b\"",
            b"one".to_vec(),
        ))
        .add_attachment(Attachment::new("Grüße.txt", "text/plain", b"two".to_vec()));

    let payload = Encoder::new().encode(&message).unwrap();
    let lines = split(&payload);

    let first = lines.iter().find(|l| l.starts_with("Content-Type: application/x-foo")).unwrap();
    let parsed = ContentType::parse(first.trim_start_matches("Content-Type: ")).unwrap();
    assert_eq!(parsed.parameter("comment"), Some("a;b"));
    assert_eq!(parsed.parameter("name"), Some("my \"best\" file.txt"));

    assert!(lines.contains(&"    filename*=UTF-8''Gr%C3%BC%C3%9Fe.txt"));
    assert_eq!(decode_base64(&part_content(&lines, "text/plain; name*=").concat()).unwrap(), b"two");
}

#[test]
fn test_unreadable_attachment_fails_encode() {
    let mut message = Message::new();
    message
        .set_text("see attachment")
        .add_attachment(Attachment::from_file("/nonexistent/mailsmith/report.pdf", "application/pdf"));

    assert!(matches!(
        Encoder::new().encode(&message),
        Err(mailsmith_mime::Error::Io(_))
    ));
}
