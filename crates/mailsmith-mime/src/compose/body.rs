//! Body serializer: multipart structure and content encoding.

use crate::attachment::Attachment;
use crate::boundary::{Boundaries, BoundaryKind};
use crate::content_type::{ContentType, file_name_parameter};
use crate::encoding::{Charset, TransferEncoding, encode_base64_lines, encode_quoted_printable};
use crate::error::Result;
use crate::message::Message;

const PREAMBLE: &str = "This is a multi-part message in MIME format.";

/// Accumulates body lines for one encode pass.
struct BodyWriter<'b> {
    lines: Vec<String>,
    boundaries: &'b mut Boundaries,
    line_length: usize,
}

impl BodyWriter<'_> {
    fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn blank(&mut self) {
        self.lines.push(String::new());
    }

    fn delimiter(&mut self, kind: BoundaryKind) {
        let line = self.boundaries.open(kind);
        self.lines.push(line);
    }

    fn close(&mut self, kind: BoundaryKind) {
        let line = self.boundaries.close(kind);
        self.lines.push(line);
    }

    /// Opens a `multipart/<kind>` envelope up to its first delimiter.
    fn open_envelope(&mut self, kind: BoundaryKind) {
        let content_type = ContentType::multipart(kind.subtype(), self.boundaries.get(kind));
        self.push(format!("Content-Type: {content_type}"));
        self.blank();
        self.push(PREAMBLE);
        self.blank();
        self.delimiter(kind);
    }

    fn text_part(&mut self, sub_type: &str, charset: Charset, encoding: TransferEncoding) {
        self.push(format!(
            "Content-Type: {}",
            ContentType::flowed_text(sub_type, charset)
        ));
        self.push(format!("Content-Transfer-Encoding: {encoding}"));
        self.blank();
    }

    fn base64_content(&mut self, data: &[u8]) {
        let encoded = encode_base64_lines(data, self.line_length);
        self.lines.extend(encoded);
        self.blank();
    }

    /// The caller's type is emitted as given; only `name` is appended.
    fn attachment_headers(&mut self, attachment: &Attachment) {
        let content_type = attachment.content_type().trim().trim_end_matches(';').trim_end();
        self.push(format!(
            "Content-Type: {content_type}; {}",
            file_name_parameter("name", attachment.name())
        ));
        self.push(format!(
            "Content-Transfer-Encoding: {}",
            TransferEncoding::Base64
        ));
    }

    fn inline_attachment(&mut self, attachment: &Attachment) -> Result<()> {
        let contents = attachment.contents()?;
        self.delimiter(BoundaryKind::Related);
        self.attachment_headers(attachment);
        self.push("Content-Disposition: inline");
        self.push(format!("Content-ID: <{}>", attachment.id().unwrap_or_default()));
        self.blank();
        self.base64_content(&contents);
        Ok(())
    }

    fn regular_attachment(&mut self, attachment: &Attachment) -> Result<()> {
        let contents = attachment.contents()?;
        self.delimiter(BoundaryKind::Mixed);
        self.attachment_headers(attachment);
        self.push("Content-Disposition: attachment;");
        self.push(format!("    {}", file_name_parameter("filename", attachment.name())));
        self.blank();
        self.base64_content(&contents);
        Ok(())
    }
}

/// Serializes the message body into wire lines (without terminators).
///
/// The first lines are the top-level `Content-Type` and
/// `Content-Transfer-Encoding` headers of the body, so the result is meant
/// to directly follow the output of the header serializer.
///
/// # Errors
///
/// Returns an error if an attachment cannot be read.
pub(crate) fn serialize(
    message: &Message,
    boundaries: &mut Boundaries,
    line_length: usize,
) -> Result<Vec<String>> {
    let (inline, regular): (Vec<&Attachment>, Vec<&Attachment>) =
        message.attachments().iter().partition(|a| a.is_inline());
    let alternative = message.has_text() && message.has_html();
    let related = message.has_html() && !inline.is_empty();

    tracing::debug!(
        mixed = !regular.is_empty(),
        alternative,
        related,
        "composing MIME body"
    );
    if !inline.is_empty() && !message.has_html() {
        tracing::warn!(
            count = inline.len(),
            "inline attachments dropped: message has no HTML body"
        );
    }

    let mut writer = BodyWriter {
        lines: Vec::new(),
        boundaries,
        line_length,
    };

    if !regular.is_empty() {
        writer.open_envelope(BoundaryKind::Mixed);
    }

    if alternative {
        writer.open_envelope(BoundaryKind::Alternative);
    }

    if let Some(text) = message.text().filter(|t| !t.is_empty()) {
        writer.text_part("plain", Charset::detect(text), TransferEncoding::Base64);
        writer.base64_content(text.as_bytes());
    }

    if let Some(html) = message.html().filter(|h| !h.is_empty()) {
        if alternative {
            writer.delimiter(BoundaryKind::Alternative);
        }

        if related {
            writer.open_envelope(BoundaryKind::Related);
        }

        writer.text_part("html", Charset::detect(html), TransferEncoding::QuotedPrintable);
        let minified = crate::html::minify(html);
        writer.lines.extend(encode_quoted_printable(&minified));
        writer.blank();

        if related {
            for attachment in &inline {
                writer.inline_attachment(attachment)?;
            }
            writer.close(BoundaryKind::Related);
        }

        if alternative {
            writer.close(BoundaryKind::Alternative);
        }
    }

    if !regular.is_empty() {
        for attachment in &regular {
            writer.regular_attachment(attachment)?;
        }
        writer.close(BoundaryKind::Mixed);
    }

    Ok(writer.lines)
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
    use crate::encoding::{LINE_LENGTH, decode_base64, decode_quoted_printable};

    fn body(message: &Message) -> (Vec<String>, Boundaries) {
        let mut boundaries = Boundaries::new();
        let lines = serialize(message, &mut boundaries, LINE_LENGTH).unwrap();
        (lines, boundaries)
    }

    fn count(lines: &[String], needle: &str) -> usize {
        lines.iter().filter(|l| l.contains(needle)).count()
    }

    fn position(lines: &[String], line: &str) -> usize {
        lines.iter().position(|l| l == line).unwrap()
    }

    #[test]
    fn test_empty_body() {
        let (lines, _) = body(&Message::new());
        assert!(lines.is_empty());
    }

    #[test]
    fn test_text_only() {
        let mut message = Message::new();
        message.set_text("Hello, plain world!");
        let (lines, _) = body(&message);

        assert_eq!(
            lines,
            vec![
                "Content-Type: text/plain; charset=\"US-ASCII\"; format=flowed; delsp=yes",
                "Content-Transfer-Encoding: base64",
                "",
                "SGVsbG8sIHBsYWluIHdvcmxkIQ==",
                "",
            ]
        );
    }

    #[test]
    fn test_text_only_round_trip() {
        let text = "Ünïcode text, repeated. ".repeat(30);
        let mut message = Message::new();
        message.set_text(text.clone());
        let (lines, _) = body(&message);

        assert_eq!(count(&lines, "Content-Type: text/plain"), 1);
        assert_eq!(count(&lines, "multipart/"), 0);
        assert!(lines[0].contains("charset=\"UTF-8\""));

        let payload: Vec<&String> = lines[3..].iter().take_while(|l| !l.is_empty()).collect();
        assert!(payload.iter().all(|l| l.len() <= LINE_LENGTH));
        let joined: String = payload.iter().map(|l| l.as_str()).collect();
        assert_eq!(decode_base64(&joined).unwrap(), text.as_bytes());
    }

    #[test]
    fn test_html_only() {
        let mut message = Message::new();
        message.set_html("<p>\n  Hi   there\n</p>");
        let (lines, _) = body(&message);

        assert_eq!(
            lines,
            vec![
                "Content-Type: text/html; charset=\"US-ASCII\"; format=flowed; delsp=yes",
                "Content-Transfer-Encoding: quoted-printable",
                "",
                "<p> Hi there </p>",
                "",
            ]
        );
    }

    #[test]
    fn test_text_and_html_alternative() {
        let mut message = Message::new();
        message.set_text("plain").set_html("<b>rich</b>");
        let (lines, mut boundaries) = body(&message);
        let alternative = boundaries.get(BoundaryKind::Alternative).to_string();

        assert_eq!(count(&lines, "multipart/alternative"), 1);
        assert_eq!(count(&lines, "multipart/mixed"), 0);
        assert_eq!(count(&lines, "multipart/related"), 0);
        assert_eq!(
            lines[0],
            format!("Content-Type: multipart/alternative; boundary=\"{alternative}\"")
        );
        assert_eq!(lines[2], PREAMBLE);

        let open = format!("--{alternative}");
        let close = format!("--{alternative}--");
        let delimiters: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == open)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(delimiters.len(), 2);

        let text = lines.iter().position(|l| l.contains("text/plain")).unwrap();
        let html = lines.iter().position(|l| l.contains("text/html")).unwrap();
        assert!(delimiters[0] < text && text < delimiters[1] && delimiters[1] < html);
        assert_eq!(lines.last(), Some(&close));
    }

    #[test]
    fn test_full_nesting() {
        let mut message = Message::new();
        message
            .set_text("See the picture.")
            .set_html("<img src=\"cid:logo\">")
            .add_attachment(Attachment::new("logo.png", "image/png", vec![1, 2, 3]).with_id("logo"))
            .add_attachment(Attachment::new("report.pdf", "application/pdf", b"%PDF-1.4".to_vec()));
        let (lines, mut boundaries) = body(&message);

        let mixed = boundaries.get(BoundaryKind::Mixed).to_string();
        let alternative = boundaries.get(BoundaryKind::Alternative).to_string();
        let related = boundaries.get(BoundaryKind::Related).to_string();

        let mixed_type = position(&lines, &format!("Content-Type: multipart/mixed; boundary=\"{mixed}\""));
        let alt_type = position(
            &lines,
            &format!("Content-Type: multipart/alternative; boundary=\"{alternative}\""),
        );
        let rel_type = position(&lines, &format!("Content-Type: multipart/related; boundary=\"{related}\""));
        let html = lines.iter().position(|l| l.contains("text/html")).unwrap();
        let inline = position(&lines, "Content-Type: image/png; name=\"logo.png\"");
        let rel_close = position(&lines, &format!("--{related}--"));
        let alt_close = position(&lines, &format!("--{alternative}--"));
        let regular = position(&lines, "Content-Type: application/pdf; name=\"report.pdf\"");
        let mixed_close = position(&lines, &format!("--{mixed}--"));

        assert_eq!(mixed_type, 0);
        assert!(mixed_type < alt_type);
        assert!(alt_type < rel_type);
        assert!(rel_type < html);
        assert!(html < inline);
        assert!(inline < rel_close);
        assert!(rel_close < alt_close);
        assert!(alt_close < regular);
        assert!(regular < mixed_close);
        assert_eq!(mixed_close, lines.len() - 1);

        assert_eq!(lines[inline + 1], "Content-Transfer-Encoding: base64");
        assert_eq!(lines[inline + 2], "Content-Disposition: inline");
        assert_eq!(lines[inline + 3], "Content-ID: <logo>");
        assert_eq!(lines[inline + 4], "");
        assert_eq!(lines[inline + 5], "AQID");

        assert_eq!(lines[regular - 1], format!("--{mixed}"));
        assert_eq!(lines[regular + 2], "Content-Disposition: attachment;");
        assert_eq!(lines[regular + 3], "    filename=\"report.pdf\"");
        assert_eq!(lines[regular + 5], "JVBERi0xLjQ=");
    }

    #[test]
    fn test_related_without_mixed() {
        let mut message = Message::new();
        message
            .set_html("<img src=\"cid:a\"><img src=\"cid:b\">")
            .add_attachment(Attachment::new("a.gif", "image/gif", vec![0]).with_id("a"))
            .add_attachment(Attachment::new("b.gif", "image/gif", vec![1]).with_id("b"));
        let (lines, mut boundaries) = body(&message);
        let related = boundaries.get(BoundaryKind::Related).to_string();

        assert_eq!(count(&lines, "multipart/mixed"), 0);
        assert_eq!(count(&lines, "multipart/alternative"), 0);
        assert!(lines[0].starts_with("Content-Type: multipart/related"));
        assert_eq!(count(&lines, &format!("--{related}")), 4); // 3 delimiters + close
        assert!(position(&lines, "Content-ID: <a>") < position(&lines, "Content-ID: <b>"));
        assert_eq!(lines.last(), Some(&format!("--{related}--")));
    }

    #[test]
    fn test_attachments_without_body() {
        let mut message = Message::new();
        message.add_attachment(Attachment::new("data.csv", "text/csv", b"a,b".to_vec()));
        let (lines, mut boundaries) = body(&message);
        let mixed = boundaries.get(BoundaryKind::Mixed).to_string();

        assert!(lines[0].starts_with("Content-Type: multipart/mixed"));
        assert_eq!(count(&lines, &format!("--{mixed}")), 3); // opening, part, close
        assert_eq!(lines.last(), Some(&format!("--{mixed}--")));
    }

    #[test]
    fn test_html_quoted_printable_lines() {
        let html = format!("<p>{}</p>\n<pre>\nline one\nline two\n</pre>", "é".repeat(60));
        let mut message = Message::new();
        message.set_html(html.clone());
        let (lines, _) = body(&message);

        assert!(lines[0].contains("charset=\"UTF-8\""));
        let content: Vec<&String> = lines[3..lines.len() - 1].iter().collect();
        assert!(content.iter().all(|l| l.len() <= LINE_LENGTH));
        assert!(content.iter().all(|l| !l.contains('\r') && !l.contains('\n')));

        let decoded = decode_quoted_printable(
            &content.iter().map(|l| l.as_str()).collect::<Vec<_>>().join("\n"),
        )
        .unwrap();
        assert_eq!(decoded, crate::html::minify(&html));
    }

    #[test]
    fn test_attachment_type_kept_verbatim() {
        let mut message = Message::new();
        message
            .add_attachment(Attachment::new("a.bin", "application/x-foo; comment=\"a;b\"", vec![1]))
            .add_attachment(Attachment::new("b.bin", "x-custom;", vec![2]));
        let (lines, _) = body(&message);

        position(&lines, "Content-Type: application/x-foo; comment=\"a;b\"; name=\"a.bin\"");
        position(&lines, "Content-Type: x-custom; name=\"b.bin\"");
    }

    #[test]
    fn test_attachment_name_escaped() {
        let mut message = Message::new();
        message.add_attachment(Attachment::new("my \"best\" file.txt", "text/plain", b"x".to_vec()));
        let (lines, _) = body(&message);

        let header = position(&lines, "Content-Type: text/plain; name=\"my \\\"best\\\" file.txt\"");
        assert_eq!(lines[header + 3], "    filename=\"my \\\"best\\\" file.txt\"");
    }

    #[test]
    fn test_non_ascii_attachment_name() {
        let mut message = Message::new();
        message
            .set_html("<img src=\"cid:l\">")
            .add_attachment(Attachment::new("Lögo.png", "image/png", vec![0]).with_id("l"))
            .add_attachment(Attachment::new("Übersicht.pdf", "application/pdf", vec![0]));
        let (lines, _) = body(&message);

        position(&lines, "Content-Type: image/png; name*=UTF-8''L%C3%B6go.png");
        let regular = position(&lines, "Content-Type: application/pdf; name*=UTF-8''%C3%9Cbersicht.pdf");
        assert_eq!(lines[regular + 3], "    filename*=UTF-8''%C3%9Cbersicht.pdf");
        assert!(lines.iter().all(|l| !l.contains("=?UTF-8?")));
    }

    #[test]
    fn test_unreadable_attachment_propagates() {
        let mut message = Message::new();
        message.set_text("body").add_attachment(Attachment::from_file(
            "/nonexistent/mailsmith/file.bin",
            "application/octet-stream",
        ));
        let mut boundaries = Boundaries::new();
        assert!(matches!(
            serialize(&message, &mut boundaries, LINE_LENGTH),
            Err(crate::Error::Io(_))
        ));
    }
}
