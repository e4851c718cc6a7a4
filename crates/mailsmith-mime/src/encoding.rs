//! MIME content and header encodings.
//!
//! Supports wrapped Base64, line-oriented Quoted-Printable, RFC 2047
//! encoded words and the charset detection used for text parts.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::fmt;
use std::fmt::Write as _;

/// Maximum encoded line length for Base64 and Quoted-Printable bodies (RFC 2045).
pub const LINE_LENGTH: usize = 76;

/// Maximum length of a single RFC 2047 encoded word.
const ENCODED_WORD_LENGTH: usize = 75;

const ENCODED_WORD_PREFIX: &str = "=?UTF-8?Q?";
const ENCODED_WORD_SUFFIX: &str = "?=";

/// RFC 2231 `attr-char`: everything else is percent-encoded.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Content transfer encodings emitted by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// Base64 encoding (binary parts and plain text).
    Base64,
    /// Quoted-Printable encoding (HTML).
    QuotedPrintable,
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
        }
    }
}

/// Character set of a text part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// Pure 7-bit ASCII.
    UsAscii,
    /// Anything else (Rust strings are always valid UTF-8).
    Utf8,
}

impl Charset {
    /// Detects the narrowest charset able to represent `text`.
    #[must_use]
    pub fn detect(text: &str) -> Self {
        if text.is_ascii() { Self::UsAscii } else { Self::Utf8 }
    }

    /// Returns the IANA name of the charset.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UsAscii => "US-ASCII",
            Self::Utf8 => "UTF-8",
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(Into::into)
}

/// Encodes data as Base64 and hard-wraps it at `width` columns.
///
/// A `width` of zero is treated as one column.
#[must_use]
pub fn encode_base64_lines(data: &[u8], width: usize) -> Vec<String> {
    encode_base64(data)
        .as_bytes()
        .chunks(width.max(1))
        .map(|chunk| chunk.iter().copied().map(char::from).collect())
        .collect()
}

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// Returns one entry per output line. Hard line breaks of the input
/// (`\n` or `\r\n`) become line boundaries; long lines are split with
/// soft breaks (`=`) so that no line exceeds [`LINE_LENGTH`]. Whitespace
/// at the end of a hard line is always encoded.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> Vec<String> {
    let mut lines = Vec::new();

    for hard_line in text.split('\n') {
        let hard_line = hard_line.strip_suffix('\r').unwrap_or(hard_line);
        let bytes = hard_line.as_bytes();
        let mut current = String::new();

        for (i, &byte) in bytes.iter().enumerate() {
            let last = i + 1 == bytes.len();
            let mut token = String::with_capacity(3);
            match byte {
                b'!'..=b'<' | b'>'..=b'~' => token.push(char::from(byte)),
                b' ' | b'\t' if !last => token.push(char::from(byte)),
                _ => {
                    let _ = write!(token, "={byte:02X}");
                }
            }

            // The final token needs no room for a trailing soft break.
            let limit = if last { LINE_LENGTH } else { LINE_LENGTH - 1 };
            if current.len() + token.len() > limit {
                current.push('=');
                lines.push(std::mem::take(&mut current));
            }
            current.push_str(&token);
        }

        lines.push(current);
    }

    lines
}

/// Decodes Quoted-Printable text (RFC 2045).
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable(text: &str) -> Result<String> {
    let mut result = Vec::new();
    let mut bytes = text.bytes().peekable();

    while let Some(byte) = bytes.next() {
        if byte == b'=' {
            // Soft line break
            if bytes.peek() == Some(&b'\r') {
                bytes.next();
                if bytes.peek() == Some(&b'\n') {
                    bytes.next();
                    continue;
                }
            } else if bytes.peek() == Some(&b'\n') {
                bytes.next();
                continue;
            }

            let hex: Vec<u8> = bytes.by_ref().take(2).collect();
            result.push(decode_hex_pair(&hex)?);
        } else {
            result.push(byte);
        }
    }

    String::from_utf8(result).map_err(Into::into)
}

fn decode_hex_pair(hex: &[u8]) -> Result<u8> {
    let [high, low] = hex else {
        return Err(Error::InvalidEncoding(
            "Incomplete escape sequence".to_string(),
        ));
    };
    let digits = [*high, *low];
    let digits = std::str::from_utf8(&digits)
        .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
    u8::from_str_radix(digits, 16).map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))
}

/// Encodes a header value as RFC 2047 `Q` encoded words when needed.
///
/// ASCII values are returned unchanged. Otherwise the value is split into
/// `=?UTF-8?Q?...?=` words of at most 75 characters, never splitting a
/// character across words, and consecutive words are joined with `fold`
/// (typically the line feed followed by a space).
#[must_use]
pub fn encode_rfc2047(text: &str, fold: &str) -> String {
    if text.is_ascii() {
        return text.to_string();
    }

    let payload_limit = ENCODED_WORD_LENGTH - ENCODED_WORD_PREFIX.len() - ENCODED_WORD_SUFFIX.len();
    let mut words = Vec::new();
    let mut current = String::new();
    let mut utf8 = [0u8; 4];

    for ch in text.chars() {
        let mut token = String::new();
        for &byte in ch.encode_utf8(&mut utf8).as_bytes() {
            match byte {
                b' ' => token.push('_'),
                b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'!' | b'*' | b'+' | b'-' | b'/' => {
                    token.push(char::from(byte));
                }
                _ => {
                    let _ = write!(token, "={byte:02X}");
                }
            }
        }

        if !current.is_empty() && current.len() + token.len() > payload_limit {
            words.push(std::mem::take(&mut current));
        }
        current.push_str(&token);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|word| format!("{ENCODED_WORD_PREFIX}{word}{ENCODED_WORD_SUFFIX}"))
        .collect::<Vec<_>>()
        .join(fold)
}

/// Encodes a parameter value as an RFC 2231 extended value
/// (`UTF-8''percent-encoded`).
#[must_use]
pub fn encode_rfc2231(text: &str) -> String {
    format!("UTF-8''{}", utf8_percent_encode(text, ATTR_CHAR))
}

/// Decodes a header value made of RFC 2047 encoded words.
///
/// Whitespace between adjacent encoded words is dropped; plain words are
/// kept as-is.
///
/// # Errors
///
/// Returns an error if an encoded word is malformed.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    if !text.contains("=?") {
        return Ok(text.to_string());
    }

    let mut decoded = Vec::new();

    for token in text.split_whitespace() {
        if let Some(inner) = token.strip_prefix("=?").and_then(|t| t.strip_suffix("?=")) {
            let parts: Vec<&str> = inner.splitn(3, '?').collect();
            let [_charset, encoding, payload] = parts.as_slice() else {
                return Err(Error::InvalidEncoding(
                    "Invalid RFC 2047 format".to_string(),
                ));
            };

            match encoding.to_ascii_uppercase().as_str() {
                "B" => decoded.extend(decode_base64(payload)?),
                "Q" => decoded.extend(decode_q(payload)?),
                other => {
                    return Err(Error::InvalidEncoding(format!(
                        "Unknown encoding: {other}"
                    )));
                }
            }
        } else {
            if !decoded.is_empty() {
                decoded.push(b' ');
            }
            decoded.extend_from_slice(token.as_bytes());
        }
    }

    String::from_utf8(decoded).map_err(Into::into)
}

fn decode_q(payload: &str) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(payload.len());
    let mut iter = payload.bytes();

    while let Some(byte) = iter.next() {
        match byte {
            b'_' => bytes.push(b' '),
            b'=' => {
                let hex: Vec<u8> = iter.by_ref().take(2).collect();
                bytes.push(decode_hex_pair(&hex)?);
            }
            _ => bytes.push(byte),
        }
    }

    Ok(bytes)
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
    use proptest::prelude::*;

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");

        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_base64_lines_wrap() {
        let data = vec![0xAB; 200];
        let lines = encode_base64_lines(&data, LINE_LENGTH);
        assert_eq!(lines.len(), 4); // 268 chars
        assert!(lines[..3].iter().all(|l| l.len() == LINE_LENGTH));
        assert_eq!(decode_base64(&lines.concat()).unwrap(), data);
    }

    #[test]
    fn test_base64_lines_empty() {
        assert!(encode_base64_lines(b"", LINE_LENGTH).is_empty());
    }

    #[test]
    fn test_quoted_printable_plain() {
        assert_eq!(encode_quoted_printable("Hello, World!"), vec!["Hello, World!"]);
    }

    #[test]
    fn test_quoted_printable_non_ascii_and_equals() {
        let lines = encode_quoted_printable("Héllo a=b");
        assert_eq!(lines, vec!["H=C3=A9llo a=3Db"]);
    }

    #[test]
    fn test_quoted_printable_trailing_whitespace() {
        let lines = encode_quoted_printable("end \nnext\t");
        assert_eq!(lines, vec!["end=20", "next=09"]);
    }

    #[test]
    fn test_quoted_printable_soft_breaks() {
        let text = "a".repeat(200);
        let lines = encode_quoted_printable(&text);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.len() <= LINE_LENGTH));
        assert!(lines[..lines.len() - 1].iter().all(|l| l.ends_with('=')));
        assert_eq!(decode_quoted_printable(&lines.join("\r\n")).unwrap(), text);
    }

    #[test]
    fn test_quoted_printable_escape_not_split() {
        let text = format!("{}é", "x".repeat(73));
        let lines = encode_quoted_printable(&text);
        assert!(lines.iter().all(|l| l.len() <= LINE_LENGTH));
        assert_eq!(decode_quoted_printable(&lines.join("\r\n")).unwrap(), text);
    }

    #[test]
    fn test_quoted_printable_decode() {
        assert_eq!(decode_quoted_printable("H=C3=A9llo").unwrap(), "Héllo");
        assert_eq!(decode_quoted_printable("Hello=\r\nWorld").unwrap(), "HelloWorld");
        assert!(decode_quoted_printable("broken=4").is_err());
    }

    #[test]
    fn test_charset_detect() {
        assert_eq!(Charset::detect("plain"), Charset::UsAscii);
        assert_eq!(Charset::detect("déjà vu"), Charset::Utf8);
        assert_eq!(Charset::Utf8.to_string(), "UTF-8");
    }

    #[test]
    fn test_rfc2047_ascii_unchanged() {
        assert_eq!(encode_rfc2047("Hello", "\r\n "), "Hello");
    }

    #[test]
    fn test_rfc2047_encode_decode() {
        let encoded = encode_rfc2047("Héllo wörld", "\r\n ");
        assert_eq!(encoded, "=?UTF-8?Q?H=C3=A9llo_w=C3=B6rld?=");
        assert_eq!(decode_rfc2047(&encoded).unwrap(), "Héllo wörld");
    }

    #[test]
    fn test_rfc2047_long_value_split() {
        let text = "Ünïcödé ".repeat(20);
        let encoded = encode_rfc2047(&text, "\r\n ");
        let words: Vec<&str> = encoded.split("\r\n ").collect();
        assert!(words.len() > 1);
        assert!(words.iter().all(|w| w.len() <= ENCODED_WORD_LENGTH));
        assert_eq!(decode_rfc2047(&encoded).unwrap(), text);
    }

    #[test]
    fn test_rfc2047_decode_base64_word() {
        assert_eq!(decode_rfc2047("=?utf-8?B?SMOpbGxv?=").unwrap(), "Héllo");
        assert!(decode_rfc2047("=?utf-8?X?abc?=").is_err());
    }

    #[test]
    fn test_rfc2231_extended_value() {
        assert_eq!(encode_rfc2231("Grüße.pdf"), "UTF-8''Gr%C3%BC%C3%9Fe.pdf");
        assert_eq!(encode_rfc2231("a b\"c;d"), "UTF-8''a%20b%22c%3Bd");
        assert_eq!(encode_rfc2231("x-y_z~1.txt"), "UTF-8''x-y_z~1.txt");
    }

    proptest! {
        #[test]
        fn prop_base64_lines_never_exceed_width(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let lines = encode_base64_lines(&data, LINE_LENGTH);
            prop_assert!(lines.iter().all(|l| l.len() <= LINE_LENGTH));
            prop_assert_eq!(decode_base64(&lines.concat()).unwrap(), data);
        }

        #[test]
        fn prop_quoted_printable_lines_are_clean(text in "[ -~\t\u{e9}\u{4e2d}]{0,400}") {
            let lines = encode_quoted_printable(&text);
            prop_assert!(lines.iter().all(|l| l.len() <= LINE_LENGTH));
            prop_assert!(lines.iter().all(|l| !l.contains('\r') && !l.contains('\n')));
            prop_assert_eq!(decode_quoted_printable(&lines.join("\r\n")).unwrap(), text);
        }
    }
}
