//! MIME content type handling.

use crate::encoding::{Charset, encode_rfc2231};
use crate::error::{Error, Result};
use std::fmt;

/// A single content type parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Parameter {
    name: String,
    value: String,
    quoted: bool,
}

/// MIME content type with ordered parameters.
///
/// Parameters render in insertion order, which keeps generated
/// `Content-Type` lines stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    parameters: Vec<Parameter>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: Vec::new(),
        }
    }

    /// Creates a flowed text content type (`text/<sub_type>`) for the given charset.
    #[must_use]
    pub fn flowed_text(sub_type: &str, charset: Charset) -> Self {
        Self::new("text", sub_type)
            .with_parameter("charset", charset.as_str())
            .with_token("format", "flowed")
            .with_token("delsp", "yes")
    }

    /// Creates a `multipart/<sub_type>` content type with boundary.
    #[must_use]
    pub fn multipart(sub_type: &str, boundary: impl Into<String>) -> Self {
        Self::new("multipart", sub_type).with_parameter("boundary", boundary)
    }

    /// Adds or replaces a quoted parameter (`name="value"`).
    #[must_use]
    pub fn with_parameter(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name.into(), value.into(), true)
    }

    /// Adds or replaces a bare token parameter (`name=value`).
    #[must_use]
    pub fn with_token(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name.into(), value.into(), false)
    }

    fn push(mut self, name: String, value: String, quoted: bool) -> Self {
        if let Some(existing) = self
            .parameters
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(&name))
        {
            existing.value = value;
            existing.quoted = quoted;
        } else {
            self.parameters.push(Parameter {
                name,
                value,
                quoted,
            });
        }
        self
    }

    /// Returns a parameter value by name (case-insensitive).
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| p.value.as_str())
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary")
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("multipart")
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2="value2"`. Separators
    /// inside quoted values are kept as part of the value.
    ///
    /// # Errors
    ///
    /// Returns an error if the format is invalid.
    pub fn parse(s: &str) -> Result<Self> {
        let parts = split_parameters(s);
        let mut parts = parts.into_iter();

        let type_str = parts.next().unwrap_or_default().trim();
        let (main_type, sub_type) = type_str
            .split_once('/')
            .ok_or_else(|| Error::InvalidContentType(format!("Missing subtype: {s}")))?;

        let (main_type, sub_type) = (main_type.trim(), sub_type.trim());
        if main_type.is_empty() || sub_type.is_empty() || sub_type.contains('/') {
            return Err(Error::InvalidContentType(format!(
                "Invalid type/subtype: {type_str}"
            )));
        }

        let mut content_type = Self::new(main_type, sub_type);
        for param in parts {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }

            let (name, value) = param
                .split_once('=')
                .ok_or_else(|| Error::InvalidContentType(format!("Invalid parameter: {param}")))?;
            let value = value.trim();
            content_type = match unquote(value) {
                Some(unquoted) => content_type.with_parameter(name.trim(), unquoted),
                None => content_type.with_token(name.trim(), value),
            };
        }

        Ok(content_type)
    }
}

/// Splits on `;` outside quoted strings.
fn split_parameters(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, ch) in s.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Strips the quotes of a quoted-string and resolves its escapes.
fn unquote(value: &str) -> Option<String> {
    let inner = value.strip_prefix('"')?.strip_suffix('"')?;
    let mut unquoted = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            unquoted.extend(chars.next());
        } else {
            unquoted.push(ch);
        }
    }
    Some(unquoted)
}

/// Escapes `\` and `"` for use inside a quoted-string.
pub(crate) fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Renders a file name parameter (`name`, `filename`).
///
/// ASCII names are quoted; anything else uses the RFC 2231 extended form
/// (`filename*=UTF-8''...`) since encoded words are not allowed inside
/// quoted strings.
pub(crate) fn file_name_parameter(attribute: &str, value: &str) -> String {
    if value.is_ascii() {
        format!("{attribute}=\"{}\"", quote(value))
    } else {
        format!("{attribute}*={}", encode_rfc2231(value))
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)?;
        for param in &self.parameters {
            if param.quoted {
                write!(f, "; {}=\"{}\"", param.name, quote(&param.value))?;
            } else {
                write!(f, "; {}={}", param.name, param.value)?;
            }
        }
        Ok(())
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
    fn test_flowed_text_display() {
        let ct = ContentType::flowed_text("plain", Charset::Utf8);
        assert_eq!(
            ct.to_string(),
            "text/plain; charset=\"UTF-8\"; format=flowed; delsp=yes"
        );
    }

    #[test]
    fn test_multipart_display() {
        let ct = ContentType::multipart("mixed", "ABC123");
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary(), Some("ABC123"));
        assert_eq!(ct.to_string(), "multipart/mixed; boundary=\"ABC123\"");
    }

    #[test]
    fn test_parse_simple() {
        let ct = ContentType::parse("image/png").unwrap();
        assert_eq!(ct.main_type, "image");
        assert_eq!(ct.sub_type, "png");
        assert_eq!(ct.to_string(), "image/png");
    }

    #[test]
    fn test_parse_with_parameters() {
        let ct = ContentType::parse("text/plain; charset=utf-8; name=\"a b.txt\"").unwrap();
        assert_eq!(ct.parameter("CHARSET"), Some("utf-8"));
        assert_eq!(ct.parameter("name"), Some("a b.txt"));
        assert_eq!(
            ct.to_string(),
            "text/plain; charset=utf-8; name=\"a b.txt\""
        );
    }

    #[test]
    fn test_parameter_replaced() {
        let ct = ContentType::parse("application/pdf; name=\"old.pdf\"")
            .unwrap()
            .with_parameter("name", "new.pdf");
        assert_eq!(ct.to_string(), "application/pdf; name=\"new.pdf\"");
    }

    #[test]
    fn test_quoted_value_escaped() {
        let ct = ContentType::new("text", "plain").with_parameter("name", "my \"best\" \\file.txt");
        assert_eq!(
            ct.to_string(),
            "text/plain; name=\"my \\\"best\\\" \\\\file.txt\""
        );
        assert_eq!(ContentType::parse(&ct.to_string()).unwrap(), ct);
    }

    #[test]
    fn test_parse_semicolon_inside_quotes() {
        let ct = ContentType::parse("application/x-foo; comment=\"a;b\"; level=1").unwrap();
        assert_eq!(ct.parameter("comment"), Some("a;b"));
        assert_eq!(ct.parameter("level"), Some("1"));
    }

    #[test]
    fn test_file_name_parameter() {
        assert_eq!(file_name_parameter("name", "report.pdf"), "name=\"report.pdf\"");
        assert_eq!(
            file_name_parameter("filename", "say \"hi\".txt"),
            "filename=\"say \\\"hi\\\".txt\""
        );
        assert_eq!(
            file_name_parameter("filename", "Übersicht.pdf"),
            "filename*=UTF-8''%C3%9Cbersicht.pdf"
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!(ContentType::parse("").is_err());
        assert!(ContentType::parse("image").is_err());
        assert!(ContentType::parse("image/").is_err());
        assert!(ContentType::parse("a/b/c").is_err());
        assert!(ContentType::parse("image/png; broken").is_err());
    }
}
