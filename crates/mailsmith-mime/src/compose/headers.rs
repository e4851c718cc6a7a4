//! Header serializer.

use crate::encoding::encode_rfc2047;
use crate::message::Message;

/// Case-insensitive set of header names to leave out.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Exclusions<'a> {
    names: &'a [String],
}

impl<'a> Exclusions<'a> {
    pub(crate) const fn new(names: &'a [String]) -> Self {
        Self { names }
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        let name = name.trim();
        self.names
            .iter()
            .any(|excluded| excluded.trim().eq_ignore_ascii_case(name))
    }
}

fn join_addresses(addresses: &[crate::Address]) -> String {
    addresses
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Serializes the message headers into `Name: value` lines.
///
/// Order: `From`, `To`, `Cc`, `Bcc`, custom headers, `MIME-Version`,
/// `Subject`. Non-ASCII values are RFC 2047 encoded, with long values
/// split into several encoded words joined by `fold`.
pub(crate) fn serialize(message: &Message, exclude: Exclusions<'_>, fold: &str) -> Vec<String> {
    let mut lines = Vec::new();

    if !exclude.contains("From") {
        if let Some(from) = message.from() {
            lines.push(format!("From: {from}"));
        }
    }

    if !exclude.contains("To") {
        if message.to().is_empty() {
            lines.push("To: undisclosed-recipients:;".to_string());
        } else {
            lines.push(format!("To: {}", join_addresses(message.to())));
        }
    }

    if !exclude.contains("Cc") && !message.cc().is_empty() {
        lines.push(format!("Cc: {}", join_addresses(message.cc())));
    }

    if !exclude.contains("Bcc") && !message.bcc().is_empty() {
        lines.push(format!("Bcc: {}", join_addresses(message.bcc())));
    }

    for (name, values) in message.headers().entries() {
        // MIME-Version is always generated below.
        if exclude.contains(name) || name.trim().eq_ignore_ascii_case("MIME-Version") {
            continue;
        }
        for value in values {
            lines.push(format!("{name}: {}", encode_rfc2047(value.trim(), fold)));
        }
    }

    if !exclude.contains("MIME-Version") {
        lines.push("MIME-Version: 1.0".to_string());
    }

    if !exclude.contains("Subject") {
        lines.push(format!(
            "Subject: {}",
            encode_rfc2047(message.subject(), fold)
        ));
    }

    lines
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

    fn no_exclusions() -> Exclusions<'static> {
        Exclusions::new(&[])
    }

    #[test]
    fn test_minimal_headers() {
        let message = Message::new();
        let lines = serialize(&message, no_exclusions(), "\r\n ");
        assert_eq!(
            lines,
            vec!["To: undisclosed-recipients:;", "MIME-Version: 1.0", "Subject: "]
        );
    }

    #[test]
    fn test_full_order() {
        let mut message = Message::new();
        message
            .set_from(Address::with_name("Sender", "sender@example.com"))
            .set_to(["a@example.com", "b@example.com"])
            .set_cc(["c@example.com"])
            .set_bcc(["d@example.com"])
            .set_subject("Hello");
        message.add_header("X-Custom", "v1", false).unwrap();
        message.add_header("X-Custom", "v2", false).unwrap();
        message.add_header("Reply-To", " reply@example.com ", false).unwrap();

        let lines = serialize(&message, no_exclusions(), "\r\n ");
        assert_eq!(
            lines,
            vec![
                "From: \"Sender\" <sender@example.com>",
                "To: a@example.com, b@example.com",
                "Cc: c@example.com",
                "Bcc: d@example.com",
                "X-Custom: v1",
                "X-Custom: v2",
                "Reply-To: reply@example.com",
                "MIME-Version: 1.0",
                "Subject: Hello",
            ]
        );
    }

    #[test]
    fn test_exclusions_case_insensitive() {
        let mut message = Message::new();
        message.set_from("sender@example.com").set_bcc(["hidden@example.com"]);
        message.add_header("X-MSYS-API", "{}", false).unwrap();

        let excluded = vec!["bcc".to_string(), "x-msys-api".to_string(), "FROM".to_string()];
        let lines = serialize(&message, Exclusions::new(&excluded), "\r\n ");
        assert!(lines.iter().all(|l| !l.starts_with("Bcc:")));
        assert!(lines.iter().all(|l| !l.starts_with("X-MSYS-API:")));
        assert!(lines.iter().all(|l| !l.starts_with("From:")));
        assert!(lines.contains(&"MIME-Version: 1.0".to_string()));
    }

    #[test]
    fn test_custom_mime_version_not_duplicated() {
        let mut message = Message::new();
        message.add_header("Mime-Version", "2.0", false).unwrap();
        let lines = serialize(&message, no_exclusions(), "\r\n ");
        let versions: Vec<_> = lines
            .iter()
            .filter(|l| l.to_ascii_lowercase().starts_with("mime-version"))
            .collect();
        assert_eq!(versions, vec!["MIME-Version: 1.0"]);
    }

    #[test]
    fn test_non_ascii_values_encoded() {
        let mut message = Message::new();
        message.set_subject("Café ☕");
        message.add_header("X-Note", "naïve", false).unwrap();

        let lines = serialize(&message, no_exclusions(), "\r\n ");
        assert!(lines.contains(&"Subject: =?UTF-8?Q?Caf=C3=A9_=E2=98=95?=".to_string()));
        assert!(lines.contains(&"X-Note: =?UTF-8?Q?na=C3=AFve?=".to_string()));
        assert!(lines.iter().all(|l| l.is_ascii()));
    }
}
