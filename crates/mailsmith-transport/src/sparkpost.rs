//! SparkPost SMTP API support.
//!
//! SparkPost reads per-message options (campaign id, tracking flags,
//! metadata, ...) from a JSON object in the `X-MSYS-API` header.
//! [`MsysApiHeader`] merges whatever the message carries in that header
//! with options configured on the transport and emits a single header.

use crate::smtp::{Security, SmtpConfig, SmtpTransport};
use mailsmith_mime::{HeaderExtension, Message};
use serde_json::{Map, Value};

/// Name of the SparkPost options header.
pub const MSYS_API_HEADER: &str = "X-MSYS-API";

/// SparkPost SMTP relay host.
pub const SPARKPOST_HOST: &str = "smtp.sparkpostmail.com";

/// SparkPost SMTP relay port (STARTTLS).
pub const SPARKPOST_PORT: u16 = 587;

/// Fixed SMTP username of the SparkPost relay; the API key is the password.
pub const SPARKPOST_USERNAME: &str = "SMTP_Injection";

/// Header extension producing the merged `X-MSYS-API` header.
///
/// Every `X-MSYS-API` value on the message is parsed as a JSON object and
/// merged in order; options given here are merged last and win on
/// conflicting keys. Values that are not JSON objects are skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MsysApiHeader {
    options: Map<String, Value>,
}

impl MsysApiHeader {
    /// Creates the extension with transport-wide options.
    #[must_use]
    pub const fn new(options: Map<String, Value>) -> Self {
        Self { options }
    }

    /// Returns the transport-wide options.
    #[must_use]
    pub const fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    /// Merges the message's options with the transport-wide ones.
    #[must_use]
    pub fn merged(&self, message: &Message) -> Map<String, Value> {
        let mut merged = Map::new();

        for raw in message.header(MSYS_API_HEADER) {
            match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(options)) => merged.extend(options),
                Ok(other) => {
                    tracing::warn!(value = %other, "ignoring {MSYS_API_HEADER} value: not a JSON object");
                }
                Err(error) => {
                    tracing::warn!(%error, "ignoring {MSYS_API_HEADER} value: invalid JSON");
                }
            }
        }

        merged.extend(self.options.clone());
        merged
    }
}

impl HeaderExtension for MsysApiHeader {
    fn excluded(&self) -> Vec<String> {
        vec![MSYS_API_HEADER.to_string()]
    }

    fn extend(&self, message: &Message, lines: &mut Vec<String>) {
        let merged = self.merged(message);
        if !merged.is_empty() {
            lines.push(format!("{MSYS_API_HEADER}: {}", Value::Object(merged)));
        }
    }
}

impl SmtpTransport {
    /// Creates a transport for the SparkPost SMTP relay.
    ///
    /// `options` are merged into every message's `X-MSYS-API` header.
    #[must_use]
    pub fn sparkpost(api_key: impl Into<String>, options: Map<String, Value>) -> Self {
        let config = SmtpConfig::builder(SPARKPOST_HOST)
            .port(SPARKPOST_PORT)
            .security(Security::StartTls)
            .credentials(SPARKPOST_USERNAME, api_key)
            .build();

        Self::new(config).with_extension(MsysApiHeader::new(options))
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
    use serde_json::json;

    fn options(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn message() -> Message {
        let mut message = Message::new();
        message
            .set_from("sender@example.com")
            .set_to(["rcpt@example.com"])
            .set_subject("Hi")
            .set_text("Hello");
        message
    }

    fn msys_lines(transport: &SmtpTransport, message: &Message) -> Vec<String> {
        transport
            .encoder()
            .headers(message, &[])
            .into_iter()
            .filter(|line| line.to_ascii_uppercase().starts_with("X-MSYS-API"))
            .collect()
    }

    #[test]
    fn test_preset_config() {
        let transport = SmtpTransport::sparkpost("key-123", Map::new());
        let config = transport.config();
        assert_eq!(config.host, "smtp.sparkpostmail.com");
        assert_eq!(config.port, 587);
        assert_eq!(config.security, Security::StartTls);

        let credentials = config.credentials.as_ref().unwrap();
        assert_eq!(credentials.username, "SMTP_Injection");
        assert_eq!(credentials.password, "key-123");
    }

    #[test]
    fn test_no_header_without_options() {
        let transport = SmtpTransport::sparkpost("key", Map::new());
        assert!(msys_lines(&transport, &message()).is_empty());
    }

    #[test]
    fn test_merges_message_and_transport_options() {
        let transport = SmtpTransport::sparkpost(
            "key",
            options(json!({"campaign_id": "spring", "options": {"open_tracking": false}})),
        );
        let mut message = message();
        message
            .add_header(MSYS_API_HEADER, r#"{"campaign_id": "ignored", "metadata": {"user": 7}}"#, false)
            .unwrap();
        message
            .add_header("x-msys-api", r#"{"metadata": {"user": 8}}"#, false)
            .unwrap();

        let lines = msys_lines(&transport, &message);
        assert_eq!(lines.len(), 1);

        let (name, raw) = lines[0].split_once(": ").unwrap();
        assert_eq!(name, "X-MSYS-API");
        let merged: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(
            merged,
            json!({
                "campaign_id": "spring",
                "metadata": {"user": 8},
                "options": {"open_tracking": false}
            })
        );
    }

    #[test]
    fn test_invalid_values_skipped() {
        let extension = MsysApiHeader::default();
        let mut message = message();
        message.add_header(MSYS_API_HEADER, "not json", false).unwrap();
        message.add_header(MSYS_API_HEADER, "[1, 2]", false).unwrap();
        message
            .add_header(MSYS_API_HEADER, r#"{"campaign_id": "kept"}"#, false)
            .unwrap();

        let merged = extension.merged(&message);
        assert_eq!(Value::Object(merged), json!({"campaign_id": "kept"}));
    }

    #[test]
    fn test_header_emitted_after_standard_headers() {
        let extension = MsysApiHeader::new(options(json!({"campaign_id": "c"})));
        let mut lines = vec!["Subject: Hi".to_string()];
        extension.extend(&message(), &mut lines);
        assert_eq!(lines, vec!["Subject: Hi", r#"X-MSYS-API: {"campaign_id":"c"}"#]);
    }
}
