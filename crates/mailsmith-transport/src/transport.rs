//! Transport capability and mass sending.

use crate::error::Result;
use mailsmith_mime::{Address, Message};

/// Target of one mass-send iteration: a single address or a group that
/// receives one shared copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// One address.
    Single(Address),
    /// Several addresses put together in the `To` header.
    Group(Vec<Address>),
}

impl Recipient {
    /// Returns the addresses of this recipient.
    #[must_use]
    pub fn addresses(&self) -> &[Address] {
        match self {
            Self::Single(address) => std::slice::from_ref(address),
            Self::Group(addresses) => addresses,
        }
    }
}

impl From<Address> for Recipient {
    fn from(address: Address) -> Self {
        Self::Single(address)
    }
}

impl From<&str> for Recipient {
    fn from(email: &str) -> Self {
        Self::Single(Address::new(email))
    }
}

impl From<Vec<Address>> for Recipient {
    fn from(addresses: Vec<Address>) -> Self {
        Self::Group(addresses)
    }
}

/// Callback invoked after each mass-send iteration with the recipient and
/// its index.
pub type MassSendCallback<'a> = &'a mut dyn FnMut(&Recipient, usize);

/// Delivery capability.
///
/// Implementations encode the message themselves (usually through a
/// [`mailsmith_mime::Encoder`]) and hand the payload to their backend.
/// A message shared between concurrent sends must be cloned per send.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Successful delivery result.
    type Ok;

    /// Line terminator used on the wire.
    fn line_feed(&self) -> &str {
        "\r\n"
    }

    /// Delivers one message.
    ///
    /// # Errors
    ///
    /// Returns an error on any encoding, network or protocol failure.
    async fn send(&self, message: &Message) -> Result<Self::Ok>;

    /// Sends the same message once per recipient.
    ///
    /// For each recipient in order the message's recipient fields are
    /// reset, `To` is set to that recipient, the message is sent and the
    /// callback (if any) is invoked. A failed send does not stop the loop;
    /// every outcome is returned in recipient order. The recipient fields
    /// are reset again before returning.
    async fn mass_send(
        &self,
        message: &mut Message,
        recipients: &[Recipient],
        mut callback: Option<MassSendCallback<'_>>,
    ) -> Vec<Result<Self::Ok>> {
        let mut results = Vec::with_capacity(recipients.len());

        for (index, recipient) in recipients.iter().enumerate() {
            message.reset_recipients();
            message.set_to(recipient.addresses().iter().cloned());

            let result = self.send(message).await;
            if let Err(error) = &result {
                tracing::warn!(index, %error, "mass send: delivery failed");
            }
            results.push(result);

            if let Some(callback) = callback.as_deref_mut() {
                callback(recipient, index);
            }
        }

        message.reset_recipients();
        results
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
    use std::sync::Mutex;

    /// Records the `To` list of every send; fails for blocked addresses.
    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<Vec<String>>>,
        blocked: Vec<String>,
    }

    impl Transport for Recording {
        type Ok = usize;

        async fn send(&self, message: &Message) -> Result<usize> {
            let to: Vec<String> = message.to().iter().map(|a| a.email().to_string()).collect();
            if to.iter().any(|t| self.blocked.contains(t)) {
                return Err(Error::smtp_error(550, "blocked"));
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push(to);
            Ok(sent.len())
        }
    }

    #[test]
    fn test_recipient_addresses() {
        let single = Recipient::from("a@example.com");
        assert_eq!(single.addresses().len(), 1);

        let group = Recipient::from(vec![Address::new("a@example.com"), Address::new("b@example.com")]);
        assert_eq!(group.addresses().len(), 2);
    }

    #[tokio::test]
    async fn test_mass_send_three_recipients() {
        let transport = Recording::default();
        let mut message = Message::new();
        message
            .set_from("sender@example.com")
            .set_cc(["stale-cc@example.com"])
            .set_text("hi");

        let recipients: Vec<Recipient> = ["a@example.com", "b@example.com", "c@example.com"]
            .into_iter()
            .map(Recipient::from)
            .collect();

        let mut calls = Vec::new();
        let mut callback = |recipient: &Recipient, index: usize| {
            calls.push((recipient.addresses()[0].email().to_string(), index));
        };
        let results = transport
            .mass_send(&mut message, &recipients, Some(&mut callback))
            .await;

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(
            *transport.sent.lock().unwrap(),
            vec![
                vec!["a@example.com".to_string()],
                vec!["b@example.com".to_string()],
                vec!["c@example.com".to_string()],
            ]
        );
        assert_eq!(
            calls,
            vec![
                ("a@example.com".to_string(), 0),
                ("b@example.com".to_string(), 1),
                ("c@example.com".to_string(), 2),
            ]
        );
        assert!(message.to().is_empty());
        assert!(message.cc().is_empty());
        assert!(message.bcc().is_empty());
        assert!(message.from().is_some());
    }

    #[tokio::test]
    async fn test_mass_send_collects_failures() {
        let transport = Recording {
            blocked: vec!["b@example.com".to_string()],
            ..Recording::default()
        };
        let mut message = Message::new();
        let recipients = vec![
            Recipient::from("a@example.com"),
            Recipient::from("b@example.com"),
            Recipient::from("c@example.com"),
        ];

        let results = transport.mass_send(&mut message, &recipients, None).await;

        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::SmtpError { code: 550, .. })));
        assert!(results[2].is_ok());
        assert_eq!(transport.sent.lock().unwrap().len(), 2);
        assert!(message.to().is_empty());
    }

    #[tokio::test]
    async fn test_mass_send_group() {
        let transport = Recording::default();
        let mut message = Message::new();
        let recipients = vec![Recipient::Group(vec![
            Address::new("a@example.com"),
            Address::new("b@example.com"),
        ])];

        let results = transport.mass_send(&mut message, &recipients, None).await;

        assert_eq!(results.len(), 1);
        assert_eq!(
            transport.sent.lock().unwrap()[0],
            vec!["a@example.com".to_string(), "b@example.com".to_string()]
        );
    }
}
