//! # mailsmith-transport
//!
//! Delivery of [`mailsmith_mime::Message`]s.
//!
//! ## Features
//!
//! - **Transport trait**: one `send` per message, plus `mass_send` that
//!   reuses a message for a list of recipients
//! - **SMTP**: plaintext, STARTTLS or implicit TLS; AUTH PLAIN and LOGIN
//! - **SparkPost**: relay preset with the merged `X-MSYS-API` header
//! - **Memory**: records payloads instead of delivering them
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailsmith_mime::Message;
//! use mailsmith_transport::{Recipient, Security, SmtpConfig, SmtpTransport, Transport};
//!
//! #[tokio::main]
//! async fn main() -> mailsmith_transport::Result<()> {
//!     let config = SmtpConfig::builder("smtp.example.com")
//!         .security(Security::StartTls)
//!         .credentials("user@example.com", "password")
//!         .build();
//!     let transport = SmtpTransport::new(config);
//!
//!     let mut message = Message::new();
//!     message
//!         .set_from("sender@example.com")
//!         .set_to(["recipient@example.com"])
//!         .set_subject("Hello")
//!         .set_text("Hello, World!");
//!     transport.send(&message).await?;
//!
//!     // One copy per recipient
//!     let recipients = [Recipient::from("a@example.com"), Recipient::from("b@example.com")];
//!     for result in transport.mass_send(&mut message, &recipients, None).await {
//!         result?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`smtp`]: SMTP transport, configuration and protocol types
//! - [`sparkpost`]: SparkPost relay preset and header extension

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
mod memory;
pub mod smtp;
pub mod sparkpost;
mod transport;

pub use error::{Error, Result};
pub use memory::{MemoryTransport, SentMessage};
pub use smtp::{Credentials, Envelope, Reply, Security, SmtpConfig, SmtpConfigBuilder, SmtpTransport};
pub use sparkpost::MsysApiHeader;
pub use transport::{MassSendCallback, Recipient, Transport};
