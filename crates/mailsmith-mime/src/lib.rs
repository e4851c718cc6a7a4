//! # mailsmith-mime
//!
//! MIME message composition for outgoing email.
//!
//! ## Features
//!
//! - **Message model**: sender, recipients, subject, text/HTML bodies,
//!   attachments and custom headers (reserved names are guarded)
//! - **Multipart layout**: `mixed` > `alternative` > `related` nesting
//!   chosen from the message content
//! - **Encodings**: wrapped Base64, Quoted-Printable, RFC 2047 encoded words
//! - **Header extensions**: transports can take over custom headers and
//!   inject their own
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailsmith_mime::{Address, Attachment, Encoder, Message};
//!
//! let mut message = Message::new();
//! message
//!     .set_from(Address::with_name("Sender", "sender@example.com"))
//!     .set_to(["recipient@example.com"])
//!     .set_subject("Quarterly report")
//!     .set_text("Plain text version")
//!     .set_html("<p>HTML version <img src=\"cid:logo\"></p>")
//!     .add_attachment(Attachment::new("logo.png", "image/png", logo_bytes).with_id("logo"))
//!     .add_attachment(Attachment::from_file("report.pdf", "application/pdf"));
//! message.add_header("X-Campaign", "q3", false)?;
//!
//! let payload = Encoder::new().encode(&message)?;
//! ```
//!
//! ## Structure
//!
//! ```text
//! multipart/mixed                 (regular attachments present)
//! ├── multipart/alternative       (text and HTML present)
//! │   ├── text/plain              base64
//! │   └── multipart/related       (inline attachments present)
//! │       ├── text/html           quoted-printable
//! │       └── image/* ...         base64, Content-ID
//! └── application/* ...           base64, attachment
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod attachment;
mod boundary;
mod compose;
mod content_type;
mod error;
mod header;
mod html;
mod message;

pub mod encoding;

pub use address::Address;
pub use attachment::{Attachment, AttachmentSource};
pub use boundary::{Boundaries, BoundaryKind, DEFAULT_BOUNDARY_LENGTH, MAX_BOUNDARY_LENGTH};
pub use compose::{Encoder, EncoderConfig, HeaderExtension};
pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::Headers;
pub use html::minify as minify_html;
pub use message::{Message, RESERVED_HEADERS};
