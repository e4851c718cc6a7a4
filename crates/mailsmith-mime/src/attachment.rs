//! Attachment values.

use crate::error::Result;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Where the bytes of an attachment come from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttachmentSource {
    /// In-memory contents.
    Bytes(Vec<u8>),
    /// File read when the message is encoded.
    File(PathBuf),
}

/// A binary part of a message.
///
/// An attachment with a content identifier is **inline**: it is placed in a
/// `multipart/related` next to the HTML body, which references it through
/// `cid:<id>`. Without one it is a regular attachment in `multipart/mixed`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attachment {
    name: String,
    content_type: String,
    source: AttachmentSource,
    id: Option<String>,
}

impl Attachment {
    /// Creates an attachment from in-memory contents.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        contents: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            source: AttachmentSource::Bytes(contents.into()),
            id: None,
        }
    }

    /// Creates an attachment read from `path` at encode time.
    ///
    /// The file name shown to the recipient defaults to the last path
    /// component.
    #[must_use]
    pub fn from_file(path: impl AsRef<Path>, content_type: impl Into<String>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
        Self {
            name,
            content_type: content_type.into(),
            source: AttachmentSource::File(path.to_path_buf()),
            id: None,
        }
    }

    /// Marks the attachment as inline with the given content identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Overrides the file name shown to the recipient.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the file name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the MIME content type string.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Returns the content identifier, if any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns true for inline attachments.
    #[must_use]
    pub const fn is_inline(&self) -> bool {
        self.id.is_some()
    }

    /// Returns the byte source.
    #[must_use]
    pub const fn source(&self) -> &AttachmentSource {
        &self.source
    }

    /// Resolves the attachment bytes.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a file source cannot be read.
    pub fn contents(&self) -> Result<Cow<'_, [u8]>> {
        match &self.source {
            AttachmentSource::Bytes(bytes) => Ok(Cow::Borrowed(bytes)),
            AttachmentSource::File(path) => Ok(Cow::Owned(std::fs::read(path)?)),
        }
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

    #[test]
    fn test_regular_attachment() {
        let attachment = Attachment::new("report.pdf", "application/pdf", b"%PDF".to_vec());
        assert!(!attachment.is_inline());
        assert_eq!(attachment.name(), "report.pdf");
        assert_eq!(attachment.content_type(), "application/pdf");
        assert_eq!(attachment.contents().unwrap().as_ref(), b"%PDF");
    }

    #[test]
    fn test_inline_attachment() {
        let attachment = Attachment::new("logo.png", "image/png", vec![0x89, 0x50]).with_id("logo");
        assert!(attachment.is_inline());
        assert_eq!(attachment.id(), Some("logo"));
    }

    #[test]
    fn test_file_attachment_name() {
        let attachment = Attachment::from_file("/tmp/some/dir/notes.txt", "text/plain");
        assert_eq!(attachment.name(), "notes.txt");
        assert_eq!(
            attachment.source(),
            &AttachmentSource::File(PathBuf::from("/tmp/some/dir/notes.txt"))
        );
    }

    #[test]
    fn test_file_attachment_read() {
        let path = std::env::temp_dir().join(format!("mailsmith-attachment-{}.bin", std::process::id()));
        std::fs::write(&path, b"file bytes").unwrap();

        let attachment = Attachment::from_file(&path, "application/octet-stream");
        assert_eq!(attachment.contents().unwrap().as_ref(), b"file bytes");

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_propagates_io_error() {
        let attachment = Attachment::from_file("/nonexistent/mailsmith/missing.bin", "application/octet-stream");
        assert!(matches!(attachment.contents(), Err(Error::Io(_))));
    }
}
