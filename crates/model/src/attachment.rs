use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};

use bytes::Bytes;
use mime::Mime;

/// Media types the backend accepts for attached files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// `application/pdf`
    Pdf,
    /// `image/png`
    Png,
    /// `image/jpeg`
    Jpeg,
}

impl MediaType {
    /// Resolves a media type from a MIME string such as `image/png`.
    ///
    /// Parameters (`; charset=...`) are ignored. Anything other than PDF,
    /// PNG or JPEG is rejected.
    pub fn from_mime_str(s: &str) -> Result<Self, AttachmentError> {
        let unsupported = || AttachmentError::UnsupportedMediaType(s.to_owned());
        let mime: Mime = s.parse().map_err(|_| unsupported())?;
        match (mime.type_(), mime.subtype()) {
            (mime::APPLICATION, mime::PDF) => Ok(MediaType::Pdf),
            (mime::IMAGE, mime::PNG) => Ok(MediaType::Png),
            (mime::IMAGE, mime::JPEG) => Ok(MediaType::Jpeg),
            _ => Err(unsupported()),
        }
    }

    /// Returns the canonical MIME string.
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Pdf => "application/pdf",
            MediaType::Png => "image/png",
            MediaType::Jpeg => "image/jpeg",
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a file cannot be staged.
#[derive(Debug)]
pub enum AttachmentError {
    /// The file is not a PDF, PNG or JPEG.
    UnsupportedMediaType(String),
    /// The file could not be read.
    Unreadable {
        /// The file that was being read.
        name: String,
        /// The underlying error.
        source: std::io::Error,
    },
}

impl Display for AttachmentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentError::UnsupportedMediaType(media_type) => {
                write!(f, "unsupported media type: {media_type}")
            }
            AttachmentError::Unreadable { name, source } => {
                write!(f, "cannot read {name}: {source}")
            }
        }
    }
}

impl StdError for AttachmentError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            AttachmentError::Unreadable { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A file the user selected to send along with the next message.
///
/// The payload is reference counted, so cloning an attachment is cheap.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    name: String,
    media_type: MediaType,
    data: Bytes,
}

impl Attachment {
    /// Creates an attachment from its parts.
    #[inline]
    pub fn new<S: Into<String>, B: Into<Bytes>>(
        name: S,
        media_type: MediaType,
        data: B,
    ) -> Self {
        Self {
            name: name.into(),
            media_type,
            data: data.into(),
        }
    }

    /// Returns the file name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared media type.
    #[inline]
    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    /// Returns the file content.
    #[inline]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Describes the attachment without its content.
    #[inline]
    pub fn info(&self) -> AttachmentInfo {
        AttachmentInfo {
            name: self.name.clone(),
            media_type: self.media_type,
            size: self.data.len(),
        }
    }
}

impl Debug for Attachment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// A content-free description of a staged attachment, for display.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AttachmentInfo {
    /// The file name.
    pub name: String,
    /// The declared media type.
    pub media_type: MediaType,
    /// Size of the content in bytes.
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_from_mime() {
        assert_eq!(
            MediaType::from_mime_str("application/pdf").unwrap(),
            MediaType::Pdf
        );
        assert_eq!(MediaType::from_mime_str("image/png").unwrap(), MediaType::Png);
        assert_eq!(
            MediaType::from_mime_str("image/jpeg; q=0.9").unwrap(),
            MediaType::Jpeg
        );
        assert!(matches!(
            MediaType::from_mime_str("image/gif"),
            Err(AttachmentError::UnsupportedMediaType(_))
        ));
        assert!(MediaType::from_mime_str("not a mime").is_err());
    }

    #[test]
    fn test_debug_hides_content() {
        let attachment =
            Attachment::new("scan.pdf", MediaType::Pdf, &b"%PDF-1.7"[..]);
        let debug = format!("{attachment:?}");
        assert!(debug.contains("scan.pdf"));
        assert!(!debug.contains("PDF-1.7"));
        assert_eq!(attachment.info().size, 8);
    }
}
