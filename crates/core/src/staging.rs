//! Files selected for the message being composed.

use std::mem;
use std::path::Path;

use orb_chat_model::{Attachment, AttachmentError, AttachmentInfo, MediaType};

/// Holds attachments until the next submission takes them.
#[derive(Clone, Debug, Default)]
pub struct StagingArea {
    attachments: Vec<Attachment>,
}

impl StagingArea {
    /// Adds a file to the next submission.
    #[inline]
    pub fn stage(&mut self, attachment: Attachment) {
        debug!("staged {attachment:?}");
        self.attachments.push(attachment);
    }

    /// Removes and returns every staged file, leaving the area empty.
    #[inline]
    pub fn take(&mut self) -> Vec<Attachment> {
        mem::take(&mut self.attachments)
    }

    /// Discards every staged file.
    #[inline]
    pub fn clear(&mut self) {
        self.attachments.clear();
    }

    /// Returns `true` if nothing is staged.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }

    /// Describes the staged files, in the order they were added.
    #[inline]
    pub fn infos(&self) -> Vec<AttachmentInfo> {
        self.attachments.iter().map(Attachment::info).collect()
    }
}

/// Reads a file from disk into an [`Attachment`].
///
/// The media type is inferred from the file extension; only PDF, PNG and
/// JPEG files are accepted, and the type is checked before reading.
pub async fn load_attachment(
    path: impl AsRef<Path>,
) -> Result<Attachment, AttachmentError> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let guessed = mime_guess::from_path(path).first_or_octet_stream();
    let media_type = MediaType::from_mime_str(guessed.essence_str())?;

    let data = tokio::fs::read(path)
        .await
        .map_err(|source| AttachmentError::Unreadable {
            name: name.clone(),
            source,
        })?;
    Ok(Attachment::new(name, media_type, data))
}
