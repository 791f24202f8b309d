//! Client-side attachment wrapper tracking upload progress.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::Attachment;

/// Upload state of a local attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum UploadState {
    Uploading,
    Finished,
    Failed,
}

/// File picked by the user, not yet known to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFile {
    /// File name shown in previews.
    pub name: String,
    /// MIME type reported by the picker.
    pub mime_type: String,
    /// Size in bytes.
    pub size: u64,
    /// Location of the file on disk, if any.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl LocalFile {
    /// Returns true for image MIME types.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Client-only bookkeeping for an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalMetadata {
    /// Client-generated upload identifier.
    pub id: String,
    /// Upload progress.
    pub upload_state: UploadState,
    /// Local preview URI, revoked once the upload finishes.
    #[serde(default)]
    pub preview_uri: Option<String>,
    /// Underlying file handle.
    #[serde(default)]
    pub file: Option<LocalFile>,
}

/// Server attachment plus local upload metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAttachment {
    /// Attachment as it will be sent.
    pub attachment: Attachment,
    /// Local upload metadata.
    pub local_metadata: LocalMetadata,
}

impl LocalAttachment {
    /// Creates an attachment in the `Uploading` state for a picked file.
    #[must_use]
    pub fn uploading(id: impl Into<String>, file: LocalFile, preview_uri: Option<String>) -> Self {
        let kind = if file.is_image() { "image" } else { "file" };
        let attachment = Attachment::new(kind)
            .with_title(file.name.clone())
            .with_mime_type(file.mime_type.clone())
            .with_file_size(file.size);
        Self {
            attachment,
            local_metadata: LocalMetadata {
                id: id.into(),
                upload_state: UploadState::Uploading,
                preview_uri,
                file: Some(file),
            },
        }
    }

    /// Returns the local upload ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.local_metadata.id
    }

    /// Returns the current upload state.
    #[must_use]
    pub const fn upload_state(&self) -> UploadState {
        self.local_metadata.upload_state
    }

    /// Marks the upload finished with the server URL; the local preview is dropped.
    #[must_use]
    pub fn finished(mut self, url: impl Into<String>, thumb_url: Option<String>) -> Self {
        let url = url.into();
        self.attachment = if self.attachment.is_image() {
            self.attachment.with_image_url(url)
        } else {
            self.attachment.with_asset_url(url)
        };
        if let Some(thumb) = thumb_url {
            self.attachment = self.attachment.with_thumb_url(thumb);
        }
        self.local_metadata.upload_state = UploadState::Finished;
        self.local_metadata.preview_uri = None;
        self
    }

    /// Marks the upload failed; the file handle is kept for a retry.
    #[must_use]
    pub const fn failed(mut self) -> Self {
        self.local_metadata.upload_state = UploadState::Failed;
        self
    }

    /// Moves a failed upload back to `Uploading`.
    #[must_use]
    pub const fn retrying(mut self) -> Self {
        self.local_metadata.upload_state = UploadState::Uploading;
        self
    }
}
