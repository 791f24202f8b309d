use async_trait::async_trait;

use crate::domain::entities::{ChannelCid, LocalFile};
use crate::domain::errors::ChatError;

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResponse {
    /// Public URL of the uploaded file.
    pub file: String,
    /// Thumbnail URL, for videos and large images.
    pub thumb_url: Option<String>,
}

/// Port for file and image uploads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UploadPort: Send + Sync {
    /// Uploads a non-image file.
    async fn upload_file(
        &self,
        cid: &ChannelCid,
        file: &LocalFile,
    ) -> Result<UploadResponse, ChatError>;

    /// Uploads an image.
    async fn upload_image(
        &self,
        cid: &ChannelCid,
        file: &LocalFile,
    ) -> Result<UploadResponse, ChatError>;
}
