//! Upload lifecycle for attachments picked in the composer.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::NotificationLevel;
use crate::domain::entities::{
    Attachment, CAPABILITY_UPLOAD_FILE, LocalAttachment, LocalFile, UploadState,
};
use crate::domain::errors::ChatError;
use crate::domain::ports::{ChannelPort, I18nPort, NotificationPort, UploadPort};

/// Tracks local attachments from pick to send.
///
/// Attachments keep their pick order. An upload whose attachment was removed
/// while in flight is discarded when it settles.
#[derive(Clone)]
pub struct AttachmentUploads {
    channel: Arc<dyn ChannelPort>,
    uploader: Arc<dyn UploadPort>,
    notifier: Arc<dyn NotificationPort>,
    i18n: Arc<dyn I18nPort>,
    attachments: Arc<Mutex<Vec<LocalAttachment>>>,
}

impl AttachmentUploads {
    /// Creates an empty upload list for `channel`.
    #[must_use]
    pub fn new(
        channel: Arc<dyn ChannelPort>,
        uploader: Arc<dyn UploadPort>,
        notifier: Arc<dyn NotificationPort>,
        i18n: Arc<dyn I18nPort>,
    ) -> Self {
        Self {
            channel,
            uploader,
            notifier,
            i18n,
            attachments: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// All attachments in pick order.
    #[must_use]
    pub fn attachments(&self) -> Vec<LocalAttachment> {
        self.attachments.lock().clone()
    }

    /// Attachments ready to go out with a message.
    #[must_use]
    pub fn finished_attachments(&self) -> Vec<Attachment> {
        self.attachments
            .lock()
            .iter()
            .filter(|a| a.upload_state() == UploadState::Finished)
            .map(|a| a.attachment.clone())
            .collect()
    }

    /// True while any upload is in flight.
    #[must_use]
    pub fn is_uploading(&self) -> bool {
        self.attachments
            .lock()
            .iter()
            .any(|a| a.upload_state() == UploadState::Uploading)
    }

    /// Uploads a picked file.
    ///
    /// Upload failures are not errors: the attachment is kept as `Failed` so
    /// it can be retried, and a notification is shown.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::PermissionDenied`] without uploading when the
    /// user lacks the upload capability, and [`ChatError::MissingIdentifier`]
    /// when the channel has no ID yet.
    pub async fn upload(
        &self,
        file: LocalFile,
        preview_uri: Option<String>,
    ) -> Result<LocalAttachment, ChatError> {
        self.check_permission()?;
        let attachment = LocalAttachment::uploading(Uuid::new_v4().to_string(), file, preview_uri);
        self.attachments.lock().push(attachment.clone());
        Ok(self.run_upload(attachment).await)
    }

    /// Uploads a failed attachment again.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::NotFound`] for an unknown ID, plus the errors of
    /// [`AttachmentUploads::upload`].
    pub async fn retry(&self, id: &str) -> Result<LocalAttachment, ChatError> {
        self.check_permission()?;
        let attachment = self
            .replace(id, LocalAttachment::retrying)
            .ok_or_else(|| ChatError::NotFound(format!("attachment {id}")))?;
        Ok(self.run_upload(attachment).await)
    }

    /// Drops the attachment locally. An upload still in flight is discarded when it settles.
    pub fn remove(&self, id: &str) {
        self.attachments.lock().retain(|a| a.id() != id);
    }

    /// Drops all attachments, typically after the message was sent.
    pub fn clear(&self) {
        self.attachments.lock().clear();
    }

    fn check_permission(&self) -> Result<(), ChatError> {
        if self.channel.data().can(CAPABILITY_UPLOAD_FILE) {
            return Ok(());
        }
        self.notifier.notify(
            &self.i18n.t("You are not allowed to upload files", &[]),
            NotificationLevel::Error,
        );
        Err(ChatError::permission_denied(CAPABILITY_UPLOAD_FILE))
    }

    async fn run_upload(&self, attachment: LocalAttachment) -> LocalAttachment {
        let id = attachment.id().to_string();
        let (Some(cid), Some(file)) = (self.channel.cid(), attachment.local_metadata.file.clone())
        else {
            return self.replace(&id, LocalAttachment::failed).unwrap_or(attachment);
        };

        debug!(cid = %cid, attachment_id = %id, image = file.is_image(), "Uploading attachment");
        let result = if file.is_image() {
            self.uploader.upload_image(&cid, &file).await
        } else {
            self.uploader.upload_file(&cid, &file).await
        };

        let settled = match result {
            Ok(response) => self.replace(&id, |a| a.finished(response.file, response.thumb_url)),
            Err(e) => {
                warn!(cid = %cid, attachment_id = %id, error = %e, "Attachment upload failed");
                self.notifier.notify(
                    &self.i18n.t("Error uploading attachment", &[]),
                    NotificationLevel::Error,
                );
                self.replace(&id, LocalAttachment::failed)
            }
        };
        settled.unwrap_or_else(|| {
            debug!(attachment_id = %id, "Attachment removed during upload");
            attachment
        })
    }

    fn replace(
        &self,
        id: &str,
        update: impl FnOnce(LocalAttachment) -> LocalAttachment,
    ) -> Option<LocalAttachment> {
        let mut attachments = self.attachments.lock();
        let slot = attachments.iter_mut().find(|a| a.id() == id)?;
        *slot = update(slot.clone());
        Some(slot.clone())
    }
}
