use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ChannelCid, User, UserId};

/// Unique identifier for a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Returns the underlying string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the identifier is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Delivery status of a message.
///
/// Locally created messages start as `Sending` and are later replaced by the
/// confirmed server copy (`Received`) or flagged `Failed` in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum MessageStatus {
    Sending,
    #[default]
    Received,
    Failed,
}

impl MessageStatus {
    /// Returns true once the server has acknowledged the message.
    #[must_use]
    pub const fn is_received(self) -> bool {
        matches!(self, Self::Received)
    }
}

/// Message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum MessageKind {
    #[default]
    Regular,
    System,
    Error,
    Deleted,
    Ephemeral,
}

impl MessageKind {
    /// Returns true if this is a regular user message.
    #[must_use]
    pub const fn is_regular(self) -> bool {
        matches!(self, Self::Regular)
    }

    /// Returns true if this kind interrupts a run of grouped messages.
    #[must_use]
    pub const fn breaks_grouping(self) -> bool {
        matches!(self, Self::System | Self::Error)
    }
}

/// Server-side message attachment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct Attachment {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    asset_url: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    thumb_url: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    file_size: Option<u64>,
    /// Set on link previews scraped by the server from the message text.
    #[serde(default)]
    og_scrape_url: Option<String>,
}

#[allow(missing_docs)]
impl Attachment {
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_asset_url(mut self, url: impl Into<String>) -> Self {
        self.asset_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_thumb_url(mut self, url: impl Into<String>) -> Self {
        self.thumb_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    #[must_use]
    pub const fn with_file_size(mut self, size: u64) -> Self {
        self.file_size = Some(size);
        self
    }

    #[must_use]
    pub fn with_og_scrape_url(mut self, url: impl Into<String>) -> Self {
        self.og_scrape_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[must_use]
    pub fn asset_url(&self) -> Option<&str> {
        self.asset_url.as_deref()
    }

    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    #[must_use]
    pub fn thumb_url(&self) -> Option<&str> {
        self.thumb_url.as_deref()
    }

    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    #[must_use]
    pub const fn file_size(&self) -> Option<u64> {
        self.file_size
    }

    /// Returns true for link previews scraped from message text.
    #[must_use]
    pub const fn is_scraped(&self) -> bool {
        self.og_scrape_url.is_some()
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.kind.as_deref() == Some("image")
            || self
                .mime_type
                .as_ref()
                .is_some_and(|mime| mime.starts_with("image/"))
    }
}

/// Aggregate counters for one reaction type on a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionGroup {
    /// Number of reactions of this type.
    pub count: u32,
    /// Sum of reaction scores.
    #[serde(default)]
    pub sum_scores: u32,
    /// When the first reaction of this type was added.
    pub first_reaction_at: DateTime<Utc>,
    /// When the latest reaction of this type was added.
    pub last_reaction_at: DateTime<Utc>,
}

impl ReactionGroup {
    /// Creates a group holding a single reaction.
    #[must_use]
    pub const fn single(at: DateTime<Utc>) -> Self {
        Self {
            count: 1,
            sum_scores: 1,
            first_reaction_at: at,
            last_reaction_at: at,
        }
    }
}

/// A single user's reaction on a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    /// Reaction type, e.g. `like` or `love`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Message the reaction belongs to.
    pub message_id: MessageId,
    /// Reacting user ID.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Reacting user.
    #[serde(default)]
    pub user: Option<User>,
    /// Reaction score.
    #[serde(default = "default_score")]
    pub score: u32,
}

const fn default_score() -> u32 {
    1
}

impl Reaction {
    /// Creates a reaction authored by `user`.
    #[must_use]
    pub fn new(kind: impl Into<String>, message_id: MessageId, user: Option<User>) -> Self {
        Self {
            kind: kind.into(),
            message_id,
            user_id: user.as_ref().map(|u| u.id().clone()),
            user,
            score: 1,
        }
    }

    /// Returns the reacting user's ID from either field.
    #[must_use]
    pub fn author_id(&self) -> Option<&UserId> {
        self.user_id
            .as_ref()
            .or_else(|| self.user.as_ref().map(User::id))
    }
}

/// Chat message value object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct Message {
    id: MessageId,
    #[serde(default)]
    cid: Option<ChannelCid>,
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    text: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    message_text_updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    status: MessageStatus,
    #[serde(rename = "type", default)]
    kind: MessageKind,
    #[serde(default)]
    parent_id: Option<MessageId>,
    #[serde(default)]
    show_in_channel: bool,
    #[serde(default)]
    quoted_message: Option<Box<Self>>,
    #[serde(default)]
    attachments: Vec<Attachment>,
    #[serde(default)]
    reaction_groups: BTreeMap<String, ReactionGroup>,
    #[serde(default)]
    latest_reactions: Vec<Reaction>,
    #[serde(default)]
    own_reactions: Vec<Reaction>,
    #[serde(default)]
    mentioned_users: Vec<User>,
    #[serde(default)]
    pinned: bool,
    #[serde(default)]
    deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[allow(missing_docs)]
impl Message {
    #[must_use]
    pub fn new(
        id: impl Into<MessageId>,
        user: Option<User>,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            cid: None,
            user,
            text: text.into(),
            created_at,
            updated_at: None,
            message_text_updated_at: None,
            status: MessageStatus::Received,
            kind: MessageKind::Regular,
            parent_id: None,
            show_in_channel: false,
            quoted_message: None,
            attachments: Vec::new(),
            reaction_groups: BTreeMap::new(),
            latest_reactions: Vec::new(),
            own_reactions: Vec::new(),
            mentioned_users: Vec::new(),
            pinned: false,
            deleted_at: None,
            command: None,
            error: None,
        }
    }

    #[must_use]
    pub fn with_cid(mut self, cid: ChannelCid) -> Self {
        self.cid = Some(cid);
        self
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub const fn with_status(mut self, status: MessageStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub const fn with_updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }

    #[must_use]
    pub const fn with_text_updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.message_text_updated_at = Some(at);
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<MessageId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    #[must_use]
    pub const fn with_show_in_channel(mut self, show: bool) -> Self {
        self.show_in_channel = show;
        self
    }

    #[must_use]
    pub fn with_quoted_message(mut self, message: Self) -> Self {
        self.quoted_message = Some(Box::new(message));
        self
    }

    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    #[must_use]
    pub fn with_reactions(
        mut self,
        groups: BTreeMap<String, ReactionGroup>,
        latest: Vec<Reaction>,
        own: Vec<Reaction>,
    ) -> Self {
        self.reaction_groups = groups;
        self.latest_reactions = latest;
        self.own_reactions = own;
        self
    }

    #[must_use]
    pub fn with_mentioned_users(mut self, users: Vec<User>) -> Self {
        self.mentioned_users = users;
        self
    }

    #[must_use]
    pub const fn with_pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }

    #[must_use]
    pub const fn with_deleted_at(mut self, at: DateTime<Utc>) -> Self {
        self.deleted_at = Some(at);
        self
    }

    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Promotes the message to `Received`, dropping any send error.
    #[must_use]
    pub fn into_received(mut self) -> Self {
        self.status = MessageStatus::Received;
        self.error = None;
        self
    }

    /// Flags the message as `Failed` with the given reason.
    #[must_use]
    pub fn into_failed(mut self, reason: impl Into<String>) -> Self {
        self.status = MessageStatus::Failed;
        self.error = Some(reason.into());
        self
    }

    /// Resets the message to `Sending` for a retry.
    #[must_use]
    pub fn into_sending(mut self) -> Self {
        self.status = MessageStatus::Sending;
        self.error = None;
        self
    }

    #[must_use]
    pub const fn id(&self) -> &MessageId {
        &self.id
    }

    #[must_use]
    pub const fn cid(&self) -> Option<&ChannelCid> {
        self.cid.as_ref()
    }

    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&UserId> {
        self.user.as_ref().map(User::id)
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub const fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    #[must_use]
    pub const fn status(&self) -> MessageStatus {
        self.status
    }

    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        self.kind
    }

    #[must_use]
    pub const fn parent_id(&self) -> Option<&MessageId> {
        self.parent_id.as_ref()
    }

    #[must_use]
    pub const fn show_in_channel(&self) -> bool {
        self.show_in_channel
    }

    /// Returns true if the message belongs to the main channel list.
    #[must_use]
    pub const fn is_in_main_list(&self) -> bool {
        self.parent_id.is_none() || self.show_in_channel
    }

    #[must_use]
    pub fn quoted_message(&self) -> Option<&Self> {
        self.quoted_message.as_deref()
    }

    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    #[must_use]
    pub const fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    #[must_use]
    pub const fn reaction_groups(&self) -> &BTreeMap<String, ReactionGroup> {
        &self.reaction_groups
    }

    #[must_use]
    pub fn has_reactions(&self) -> bool {
        !self.reaction_groups.is_empty()
    }

    #[must_use]
    pub fn latest_reactions(&self) -> &[Reaction] {
        &self.latest_reactions
    }

    #[must_use]
    pub fn own_reactions(&self) -> &[Reaction] {
        &self.own_reactions
    }

    #[must_use]
    pub fn mentioned_users(&self) -> &[User] {
        &self.mentioned_users
    }

    #[must_use]
    pub const fn is_pinned(&self) -> bool {
        self.pinned
    }

    #[must_use]
    pub const fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.kind == MessageKind::Deleted || self.deleted_at.is_some()
    }

    #[must_use]
    pub const fn is_edited(&self) -> bool {
        self.message_text_updated_at.is_some()
    }

    #[must_use]
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns true for ephemeral giphy previews awaiting confirmation.
    #[must_use]
    pub fn is_giphy_preview(&self) -> bool {
        self.kind == MessageKind::Ephemeral && self.command.as_deref() == Some("giphy")
    }

    /// Returns true if the message was authored by `user_id`.
    #[must_use]
    pub fn is_from(&self, user_id: &UserId) -> bool {
        self.user_id() == Some(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_message_creation() {
        let message = Message::new("m1", Some(User::new("alice")), "Hello", at(10));

        assert_eq!(message.id().as_str(), "m1");
        assert_eq!(message.text(), "Hello");
        assert_eq!(message.status(), MessageStatus::Received);
        assert_eq!(message.kind(), MessageKind::Regular);
        assert!(message.is_in_main_list());
        assert!(!message.is_edited());
        assert!(message.is_from(&UserId::from("alice")));
    }

    #[test]
    fn test_status_transitions() {
        let message = Message::new("m1", None, "Hello", at(10)).with_status(MessageStatus::Sending);

        let failed = message.clone().into_failed("boom");
        assert_eq!(failed.status(), MessageStatus::Failed);
        assert_eq!(failed.error(), Some("boom"));

        let retried = failed.into_sending();
        assert_eq!(retried.status(), MessageStatus::Sending);
        assert!(retried.error().is_none());

        assert!(retried.into_received().status().is_received());
    }

    #[test]
    fn test_thread_reply_visibility() {
        let reply = Message::new("r1", None, "reply", at(10)).with_parent("m1");
        assert!(!reply.is_in_main_list());
        assert!(reply.clone().with_show_in_channel(true).is_in_main_list());
    }

    #[test]
    fn test_giphy_preview_detection() {
        let preview = Message::new("g1", None, "/giphy cats", at(10))
            .with_kind(MessageKind::Ephemeral)
            .with_command("giphy");
        assert!(preview.is_giphy_preview());

        let regular = Message::new("m1", None, "cats", at(10)).with_command("giphy");
        assert!(!regular.is_giphy_preview());
    }

    #[test]
    fn test_message_deserializes_wire_names() {
        let json = r#"{
            "id": "m1",
            "text": "hi",
            "created_at": "2024-03-01T10:00:00Z",
            "type": "deleted",
            "status": "sending",
            "attachments": [{"type": "image", "og_scrape_url": "https://example.com"}]
        }"#;
        let message: Message = serde_json::from_str(json).unwrap();

        assert_eq!(message.kind(), MessageKind::Deleted);
        assert_eq!(message.status(), MessageStatus::Sending);
        assert!(message.is_deleted());
        assert!(message.attachments()[0].is_scraped());
        assert!(message.attachments()[0].is_image());
    }
}
