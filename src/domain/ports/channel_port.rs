//! Port for the external chat client's channel object.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::{
    Attachment, ChannelCid, ChannelData, ChannelSnapshot, Message, MessageId, UserId,
};
use crate::domain::errors::ChatError;

/// Cursor filters for a message page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePagination {
    /// Maximum number of messages.
    pub limit: Option<usize>,
    /// Only messages older than this ID.
    pub id_lt: Option<MessageId>,
    /// Only messages newer than this ID.
    pub id_gt: Option<MessageId>,
    /// Page centered on this ID.
    pub id_around: Option<MessageId>,
    /// Page centered on this time.
    pub created_at_around: Option<DateTime<Utc>>,
}

/// Options for `watch` and `query`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Message page filters.
    pub messages: MessagePagination,
    /// Maximum number of watchers to return.
    pub watchers_limit: Option<usize>,
}

impl QueryOptions {
    /// Newest page of the channel.
    #[must_use]
    pub fn latest(limit: usize) -> Self {
        Self {
            messages: MessagePagination {
                limit: Some(limit),
                ..MessagePagination::default()
            },
            watchers_limit: None,
        }
    }

    /// Page strictly older than `id`.
    #[must_use]
    pub fn older_than(id: MessageId, limit: usize) -> Self {
        Self {
            messages: MessagePagination {
                limit: Some(limit),
                id_lt: Some(id),
                ..MessagePagination::default()
            },
            watchers_limit: Some(limit),
        }
    }

    /// Page strictly newer than `id`.
    #[must_use]
    pub fn newer_than(id: MessageId, limit: usize) -> Self {
        Self {
            messages: MessagePagination {
                limit: Some(limit),
                id_gt: Some(id),
                ..MessagePagination::default()
            },
            watchers_limit: Some(limit),
        }
    }

    /// Page centered on `id`.
    #[must_use]
    pub fn around_id(id: MessageId, limit: usize) -> Self {
        Self {
            messages: MessagePagination {
                limit: Some(limit),
                id_around: Some(id),
                ..MessagePagination::default()
            },
            watchers_limit: None,
        }
    }

    /// Page centered on a point in time.
    #[must_use]
    pub fn around_time(at: DateTime<Utc>, limit: usize) -> Self {
        Self {
            messages: MessagePagination {
                limit: Some(limit),
                created_at_around: Some(at),
                ..MessagePagination::default()
            },
            watchers_limit: None,
        }
    }
}

/// Result of a `watch` or `query` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    /// Messages returned by this page.
    pub messages: Vec<Message>,
    /// Authoritative "older pages exist" signal, when the backend provides one.
    pub has_older: Option<bool>,
}

/// Payload for a new message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    /// Client-generated ID; reused when the send is retried.
    pub id: MessageId,
    /// Message body.
    pub text: String,
    /// Attachments to send.
    pub attachments: Vec<Attachment>,
    /// Mentioned users.
    pub mentioned_users: Vec<UserId>,
    /// Thread parent.
    pub parent_id: Option<MessageId>,
    /// Quoted message.
    pub quoted_message_id: Option<MessageId>,
}

impl MessageDraft {
    /// Builds a draft from a local preview message.
    #[must_use]
    pub fn from_message(message: &Message) -> Self {
        Self {
            id: message.id().clone(),
            text: message.text().to_string(),
            attachments: message.attachments().to_vec(),
            mentioned_users: message
                .mentioned_users()
                .iter()
                .map(|u| u.id().clone())
                .collect(),
            parent_id: message.parent_id().cloned(),
            quoted_message_id: message.quoted_message().map(|q| q.id().clone()),
        }
    }
}

/// Response to `mark_read`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkReadResponse {
    /// Last message the server recorded as read.
    pub last_read_message_id: Option<MessageId>,
}

/// Port over one channel of the external chat client.
///
/// The live state behind `snapshot` is owned by the client. Apart from the
/// local-state methods (`add_message_sorted`, `remove_message`,
/// `filter_error_messages`) the render layer never mutates it.
#[async_trait]
pub trait ChannelPort: Send + Sync {
    /// Channel type.
    fn channel_type(&self) -> String;

    /// Channel ID; `None` for a distinct channel not yet created server-side.
    fn channel_id(&self) -> Option<String>;

    /// Composite ID, once the channel has an ID.
    fn cid(&self) -> Option<ChannelCid> {
        self.channel_id()
            .map(|id| ChannelCid::new(self.channel_type(), id))
    }

    /// Member IDs the channel was created with.
    fn member_ids(&self) -> Vec<UserId>;

    /// Copy of the live state.
    fn snapshot(&self) -> ChannelSnapshot;

    /// Descriptive channel fields.
    fn data(&self) -> ChannelData;

    /// Whether the channel has been watched at least once.
    fn is_initialized(&self) -> bool;

    /// Whether the channel stopped receiving events.
    fn is_disconnected(&self) -> bool;

    /// Inserts or replaces `message` in the live state, keeping order.
    fn add_message_sorted(&self, message: Message, timestamp_changed: bool);

    /// Removes a message from the live state.
    fn remove_message(&self, id: &MessageId);

    /// Drops local `error` messages from the live state.
    fn filter_error_messages(&self);

    /// Fetches and subscribes to the channel.
    async fn watch(&self) -> Result<QueryResult, ChatError>;

    /// Fetches a page of messages into the live state.
    async fn query(&self, options: QueryOptions) -> Result<QueryResult, ChatError>;

    /// Fetches a page of replies to `parent_id` into the live thread state.
    async fn get_replies(
        &self,
        parent_id: &MessageId,
        pagination: MessagePagination,
    ) -> Result<QueryResult, ChatError>;

    /// Sends a new message.
    async fn send_message(&self, draft: MessageDraft) -> Result<Message, ChatError>;

    /// Updates an existing message.
    async fn update_message(&self, message: &Message) -> Result<Message, ChatError>;

    /// Deletes a message, returning its deleted form.
    async fn delete_message(&self, id: &MessageId) -> Result<Message, ChatError>;

    /// Adds a reaction of `kind` by the current user.
    async fn send_reaction(&self, id: &MessageId, kind: &str) -> Result<Message, ChatError>;

    /// Removes the current user's reaction of `kind`.
    async fn delete_reaction(&self, id: &MessageId, kind: &str) -> Result<Message, ChatError>;

    /// Marks the channel read.
    async fn mark_read(&self) -> Result<MarkReadResponse, ChatError>;

    /// Marks the channel unread from `message_id` onwards.
    async fn mark_unread(&self, message_id: &MessageId) -> Result<(), ChatError>;
}
