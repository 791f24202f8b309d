//! Closed set of real-time events consumed from the external chat client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entities::{ChannelCid, ChannelData, Member, Message, MessageId, User, UserId};

/// Real-time event delivered by the chat client.
///
/// Event names the engine does not handle deserialize into `Unrecognized`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[allow(missing_docs)]
pub enum ChatEvent {
    #[serde(rename = "message.new")]
    MessageNew { cid: ChannelCid, message: Message },
    #[serde(rename = "message.updated")]
    MessageUpdated { cid: ChannelCid, message: Message },
    #[serde(rename = "message.deleted")]
    MessageDeleted { cid: ChannelCid, message: Message },
    #[serde(rename = "message.read")]
    MessageRead {
        cid: ChannelCid,
        user: User,
        created_at: DateTime<Utc>,
        #[serde(default)]
        last_read_message_id: Option<MessageId>,
    },
    #[serde(rename = "reaction.new")]
    ReactionNew { cid: ChannelCid, message: Message },
    #[serde(rename = "reaction.updated")]
    ReactionUpdated { cid: ChannelCid, message: Message },
    #[serde(rename = "reaction.deleted")]
    ReactionDeleted { cid: ChannelCid, message: Message },
    #[serde(rename = "typing.start")]
    TypingStart {
        cid: ChannelCid,
        user: User,
        #[serde(default)]
        parent_id: Option<MessageId>,
    },
    #[serde(rename = "typing.stop")]
    TypingStop {
        cid: ChannelCid,
        user: User,
        #[serde(default)]
        parent_id: Option<MessageId>,
    },
    #[serde(rename = "user.watching.start")]
    UserWatchingStart {
        cid: ChannelCid,
        user: User,
        #[serde(default)]
        watcher_count: u32,
    },
    #[serde(rename = "user.watching.stop")]
    UserWatchingStop {
        cid: ChannelCid,
        user: User,
        #[serde(default)]
        watcher_count: u32,
    },
    #[serde(rename = "member.added")]
    MemberAdded { cid: ChannelCid, member: Member },
    #[serde(rename = "member.updated")]
    MemberUpdated { cid: ChannelCid, member: Member },
    #[serde(rename = "member.removed")]
    MemberRemoved { cid: ChannelCid, member: Member },
    #[serde(rename = "notification.mark_unread")]
    NotificationMarkUnread {
        cid: ChannelCid,
        last_read_at: DateTime<Utc>,
        #[serde(default)]
        first_unread_message_id: Option<MessageId>,
        #[serde(default)]
        last_read_message_id: Option<MessageId>,
        #[serde(default)]
        unread_messages: u32,
    },
    #[serde(rename = "channel.truncated")]
    ChannelTruncated { cid: ChannelCid },
    #[serde(rename = "channel.updated")]
    ChannelUpdated { cid: ChannelCid, channel: ChannelData },
    #[serde(rename = "channel.deleted")]
    ChannelDeleted { cid: ChannelCid },
    #[serde(rename = "channel.hidden")]
    ChannelHidden { cid: ChannelCid },
    #[serde(rename = "channel.visible")]
    ChannelVisible { cid: ChannelCid },
    #[serde(rename = "notification.message_new")]
    NotificationMessageNew { cid: ChannelCid },
    #[serde(rename = "notification.added_to_channel")]
    NotificationAddedToChannel {
        cid: ChannelCid,
        #[serde(default)]
        members: Vec<UserId>,
    },
    #[serde(rename = "notification.removed_from_channel")]
    NotificationRemovedFromChannel { cid: ChannelCid },
    #[serde(rename = "connection.changed")]
    ConnectionChanged { online: bool },
    #[serde(rename = "connection.recovered")]
    ConnectionRecovered,
    #[serde(rename = "user.updated")]
    UserUpdated { user: User },
    #[serde(rename = "user.deleted")]
    UserDeleted { user: User },
    #[serde(rename = "user.presence.changed")]
    UserPresenceChanged { user: User },
    #[serde(other)]
    Unrecognized,
}

impl ChatEvent {
    /// Returns the wire name of the event.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::MessageNew { .. } => "message.new",
            Self::MessageUpdated { .. } => "message.updated",
            Self::MessageDeleted { .. } => "message.deleted",
            Self::MessageRead { .. } => "message.read",
            Self::ReactionNew { .. } => "reaction.new",
            Self::ReactionUpdated { .. } => "reaction.updated",
            Self::ReactionDeleted { .. } => "reaction.deleted",
            Self::TypingStart { .. } => "typing.start",
            Self::TypingStop { .. } => "typing.stop",
            Self::UserWatchingStart { .. } => "user.watching.start",
            Self::UserWatchingStop { .. } => "user.watching.stop",
            Self::MemberAdded { .. } => "member.added",
            Self::MemberUpdated { .. } => "member.updated",
            Self::MemberRemoved { .. } => "member.removed",
            Self::NotificationMarkUnread { .. } => "notification.mark_unread",
            Self::ChannelTruncated { .. } => "channel.truncated",
            Self::ChannelUpdated { .. } => "channel.updated",
            Self::ChannelDeleted { .. } => "channel.deleted",
            Self::ChannelHidden { .. } => "channel.hidden",
            Self::ChannelVisible { .. } => "channel.visible",
            Self::NotificationMessageNew { .. } => "notification.message_new",
            Self::NotificationAddedToChannel { .. } => "notification.added_to_channel",
            Self::NotificationRemovedFromChannel { .. } => "notification.removed_from_channel",
            Self::ConnectionChanged { .. } => "connection.changed",
            Self::ConnectionRecovered => "connection.recovered",
            Self::UserUpdated { .. } => "user.updated",
            Self::UserDeleted { .. } => "user.deleted",
            Self::UserPresenceChanged { .. } => "user.presence.changed",
            Self::Unrecognized => "unrecognized",
        }
    }

    /// Returns the channel the event is scoped to. Client-wide events return `None`.
    #[must_use]
    pub const fn cid(&self) -> Option<&ChannelCid> {
        match self {
            Self::MessageNew { cid, .. }
            | Self::MessageUpdated { cid, .. }
            | Self::MessageDeleted { cid, .. }
            | Self::MessageRead { cid, .. }
            | Self::ReactionNew { cid, .. }
            | Self::ReactionUpdated { cid, .. }
            | Self::ReactionDeleted { cid, .. }
            | Self::TypingStart { cid, .. }
            | Self::TypingStop { cid, .. }
            | Self::UserWatchingStart { cid, .. }
            | Self::UserWatchingStop { cid, .. }
            | Self::MemberAdded { cid, .. }
            | Self::MemberUpdated { cid, .. }
            | Self::MemberRemoved { cid, .. }
            | Self::NotificationMarkUnread { cid, .. }
            | Self::ChannelTruncated { cid }
            | Self::ChannelUpdated { cid, .. }
            | Self::ChannelDeleted { cid }
            | Self::ChannelHidden { cid }
            | Self::ChannelVisible { cid }
            | Self::NotificationMessageNew { cid }
            | Self::NotificationAddedToChannel { cid, .. }
            | Self::NotificationRemovedFromChannel { cid } => Some(cid),
            Self::ConnectionChanged { .. }
            | Self::ConnectionRecovered
            | Self::UserUpdated { .. }
            | Self::UserDeleted { .. }
            | Self::UserPresenceChanged { .. }
            | Self::Unrecognized => None,
        }
    }

    /// Returns the message carried by the event, if any.
    #[must_use]
    pub const fn message(&self) -> Option<&Message> {
        match self {
            Self::MessageNew { message, .. }
            | Self::MessageUpdated { message, .. }
            | Self::MessageDeleted { message, .. }
            | Self::ReactionNew { message, .. }
            | Self::ReactionUpdated { message, .. }
            | Self::ReactionDeleted { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Returns true for message lifecycle events.
    #[must_use]
    pub const fn is_message_event(&self) -> bool {
        matches!(
            self,
            Self::MessageNew { .. } | Self::MessageUpdated { .. } | Self::MessageDeleted { .. }
        )
    }
}
