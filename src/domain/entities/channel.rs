//! Chat channel entity and live-state snapshot.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Member, Message, MessageId, ReadState, User, UserId};

/// Composite channel identifier, rendered as `type:id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelCid {
    kind: String,
    id: String,
}

impl ChannelCid {
    /// Creates a composite ID from channel type and channel ID.
    #[must_use]
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Returns the channel type.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the channel ID within its type.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Display for ChannelCid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl std::str::FromStr for ChannelCid {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.split_once(':') {
            Some((kind, id)) if !kind.is_empty() && !id.is_empty() => Ok(Self::new(kind, id)),
            _ => Err(format!("invalid channel cid: {value}")),
        }
    }
}

impl TryFrom<String> for ChannelCid {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChannelCid> for String {
    fn from(value: ChannelCid) -> Self {
        value.to_string()
    }
}

/// Deterministic key for a distinct channel that has no ID yet, derived from
/// its sorted member IDs.
#[must_use]
pub fn temp_channel_key(channel_type: &str, members: &[UserId]) -> Option<String> {
    if members.is_empty() {
        return None;
    }
    let mut ids: Vec<&str> = members.iter().map(UserId::as_str).collect();
    ids.sort_unstable();
    Some(format!("{channel_type}:!members-{}", ids.join(",")))
}

/// Channel capability required to react to messages.
pub const CAPABILITY_SEND_REACTION: &str = "send-reaction";
/// Channel capability required to upload files.
pub const CAPABILITY_UPLOAD_FILE: &str = "upload-file";

/// Descriptive channel fields that can change through `channel.updated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelData {
    /// Channel name.
    #[serde(default)]
    pub name: Option<String>,
    /// Channel image URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Capabilities granted to the current user.
    #[serde(default)]
    pub own_capabilities: BTreeSet<String>,
    /// Whether read receipts are enabled for this channel type.
    #[serde(default = "default_true")]
    pub read_events: bool,
    /// Whether the channel is frozen.
    #[serde(default)]
    pub frozen: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for ChannelData {
    fn default() -> Self {
        Self {
            name: None,
            image: None,
            own_capabilities: BTreeSet::new(),
            read_events: true,
            frozen: false,
        }
    }
}

impl ChannelData {
    /// Sets the channel name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a capability for the current user.
    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.own_capabilities.insert(capability.into());
        self
    }

    /// Returns whether the current user holds `capability`.
    #[must_use]
    pub fn can(&self, capability: &str) -> bool {
        self.own_capabilities.contains(capability)
    }
}

/// A user currently typing in a channel or thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingEntry {
    /// Typing user.
    pub user: User,
    /// Thread the user is typing in, if any.
    #[serde(default)]
    pub parent_id: Option<MessageId>,
    /// When the typing event was received.
    pub received_at: DateTime<Utc>,
}

/// Read-only copy of the external channel's live state.
///
/// The external client owns the live state; the render layer only ever
/// copies from a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    /// Currently active message window, chronological ascending.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Pinned messages.
    #[serde(default)]
    pub pinned_messages: Vec<Message>,
    /// Channel members by user ID.
    #[serde(default)]
    pub members: BTreeMap<UserId, Member>,
    /// Current watchers by user ID.
    #[serde(default)]
    pub watchers: BTreeMap<UserId, User>,
    /// Number of watchers.
    #[serde(default)]
    pub watcher_count: u32,
    /// Read receipts by user ID.
    #[serde(default)]
    pub read: BTreeMap<UserId, ReadState>,
    /// Users currently typing.
    #[serde(default)]
    pub typing: BTreeMap<UserId, TypingEntry>,
    /// Loaded thread replies by parent message ID.
    #[serde(default)]
    pub threads: BTreeMap<MessageId, Vec<Message>>,
    /// Whether the active window is the channel's latest message set.
    #[serde(default)]
    pub is_latest_set: bool,
}

impl ChannelSnapshot {
    /// Returns replies loaded for `parent_id`.
    #[must_use]
    pub fn thread(&self, parent_id: &MessageId) -> Vec<Message> {
        self.threads.get(parent_id).cloned().unwrap_or_default()
    }

    /// Returns the index of `id` in the active window.
    #[must_use]
    pub fn position(&self, id: &MessageId) -> Option<usize> {
        self.messages.iter().position(|m| m.id() == id)
    }

    /// Returns whether the active window contains `id`.
    #[must_use]
    pub fn contains(&self, id: &MessageId) -> bool {
        self.position(id).is_some()
    }
}
