//! Render state of a single open channel.

use std::collections::BTreeMap;

use crate::domain::entities::{
    ChannelUnreadState, Member, Message, MessageId, ReadState, TypingEntry, User, UserId,
};

/// UI-facing projection of a channel, owned by the reducer.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRenderState {
    /// Main message list, chronological ascending, unique by ID.
    pub messages: Vec<Message>,
    /// Pinned messages, oldest first.
    pub pinned_messages: Vec<Message>,
    /// Members keyed by user ID.
    pub members: BTreeMap<UserId, Member>,
    /// Users currently watching the channel.
    pub watchers: BTreeMap<UserId, User>,
    /// Watcher count reported by the server.
    pub watcher_count: u32,
    /// Latest read position of each user.
    pub read: BTreeMap<UserId, ReadState>,
    /// Users typing right now; replaced wholesale on each typing event.
    pub typing: BTreeMap<UserId, TypingEntry>,

    /// Root message of the open thread.
    pub thread: Option<Message>,
    /// Replies of the open thread, oldest first.
    pub thread_messages: Vec<Message>,
    /// Older replies can be loaded.
    pub thread_has_more: bool,
    /// A reply page request is in flight.
    pub thread_loading_more: bool,
    /// Keeps the thread viewport still while older replies load.
    pub thread_suppress_autoscroll: bool,

    /// Set until the first successful watch.
    pub loading: bool,
    /// An older page request is in flight.
    pub loading_more: bool,
    /// A newer page request is in flight.
    pub loading_more_newer: bool,
    /// Older pages can be loaded.
    pub has_more: bool,
    /// The window does not reach the newest message.
    pub has_more_newer: bool,

    /// Message to highlight after a jump; cleared by a timer.
    pub highlighted_message_id: Option<MessageId>,
    /// Keeps the viewport still while older pages load above it.
    pub suppress_autoscroll: bool,
    /// Last watch or query failure.
    pub error: Option<String>,

    /// Current user's unread markers for this channel.
    pub channel_unread_ui_state: Option<ChannelUnreadState>,
}

impl Default for ChannelRenderState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            pinned_messages: Vec::new(),
            members: BTreeMap::new(),
            watchers: BTreeMap::new(),
            watcher_count: 0,
            read: BTreeMap::new(),
            typing: BTreeMap::new(),
            thread: None,
            thread_messages: Vec::new(),
            thread_has_more: true,
            thread_loading_more: false,
            thread_suppress_autoscroll: false,
            loading: true,
            loading_more: false,
            loading_more_newer: false,
            has_more: true,
            has_more_newer: false,
            highlighted_message_id: None,
            suppress_autoscroll: false,
            error: None,
            channel_unread_ui_state: None,
        }
    }
}

impl ChannelRenderState {
    /// Returns the oldest loaded message.
    #[must_use]
    pub fn oldest_message(&self) -> Option<&Message> {
        self.messages.first()
    }

    /// Returns the newest loaded message.
    #[must_use]
    pub fn newest_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Returns true while any main-list page request is in flight.
    #[must_use]
    pub const fn is_paginating(&self) -> bool {
        self.loading_more || self.loading_more_newer
    }

    /// Finds a loaded message in the main list or the open thread.
    #[must_use]
    pub fn find_message(&self, id: &MessageId) -> Option<&Message> {
        self.messages
            .iter()
            .chain(self.thread_messages.iter())
            .chain(self.thread.iter())
            .find(|m| m.id() == id)
    }
}
