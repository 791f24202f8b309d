use std::collections::BTreeMap;

use crate::domain::entities::{
    ChannelSnapshot, ChannelUnreadState, Message, MessageId, TypingEntry, UserId,
};

/// Closed set of channel state transitions.
///
/// Actions that copy from the live channel carry an owned snapshot so the
/// reducer never reads the external client itself.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ChannelAction {
    InitStateFromChannel(Box<ChannelSnapshot>),
    CopyStateFromChannelOnEvent(Box<ChannelSnapshot>),
    CopyMessagesFromChannel {
        snapshot: Box<ChannelSnapshot>,
        parent_id: Option<MessageId>,
    },
    SetLoadingMore(bool),
    SetLoadingMoreNewer(bool),
    LoadMoreFinished {
        has_more: bool,
        messages: Vec<Message>,
    },
    LoadMoreNewerFinished {
        has_more_newer: bool,
        messages: Vec<Message>,
    },
    JumpToMessageFinished {
        has_more_newer: bool,
        highlighted_message_id: MessageId,
    },
    ClearHighlightedMessage,
    JumpToLatestMessage,
    OpenThread {
        message: Message,
        snapshot: Box<ChannelSnapshot>,
    },
    CloseThread,
    SetThread(Message),
    StartLoadingThread,
    SetThreadLoadingMore(bool),
    LoadMoreThreadFinished {
        thread_has_more: bool,
        thread_messages: Vec<Message>,
    },
    UpdateThreadOnEvent {
        message: Option<Message>,
        snapshot: Box<ChannelSnapshot>,
    },
    SetTyping(BTreeMap<UserId, TypingEntry>),
    SetError(String),
    SetChannelUnreadUiState(Option<ChannelUnreadState>),
    /// Action kinds introduced by newer producers; ignored.
    Unknown {
        kind: String,
    },
}

impl ChannelAction {
    /// Returns a stable name for logging.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::InitStateFromChannel(_) => "initStateFromChannel",
            Self::CopyStateFromChannelOnEvent(_) => "copyStateFromChannelOnEvent",
            Self::CopyMessagesFromChannel { .. } => "copyMessagesFromChannel",
            Self::SetLoadingMore(_) => "setLoadingMore",
            Self::SetLoadingMoreNewer(_) => "setLoadingMoreNewer",
            Self::LoadMoreFinished { .. } => "loadMoreFinished",
            Self::LoadMoreNewerFinished { .. } => "loadMoreNewerFinished",
            Self::JumpToMessageFinished { .. } => "jumpToMessageFinished",
            Self::ClearHighlightedMessage => "clearHighlightedMessage",
            Self::JumpToLatestMessage => "jumpToLatestMessage",
            Self::OpenThread { .. } => "openThread",
            Self::CloseThread => "closeThread",
            Self::SetThread(_) => "setThread",
            Self::StartLoadingThread => "startLoadingThread",
            Self::SetThreadLoadingMore(_) => "setThreadLoadingMore",
            Self::LoadMoreThreadFinished { .. } => "loadMoreThreadFinished",
            Self::UpdateThreadOnEvent { .. } => "updateThreadOnEvent",
            Self::SetTyping(_) => "setTyping",
            Self::SetError(_) => "setError",
            Self::SetChannelUnreadUiState(_) => "setChannelUnreadUiState",
            Self::Unknown { kind } => kind,
        }
    }
}
