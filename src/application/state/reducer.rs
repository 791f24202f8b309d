use tracing::debug;

use super::{ChannelAction, ChannelRenderState};

/// Pure channel state transition. Never fails; unknown actions leave the
/// state untouched.
#[must_use]
pub fn channel_reducer(state: ChannelRenderState, action: ChannelAction) -> ChannelRenderState {
    match action {
        ChannelAction::InitStateFromChannel(snapshot) => {
            let snapshot = *snapshot;
            ChannelRenderState {
                loading: false,
                members: snapshot.members,
                messages: snapshot.messages,
                pinned_messages: snapshot.pinned_messages,
                read: snapshot.read,
                watcher_count: snapshot.watcher_count,
                watchers: snapshot.watchers,
                ..state
            }
        }

        ChannelAction::CopyStateFromChannelOnEvent(snapshot) => {
            let snapshot = *snapshot;
            ChannelRenderState {
                members: snapshot.members,
                messages: snapshot.messages,
                pinned_messages: snapshot.pinned_messages,
                read: snapshot.read,
                watcher_count: snapshot.watcher_count,
                watchers: snapshot.watchers,
                ..state
            }
        }

        ChannelAction::CopyMessagesFromChannel {
            snapshot,
            parent_id,
        } => {
            let thread_messages = match &parent_id {
                Some(parent_id) => snapshot.thread(parent_id),
                None => state.thread_messages,
            };
            let snapshot = *snapshot;
            ChannelRenderState {
                messages: snapshot.messages,
                pinned_messages: snapshot.pinned_messages,
                thread_messages,
                suppress_autoscroll: false,
                ..state
            }
        }

        ChannelAction::SetLoadingMore(loading_more) => ChannelRenderState {
            loading_more,
            // older pages land above the fold; keep the viewport still
            suppress_autoscroll: loading_more,
            ..state
        },

        ChannelAction::SetLoadingMoreNewer(loading_more_newer) => ChannelRenderState {
            loading_more_newer,
            ..state
        },

        ChannelAction::LoadMoreFinished { has_more, messages } => ChannelRenderState {
            has_more,
            loading_more: false,
            messages,
            suppress_autoscroll: false,
            ..state
        },

        ChannelAction::LoadMoreNewerFinished {
            has_more_newer,
            messages,
        } => ChannelRenderState {
            has_more_newer,
            loading_more_newer: false,
            messages,
            suppress_autoscroll: false,
            ..state
        },

        ChannelAction::JumpToMessageFinished {
            has_more_newer,
            highlighted_message_id,
        } => ChannelRenderState {
            has_more_newer,
            highlighted_message_id: Some(highlighted_message_id),
            ..state
        },

        ChannelAction::ClearHighlightedMessage => ChannelRenderState {
            highlighted_message_id: None,
            ..state
        },

        ChannelAction::JumpToLatestMessage => ChannelRenderState {
            has_more_newer: false,
            highlighted_message_id: None,
            loading: false,
            suppress_autoscroll: false,
            ..state
        },

        ChannelAction::OpenThread { message, snapshot } => ChannelRenderState {
            thread_messages: snapshot.thread(message.id()),
            thread: Some(message),
            thread_suppress_autoscroll: false,
            ..state
        },

        ChannelAction::CloseThread => ChannelRenderState {
            thread: None,
            thread_loading_more: false,
            thread_messages: Vec::new(),
            ..state
        },

        ChannelAction::SetThread(message) => ChannelRenderState {
            thread: Some(message),
            ..state
        },

        ChannelAction::StartLoadingThread => ChannelRenderState {
            thread_loading_more: true,
            ..state
        },

        ChannelAction::SetThreadLoadingMore(loading_more) => ChannelRenderState {
            thread_loading_more: loading_more,
            thread_suppress_autoscroll: loading_more,
            ..state
        },

        ChannelAction::LoadMoreThreadFinished {
            thread_has_more,
            thread_messages,
        } => ChannelRenderState {
            thread_has_more,
            thread_loading_more: false,
            thread_messages,
            thread_suppress_autoscroll: false,
            ..state
        },

        ChannelAction::UpdateThreadOnEvent { message, snapshot } => {
            let Some(thread) = state.thread.clone() else {
                return state;
            };
            let thread_messages = snapshot.thread(thread.id());
            let thread = match message {
                Some(message) if message.id() == thread.id() => message,
                _ => thread,
            };
            ChannelRenderState {
                thread: Some(thread),
                thread_messages,
                ..state
            }
        }

        ChannelAction::SetTyping(typing) => ChannelRenderState { typing, ..state },

        ChannelAction::SetError(error) => ChannelRenderState {
            error: Some(error),
            ..state
        },

        ChannelAction::SetChannelUnreadUiState(unread) => ChannelRenderState {
            channel_unread_ui_state: unread,
            ..state
        },

        ChannelAction::Unknown { kind } => {
            debug!(action = %kind, "Ignoring unknown channel action");
            state
        }
    }
}
