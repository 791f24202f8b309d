//! In-memory channel adapter.
//!
//! Keeps a full server-side history plus the live message window the SDK
//! would hold, records every query issued against it and lets callers inject
//! failures per operation.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::domain::entities::{
    ChannelData, ChannelSnapshot, Member, Message, MessageId, MessageKind, Reaction,
    ReactionGroup, ReadState, TypingEntry, User, UserId,
};
use crate::domain::errors::ChatError;
use crate::domain::events::ChatEvent;
use crate::domain::ports::{
    ChannelPort, MarkReadResponse, MessageDraft, MessagePagination, QueryOptions, QueryResult,
};

/// Page size used by `watch` when no window has been loaded yet.
pub const DEFAULT_WATCH_LIMIT: usize = 25;

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Operation {
    Watch,
    Query,
    SendMessage,
    UpdateMessage,
    DeleteMessage,
    SendReaction,
    DeleteReaction,
    MarkRead,
    MarkUnread,
}

#[derive(Default)]
struct LiveState {
    history: Vec<Message>,
    snapshot: ChannelSnapshot,
    data: ChannelData,
    initialized: bool,
    disconnected: bool,
    queries: Vec<QueryOptions>,
    watch_count: usize,
    failures: HashMap<Operation, VecDeque<ChatError>>,
    sent: Vec<MessageDraft>,
    unread_marks: Vec<MessageId>,
}

impl LiveState {
    fn take_failure(&mut self, operation: Operation) -> Result<(), ChatError> {
        match self.failures.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn history_index(&self, id: &MessageId) -> Option<usize> {
        self.history.iter().position(|m| m.id() == id)
    }

    fn main_history(&self) -> Vec<Message> {
        self.history
            .iter()
            .filter(|m| m.is_in_main_list())
            .cloned()
            .collect()
    }

    fn set_window(&mut self, window: Vec<Message>) {
        let main = self.main_history();
        self.snapshot.is_latest_set = match (window.last(), main.last()) {
            (Some(a), Some(b)) => a.id() == b.id(),
            (None, None) => true,
            _ => false,
        };
        self.snapshot.messages = window;
    }

    fn merge_into_window(&mut self, page: &[Message]) {
        let mut window = std::mem::take(&mut self.snapshot.messages);
        for message in page {
            upsert_sorted(&mut window, message.clone());
        }
        self.set_window(window);
    }

    fn upsert_everywhere(&mut self, message: Message) {
        upsert_sorted(&mut self.history, message.clone());
        if let Some(parent) = message.parent_id().cloned() {
            let replies = self.snapshot.threads.entry(parent).or_default();
            upsert_sorted(replies, message.clone());
        }
        if let Some(pos) = self.snapshot.position(message.id()) {
            self.snapshot.messages[pos] = message;
        } else if message.is_in_main_list() && self.snapshot.is_latest_set {
            upsert_sorted(&mut self.snapshot.messages, message);
        }
    }
}

fn upsert_sorted(list: &mut Vec<Message>, message: Message) {
    if let Some(pos) = list.iter().position(|m| m.id() == message.id()) {
        list[pos] = message;
        return;
    }
    let at = list.partition_point(|m| m.created_at() <= message.created_at());
    list.insert(at, message);
}

fn window_around(messages: &[Message], index: usize, limit: usize) -> Vec<Message> {
    let start = index.saturating_sub(limit / 2);
    let end = (start + limit).min(messages.len());
    let start = end.saturating_sub(limit).min(start);
    messages[start..end].to_vec()
}

/// Channel adapter holding all state in memory.
pub struct InMemoryChannel {
    channel_type: String,
    id: Option<String>,
    member_ids: Vec<UserId>,
    own_user: Option<User>,
    watch_delay: Option<Duration>,
    query_delay: Option<Duration>,
    state: RwLock<LiveState>,
}

impl InMemoryChannel {
    /// Empty channel of `channel_type`. Channels without an ID are keyed by their members.
    #[must_use]
    pub fn new(channel_type: impl Into<String>, id: Option<&str>) -> Self {
        Self {
            channel_type: channel_type.into(),
            id: id.map(str::to_string),
            member_ids: Vec::new(),
            own_user: None,
            watch_delay: None,
            query_delay: None,
            state: RwLock::new(LiveState {
                snapshot: ChannelSnapshot {
                    is_latest_set: true,
                    ..ChannelSnapshot::default()
                },
                ..LiveState::default()
            }),
        }
    }

    /// Seeds the server-side history and loads its latest page as the
    /// live window.
    #[must_use]
    pub fn with_history(mut self, mut history: Vec<Message>, window: usize) -> Self {
        history.sort_by_key(Message::created_at);
        let state = self.state.get_mut();
        state.history = history;
        let main = state.main_history();
        let start = main.len().saturating_sub(window);
        state.set_window(main[start..].to_vec());
        for message in state.history.clone() {
            if let Some(parent) = message.parent_id().cloned() {
                state.snapshot.threads.entry(parent).or_default().push(message);
            }
        }
        self
    }

    /// Replaces the channel data and capabilities.
    #[must_use]
    pub fn with_data(mut self, data: ChannelData) -> Self {
        self.state.get_mut().data = data;
        self
    }

    /// Adds members to the live snapshot.
    #[must_use]
    pub fn with_members(mut self, members: Vec<Member>) -> Self {
        self.member_ids = members.iter().map(|m| m.user_id.clone()).collect();
        self.state.get_mut().snapshot.members =
            members.into_iter().map(|m| (m.user_id.clone(), m)).collect();
        self
    }

    /// Member IDs of a distinct channel that has no ID yet.
    #[must_use]
    pub fn with_member_ids(mut self, member_ids: Vec<UserId>) -> Self {
        self.member_ids = member_ids;
        self
    }

    /// Seeds per-user read state.
    #[must_use]
    pub fn with_read(mut self, reads: Vec<ReadState>) -> Self {
        self.state.get_mut().snapshot.read = reads
            .into_iter()
            .map(|r| (r.user.id().clone(), r))
            .collect();
        self
    }

    /// User the server attributes sends and reactions to.
    #[must_use]
    pub fn with_own_user(mut self, user: User) -> Self {
        self.own_user = Some(user);
        self
    }

    /// Makes `watch` yield for `delay` before completing.
    #[must_use]
    pub const fn with_watch_delay(mut self, delay: Duration) -> Self {
        self.watch_delay = Some(delay);
        self
    }

    /// Makes `query` yield for `delay` before completing.
    #[must_use]
    pub const fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = Some(delay);
        self
    }

    /// Marks the channel as already watched.
    #[must_use]
    pub fn initialized(mut self) -> Self {
        self.state.get_mut().initialized = true;
        self
    }

    /// Fails the next call to `operation` with `error`.
    pub fn fail_next(&self, operation: Operation, error: ChatError) {
        self.state
            .write()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Fails the next `watch` call with `error`.
    pub fn fail_next_watch(&self, error: ChatError) {
        self.fail_next(Operation::Watch, error);
    }

    /// Queries issued so far, oldest first.
    #[must_use]
    pub fn queries(&self) -> Vec<QueryOptions> {
        self.state.read().queries.clone()
    }

    /// Number of queries issued so far.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.state.read().queries.len()
    }

    /// Number of `watch` calls so far.
    #[must_use]
    pub fn watch_count(&self) -> usize {
        self.state.read().watch_count
    }

    /// Drafts accepted by `send_message`.
    #[must_use]
    pub fn sent_drafts(&self) -> Vec<MessageDraft> {
        self.state.read().sent.clone()
    }

    /// Message IDs passed to `mark_unread`, in call order.
    #[must_use]
    pub fn unread_marks(&self) -> Vec<MessageId> {
        self.state.read().unread_marks.clone()
    }

    /// Simulates a dropped connection for this channel.
    pub fn set_disconnected(&self, disconnected: bool) {
        self.state.write().disconnected = disconnected;
    }

    /// Replaces the channel data, as a `channel.updated` event would.
    pub fn set_data(&self, data: ChannelData) {
        self.state.write().data = data;
    }

    /// Replaces a message in the live state only, as a locally applied
    /// server push would.
    pub fn replace_live_message(&self, message: Message) {
        self.state.write().upsert_everywhere(message);
    }

    /// Applies `event` to the live state the way the SDK does before
    /// forwarding it to listeners.
    pub fn apply_event(&self, event: &ChatEvent) {
        if event.cid().is_some_and(|cid| Some(cid) != self.cid().as_ref()) {
            return;
        }
        trace!(event = event.event_type(), "Applying event to live state");
        let mut state = self.state.write();
        match event {
            ChatEvent::MessageNew { message, .. }
            | ChatEvent::MessageUpdated { message, .. }
            | ChatEvent::MessageDeleted { message, .. }
            | ChatEvent::ReactionNew { message, .. }
            | ChatEvent::ReactionUpdated { message, .. }
            | ChatEvent::ReactionDeleted { message, .. } => {
                state.upsert_everywhere(message.clone());
            }
            ChatEvent::MessageRead {
                user,
                created_at,
                last_read_message_id,
                ..
            } => {
                let mut read = ReadState::new(user.clone(), *created_at);
                read.last_read_message_id.clone_from(last_read_message_id);
                state.snapshot.read.insert(user.id().clone(), read);
            }
            ChatEvent::TypingStart {
                user, parent_id, ..
            } => {
                state.snapshot.typing.insert(
                    user.id().clone(),
                    TypingEntry {
                        user: user.clone(),
                        parent_id: parent_id.clone(),
                        received_at: Utc::now(),
                    },
                );
            }
            ChatEvent::TypingStop { user, .. } => {
                state.snapshot.typing.remove(user.id());
            }
            ChatEvent::UserWatchingStart {
                user,
                watcher_count,
                ..
            } => {
                state.snapshot.watcher_count = *watcher_count;
                state.snapshot.watchers.insert(user.id().clone(), user.clone());
            }
            ChatEvent::UserWatchingStop {
                user,
                watcher_count,
                ..
            } => {
                state.snapshot.watcher_count = *watcher_count;
                state.snapshot.watchers.remove(user.id());
            }
            ChatEvent::MemberAdded { member, .. } | ChatEvent::MemberUpdated { member, .. } => {
                state
                    .snapshot
                    .members
                    .insert(member.user_id.clone(), member.clone());
            }
            ChatEvent::MemberRemoved { member, .. } => {
                state.snapshot.members.remove(&member.user_id);
            }
            ChatEvent::ChannelTruncated { .. } => {
                state.history.clear();
                state.snapshot.messages.clear();
                state.snapshot.threads.clear();
                state.snapshot.is_latest_set = true;
            }
            ChatEvent::ChannelUpdated { channel, .. } => {
                state.data = channel.clone();
            }
            ChatEvent::UserDeleted { user } => {
                let id = user.id().clone();
                state.snapshot.members.remove(&id);
                state.snapshot.watchers.remove(&id);
            }
            _ => {}
        }
    }

    fn own_reaction(&self, id: &MessageId, kind: &str) -> Reaction {
        Reaction::new(kind, id.clone(), self.own_user.clone())
    }
}

#[async_trait]
impl ChannelPort for InMemoryChannel {
    fn channel_type(&self) -> String {
        self.channel_type.clone()
    }

    fn channel_id(&self) -> Option<String> {
        self.id.clone()
    }

    fn member_ids(&self) -> Vec<UserId> {
        self.member_ids.clone()
    }

    fn snapshot(&self) -> ChannelSnapshot {
        self.state.read().snapshot.clone()
    }

    fn data(&self) -> ChannelData {
        self.state.read().data.clone()
    }

    fn is_initialized(&self) -> bool {
        self.state.read().initialized
    }

    fn is_disconnected(&self) -> bool {
        self.state.read().disconnected
    }

    fn add_message_sorted(&self, message: Message, _timestamp_changed: bool) {
        let mut state = self.state.write();
        if let Some(parent) = message.parent_id().cloned() {
            let replies = state.snapshot.threads.entry(parent).or_default();
            upsert_sorted(replies, message.clone());
        }
        if message.is_in_main_list() {
            upsert_sorted(&mut state.snapshot.messages, message);
        }
    }

    fn remove_message(&self, id: &MessageId) {
        let mut state = self.state.write();
        state.snapshot.messages.retain(|m| m.id() != id);
        for replies in state.snapshot.threads.values_mut() {
            replies.retain(|m| m.id() != id);
        }
    }

    fn filter_error_messages(&self) {
        self.state
            .write()
            .snapshot
            .messages
            .retain(|m| m.kind() != MessageKind::Error);
    }

    async fn watch(&self) -> Result<QueryResult, ChatError> {
        if let Some(delay) = self.watch_delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write();
        state.watch_count += 1;
        state.take_failure(Operation::Watch)?;
        state.initialized = true;
        if state.snapshot.messages.is_empty() {
            let main = state.main_history();
            let start = main.len().saturating_sub(DEFAULT_WATCH_LIMIT);
            state.set_window(main[start..].to_vec());
        }
        debug!(cid = ?self.cid(), "Watched channel");
        Ok(QueryResult {
            messages: state.snapshot.messages.clone(),
            has_older: None,
        })
    }

    async fn query(&self, options: QueryOptions) -> Result<QueryResult, ChatError> {
        if let Some(delay) = self.query_delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write();
        state.queries.push(options.clone());
        state.take_failure(Operation::Query)?;

        let pagination = &options.messages;
        let limit = pagination.limit.unwrap_or(DEFAULT_WATCH_LIMIT);
        let main = state.main_history();

        let page = if let Some(id) = &pagination.id_lt {
            let end = main.iter().position(|m| m.id() == id).unwrap_or(0);
            let page = main[end.saturating_sub(limit)..end].to_vec();
            state.merge_into_window(&page);
            page
        } else if let Some(id) = &pagination.id_gt {
            let start = main
                .iter()
                .position(|m| m.id() == id)
                .map_or(main.len(), |i| i + 1);
            let page = main[start..(start + limit).min(main.len())].to_vec();
            state.merge_into_window(&page);
            page
        } else if let Some(id) = &pagination.id_around {
            let index = main
                .iter()
                .position(|m| m.id() == id)
                .ok_or_else(|| ChatError::NotFound(id.to_string()))?;
            let page = window_around(&main, index, limit);
            state.set_window(page.clone());
            page
        } else if let Some(at) = pagination.created_at_around {
            let index = main.partition_point(|m| m.created_at() < at);
            let page = window_around(&main, index, limit);
            state.set_window(page.clone());
            page
        } else {
            let page = main[main.len().saturating_sub(limit)..].to_vec();
            state.set_window(page.clone());
            page
        };

        Ok(QueryResult {
            messages: page,
            has_older: None,
        })
    }

    async fn get_replies(
        &self,
        parent_id: &MessageId,
        pagination: MessagePagination,
    ) -> Result<QueryResult, ChatError> {
        let mut state = self.state.write();
        state.queries.push(QueryOptions {
            messages: pagination.clone(),
            watchers_limit: None,
        });
        state.take_failure(Operation::Query)?;

        let limit = pagination.limit.unwrap_or(DEFAULT_WATCH_LIMIT);
        let replies: Vec<Message> = state
            .history
            .iter()
            .filter(|m| m.parent_id() == Some(parent_id))
            .cloned()
            .collect();
        let end = pagination
            .id_lt
            .as_ref()
            .and_then(|id| replies.iter().position(|m| m.id() == id))
            .unwrap_or(replies.len());
        let page = replies[end.saturating_sub(limit)..end].to_vec();

        let thread = state.snapshot.threads.entry(parent_id.clone()).or_default();
        for message in &page {
            upsert_sorted(thread, message.clone());
        }
        Ok(QueryResult {
            messages: page,
            has_older: None,
        })
    }

    async fn send_message(&self, draft: MessageDraft) -> Result<Message, ChatError> {
        let mut state = self.state.write();
        state.take_failure(Operation::SendMessage)?;

        let now = Utc::now();
        let mut message = Message::new(draft.id.clone(), self.own_user.clone(), &draft.text, now)
            .with_updated_at(now)
            .with_attachments(draft.attachments.clone());
        if let Some(cid) = self.cid() {
            message = message.with_cid(cid);
        }
        if let Some(parent) = &draft.parent_id {
            message = message.with_parent(parent.clone());
        }
        state.sent.push(draft);
        upsert_sorted(&mut state.history, message.clone());
        Ok(message)
    }

    async fn update_message(&self, message: &Message) -> Result<Message, ChatError> {
        let mut state = self.state.write();
        state.take_failure(Operation::UpdateMessage)?;

        let now = Utc::now();
        let updated = message
            .clone()
            .into_received()
            .with_updated_at(now)
            .with_text_updated_at(now);
        upsert_sorted(&mut state.history, updated.clone());
        Ok(updated)
    }

    async fn delete_message(&self, id: &MessageId) -> Result<Message, ChatError> {
        let mut state = self.state.write();
        state.take_failure(Operation::DeleteMessage)?;

        let index = state
            .history_index(id)
            .ok_or_else(|| ChatError::NotFound(id.to_string()))?;
        let deleted = state.history[index]
            .clone()
            .with_kind(MessageKind::Deleted)
            .with_deleted_at(Utc::now());
        state.history[index] = deleted.clone();
        Ok(deleted)
    }

    async fn send_reaction(&self, id: &MessageId, kind: &str) -> Result<Message, ChatError> {
        let reaction = self.own_reaction(id, kind);
        let mut state = self.state.write();
        state.take_failure(Operation::SendReaction)?;

        let index = state
            .history_index(id)
            .ok_or_else(|| ChatError::NotFound(id.to_string()))?;
        let current = &state.history[index];
        // one reaction of each kind per user
        if current.own_reactions().iter().any(|r| r.kind == kind) {
            return Ok(current.clone());
        }
        let mut groups = current.reaction_groups().clone();
        let now = Utc::now();
        groups
            .entry(kind.to_string())
            .and_modify(|g| {
                g.count += 1;
                g.last_reaction_at = now;
            })
            .or_insert_with(|| ReactionGroup::single(now));
        let mut latest = vec![reaction.clone()];
        latest.extend(current.latest_reactions().iter().cloned());
        let mut own = vec![reaction];
        own.extend(current.own_reactions().iter().cloned());

        let updated = current.clone().with_reactions(groups, latest, own);
        state.history[index] = updated.clone();
        Ok(updated)
    }

    async fn delete_reaction(&self, id: &MessageId, kind: &str) -> Result<Message, ChatError> {
        let own_id = self.own_user.as_ref().map(|u| u.id().clone());
        let mut state = self.state.write();
        state.take_failure(Operation::DeleteReaction)?;

        let index = state
            .history_index(id)
            .ok_or_else(|| ChatError::NotFound(id.to_string()))?;
        let current = &state.history[index];
        let mut groups = current.reaction_groups().clone();
        if let Some(group) = groups.get_mut(kind) {
            if group.count > 1 {
                group.count -= 1;
            } else {
                groups.remove(kind);
            }
        }
        let latest = current
            .latest_reactions()
            .iter()
            .filter(|r| !(r.kind == kind && r.author_id() == own_id.as_ref()))
            .cloned()
            .collect();
        let own = current
            .own_reactions()
            .iter()
            .filter(|r| r.kind != kind)
            .cloned()
            .collect();

        let updated = current.clone().with_reactions(groups, latest, own);
        state.history[index] = updated.clone();
        Ok(updated)
    }

    async fn mark_read(&self) -> Result<MarkReadResponse, ChatError> {
        let mut state = self.state.write();
        state.take_failure(Operation::MarkRead)?;

        let last = state.snapshot.messages.last().map(|m| m.id().clone());
        if let Some(user) = self.own_user.clone() {
            let mut read = ReadState::new(user.clone(), Utc::now());
            read.last_read_message_id.clone_from(&last);
            state.snapshot.read.insert(user.id().clone(), read);
        }
        Ok(MarkReadResponse {
            last_read_message_id: last,
        })
    }

    async fn mark_unread(&self, message_id: &MessageId) -> Result<(), ChatError> {
        let mut state = self.state.write();
        state.take_failure(Operation::MarkUnread)?;
        state.unread_marks.push(message_id.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone};

    use super::*;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0).unwrap()
    }

    fn history(count: u32) -> Vec<Message> {
        (0..count)
            .map(|i| Message::new(format!("m{i}"), Some(User::new("a")), "x", at(i)))
            .collect()
    }

    fn ids(messages: &[Message]) -> Vec<String> {
        messages.iter().map(|m| m.id().to_string()).collect()
    }

    #[tokio::test]
    async fn test_older_page_merges_into_window() {
        let channel = InMemoryChannel::new("messaging", Some("c")).with_history(history(10), 3);
        assert_eq!(ids(&channel.snapshot().messages), ["m7", "m8", "m9"]);

        let page = channel
            .query(QueryOptions::older_than("m7".into(), 2))
            .await
            .unwrap();

        assert_eq!(ids(&page.messages), ["m5", "m6"]);
        assert_eq!(
            ids(&channel.snapshot().messages),
            ["m5", "m6", "m7", "m8", "m9"]
        );
        assert!(channel.snapshot().is_latest_set);
    }

    #[tokio::test]
    async fn test_around_query_replaces_window() {
        let channel = InMemoryChannel::new("messaging", Some("c")).with_history(history(10), 3);

        channel
            .query(QueryOptions::around_id("m2".into(), 4))
            .await
            .unwrap();

        let snapshot = channel.snapshot();
        assert_eq!(ids(&snapshot.messages), ["m0", "m1", "m2", "m3"]);
        assert!(!snapshot.is_latest_set);
        assert_eq!(channel.query_count(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed_once() {
        let channel = InMemoryChannel::new("messaging", Some("c"));
        channel.fail_next(Operation::MarkRead, ChatError::network("down"));

        assert!(channel.mark_read().await.is_err());
        assert!(channel.mark_read().await.is_ok());
    }

    #[test]
    fn test_apply_event_ignores_other_channels() {
        let channel = InMemoryChannel::new("messaging", Some("c"));
        let other = crate::domain::entities::ChannelCid::new("messaging", "other");

        channel.apply_event(&ChatEvent::MessageNew {
            cid: other,
            message: Message::new("m1", None, "x", at(1)),
        });

        assert!(channel.snapshot().messages.is_empty());
    }
}
