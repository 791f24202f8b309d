//! Message pagination and jump-to-message.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::application::state::{ChannelAction, ChannelStore};
use crate::domain::NotificationLevel;
use crate::domain::connection::ConnectionStatus;
use crate::domain::entities::{ChannelSnapshot, ChannelUnreadState, Message, MessageId};
use crate::domain::errors::ChatError;
use crate::domain::ports::{
    ChannelPort, I18nPort, MessagePagination, NotificationPort, QueryOptions,
};
use crate::infrastructure::config::PaginationConfig;

const JUMP_TO_UNREAD_FAILED: &str = "Failed to jump to the first unread message";

/// Drives page requests for one channel and commits their results to the
/// store.
///
/// Every operation checks the in-flight flags before issuing a request, so
/// at most one main-list page request is outstanding at a time.
#[derive(Clone)]
pub struct PaginationController {
    channel: Arc<dyn ChannelPort>,
    store: ChannelStore,
    connection: ConnectionStatus,
    notifier: Arc<dyn NotificationPort>,
    i18n: Arc<dyn I18nPort>,
    config: PaginationConfig,
    highlight_timer: Arc<Mutex<Option<JoinHandle<()>>>>,
}

/// Outcome of the first-unread boundary search.
struct UnreadTarget {
    first_unread_id: Option<MessageId>,
    last_read_id: Option<MessageId>,
    loaded: bool,
    has_more: bool,
}

/// Index of the last message created at or before `at`.
fn last_at_or_before(messages: &[Message], at: DateTime<Utc>) -> Option<usize> {
    messages
        .partition_point(|m| m.created_at() <= at)
        .checked_sub(1)
}

/// Next message after `id` in `messages`.
fn next_after(messages: &[Message], id: &MessageId) -> Option<MessageId> {
    let index = messages.iter().position(|m| m.id() == id)?;
    messages.get(index + 1).map(|m| m.id().clone())
}

impl PaginationController {
    /// Controller committing pages for `channel` into `store`.
    #[must_use]
    pub fn new(
        channel: Arc<dyn ChannelPort>,
        store: ChannelStore,
        connection: ConnectionStatus,
        notifier: Arc<dyn NotificationPort>,
        i18n: Arc<dyn I18nPort>,
        config: PaginationConfig,
    ) -> Self {
        Self {
            channel,
            store,
            connection,
            notifier,
            i18n,
            config,
            highlight_timer: Arc::new(Mutex::new(None)),
        }
    }

    /// Page sizes, thresholds and highlight duration in use.
    #[must_use]
    pub const fn config(&self) -> &PaginationConfig {
        &self.config
    }

    fn loaded(&self) -> ChannelSnapshot {
        self.channel.snapshot()
    }

    /// Loads the page of messages older than the oldest loaded one.
    ///
    /// Returns the number of messages the page held, or 0 when nothing was
    /// requested or the request failed.
    pub async fn load_more(&self, limit: usize) -> usize {
        if !self.connection.is_online() {
            debug!("Offline, skipping load more");
            return 0;
        }
        let Some(oldest) = self.store.dispatch_if(|state| {
            if !state.has_more || state.is_paginating() {
                return None;
            }
            let oldest = state
                .oldest_message()
                .filter(|m| m.status().is_received())
                .map(|m| m.id().clone())?;
            Some((oldest, ChannelAction::SetLoadingMore(true)))
        }) else {
            return 0;
        };

        debug!(before = %oldest, limit, "Loading older messages");

        let result = match self
            .channel
            .query(QueryOptions::older_than(oldest, limit))
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Message pagination request failed");
                self.store.dispatch(ChannelAction::SetLoadingMore(false));
                return 0;
            }
        };

        let returned = result.messages.len();
        self.store.dispatch(ChannelAction::LoadMoreFinished {
            has_more: result.has_older.unwrap_or(returned == limit),
            messages: self.loaded().messages,
        });
        returned
    }

    /// Loads the page of messages newer than the newest loaded one.
    pub async fn load_more_newer(&self, limit: usize) -> usize {
        if !self.connection.is_online() {
            return 0;
        }
        let Some(newest) = self.store.dispatch_if(|state| {
            if !state.has_more_newer || state.is_paginating() {
                return None;
            }
            let newest = state.newest_message().map(|m| m.id().clone())?;
            Some((newest, ChannelAction::SetLoadingMoreNewer(true)))
        }) else {
            return 0;
        };

        debug!(after = %newest, limit, "Loading newer messages");

        let result = match self
            .channel
            .query(QueryOptions::newer_than(newest, limit))
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Message pagination request failed");
                self.store.dispatch(ChannelAction::SetLoadingMoreNewer(false));
                return 0;
            }
        };

        let snapshot = self.loaded();
        self.store.dispatch(ChannelAction::LoadMoreNewerFinished {
            has_more_newer: !snapshot.is_latest_set,
            messages: snapshot.messages,
        });
        result.messages.len()
    }

    /// Loads the page around `id` and highlights it for `highlight`.
    ///
    /// # Errors
    ///
    /// Returns the query error after resetting the loading flag and
    /// notifying the user.
    pub async fn jump_to_message(
        &self,
        id: &MessageId,
        limit: usize,
        highlight: Duration,
    ) -> Result<(), ChatError> {
        debug!(message_id = %id, limit, "Jumping to message");
        self.store.dispatch(ChannelAction::SetLoadingMore(true));

        if let Err(e) = self.load_into_window(id, limit).await {
            warn!(message_id = %id, error = %e, "Failed to jump to message");
            self.store.dispatch(ChannelAction::SetLoadingMore(false));
            self.notifier.notify(
                &self.i18n.t("Failed to jump to message", &[]),
                NotificationLevel::Error,
            );
            return Err(e);
        }

        let snapshot = self.loaded();
        let has_more = snapshot.position(id).is_some_and(|index| index >= limit / 2);
        self.store.dispatch(ChannelAction::LoadMoreFinished {
            has_more,
            messages: snapshot.messages,
        });
        self.finish_jump(id.clone(), !snapshot.is_latest_set, highlight);
        Ok(())
    }

    /// Fetches the page around `id` unless it is already loaded.
    async fn load_into_window(&self, id: &MessageId, limit: usize) -> Result<(), ChatError> {
        if self.loaded().contains(id) {
            return Ok(());
        }
        self.channel
            .query(QueryOptions::around_id(id.clone(), limit))
            .await
            .map(|_| ())
    }

    fn finish_jump(&self, id: MessageId, has_more_newer: bool, highlight: Duration) {
        self.store.dispatch(ChannelAction::JumpToMessageFinished {
            has_more_newer,
            highlighted_message_id: id,
        });

        let store = self.store.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(highlight).await;
            store.dispatch(ChannelAction::ClearHighlightedMessage);
        });
        if let Some(previous) = self.highlight_timer.lock().replace(timer) {
            previous.abort();
        }
    }

    fn fail_unread_jump(&self) {
        self.notifier
            .notify(&self.i18n.t(JUMP_TO_UNREAD_FAILED, &[]), NotificationLevel::Error);
    }

    /// Loads and highlights the first message the user has not read.
    ///
    /// Does nothing when the channel has no unread messages.
    pub async fn jump_to_first_unread_message(&self, limit: usize, highlight: Duration) {
        let Some(unread) = self.store.with_state(|s| s.channel_unread_ui_state.clone()) else {
            return;
        };
        if unread.unread_messages == 0 {
            return;
        }
        // failed lookups commit this back instead of ending older paging
        let prior_has_more = self.store.with_state(|s| s.has_more);

        let Some(target) = self
            .resolve_unread_target(&unread, limit, prior_has_more)
            .await
        else {
            return;
        };
        let UnreadTarget {
            mut first_unread_id,
            last_read_id,
            loaded,
            ..
        } = target;

        if first_unread_id.is_none() && last_read_id.is_none() {
            self.fail_unread_jump();
            return;
        }

        if !loaded {
            let Some(target_id) = first_unread_id.clone().or_else(|| last_read_id.clone()) else {
                self.fail_unread_jump();
                return;
            };
            self.store.dispatch(ChannelAction::SetLoadingMore(true));
            if let Err(e) = self.load_into_window(&target_id, limit).await {
                warn!(message_id = %target_id, error = %e, "Failed to load first unread message");
                self.fail_unread_jump();
                self.commit_window(prior_has_more);
                return;
            }
            let snapshot = self.loaded();
            let has_more = snapshot
                .position(&target_id)
                .is_some_and(|index| index >= limit / 2);
            if first_unread_id.is_none() {
                first_unread_id = next_after(&snapshot.messages, &target_id);
            }
            self.store.dispatch(ChannelAction::LoadMoreFinished {
                has_more,
                messages: snapshot.messages,
            });
        }

        let Some(first_unread_id) = first_unread_id else {
            self.fail_unread_jump();
            return;
        };

        if unread.first_unread_message_id.is_none() {
            self.store
                .dispatch(ChannelAction::SetChannelUnreadUiState(Some(ChannelUnreadState {
                    first_unread_message_id: Some(first_unread_id.clone()),
                    last_read_message_id: last_read_id,
                    ..unread
                })));
        }

        debug!(message_id = %first_unread_id, "Jumping to first unread message");
        let has_more_newer = !self.loaded().is_latest_set;
        self.finish_jump(first_unread_id, has_more_newer, highlight);
    }

    /// Finds the unread boundary in the loaded window, querying around the
    /// last-read time when the window does not reach back that far.
    ///
    /// Returns `None` when the failure has already been reported.
    async fn resolve_unread_target(
        &self,
        unread: &ChannelUnreadState,
        limit: usize,
        has_more: bool,
    ) -> Option<UnreadTarget> {
        let window = self.loaded().messages;

        if let Some(first_unread_id) = &unread.first_unread_message_id {
            return Some(UnreadTarget {
                loaded: window.iter().any(|m| m.id() == first_unread_id),
                first_unread_id: Some(first_unread_id.clone()),
                last_read_id: unread.last_read_message_id.clone(),
                has_more,
            });
        }

        if let Some(last_read_id) = &unread.last_read_message_id {
            return Some(UnreadTarget {
                loaded: window.iter().any(|m| m.id() == last_read_id),
                first_unread_id: next_after(&window, last_read_id),
                last_read_id: Some(last_read_id.clone()),
                has_more,
            });
        }

        if let Some(index) = last_at_or_before(&window, unread.last_read) {
            let first_unread_id = window.get(index + 1).map(|m| m.id().clone());
            return Some(UnreadTarget {
                loaded: first_unread_id.is_some(),
                first_unread_id,
                last_read_id: Some(window[index].id().clone()),
                has_more,
            });
        }

        self.store.dispatch(ChannelAction::SetLoadingMore(true));
        let page = match self
            .channel
            .query(QueryOptions::around_time(unread.last_read, limit))
            .await
        {
            Ok(result) => result.messages,
            Err(e) => {
                warn!(error = %e, "Failed to query around last read time");
                self.fail_unread_jump();
                self.commit_window(has_more);
                return None;
            }
        };

        let Some(first) = page.first() else {
            self.fail_unread_jump();
            self.commit_window(has_more);
            return None;
        };

        let target = if unread.last_read < first.created_at() {
            UnreadTarget {
                first_unread_id: Some(first.id().clone()),
                last_read_id: None,
                loaded: true,
                has_more: false,
            }
        } else {
            let index = last_at_or_before(&page, unread.last_read);
            let first_unread_id = index.and_then(|i| page.get(i + 1)).map(|m| m.id().clone());
            UnreadTarget {
                loaded: first_unread_id.is_some(),
                first_unread_id,
                last_read_id: index.map(|i| page[i].id().clone()),
                has_more: index.is_some_and(|i| i >= limit / 2),
            }
        };
        self.commit_window(target.has_more);
        Some(target)
    }

    fn commit_window(&self, has_more: bool) {
        self.store.dispatch(ChannelAction::LoadMoreFinished {
            has_more,
            messages: self.loaded().messages,
        });
    }

    /// Loads the newest page and leaves any jumped-to window.
    pub async fn jump_to_latest_message(&self, limit: usize) {
        debug!(limit, "Jumping to latest messages");
        let result = match self.channel.query(QueryOptions::latest(limit)).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Failed to load latest messages");
                return;
            }
        };

        let has_more = result
            .has_older
            .unwrap_or(result.messages.len() >= self.config.jump_to_latest_threshold);
        self.store.dispatch(ChannelAction::LoadMoreFinished {
            has_more,
            messages: self.loaded().messages,
        });
        self.store.dispatch(ChannelAction::JumpToLatestMessage);
    }

    /// Loads replies older than the oldest loaded reply of the open thread.
    pub async fn load_more_thread(&self, limit: usize) {
        let Some(parent) = self.store.with_state(|state| {
            if state.thread_loading_more {
                return None;
            }
            state.thread.as_ref().map(|t| t.id().clone())
        }) else {
            return;
        };

        self.store.dispatch(ChannelAction::StartLoadingThread);
        let oldest = self
            .loaded()
            .thread(&parent)
            .first()
            .map(|m| m.id().clone());
        let pagination = MessagePagination {
            limit: Some(limit),
            id_lt: oldest,
            ..MessagePagination::default()
        };

        match self.channel.get_replies(&parent, pagination).await {
            Ok(result) => {
                let thread_has_more = result.has_older.unwrap_or(result.messages.len() == limit);
                self.store.dispatch(ChannelAction::LoadMoreThreadFinished {
                    thread_has_more,
                    thread_messages: self.loaded().thread(&parent),
                });
            }
            Err(e) => {
                warn!(parent_id = %parent, error = %e, "Thread pagination request failed");
                self.store.dispatch(ChannelAction::SetError(e.to_string()));
                self.store.dispatch(ChannelAction::SetThreadLoadingMore(false));
            }
        }
    }

    /// Cancels the pending highlight clear, if any.
    pub fn cancel_highlight(&self) {
        if let Some(timer) = self.highlight_timer.lock().take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::domain::entities::{MessageStatus, User};
    use crate::domain::ports::mocks::RecordingNotifier;
    use crate::infrastructure::i18n::PassthroughTranslator;
    use crate::infrastructure::memory::{InMemoryChannel, Operation};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap() + chrono::Duration::minutes(i64::from(minute))
    }

    fn history(count: u32) -> Vec<Message> {
        (0..count)
            .map(|i| Message::new(format!("m{i}"), Some(User::new("alice")), "hi", at(i)))
            .collect()
    }

    struct Fixture {
        channel: Arc<InMemoryChannel>,
        store: ChannelStore,
        notifier: RecordingNotifier,
        connection: ConnectionStatus,
        pagination: PaginationController,
    }

    fn fixture(channel: InMemoryChannel) -> Fixture {
        let channel = Arc::new(channel);
        let store = ChannelStore::default();
        store.dispatch(ChannelAction::InitStateFromChannel(Box::new(channel.snapshot())));
        let notifier = RecordingNotifier::new();
        let connection = ConnectionStatus::default();
        let pagination = PaginationController::new(
            channel.clone(),
            store.clone(),
            connection.clone(),
            Arc::new(notifier.clone()),
            Arc::new(PassthroughTranslator),
            PaginationConfig::default(),
        );
        Fixture {
            channel,
            store,
            notifier,
            connection,
            pagination,
        }
    }

    fn window_ids(store: &ChannelStore) -> Vec<String> {
        store.with_state(|s| s.messages.iter().map(|m| m.id().to_string()).collect())
    }

    #[tokio::test]
    async fn test_load_more_appends_older_page() {
        let f = fixture(InMemoryChannel::new("messaging", Some("c")).with_history(history(10), 4));

        let returned = f.pagination.load_more(3).await;

        assert_eq!(returned, 3);
        assert_eq!(window_ids(&f.store), ["m3", "m4", "m5", "m6", "m7", "m8", "m9"]);
        let state = f.store.state();
        assert!(state.has_more);
        assert!(!state.loading_more);
        assert!(!state.suppress_autoscroll);
    }

    #[tokio::test]
    async fn test_load_more_short_page_ends_history() {
        let f = fixture(InMemoryChannel::new("messaging", Some("c")).with_history(history(5), 4));

        assert_eq!(f.pagination.load_more(3).await, 1);
        assert!(!f.store.state().has_more);
    }

    #[tokio::test]
    async fn test_load_more_while_loading_is_noop() {
        let f = fixture(InMemoryChannel::new("messaging", Some("c")).with_history(history(10), 4));
        f.store.dispatch(ChannelAction::SetLoadingMore(true));

        assert_eq!(f.pagination.load_more(3).await, 0);
        assert_eq!(f.channel.query_count(), 0);
    }

    #[tokio::test]
    async fn test_load_more_skips_when_offline_or_oldest_pending() {
        let mut messages = history(3);
        messages[0] = messages[0].clone().with_status(MessageStatus::Sending);
        let f = fixture(InMemoryChannel::new("messaging", Some("c")).with_history(messages, 3));

        assert_eq!(f.pagination.load_more(3).await, 0);

        f.connection.set_online(false);
        assert_eq!(f.pagination.load_more(3).await, 0);
        assert_eq!(f.channel.query_count(), 0);
    }

    #[tokio::test]
    async fn test_load_more_failure_resets_flag() {
        let f = fixture(InMemoryChannel::new("messaging", Some("c")).with_history(history(10), 4));
        f.channel.fail_next(Operation::Query, ChatError::network("timeout"));

        assert_eq!(f.pagination.load_more(3).await, 0);

        let state = f.store.state();
        assert!(!state.loading_more);
        assert_eq!(state.messages.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_load_more_issues_one_query() {
        let f = fixture(
            InMemoryChannel::new("messaging", Some("c"))
                .with_history(history(10), 4)
                .with_query_delay(Duration::from_millis(50)),
        );

        let (first, second) = tokio::join!(f.pagination.load_more(3), f.pagination.load_more(3));

        assert_eq!(first + second, 3);
        assert_eq!(f.channel.query_count(), 1);
        assert!(!f.store.state().loading_more);
    }

    #[tokio::test(start_paused = true)]
    async fn test_jump_to_message_highlights_then_clears() {
        let f = fixture(InMemoryChannel::new("messaging", Some("c")).with_history(history(40), 5));

        f.pagination
            .jump_to_message(&"m10".into(), 10, Duration::from_millis(500))
            .await
            .unwrap();

        let state = f.store.state();
        assert_eq!(state.highlighted_message_id, Some("m10".into()));
        assert!(state.has_more_newer);
        assert!(state.has_more);
        assert!(!state.loading_more);
        assert!(state.messages.iter().any(|m| m.id().as_str() == "m10"));

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(f.store.state().highlighted_message_id, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_jump_replaces_highlight_timer() {
        let f = fixture(InMemoryChannel::new("messaging", Some("c")).with_history(history(40), 40));

        f.pagination
            .jump_to_message(&"m10".into(), 10, Duration::from_millis(500))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        f.pagination
            .jump_to_message(&"m20".into(), 10, Duration::from_millis(500))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(f.store.state().highlighted_message_id, Some("m20".into()));
        assert_eq!(f.channel.query_count(), 0);
    }

    #[tokio::test]
    async fn test_jump_to_missing_message_notifies() {
        let f = fixture(InMemoryChannel::new("messaging", Some("c")).with_history(history(10), 5));

        let result = f
            .pagination
            .jump_to_message(&"nope".into(), 10, Duration::from_millis(500))
            .await;

        assert!(result.is_err());
        assert!(!f.store.state().loading_more);
        assert_eq!(f.store.state().highlighted_message_id, None);
        assert_eq!(f.notifier.count(), 1);
    }

    #[tokio::test]
    async fn test_jump_to_first_unread_by_timestamp_issues_one_query() {
        let f = fixture(InMemoryChannel::new("messaging", Some("c")).with_history(history(60), 20));
        let mut unread = ChannelUnreadState::new(at(0) - chrono::Duration::hours(1));
        unread.unread_messages = 60;
        f.store
            .dispatch(ChannelAction::SetChannelUnreadUiState(Some(unread)));

        f.pagination
            .jump_to_first_unread_message(20, Duration::from_millis(500))
            .await;

        let queries = f.channel.queries();
        assert_eq!(queries.len(), 1);
        assert!(queries[0].messages.created_at_around.is_some());

        let state = f.store.state();
        assert_eq!(state.highlighted_message_id, Some("m0".into()));
        assert!(!state.has_more);
        assert_eq!(
            state
                .channel_unread_ui_state
                .and_then(|u| u.first_unread_message_id),
            Some("m0".into())
        );
        assert_eq!(f.notifier.count(), 0);
    }

    #[tokio::test]
    async fn test_jump_to_first_unread_after_last_read_id() {
        let f = fixture(InMemoryChannel::new("messaging", Some("c")).with_history(history(10), 10));
        let mut unread = ChannelUnreadState::new(at(4));
        unread.last_read_message_id = Some("m4".into());
        unread.unread_messages = 5;
        f.store
            .dispatch(ChannelAction::SetChannelUnreadUiState(Some(unread)));

        f.pagination
            .jump_to_first_unread_message(10, Duration::from_millis(500))
            .await;

        assert_eq!(f.store.state().highlighted_message_id, Some("m5".into()));
        assert_eq!(f.channel.query_count(), 0);
    }

    #[tokio::test]
    async fn test_jump_to_first_unread_without_unread_does_nothing() {
        let f = fixture(InMemoryChannel::new("messaging", Some("c")).with_history(history(10), 10));
        f.store
            .dispatch(ChannelAction::SetChannelUnreadUiState(Some(ChannelUnreadState::new(at(3)))));

        f.pagination
            .jump_to_first_unread_message(10, Duration::from_millis(500))
            .await;

        assert_eq!(f.store.state().highlighted_message_id, None);
        assert_eq!(f.notifier.count(), 0);
    }

    #[tokio::test]
    async fn test_jump_to_first_unread_failure_keeps_highlight() {
        let f = fixture(InMemoryChannel::new("messaging", Some("c")).with_history(history(10), 3));
        let mut unread = ChannelUnreadState::new(at(0) - chrono::Duration::hours(1));
        unread.unread_messages = 3;
        f.store
            .dispatch(ChannelAction::SetChannelUnreadUiState(Some(unread)));
        f.channel.fail_next(Operation::Query, ChatError::network("down"));

        f.pagination
            .jump_to_first_unread_message(10, Duration::from_millis(500))
            .await;

        let state = f.store.state();
        assert_eq!(state.highlighted_message_id, None);
        assert!(!state.loading_more);
        assert!(state.has_more);
        assert_eq!(f.notifier.texts(), [JUMP_TO_UNREAD_FAILED]);
    }

    fn unread_from(first_unread: &str, count: u32) -> ChannelUnreadState {
        let mut unread = ChannelUnreadState::new(at(4));
        unread.first_unread_message_id = Some(first_unread.into());
        unread.unread_messages = count;
        unread
    }

    #[tokio::test]
    async fn test_jump_to_unloaded_first_unread_loads_its_page() {
        let f = fixture(InMemoryChannel::new("messaging", Some("c")).with_history(history(40), 5));
        f.store
            .dispatch(ChannelAction::SetChannelUnreadUiState(Some(unread_from("m5", 35))));

        f.pagination
            .jump_to_first_unread_message(10, Duration::from_millis(500))
            .await;

        let queries = f.channel.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].messages.id_around, Some("m5".into()));

        let state = f.store.state();
        assert_eq!(state.highlighted_message_id, Some("m5".into()));
        assert!(state.has_more);
        assert!(state.has_more_newer);
        assert!(!state.loading_more);
        assert_eq!(window_ids(&f.store).first().map(String::as_str), Some("m0"));
        assert_eq!(f.notifier.count(), 0);
    }

    #[tokio::test]
    async fn test_failed_first_unread_load_keeps_older_paging() {
        let f = fixture(InMemoryChannel::new("messaging", Some("c")).with_history(history(40), 5));
        f.store
            .dispatch(ChannelAction::SetChannelUnreadUiState(Some(unread_from("m5", 35))));
        f.channel.fail_next(Operation::Query, ChatError::network("timeout"));

        f.pagination
            .jump_to_first_unread_message(10, Duration::from_millis(500))
            .await;

        let state = f.store.state();
        assert!(state.has_more);
        assert!(!state.loading_more);
        assert_eq!(state.highlighted_message_id, None);
        assert_eq!(window_ids(&f.store), ["m35", "m36", "m37", "m38", "m39"]);
        assert_eq!(f.notifier.texts(), [JUMP_TO_UNREAD_FAILED]);

        assert_eq!(f.pagination.load_more(5).await, 5);
    }

    #[tokio::test]
    async fn test_jump_to_latest_uses_threshold() {
        let f = fixture(InMemoryChannel::new("messaging", Some("c")).with_history(history(60), 60));
        f.pagination
            .jump_to_message(&"m5".into(), 10, Duration::from_millis(1))
            .await
            .unwrap();

        f.pagination.jump_to_latest_message(30).await;

        let state = f.store.state();
        assert!(state.has_more);
        assert!(!state.has_more_newer);
        assert_eq!(state.highlighted_message_id, None);
        assert_eq!(state.newest_message().map(|m| m.id().to_string()), Some("m59".into()));
    }

    #[tokio::test]
    async fn test_load_more_newer_tracks_latest_set() {
        let f = fixture(InMemoryChannel::new("messaging", Some("c")).with_history(history(30), 30));
        f.channel
            .query(QueryOptions::around_id("m5".into(), 10))
            .await
            .unwrap();
        f.store.dispatch(ChannelAction::LoadMoreFinished {
            has_more: false,
            messages: f.channel.snapshot().messages,
        });
        f.store.dispatch(ChannelAction::JumpToMessageFinished {
            has_more_newer: true,
            highlighted_message_id: "m5".into(),
        });

        assert_eq!(f.pagination.load_more_newer(10).await, 10);
        assert!(f.store.state().has_more_newer);

        assert_eq!(f.pagination.load_more_newer(20).await, 10);
        assert!(!f.store.state().has_more_newer);
    }

    #[tokio::test]
    async fn test_load_more_thread() {
        let parent = Message::new("p", Some(User::new("alice")), "root", at(0));
        let mut messages = vec![parent.clone()];
        messages.extend((1..=5).map(|i| {
            Message::new(format!("r{i}"), Some(User::new("bob")), "reply", at(i)).with_parent("p")
        }));
        let f = fixture(InMemoryChannel::new("messaging", Some("c")).with_history(messages, 10));
        f.store.dispatch(ChannelAction::OpenThread {
            message: parent,
            snapshot: Box::new(f.channel.snapshot()),
        });

        f.pagination.load_more_thread(3).await;

        let state = f.store.state();
        assert!(!state.thread_loading_more);
        assert!(!state.thread_has_more);
        assert_eq!(state.thread_messages.len(), 5);
    }

    #[tokio::test]
    async fn test_load_more_thread_failure_clears_loading() {
        let parent = Message::new("p", Some(User::new("alice")), "root", at(0));
        let f = fixture(
            InMemoryChannel::new("messaging", Some("c")).with_history(vec![parent.clone()], 10),
        );
        f.store.dispatch(ChannelAction::SetThread(parent));
        f.channel.fail_next(Operation::Query, ChatError::network("down"));

        f.pagination.load_more_thread(3).await;

        let state = f.store.state();
        assert!(!state.thread_loading_more);
        assert!(state.error.is_some());
    }
}
