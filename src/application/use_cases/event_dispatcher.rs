//! Translates chat client events into channel actions.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::application::services::Throttle;
use crate::application::state::{ChannelAction, ChannelStore};
use crate::domain::connection::ConnectionStatus;
use crate::domain::entities::{ChannelCid, ChannelUnreadState, UserId};
use crate::domain::events::ChatEvent;
use crate::domain::ports::{ChannelPort, QueryOptions};
use crate::infrastructure::config::EngineConfig;

/// Creation time of the newest message the current user sent, per channel.
///
/// Shared across channel sessions; read by slow-mode cooldown timers.
#[derive(Debug, Clone, Default)]
pub struct LatestMessageDates {
    inner: Arc<Mutex<HashMap<ChannelCid, DateTime<Utc>>>>,
}

impl LatestMessageDates {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `at` unless a later date is already known.
    pub fn record(&self, cid: ChannelCid, at: DateTime<Utc>) {
        self.inner
            .lock()
            .entry(cid)
            .and_modify(|current| {
                if *current < at {
                    *current = at;
                }
            })
            .or_insert(at);
    }

    /// Newest own message date recorded for `cid`.
    #[must_use]
    pub fn get(&self, cid: &ChannelCid) -> Option<DateTime<Utc>> {
        self.inner.lock().get(cid).copied()
    }
}

/// Consumes events for one open channel and keeps its render state in sync.
///
/// Every handled event ends in a throttled full copy from the live channel,
/// so bursts collapse into a bounded number of state updates.
pub struct EventDispatcher {
    channel: Arc<dyn ChannelPort>,
    store: ChannelStore,
    connection: ConnectionStatus,
    own_user_id: Option<UserId>,
    latest_dates: LatestMessageDates,
    copy_throttle: Throttle,
    page_size: usize,
}

impl EventDispatcher {
    /// Dispatcher for `channel` writing into `store`. Uses the copy throttle and page size from `config`.
    #[must_use]
    pub fn new(
        channel: Arc<dyn ChannelPort>,
        store: ChannelStore,
        connection: ConnectionStatus,
        own_user_id: Option<UserId>,
        latest_dates: LatestMessageDates,
        config: &EngineConfig,
    ) -> Self {
        Self {
            channel,
            store,
            connection,
            own_user_id,
            latest_dates,
            copy_throttle: Throttle::leading_trailing(config.events.copy_state_throttle()),
            page_size: config.pagination.message_page_size,
        }
    }

    /// Handles one event.
    pub async fn handle_event(&self, event: &ChatEvent) {
        if matches!(event, ChatEvent::Unrecognized) {
            trace!("Ignoring unrecognized event");
            return;
        }
        if let Some(cid) = event.cid()
            && self.channel.cid().as_ref() != Some(cid)
        {
            return;
        }
        debug!(event = event.event_type(), "Handling channel event");

        if let Some(message) = event.message() {
            self.store.dispatch(ChannelAction::UpdateThreadOnEvent {
                message: Some(message.clone()),
                snapshot: Box::new(self.channel.snapshot()),
            });
        }

        match event {
            ChatEvent::TypingStart { .. } | ChatEvent::TypingStop { .. } => {
                self.store
                    .dispatch(ChannelAction::SetTyping(self.channel.snapshot().typing));
                return;
            }
            ChatEvent::UserWatchingStart { .. } | ChatEvent::UserWatchingStop { .. } => return,
            ChatEvent::ConnectionChanged { online } => {
                info!(online, "Connection changed");
                self.connection.set_online(*online);
            }
            ChatEvent::MessageNew { message, .. } => {
                if let Some(own) = &self.own_user_id
                    && message.is_from(own)
                    && message.is_in_main_list()
                {
                    let cid = message
                        .cid()
                        .cloned()
                        .or_else(|| event.cid().cloned());
                    if let Some(cid) = cid {
                        self.latest_dates.record(cid, message.created_at());
                    }
                }
            }
            ChatEvent::UserDeleted { user } => {
                debug!(user_id = %user.id(), "User deleted, reloading messages");
                self.requery().await;
            }
            ChatEvent::NotificationMarkUnread {
                last_read_at,
                first_unread_message_id,
                last_read_message_id,
                unread_messages,
                ..
            } => {
                self.store
                    .dispatch(ChannelAction::SetChannelUnreadUiState(Some(ChannelUnreadState {
                        last_read: *last_read_at,
                        last_read_message_id: last_read_message_id.clone(),
                        first_unread_message_id: first_unread_message_id.clone(),
                        unread_messages: *unread_messages,
                    })));
            }
            ChatEvent::ChannelTruncated { .. } => {
                self.store
                    .dispatch(ChannelAction::SetChannelUnreadUiState(None));
            }
            _ => {}
        }

        self.copy_state();
    }

    async fn requery(&self) {
        let Some(oldest) = self
            .channel
            .snapshot()
            .messages
            .first()
            .map(|m| m.id().clone())
        else {
            return;
        };
        if let Err(e) = self
            .channel
            .query(QueryOptions::older_than(oldest, self.page_size))
            .await
        {
            warn!(error = %e, "Failed to reload channel after user deletion");
        }
    }

    fn copy_state(&self) {
        let channel = Arc::clone(&self.channel);
        let store = self.store.clone();
        self.copy_throttle.call(move || {
            store.dispatch(ChannelAction::CopyStateFromChannelOnEvent(Box::new(
                channel.snapshot(),
            )));
        });
    }

    /// Drops any pending throttled copy and copies the live state now.
    pub fn flush(&self) {
        self.copy_throttle.cancel();
        self.store
            .dispatch(ChannelAction::CopyStateFromChannelOnEvent(Box::new(
                self.channel.snapshot(),
            )));
    }

    /// Handles events until the sender side closes.
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<ChatEvent>) {
        info!(cid = ?self.channel.cid(), "Event dispatcher started");
        while let Some(event) = events.recv().await {
            self.handle_event(&event).await;
        }
        info!(cid = ?self.channel.cid(), "Event dispatcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;

    use super::*;
    use crate::domain::entities::{Message, User};
    use crate::infrastructure::memory::InMemoryChannel;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0).unwrap()
    }

    fn cid() -> ChannelCid {
        ChannelCid::new("messaging", "c")
    }

    struct Fixture {
        channel: Arc<InMemoryChannel>,
        store: ChannelStore,
        connection: ConnectionStatus,
        dates: LatestMessageDates,
        dispatcher: EventDispatcher,
    }

    fn fixture(channel: InMemoryChannel) -> Fixture {
        let channel = Arc::new(channel);
        let store = ChannelStore::default();
        store.dispatch(ChannelAction::InitStateFromChannel(Box::new(channel.snapshot())));
        let connection = ConnectionStatus::default();
        let dates = LatestMessageDates::new();
        let dispatcher = EventDispatcher::new(
            channel.clone(),
            store.clone(),
            connection.clone(),
            Some(UserId::from("me")),
            dates.clone(),
            &EngineConfig::default(),
        );
        Fixture {
            channel,
            store,
            connection,
            dates,
            dispatcher,
        }
    }

    fn empty() -> InMemoryChannel {
        InMemoryChannel::new("messaging", Some("c"))
    }

    async fn deliver(f: &Fixture, event: ChatEvent) {
        f.channel.apply_event(&event);
        f.dispatcher.handle_event(&event).await;
    }

    fn new_message(id: &str, user: &str, minute: u32) -> ChatEvent {
        ChatEvent::MessageNew {
            cid: cid(),
            message: Message::new(id, Some(User::new(user)), "hi", at(minute)),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_burst_is_throttled() {
        let f = fixture(empty());

        for i in 0..10 {
            deliver(&f, new_message(&format!("m{i}"), "alice", i)).await;
        }
        assert_eq!(f.store.state().messages.len(), 1);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(f.store.state().messages.len(), 10);
    }

    #[tokio::test]
    async fn test_events_for_other_channels_are_ignored() {
        let f = fixture(empty());
        let event = ChatEvent::ChannelTruncated {
            cid: ChannelCid::new("messaging", "other"),
        };
        let mut unread = ChannelUnreadState::new(at(0));
        unread.unread_messages = 2;
        f.store
            .dispatch(ChannelAction::SetChannelUnreadUiState(Some(unread.clone())));

        f.dispatcher.handle_event(&event).await;
        f.dispatcher.handle_event(&ChatEvent::Unrecognized).await;

        assert_eq!(f.store.state().channel_unread_ui_state, Some(unread));
    }

    #[tokio::test]
    async fn test_typing_replaces_set() {
        let f = fixture(empty());

        deliver(
            &f,
            ChatEvent::TypingStart {
                cid: cid(),
                user: User::new("alice"),
                parent_id: None,
            },
        )
        .await;
        assert!(f.store.state().typing.contains_key(&UserId::from("alice")));

        deliver(
            &f,
            ChatEvent::TypingStop {
                cid: cid(),
                user: User::new("alice"),
                parent_id: None,
            },
        )
        .await;
        assert!(f.store.state().typing.is_empty());
    }

    #[tokio::test]
    async fn test_own_message_records_latest_date() {
        let f = fixture(empty());

        deliver(&f, new_message("m1", "me", 5)).await;
        deliver(&f, new_message("m0", "me", 1)).await;
        deliver(&f, new_message("m2", "alice", 9)).await;

        assert_eq!(f.dates.get(&cid()), Some(at(5)));
    }

    #[tokio::test]
    async fn test_own_thread_reply_keeps_latest_date() {
        let f = fixture(empty());
        let reply = |id: &str, minute, show_in_channel| ChatEvent::MessageNew {
            cid: cid(),
            message: Message::new(id, Some(User::new("me")), "hi", at(minute))
                .with_parent("p")
                .with_show_in_channel(show_in_channel),
        };

        deliver(&f, new_message("m1", "me", 5)).await;
        deliver(&f, reply("r1", 7, false)).await;
        assert_eq!(f.dates.get(&cid()), Some(at(5)));

        deliver(&f, reply("r2", 8, true)).await;
        assert_eq!(f.dates.get(&cid()), Some(at(8)));
    }

    #[tokio::test]
    async fn test_watching_events_skip_state_copy() {
        let f = fixture(empty());
        f.channel.apply_event(&new_message("m1", "alice", 1));

        for event in [
            ChatEvent::UserWatchingStart {
                cid: cid(),
                user: User::new("alice"),
                watcher_count: 1,
            },
            ChatEvent::UserWatchingStop {
                cid: cid(),
                user: User::new("alice"),
                watcher_count: 0,
            },
        ] {
            f.dispatcher.handle_event(&event).await;
        }

        assert!(f.store.state().messages.is_empty());
    }

    #[tokio::test]
    async fn test_connection_changed_updates_status() {
        let f = fixture(empty());

        f.dispatcher
            .handle_event(&ChatEvent::ConnectionChanged { online: false })
            .await;

        assert!(!f.connection.is_online());
    }

    #[tokio::test]
    async fn test_user_deleted_requeries() {
        let history = (0..5)
            .map(|i| Message::new(format!("m{i}"), Some(User::new("alice")), "x", at(i)))
            .collect();
        let f = fixture(empty().with_history(history, 2));

        f.dispatcher
            .handle_event(&ChatEvent::UserDeleted {
                user: User::new("bob"),
            })
            .await;

        let queries = f.channel.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].messages.id_lt, Some("m3".into()));
        assert_eq!(queries[0].messages.limit, Some(100));
        assert_eq!(f.store.state().messages.len(), 5);
    }

    #[tokio::test]
    async fn test_unread_markers_follow_events() {
        let f = fixture(empty());

        deliver(
            &f,
            ChatEvent::NotificationMarkUnread {
                cid: cid(),
                last_read_at: at(3),
                first_unread_message_id: Some("m4".into()),
                last_read_message_id: Some("m3".into()),
                unread_messages: 2,
            },
        )
        .await;
        let unread = f.store.state().channel_unread_ui_state.unwrap();
        assert_eq!(unread.first_unread_message_id, Some("m4".into()));
        assert_eq!(unread.unread_messages, 2);

        deliver(&f, ChatEvent::ChannelTruncated { cid: cid() }).await;
        assert!(f.store.state().channel_unread_ui_state.is_none());
    }

    #[tokio::test]
    async fn test_thread_root_follows_updates() {
        let root = Message::new("p", Some(User::new("alice")), "root", at(0));
        let f = fixture(empty().with_history(vec![root.clone()], 5));
        f.store.dispatch(ChannelAction::SetThread(root.clone()));

        let edited = root.clone().with_updated_at(at(2));
        deliver(
            &f,
            ChatEvent::MessageUpdated {
                cid: cid(),
                message: edited.clone(),
            },
        )
        .await;

        assert_eq!(f.store.state().thread, Some(edited));
    }

    #[tokio::test]
    async fn test_run_drains_channel() {
        let f = fixture(empty());
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(ChatEvent::ConnectionChanged { online: false }).unwrap();
        drop(tx);

        f.dispatcher.run(rx).await;
        f.dispatcher.flush();

        assert!(!f.connection.is_online());
    }
}
