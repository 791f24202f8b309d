//! User-initiated message operations with optimistic local updates.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::services::Throttle;
use crate::application::services::reactions::{has_own_reaction, reaction_preview};
use crate::application::state::{ChannelAction, ChannelStore};
use crate::domain::NotificationLevel;
use crate::domain::connection::ConnectionStatus;
use crate::domain::entities::{
    Attachment, CAPABILITY_SEND_REACTION, ChannelUnreadState, Message, MessageId, MessageStatus,
    Reaction, User,
};
use crate::domain::errors::ChatError;
use crate::domain::ports::{
    ChannelPort, ChatClientPort, I18nPort, MessageDraft, NotificationPort,
};
use crate::infrastructure::config::EventsConfig;

/// Composer output for a new message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewMessage {
    /// Message body.
    pub text: String,
    /// Uploaded attachments to send.
    pub attachments: Vec<Attachment>,
    /// Users mentioned in the text.
    pub mentioned_users: Vec<User>,
    /// Thread parent, when replying in a thread.
    pub parent_id: Option<MessageId>,
    /// Message being quoted.
    pub quoted_message: Option<Message>,
}

impl NewMessage {
    /// Plain text message.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Attaches finished uploads.
    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Sends the message as a reply in the thread of `parent_id`.
    #[must_use]
    pub fn in_thread(mut self, parent_id: impl Into<MessageId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

/// Send, edit, delete, react and read-marker operations for one channel.
///
/// Cheap to clone; clones share the same throttles.
#[derive(Clone)]
pub struct MessageActions {
    channel: Arc<dyn ChannelPort>,
    client: Arc<dyn ChatClientPort>,
    store: ChannelStore,
    connection: ConnectionStatus,
    notifier: Arc<dyn NotificationPort>,
    i18n: Arc<dyn I18nPort>,
    reaction_throttle: Arc<Throttle>,
    /// Message state before the first unsettled tap, per message and kind.
    reaction_bases: Arc<Mutex<HashMap<(MessageId, String), Message>>>,
    mark_read_throttle: Arc<Throttle>,
}

impl MessageActions {
    /// Operations on `channel`, with throttle intervals from `events`.
    #[must_use]
    pub fn new(
        channel: Arc<dyn ChannelPort>,
        client: Arc<dyn ChatClientPort>,
        store: ChannelStore,
        connection: ConnectionStatus,
        notifier: Arc<dyn NotificationPort>,
        i18n: Arc<dyn I18nPort>,
        events: &EventsConfig,
    ) -> Self {
        Self {
            channel,
            client,
            store,
            connection,
            notifier,
            i18n,
            reaction_throttle: Arc::new(Throttle::leading_trailing(events.reaction_throttle())),
            reaction_bases: Arc::new(Mutex::new(HashMap::new())),
            mark_read_throttle: Arc::new(Throttle::leading_only(events.mark_read_throttle())),
        }
    }

    fn notify(&self, key: &str, level: NotificationLevel) {
        self.notifier.notify(&self.i18n.t(key, &[]), level);
    }

    /// Writes `message` into the live state and copies the message lists
    /// into the render state.
    pub fn update_message(&self, message: Message, timestamp_changed: bool) {
        let parent_id = self
            .store
            .with_state(|s| s.thread.is_some())
            .then(|| message.parent_id().cloned())
            .flatten();
        self.channel.add_message_sorted(message, timestamp_changed);
        self.store.dispatch(ChannelAction::CopyMessagesFromChannel {
            snapshot: Box::new(self.channel.snapshot()),
            parent_id,
        });
    }

    /// Removes a message from local state only.
    pub fn remove_message(&self, id: &MessageId) {
        let parent_id = self.store.with_state(|s| s.thread.as_ref().map(|t| t.id().clone()));
        self.channel.remove_message(id);
        self.store.dispatch(ChannelAction::CopyMessagesFromChannel {
            snapshot: Box::new(self.channel.snapshot()),
            parent_id,
        });
    }

    /// Shows a `Sending` preview right away, then sends it.
    ///
    /// Returns the message as it was left in local state.
    pub async fn send_message(&self, input: NewMessage) -> Message {
        self.channel.filter_error_messages();

        let user = self.client.user();
        let user_id = user.as_ref().map_or_else(String::new, |u| u.id().to_string());
        let id = format!("{user_id}-{}", Uuid::new_v4());

        let mut preview = Message::new(id, user, input.text, Utc::now())
            .with_status(MessageStatus::Sending)
            .with_attachments(input.attachments)
            .with_mentioned_users(input.mentioned_users);
        if let Some(parent_id) = input.parent_id {
            preview = preview.with_parent(parent_id);
        }
        if let Some(quoted) = input.quoted_message {
            preview = preview.with_quoted_message(quoted);
        }
        if let Some(cid) = self.channel.cid() {
            preview = preview.with_cid(cid);
        }

        debug!(message_id = %preview.id(), "Sending message");
        self.update_message(preview.clone(), false);
        self.do_send_message(preview).await
    }

    /// Resends a failed message under the same ID.
    pub async fn retry_send_message(&self, message: &Message) -> Message {
        let attachments: Vec<Attachment> = message
            .attachments()
            .iter()
            .filter(|a| !a.is_scraped())
            .cloned()
            .collect();
        let message = message.clone().into_sending().with_attachments(attachments);

        debug!(message_id = %message.id(), "Retrying message");
        self.update_message(message.clone(), false);
        self.do_send_message(message).await
    }

    async fn do_send_message(&self, message: Message) -> Message {
        let draft = MessageDraft::from_message(&message);
        match self.channel.send_message(draft).await {
            Ok(response) => {
                let existing = self
                    .channel
                    .snapshot()
                    .messages
                    .into_iter()
                    .rev()
                    .find(|m| m.id() == message.id());
                let existing_at = existing.as_ref().and_then(Message::updated_at);
                let response_is_newest = response.updated_at() > existing_at;
                let still_sending =
                    existing.as_ref().is_some_and(|m| m.status() == MessageStatus::Sending);

                if response_is_newest || still_sending {
                    let confirmed = response.into_received();
                    self.update_message(confirmed.clone(), false);
                    confirmed
                } else {
                    debug!(message_id = %message.id(), "Keeping newer local copy");
                    existing.unwrap_or(response)
                }
            }
            Err(e) if e.is_duplicate_message() => {
                debug!(message_id = %message.id(), "Message already exists, treating as sent");
                let received = message.into_received();
                self.update_message(received.clone(), false);
                received
            }
            Err(e) => {
                warn!(message_id = %message.id(), error = %e, "Failed to send message");
                let failed = message.into_failed(e.to_string());
                self.update_message(failed.clone(), false);
                failed
            }
        }
    }

    /// Saves an edited message.
    ///
    /// # Errors
    ///
    /// Returns the update error; the local copy is flagged `Failed`.
    pub async fn edit_message(&self, message: &Message) -> Result<Message, ChatError> {
        debug!(message_id = %message.id(), "Editing message");
        match self.channel.update_message(message).await {
            Ok(updated) => {
                self.update_message(updated.clone(), false);
                Ok(updated)
            }
            Err(e) => {
                warn!(message_id = %message.id(), error = %e, "Failed to edit message");
                self.update_message(message.clone().into_failed(e.to_string()), false);
                Err(e)
            }
        }
    }

    /// Deletes a message on the server.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::MissingIdentifier`] when the message has no ID.
    /// Server failures are reported through a notification instead.
    pub async fn delete_message(&self, message: &Message) -> Result<(), ChatError> {
        if message.id().is_empty() {
            return Err(ChatError::missing_identifier("Message id is missing"));
        }
        match self.channel.delete_message(message.id()).await {
            Ok(deleted) => self.update_message(deleted, false),
            Err(e) => {
                warn!(message_id = %message.id(), error = %e, "Failed to delete message");
                self.notify("Error deleting message", NotificationLevel::Error);
            }
        }
        Ok(())
    }

    /// Toggles the current user's `kind` reaction on `message`.
    ///
    /// Each tap updates local state right away. Server requests are
    /// throttled, and each settle sends only the net change since the last
    /// one, so an even number of taps sends nothing.
    pub fn handle_reaction(&self, message: &Message, kind: &str) {
        if !self.can_react() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No runtime available for reaction toggle");
            return;
        };

        let current = self
            .store
            .with_state(|s| s.find_message(message.id()).cloned())
            .unwrap_or_else(|| message.clone());
        self.reaction_bases
            .lock()
            .entry((current.id().clone(), kind.to_string()))
            .or_insert_with(|| current.clone());
        self.apply_reaction_preview(&current, kind, !has_own_reaction(&current, kind));

        let actions = self.clone();
        self.reaction_throttle.call(move || {
            runtime.spawn(async move {
                actions.settle_reactions().await;
            });
        });
    }

    /// Sends the net change of every unsettled reaction.
    async fn settle_reactions(&self) {
        let pending: Vec<_> = self.reaction_bases.lock().drain().collect();
        for ((id, kind), base) in pending {
            let Some(wanted) = self
                .store
                .with_state(|s| s.find_message(&id).map(|m| has_own_reaction(m, &kind)))
            else {
                continue;
            };
            if wanted == has_own_reaction(&base, &kind) {
                debug!(message_id = %id, reaction = %kind, "Reaction taps cancelled out");
                continue;
            }
            self.settle_reaction(&base, &kind, wanted).await;
        }
    }

    /// Applies the optimistic reaction delta, then settles it with the
    /// server. On failure the message is restored exactly as it was.
    pub async fn toggle_reaction(&self, message: &Message, kind: &str, add: bool) {
        if !self.can_react() {
            return;
        }
        self.apply_reaction_preview(message, kind, add);
        self.settle_reaction(message, kind, add).await;
    }

    fn can_react(&self) -> bool {
        if self.channel.data().can(CAPABILITY_SEND_REACTION) {
            return true;
        }
        self.notify("You are not allowed to react to messages", NotificationLevel::Error);
        false
    }

    fn apply_reaction_preview(&self, message: &Message, kind: &str, add: bool) {
        let reaction = Reaction::new(kind, message.id().clone(), self.client.user());
        self.update_message(reaction_preview(message, &reaction, add, Utc::now()), false);
    }

    /// Sends one reaction change. `base` is the state restored on failure.
    async fn settle_reaction(&self, base: &Message, kind: &str, add: bool) {
        let result = if add {
            self.channel.send_reaction(base.id(), kind).await
        } else {
            self.channel.delete_reaction(base.id(), kind).await
        };

        let key = (base.id().clone(), kind.to_string());
        match result {
            // newer taps keep their preview until they settle
            Ok(updated) if !self.reaction_bases.lock().contains_key(&key) => {
                self.update_message(updated, false);
            }
            Ok(_) => {}
            Err(e) => {
                warn!(message_id = %base.id(), reaction = kind, error = %e, "Reaction failed, rolling back");
                self.reaction_bases.lock().remove(&key);
                self.update_message(base.clone(), false);
            }
        }
    }

    /// Marks the channel read. Calls inside the throttle window are dropped.
    pub fn mark_read(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let actions = self.clone();
        self.mark_read_throttle.call(move || {
            runtime.spawn(async move {
                actions.mark_read_now().await;
            });
        });
    }

    /// Marks the channel read without throttling.
    pub async fn mark_read_now(&self) {
        if !self.connection.is_online() || self.channel.is_disconnected() {
            debug!("Disconnected, skipping mark read");
            return;
        }
        if !self.channel.data().read_events {
            return;
        }

        match self.channel.mark_read().await {
            Ok(response) => {
                let current = self.store.with_state(|s| s.channel_unread_ui_state.clone());
                let mut next = ChannelUnreadState::new(Utc::now());
                next.last_read_message_id = response.last_read_message_id;
                let next = match current {
                    Some(current) => current.advance(next),
                    None => next,
                };
                self.store
                    .dispatch(ChannelAction::SetChannelUnreadUiState(Some(next)));
            }
            Err(e) => warn!(error = %e, "Failed to mark channel read"),
        }
    }

    /// Marks the channel unread from `message_id` onwards.
    pub async fn mark_unread(&self, message_id: &MessageId) {
        match self.channel.mark_unread(message_id).await {
            Ok(()) => {
                info!(message_id = %message_id, "Marked channel unread");
                self.notify("Message marked as unread", NotificationLevel::Success);
            }
            Err(e) => {
                warn!(message_id = %message_id, error = %e, "Failed to mark unread");
                self.notify(
                    "Error marking message unread. Cannot mark unread messages older than the newest 100 channel messages.",
                    NotificationLevel::Error,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{DateTime, TimeZone};

    use super::*;
    use crate::domain::entities::ChannelData;
    use crate::domain::ports::mocks::RecordingNotifier;
    use crate::infrastructure::i18n::PassthroughTranslator;
    use crate::infrastructure::memory::{InMemoryChannel, InMemoryClient, Operation};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0).unwrap()
    }

    struct Fixture {
        channel: Arc<InMemoryChannel>,
        store: ChannelStore,
        notifier: RecordingNotifier,
        actions: MessageActions,
    }

    fn fixture(channel: InMemoryChannel) -> Fixture {
        let me = User::new("me");
        let channel = Arc::new(
            channel
                .with_own_user(me.clone())
                .with_data(ChannelData::default().with_capability(CAPABILITY_SEND_REACTION)),
        );
        let client = Arc::new(InMemoryClient::new(Some(me)));
        let store = ChannelStore::default();
        store.dispatch(ChannelAction::InitStateFromChannel(Box::new(channel.snapshot())));
        let notifier = RecordingNotifier::new();
        let actions = MessageActions::new(
            channel.clone(),
            client,
            store.clone(),
            ConnectionStatus::default(),
            Arc::new(notifier.clone()),
            Arc::new(PassthroughTranslator),
            &EventsConfig::default(),
        );
        Fixture {
            channel,
            store,
            notifier,
            actions,
        }
    }

    fn existing() -> Message {
        Message::new("m1", Some(User::new("alice")), "hello", at(0))
    }

    fn channel_with(messages: Vec<Message>) -> InMemoryChannel {
        InMemoryChannel::new("messaging", Some("c")).with_history(messages, 10)
    }

    #[tokio::test]
    async fn test_send_message_confirms_preview() {
        let f = fixture(channel_with(vec![existing()]));

        let sent = f.actions.send_message(NewMessage::text("hi there")).await;

        assert_eq!(sent.status(), MessageStatus::Received);
        assert!(sent.id().as_str().starts_with("me-"));
        let state = f.store.state();
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[1].id(), sent.id());
        assert_eq!(f.channel.sent_drafts().len(), 1);
    }

    #[tokio::test]
    async fn test_send_failure_marks_failed_in_place() {
        let f = fixture(channel_with(vec![]));
        f.channel
            .fail_next(Operation::SendMessage, ChatError::server(17, "not allowed"));

        let failed = f.actions.send_message(NewMessage::text("oops")).await;

        assert_eq!(failed.status(), MessageStatus::Failed);
        let state = f.store.state();
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].status(), MessageStatus::Failed);
    }

    #[tokio::test]
    async fn test_duplicate_send_is_received() {
        let f = fixture(channel_with(vec![]));
        f.channel.fail_next(
            Operation::SendMessage,
            ChatError::server(4, "message with id me-1 already exists"),
        );

        let sent = f.actions.send_message(NewMessage::text("again")).await;

        assert_eq!(sent.status(), MessageStatus::Received);
        assert_eq!(f.store.state().messages[0].status(), MessageStatus::Received);
    }

    #[tokio::test]
    async fn test_retry_strips_scraped_attachments() {
        let f = fixture(channel_with(vec![]));
        f.channel
            .fail_next(Operation::SendMessage, ChatError::network("offline"));
        let input = NewMessage::text("see https://example.com").with_attachments(vec![
            Attachment::new("image").with_image_url("https://cdn/x.png"),
            Attachment::new("image").with_og_scrape_url("https://example.com"),
        ]);
        let failed = f.actions.send_message(input).await;

        let retried = f.actions.retry_send_message(&failed).await;

        assert_eq!(retried.id(), failed.id());
        assert_eq!(retried.status(), MessageStatus::Received);
        let drafts = f.channel.sent_drafts();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].attachments.len(), 1);
        assert_eq!(f.store.state().messages.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_send_response_does_not_clobber() {
        let f = fixture(channel_with(vec![]));
        let pending = Message::new("me-1", Some(User::new("me")), "v1", at(0))
            .with_status(MessageStatus::Sending);
        // message.updated arrived before the send response
        let pushed = Message::new("me-1", Some(User::new("me")), "v2", at(0))
            .with_updated_at(Utc::now() + chrono::Duration::hours(1));
        f.channel.add_message_sorted(pushed.clone(), false);

        let result = f.actions.do_send_message(pending).await;

        assert_eq!(result, pushed);
        assert_eq!(f.channel.snapshot().messages[0].text(), "v2");
    }

    #[tokio::test]
    async fn test_reaction_failure_restores_exact_groups() {
        let mut groups = std::collections::BTreeMap::new();
        groups.insert(
            "like".to_string(),
            crate::domain::entities::ReactionGroup::single(at(0)),
        );
        let message = existing().with_reactions(groups.clone(), Vec::new(), Vec::new());
        let f = fixture(channel_with(vec![message.clone()]));
        f.channel
            .fail_next(Operation::SendReaction, ChatError::network("down"));

        f.actions.toggle_reaction(&message, "like", true).await;

        let state = f.store.state();
        assert_eq!(state.messages[0].reaction_groups(), &groups);
        assert_eq!(state.messages[0], message);
    }

    #[tokio::test]
    async fn test_reaction_success_keeps_server_copy() {
        let f = fixture(channel_with(vec![existing()]));

        f.actions.toggle_reaction(&existing(), "love", true).await;

        let state = f.store.state();
        assert_eq!(state.messages[0].reaction_groups()["love"].count, 1);
        assert_eq!(state.messages[0].own_reactions().len(), 1);
    }

    #[tokio::test]
    async fn test_reaction_without_capability_is_denied() {
        let f = fixture(channel_with(vec![existing()]));
        f.channel.set_data(ChannelData::default());

        f.actions.toggle_reaction(&existing(), "like", true).await;

        assert_eq!(f.notifier.count(), 1);
        assert!(!f.store.state().messages[0].has_reactions());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_reaction_taps_settle_to_one_reaction() {
        let f = fixture(channel_with(vec![existing()]));

        for _ in 0..5 {
            f.actions.handle_reaction(&existing(), "like");
        }
        assert_eq!(f.store.state().messages[0].reaction_groups()["like"].count, 1);
        tokio::time::sleep(Duration::from_millis(1100)).await;

        let settled = f.store.state().messages[0].clone();
        assert_eq!(settled.reaction_groups()["like"].count, 1);
        assert_eq!(settled.own_reactions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_even_reaction_taps_leave_message_untouched() {
        let f = fixture(channel_with(vec![existing()]));

        for _ in 0..4 {
            f.actions.handle_reaction(&existing(), "like");
        }
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(f.store.state().messages[0], existing());
        assert_eq!(f.notifier.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_reaction_settle_restores_message() {
        let f = fixture(channel_with(vec![existing()]));
        f.channel
            .fail_next(Operation::SendReaction, ChatError::network("down"));

        f.actions.handle_reaction(&existing(), "like");
        assert!(f.store.state().messages[0].has_reactions());
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(f.store.state().messages[0], existing());
    }

    #[tokio::test]
    async fn test_delete_without_id_is_rejected() {
        let f = fixture(channel_with(vec![]));
        let message = Message::new("", None, "x", at(0));

        let err = f.actions.delete_message(&message).await.unwrap_err();

        assert!(matches!(err, ChatError::MissingIdentifier(_)));
    }

    #[tokio::test]
    async fn test_delete_failure_notifies() {
        let f = fixture(channel_with(vec![existing()]));
        f.channel
            .fail_next(Operation::DeleteMessage, ChatError::network("down"));

        f.actions.delete_message(&existing()).await.unwrap();

        assert_eq!(f.notifier.texts(), ["Error deleting message"]);
        assert!(!f.store.state().messages[0].is_deleted());
    }

    #[tokio::test]
    async fn test_remove_message_is_local() {
        let f = fixture(channel_with(vec![existing()]));

        f.actions.remove_message(existing().id());

        assert!(f.store.state().messages.is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_skipped_when_disconnected() {
        let f = fixture(channel_with(vec![existing()]));
        f.channel.set_disconnected(true);

        f.actions.mark_read_now().await;

        assert!(f.store.state().channel_unread_ui_state.is_none());
    }

    #[tokio::test]
    async fn test_mark_read_sets_unread_state() {
        let f = fixture(channel_with(vec![existing()]));

        f.actions.mark_read_now().await;

        let unread = f.store.state().channel_unread_ui_state.unwrap();
        assert_eq!(unread.last_read_message_id, Some("m1".into()));
        assert_eq!(unread.unread_messages, 0);
    }

    #[tokio::test]
    async fn test_mark_unread_notifies_outcome() {
        let f = fixture(channel_with(vec![existing()]));

        f.actions.mark_unread(&"m1".into()).await;
        f.channel
            .fail_next(Operation::MarkUnread, ChatError::network("down"));
        f.actions.mark_unread(&"m1".into()).await;

        assert_eq!(f.channel.unread_marks(), vec![MessageId::from("m1")]);
        assert_eq!(f.notifier.count(), 2);
        assert_eq!(f.notifier.texts()[0], "Message marked as unread");
    }
}
