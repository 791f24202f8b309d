//! One open channel: render state plus the controllers that drive it.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::event_dispatcher::{EventDispatcher, LatestMessageDates};
use super::message_actions::MessageActions;
use super::pagination::PaginationController;
use crate::application::services::{
    GroupStyle, RenderedMessage, get_read_states, group_styles, process_messages,
};
use crate::application::state::{ChannelAction, ChannelRenderState, ChannelStore};
use crate::domain::connection::ConnectionStatus;
use crate::domain::entities::{ChannelUnreadState, Message, MessageId, User, UserId};
use crate::domain::errors::ChatError;
use crate::domain::ports::{ChannelPort, ChatClientPort, I18nPort, NotificationPort};
use crate::infrastructure::config::{EngineConfig, MessageListConfig};

/// Display-ready projection of a message list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MessageListView {
    /// Display sequence with date and unread separators.
    pub entries: Vec<RenderedMessage>,
    /// Group style per message ID.
    pub group_styles: HashMap<MessageId, GroupStyle>,
    /// Users whose latest read position is each message.
    pub read_by: HashMap<MessageId, Vec<User>>,
    /// Ephemeral giphy preview pulled out of the list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub giphy_preview: Option<Message>,
}

/// Wires the store, pagination, message actions and event dispatch for a
/// single channel.
pub struct ChannelSession {
    channel: Arc<dyn ChannelPort>,
    store: ChannelStore,
    own_user_id: Option<UserId>,
    message_list: MessageListConfig,
    page_size: usize,
    pagination: PaginationController,
    actions: MessageActions,
    dispatcher: EventDispatcher,
}

impl ChannelSession {
    /// Wires a session for `channel`. Call [`ChannelSession::initialize`] before use.
    #[must_use]
    pub fn new(
        channel: Arc<dyn ChannelPort>,
        client: Arc<dyn ChatClientPort>,
        notifier: Arc<dyn NotificationPort>,
        i18n: Arc<dyn I18nPort>,
        latest_dates: LatestMessageDates,
        config: &EngineConfig,
    ) -> Self {
        let store = ChannelStore::default();
        let connection = ConnectionStatus::default();
        let own_user_id = client.user_id();

        let pagination = PaginationController::new(
            Arc::clone(&channel),
            store.clone(),
            connection.clone(),
            Arc::clone(&notifier),
            Arc::clone(&i18n),
            config.pagination.clone(),
        );
        let actions = MessageActions::new(
            Arc::clone(&channel),
            client,
            store.clone(),
            connection.clone(),
            notifier,
            i18n,
            &config.events,
        );
        let dispatcher = EventDispatcher::new(
            Arc::clone(&channel),
            store.clone(),
            connection,
            own_user_id.clone(),
            latest_dates,
            config,
        );

        Self {
            channel,
            store,
            own_user_id,
            message_list: config.message_list.clone(),
            page_size: config.pagination.message_page_size,
            pagination,
            actions,
            dispatcher,
        }
    }

    /// Store holding the render state.
    #[must_use]
    pub const fn store(&self) -> &ChannelStore {
        &self.store
    }

    /// Copy of the current render state.
    #[must_use]
    pub fn state(&self) -> ChannelRenderState {
        self.store.state()
    }

    /// Page and jump controller.
    #[must_use]
    pub const fn pagination(&self) -> &PaginationController {
        &self.pagination
    }

    /// Send, edit, react and read-marker operations.
    #[must_use]
    pub const fn actions(&self) -> &MessageActions {
        &self.actions
    }

    /// Event dispatcher feeding the store.
    #[must_use]
    pub const fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Watches the channel if needed and seeds the render state from it.
    ///
    /// # Errors
    ///
    /// Returns the watch error. The render state keeps `loading` set and
    /// carries the error text.
    pub async fn initialize(&self) -> Result<(), ChatError> {
        if !self.channel.is_initialized()
            && let Err(e) = self.channel.watch().await
        {
            warn!(cid = ?self.channel.cid(), error = %e, "Failed to watch channel");
            self.store.dispatch(ChannelAction::SetError(e.to_string()));
            return Err(e);
        }

        let snapshot = self.channel.snapshot();
        let unread = self
            .own_user_id
            .as_ref()
            .and_then(|id| snapshot.read.get(id))
            .map(ChannelUnreadState::from_read_state);
        info!(
            cid = ?self.channel.cid(),
            messages = snapshot.messages.len(),
            "Channel initialized"
        );
        self.store
            .dispatch(ChannelAction::InitStateFromChannel(Box::new(snapshot)));
        if unread.is_some() {
            self.store
                .dispatch(ChannelAction::SetChannelUnreadUiState(unread));
        }
        Ok(())
    }

    /// Loads one page of older messages.
    pub async fn load_more(&self) -> usize {
        self.pagination.load_more(self.page_size).await
    }

    /// Loads one page of newer messages.
    pub async fn load_more_newer(&self) -> usize {
        self.pagination.load_more_newer(self.page_size).await
    }

    /// Jumps to `id` and highlights it.
    ///
    /// # Errors
    ///
    /// Returns the query error when the message could not be loaded.
    pub async fn jump_to_message(&self, id: &MessageId) -> Result<(), ChatError> {
        let highlight = self.pagination.config().highlight_duration();
        self.pagination
            .jump_to_message(id, self.page_size, highlight)
            .await
    }

    /// Jumps to and highlights the first unread message.
    pub async fn jump_to_first_unread_message(&self) {
        let highlight = self.pagination.config().highlight_duration();
        self.pagination
            .jump_to_first_unread_message(self.page_size, highlight)
            .await;
    }

    /// Returns to the newest page.
    pub async fn jump_to_latest_message(&self) {
        self.pagination.jump_to_latest_message(self.page_size).await;
    }

    /// Opens the thread rooted at `message` and loads its replies.
    pub async fn open_thread(&self, message: Message) {
        self.store.dispatch(ChannelAction::OpenThread {
            message,
            snapshot: Box::new(self.channel.snapshot()),
        });
        self.pagination.load_more_thread(self.page_size).await;
    }

    /// Closes the open thread.
    pub fn close_thread(&self) {
        self.store.dispatch(ChannelAction::CloseThread);
    }

    /// Main list, normalized for display.
    #[must_use]
    pub fn message_list(&self) -> MessageListView {
        self.store.with_state(|state| {
            self.build_view(&state.messages, state, self.message_list.enable_date_separator)
        })
    }

    /// Open thread's replies, normalized for display. Threads carry no date
    /// separators.
    #[must_use]
    pub fn thread_list(&self) -> MessageListView {
        self.store
            .with_state(|state| self.build_view(&state.thread_messages, state, false))
    }

    fn build_view(
        &self,
        messages: &[Message],
        state: &ChannelRenderState,
        enable_date_separator: bool,
    ) -> MessageListView {
        let mut options = self.message_list.process_options();
        options.enable_date_separator = enable_date_separator;
        options.user_id.clone_from(&self.own_user_id);
        options.last_read = state
            .channel_unread_ui_state
            .as_ref()
            .map(|unread| unread.last_read);

        let processed = process_messages(messages, &options);
        let group_styles = group_styles(
            &processed.messages,
            self.message_list.no_group_by_user,
            self.message_list.max_time_between_grouped_messages_ms,
        );
        MessageListView {
            read_by: get_read_states(messages, &state.read, false),
            group_styles,
            entries: processed.messages,
            giphy_preview: processed.giphy_preview,
        }
    }
}
