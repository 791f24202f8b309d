//! Paginated channel list kept in sync with client events.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::application::services::channel_list::{append_page, prepend_channel, remove_channel};
use crate::application::services::{
    ChannelHandle, ChannelListEntry, ChannelTarget, WatchRegistry, move_channel_up,
};
use crate::domain::entities::{ChannelCid, UserCache, UserId};
use crate::domain::errors::ChatError;
use crate::domain::events::ChatEvent;
use crate::domain::ports::{ChannelQuery, ChatClientPort, I18nPort};
use crate::infrastructure::config::{ChannelListConfig, EngineConfig};

/// Ordered, de-duplicated channels plus the paging cursor.
#[derive(Clone)]
pub struct ChannelListState {
    /// Channels in display order, unique by cid.
    pub channels: Vec<ChannelHandle>,
    /// Another page can be requested.
    pub has_next_page: bool,
    /// A page request is in flight.
    pub loading: bool,
    /// Last page request failure.
    pub error: Option<String>,
}

impl Default for ChannelListState {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            has_next_page: true,
            loading: false,
            error: None,
        }
    }
}

impl std::fmt::Debug for ChannelListState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cids: Vec<_> = self.channels.iter().map(|c| c.cid()).collect();
        f.debug_struct("ChannelListState")
            .field("channels", &cids)
            .field("has_next_page", &self.has_next_page)
            .field("loading", &self.loading)
            .field("error", &self.error)
            .finish()
    }
}

/// Owns the channel list and its in-flight watch registry.
#[derive(Clone)]
pub struct ChannelListController {
    client: Arc<dyn ChatClientPort>,
    i18n: Arc<dyn I18nPort>,
    registry: WatchRegistry,
    users: UserCache,
    filter: serde_json::Value,
    page_size: usize,
    config: ChannelListConfig,
    active: Arc<Mutex<Option<ChannelHandle>>>,
    state: Arc<watch::Sender<ChannelListState>>,
}

impl ChannelListController {
    /// Creates an empty list; call [`ChannelListController::load_first_page`] to fill it.
    #[must_use]
    pub fn new(
        client: Arc<dyn ChatClientPort>,
        i18n: Arc<dyn I18nPort>,
        filter: serde_json::Value,
        config: &EngineConfig,
    ) -> Self {
        let (state, _receiver) = watch::channel(ChannelListState::default());
        Self {
            client,
            i18n,
            registry: WatchRegistry::new(),
            users: UserCache::new(),
            filter,
            page_size: config.pagination.channel_page_size,
            config: config.channel_list.clone(),
            active: Arc::new(Mutex::new(None)),
            state: Arc::new(state),
        }
    }

    /// Copy of the current list state.
    #[must_use]
    pub fn state(&self) -> ChannelListState {
        self.state.borrow().clone()
    }

    /// Receiver that wakes on every list change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ChannelListState> {
        self.state.subscribe()
    }

    /// Channels in display order.
    #[must_use]
    pub fn channels(&self) -> Vec<ChannelHandle> {
        self.state.borrow().channels.clone()
    }

    /// True until a short page is returned.
    #[must_use]
    pub fn has_next_page(&self) -> bool {
        self.state.borrow().has_next_page
    }

    /// Profiles used to annotate member rosters.
    #[must_use]
    pub const fn users(&self) -> &UserCache {
        &self.users
    }

    /// In-flight watch calls shared by list notifications.
    #[must_use]
    pub const fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    /// Channel the user has open; kept at the head when its list position moves.
    pub fn set_active_channel(&self, channel: Option<ChannelHandle>) {
        *self.active.lock() = channel;
    }

    /// Display rows for the current list.
    #[must_use]
    pub fn entries(&self) -> Vec<ChannelListEntry> {
        let own_user_id = self.client.user_id();
        self.channels()
            .into_iter()
            .map(|channel| {
                ChannelListEntry::new(channel, own_user_id.as_ref(), &self.users, self.i18n.as_ref())
            })
            .collect()
    }

    /// Replaces the list with the first page.
    ///
    /// # Errors
    ///
    /// Returns the query error after recording it in the list state.
    pub async fn load_first_page(&self) -> Result<(), ChatError> {
        info!(limit = self.page_size, "Resetting channel list");
        self.state.send_modify(|s| s.loading = true);
        let page = self.query_page(0).await?;
        self.state.send_modify(|s| {
            s.has_next_page = page.len() >= self.page_size;
            s.channels = append_page(&[], page);
            s.loading = false;
            s.error = None;
        });
        Ok(())
    }

    /// Appends the next page, if any.
    ///
    /// # Errors
    ///
    /// Returns the query error after recording it in the list state.
    pub async fn load_next_page(&self) -> Result<(), ChatError> {
        let offset = {
            let state = self.state.borrow();
            if state.loading || !state.has_next_page {
                return Ok(());
            }
            state.channels.len()
        };
        self.state.send_modify(|s| s.loading = true);
        let page = self.query_page(offset).await?;
        self.state.send_modify(|s| {
            s.has_next_page = page.len() >= self.page_size;
            s.channels = append_page(&s.channels, page);
            s.loading = false;
        });
        Ok(())
    }

    async fn query_page(&self, offset: usize) -> Result<Vec<ChannelHandle>, ChatError> {
        debug!(offset, limit = self.page_size, "Querying channels");
        let query = ChannelQuery::new(self.filter.clone(), self.page_size).with_offset(offset);
        match self.client.query_channels(query).await {
            Ok(page) => Ok(page),
            Err(e) => {
                warn!(offset, error = %e, "Failed to query channels");
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(e.to_string());
                });
                Err(e)
            }
        }
    }

    /// Applies one client event to the list.
    pub async fn handle_event(&self, event: &ChatEvent) {
        match event {
            ChatEvent::MessageNew { cid, .. } => self.on_new_message(cid),
            ChatEvent::NotificationMessageNew { cid } => {
                if self.config.allow_new_messages_from_unfiltered_channels {
                    self.fetch_and_prepend(cid, &[]).await;
                }
            }
            ChatEvent::NotificationAddedToChannel { cid, members } => {
                self.fetch_and_prepend(cid, members).await;
            }
            ChatEvent::ChannelVisible { cid } => self.fetch_and_prepend(cid, &[]).await,
            ChatEvent::NotificationRemovedFromChannel { cid }
            | ChatEvent::ChannelDeleted { cid }
            | ChatEvent::ChannelHidden { cid } => {
                debug!(cid = %cid, "Removing channel from list");
                self.state
                    .send_modify(|s| s.channels = remove_channel(&s.channels, cid));
            }
            ChatEvent::ChannelUpdated { .. } | ChatEvent::ChannelTruncated { .. } => {
                self.refresh();
            }
            ChatEvent::ConnectionRecovered => {
                if let Err(e) = self.load_first_page().await {
                    warn!(error = %e, "Failed to reload channels after reconnect");
                }
            }
            ChatEvent::UserPresenceChanged { user } | ChatEvent::UserUpdated { user } => {
                self.users.insert(user.clone());
                self.refresh();
            }
            _ => {}
        }
    }

    fn on_new_message(&self, cid: &ChannelCid) {
        let listed = self
            .state
            .borrow()
            .channels
            .iter()
            .any(|c| c.cid().as_ref() == Some(cid));

        if !listed && self.config.allow_new_messages_from_unfiltered_channels {
            let channel = self.client.channel(cid.kind(), Some(cid.id()), &[]);
            self.state
                .send_modify(|s| s.channels = prepend_channel(&s.channels, channel));
            return;
        }
        if self.config.lock_channel_order {
            return;
        }
        let active = self.active.lock().clone();
        self.state.send_modify(|s| {
            s.channels = move_channel_up(&s.channels, cid, active.as_ref());
        });
    }

    async fn fetch_and_prepend(&self, cid: &ChannelCid, members: &[UserId]) {
        let target = ChannelTarget::Lookup {
            channel_type: Some(cid.kind()),
            id: Some(cid.id()),
            members,
        };
        match self.registry.get_channel(self.client.as_ref(), target).await {
            Ok(channel) => {
                self.state
                    .send_modify(|s| s.channels = prepend_channel(&s.channels, channel));
            }
            Err(e) => warn!(cid = %cid, error = %e, "Failed to fetch channel"),
        }
    }

    // channel objects are shared; subscribers re-read them
    fn refresh(&self) {
        self.state.send_modify(|_| {});
    }

    /// Handles events until the sender side closes.
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<ChatEvent>) {
        info!("Channel list listener started");
        while let Some(event) = events.recv().await {
            self.handle_event(&event).await;
        }
        info!("Channel list listener stopped");
    }
}
