use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::InMemoryChannel;
use crate::domain::entities::{User, UserId, temp_channel_key};
use crate::domain::errors::ChatError;
use crate::domain::ports::{ChannelPort, ChannelQuery, ChatClientPort};

/// Client adapter caching channel objects by key, as the SDK does.
pub struct InMemoryClient {
    user: Option<User>,
    watch_delay: Option<Duration>,
    channels: RwLock<HashMap<String, Arc<InMemoryChannel>>>,
    /// Server-side channel list returned by `query_channels`, in order.
    server_channels: RwLock<Vec<Arc<InMemoryChannel>>>,
    channel_queries: RwLock<Vec<ChannelQuery>>,
    query_failures: RwLock<Vec<ChatError>>,
}

impl InMemoryClient {
    /// Client logged in as `user`.
    #[must_use]
    pub fn new(user: Option<User>) -> Self {
        Self {
            user,
            watch_delay: None,
            channels: RwLock::new(HashMap::new()),
            server_channels: RwLock::new(Vec::new()),
            channel_queries: RwLock::new(Vec::new()),
            query_failures: RwLock::new(Vec::new()),
        }
    }

    /// Delay applied to `watch` on channels this client creates.
    #[must_use]
    pub const fn with_watch_delay(mut self, delay: Duration) -> Self {
        self.watch_delay = Some(delay);
        self
    }

    fn key(channel_type: &str, id: Option<&str>, members: &[UserId]) -> String {
        id.map(|id| format!("{channel_type}:{id}"))
            .or_else(|| temp_channel_key(channel_type, members))
            .unwrap_or_else(|| format!("{channel_type}:"))
    }

    /// Registers an already built channel so lookups return it.
    pub fn insert_channel(&self, channel: Arc<InMemoryChannel>) {
        let key = Self::key(
            &channel.channel_type(),
            channel.channel_id().as_deref(),
            &channel.member_ids(),
        );
        self.channels.write().insert(key, channel);
    }

    /// Channels `query_channels` pages through, in server order.
    pub fn set_server_channels(&self, channels: Vec<Arc<InMemoryChannel>>) {
        for channel in &channels {
            self.insert_channel(Arc::clone(channel));
        }
        *self.server_channels.write() = channels;
    }

    /// Fails the next `query_channels` call.
    pub fn fail_next_query(&self, error: ChatError) {
        self.query_failures.write().push(error);
    }

    /// Returns the cached channel stored under `key`.
    #[must_use]
    pub fn channel_handle(&self, key: &str) -> Option<Arc<InMemoryChannel>> {
        self.channels.read().get(key).cloned()
    }

    /// Number of `watch` calls made on the channel stored under `key`.
    #[must_use]
    pub fn watch_count(&self, key: &str) -> usize {
        self.channel_handle(key).map_or(0, |c| c.watch_count())
    }

    /// Channel list queries issued so far.
    #[must_use]
    pub fn channel_queries(&self) -> Vec<ChannelQuery> {
        self.channel_queries.read().clone()
    }
}

#[async_trait]
impl ChatClientPort for InMemoryClient {
    fn user(&self) -> Option<User> {
        self.user.clone()
    }

    fn channel(
        &self,
        channel_type: &str,
        id: Option<&str>,
        members: &[UserId],
    ) -> Arc<dyn ChannelPort> {
        let key = Self::key(channel_type, id, members);
        let mut channels = self.channels.write();
        let channel = channels.entry(key).or_insert_with(|| {
            let mut channel =
                InMemoryChannel::new(channel_type, id).with_member_ids(members.to_vec());
            if let Some(user) = &self.user {
                channel = channel.with_own_user(user.clone());
            }
            if let Some(delay) = self.watch_delay {
                channel = channel.with_watch_delay(delay);
            }
            Arc::new(channel)
        });
        Arc::clone(channel) as Arc<dyn ChannelPort>
    }

    async fn query_channels(
        &self,
        query: ChannelQuery,
    ) -> Result<Vec<Arc<dyn ChannelPort>>, ChatError> {
        self.channel_queries.write().push(query.clone());
        if let Some(error) = self.query_failures.write().pop() {
            return Err(error);
        }

        let page: Vec<Arc<dyn ChannelPort>> = self
            .server_channels
            .read()
            .iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|c| Arc::clone(c) as Arc<dyn ChannelPort>)
            .collect();
        debug!(
            offset = query.offset,
            limit = query.limit,
            returned = page.len(),
            "Queried channels"
        );
        Ok(page)
    }
}
