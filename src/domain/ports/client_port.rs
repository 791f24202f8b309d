use std::sync::Arc;

use async_trait::async_trait;

use super::ChannelPort;
use crate::domain::entities::{User, UserId};
use crate::domain::errors::ChatError;

/// Channel list query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelQuery {
    /// Opaque filter expression forwarded to the backend.
    pub filter: serde_json::Value,
    /// Opaque sort expression forwarded to the backend.
    pub sort: serde_json::Value,
    /// Maximum channels per page.
    pub limit: usize,
    /// Number of channels to skip.
    pub offset: usize,
}

impl ChannelQuery {
    /// First page of channels matching `filter`.
    #[must_use]
    pub fn new(filter: serde_json::Value, limit: usize) -> Self {
        Self {
            filter,
            sort: serde_json::Value::Null,
            limit,
            offset: 0,
        }
    }

    /// Skips the first `offset` channels.
    #[must_use]
    pub const fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// Port over the external chat client.
#[async_trait]
pub trait ChatClientPort: Send + Sync {
    /// Currently connected user.
    fn user(&self) -> Option<User>;

    /// ID of the currently connected user.
    fn user_id(&self) -> Option<UserId> {
        self.user().map(|u| u.id().clone())
    }

    /// Returns the channel object for `channel_type`/`id`, creating a local
    /// handle if needed. Distinct channels without an ID are keyed by members.
    fn channel(
        &self,
        channel_type: &str,
        id: Option<&str>,
        members: &[UserId],
    ) -> Arc<dyn ChannelPort>;

    /// Queries a page of channels.
    async fn query_channels(
        &self,
        query: ChannelQuery,
    ) -> Result<Vec<Arc<dyn ChannelPort>>, ChatError>;
}
