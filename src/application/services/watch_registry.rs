//! Keyed registry of in-flight `watch` calls.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tracing::debug;

use crate::domain::entities::{UserId, temp_channel_key};
use crate::domain::errors::ChatError;
use crate::domain::ports::{ChannelPort, ChatClientPort};

type WatchFuture = Shared<BoxFuture<'static, Result<(), ChatError>>>;

/// Channel to resolve through [`WatchRegistry::get_channel`].
pub enum ChannelTarget<'a> {
    /// A channel object the caller already holds.
    Existing(Arc<dyn ChannelPort>),
    /// A channel to look up on the client.
    Lookup {
        /// Channel type; required.
        channel_type: Option<&'a str>,
        /// Channel ID, when the channel has one.
        id: Option<&'a str>,
        /// Members of a channel created without an ID.
        members: &'a [UserId],
    },
}

/// Collapses concurrent `watch` calls for the same logical channel into one.
///
/// Scoped to whichever controller owns the channel lifecycle; entries are
/// removed as soon as the shared call settles.
#[derive(Clone, Default)]
pub struct WatchRegistry {
    in_flight: Arc<Mutex<HashMap<String, WatchFuture>>>,
}

struct InFlightGuard {
    in_flight: Arc<Mutex<HashMap<String, WatchFuture>>>,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}

impl WatchRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of watch calls currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Resolves `target` and makes sure it has been watched.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::MissingIdentifier`] when neither a channel nor a
    /// channel type is given, or when the channel has neither an ID nor
    /// members. Otherwise returns the shared watch error, if any.
    pub async fn get_channel(
        &self,
        client: &dyn ChatClientPort,
        target: ChannelTarget<'_>,
    ) -> Result<Arc<dyn ChannelPort>, ChatError> {
        let channel = match target {
            ChannelTarget::Existing(channel) => channel,
            ChannelTarget::Lookup {
                channel_type,
                id,
                members,
            } => {
                let Some(channel_type) = channel_type else {
                    return Err(ChatError::missing_identifier(
                        "Channel or channel type have to be provided to query a channel.",
                    ));
                };
                client.channel(channel_type, id, members)
            }
        };

        let key = match channel.cid() {
            Some(cid) => cid.to_string(),
            None => temp_channel_key(&channel.channel_type(), &channel.member_ids()).ok_or_else(
                || {
                    ChatError::missing_identifier(
                        "Channel ID or channel members array have to be provided to query a channel.",
                    )
                },
            )?,
        };

        let (watch, guard) = {
            let mut in_flight = self.in_flight.lock();
            if let Some(existing) = in_flight.get(&key) {
                debug!(key = %key, "Joining in-flight watch");
                (existing.clone(), None)
            } else {
                let target = Arc::clone(&channel);
                let watch = async move { target.watch().await.map(|_| ()) }
                    .boxed()
                    .shared();
                in_flight.insert(key.clone(), watch.clone());
                let guard = InFlightGuard {
                    in_flight: Arc::clone(&self.in_flight),
                    key,
                };
                (watch, Some(guard))
            }
        };

        let result = watch.await;
        drop(guard);
        result.map(|()| channel)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::infrastructure::memory::{InMemoryChannel, InMemoryClient};

    fn client() -> InMemoryClient {
        InMemoryClient::new(None).with_watch_delay(Duration::from_millis(50))
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_watches_collapse() {
        let client = client();
        let registry = WatchRegistry::new();

        let lookup = || ChannelTarget::Lookup {
            channel_type: Some("messaging"),
            id: Some("general"),
            members: &[],
        };
        let (first, second) = tokio::join!(
            registry.get_channel(&client, lookup()),
            registry.get_channel(&client, lookup()),
        );

        let first = first.unwrap();
        let second = second.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(client.watch_count("messaging:general"), 1);
        assert_eq!(registry.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_channels_keyed_by_members() {
        let client = client();
        let registry = WatchRegistry::new();
        let members = [UserId::from("b"), UserId::from("a")];
        let reversed = [UserId::from("a"), UserId::from("b")];

        let (first, second) = tokio::join!(
            registry.get_channel(
                &client,
                ChannelTarget::Lookup {
                    channel_type: Some("messaging"),
                    id: None,
                    members: &members,
                },
            ),
            registry.get_channel(
                &client,
                ChannelTarget::Lookup {
                    channel_type: Some("messaging"),
                    id: None,
                    members: &reversed,
                },
            ),
        );

        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(client.watch_count("messaging:!members-a,b"), 1);
    }

    #[tokio::test]
    async fn test_missing_identifiers() {
        let client = InMemoryClient::new(None);
        let registry = WatchRegistry::new();

        let err = registry
            .get_channel(
                &client,
                ChannelTarget::Lookup {
                    channel_type: None,
                    id: Some("general"),
                    members: &[],
                },
            )
            .await
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "Channel or channel type have to be provided to query a channel."
        );

        let err = registry
            .get_channel(
                &client,
                ChannelTarget::Lookup {
                    channel_type: Some("messaging"),
                    id: None,
                    members: &[],
                },
            )
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ChatError::MissingIdentifier(_)));
    }

    #[tokio::test]
    async fn test_failed_watch_is_cleared() {
        let channel = Arc::new(InMemoryChannel::new("messaging", Some("general")));
        channel.fail_next_watch(ChatError::network("socket closed"));
        let client = InMemoryClient::new(None);
        let registry = WatchRegistry::new();

        let result = registry
            .get_channel(&client, ChannelTarget::Existing(channel.clone()))
            .await;
        assert!(matches!(result, Err(ChatError::Network { .. })));
        assert_eq!(registry.in_flight(), 0);

        let retry = registry
            .get_channel(&client, ChannelTarget::Existing(channel.clone()))
            .await;
        assert!(retry.is_ok());
        assert_eq!(channel.watch_count(), 2);
    }
}
