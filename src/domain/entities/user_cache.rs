use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Member, User, UserId};

/// Shared cache of the freshest known user profiles.
///
/// Presence and profile events land here so channel list rosters can be
/// annotated without re-querying channels.
#[derive(Debug, Clone, Default)]
pub struct UserCache {
    inner: Arc<RwLock<HashMap<UserId, User>>>,
}

impl UserCache {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `user`, replacing any older profile.
    pub fn insert(&self, user: User) {
        self.inner.write().insert(user.id().clone(), user);
    }

    /// Cached profile for `user_id`.
    #[must_use]
    pub fn get(&self, user_id: &UserId) -> Option<User> {
        self.inner.read().get(user_id).cloned()
    }

    /// Display name of a cached user.
    #[must_use]
    pub fn get_display_name(&self, user_id: &UserId) -> Option<String> {
        self.get(user_id).map(|u| u.display_name().to_string())
    }

    /// True if `user_id` is cached.
    #[must_use]
    pub fn contains(&self, user_id: &UserId) -> bool {
        self.inner.read().contains_key(user_id)
    }

    /// Forgets `user_id`.
    pub fn remove(&self, user_id: &UserId) {
        self.inner.write().remove(user_id);
    }

    /// Replaces each member's user with the cached profile, when one exists.
    #[must_use]
    pub fn annotate(&self, members: Vec<Member>) -> Vec<Member> {
        let inner = self.inner.read();
        members
            .into_iter()
            .map(|mut member| {
                if let Some(user) = inner.get(&member.user_id) {
                    member.user = Some(user.clone());
                }
                member
            })
            .collect()
    }

    /// Number of cached profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// True when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
