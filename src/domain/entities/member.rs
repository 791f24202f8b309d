use serde::{Deserialize, Serialize};

use super::{User, UserId};

/// Channel member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    /// Member user ID.
    pub user_id: UserId,
    /// Profile, when the server sent one.
    #[serde(default)]
    pub user: Option<User>,
    /// Channel role, e.g. `owner` or `moderator`.
    #[serde(default)]
    pub role: Option<String>,
}

impl Member {
    /// Member without a role.
    #[must_use]
    pub fn new(user: User) -> Self {
        Self {
            user_id: user.id().clone(),
            user: Some(user),
            role: None,
        }
    }

    /// Sets the channel role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Display name of the member, falling back to the user ID.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.user
            .as_ref()
            .map_or(self.user_id.as_str(), User::display_name)
    }
}
