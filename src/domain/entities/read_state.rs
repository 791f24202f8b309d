//! Read state entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MessageId, User};

/// Read receipt of one user in a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadState {
    /// Reading user.
    pub user: User,
    /// When the user last read the channel.
    pub last_read: DateTime<Utc>,
    /// ID of the last read message.
    #[serde(default)]
    pub last_read_message_id: Option<MessageId>,
    /// Number of unread messages.
    #[serde(default)]
    pub unread_messages: u32,
}

impl ReadState {
    /// Creates a new read state.
    #[must_use]
    pub const fn new(user: User, last_read: DateTime<Utc>) -> Self {
        Self {
            user,
            last_read,
            last_read_message_id: None,
            unread_messages: 0,
        }
    }

    /// Sets the last read message ID.
    #[must_use]
    pub fn with_last_read_message(mut self, id: impl Into<MessageId>) -> Self {
        self.last_read_message_id = Some(id.into());
        self
    }

    /// Sets the unread count.
    #[must_use]
    pub const fn with_unread_messages(mut self, count: u32) -> Self {
        self.unread_messages = count;
        self
    }
}

/// The current user's unread markers for the open channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelUnreadState {
    /// When the channel was last read.
    pub last_read: DateTime<Utc>,
    /// ID of the last read message.
    #[serde(default)]
    pub last_read_message_id: Option<MessageId>,
    /// ID of the first unread message, once resolved.
    #[serde(default)]
    pub first_unread_message_id: Option<MessageId>,
    /// Number of unread messages.
    #[serde(default)]
    pub unread_messages: u32,
}

impl ChannelUnreadState {
    /// Creates an unread state anchored at `last_read`.
    #[must_use]
    pub const fn new(last_read: DateTime<Utc>) -> Self {
        Self {
            last_read,
            last_read_message_id: None,
            first_unread_message_id: None,
            unread_messages: 0,
        }
    }

    /// Builds the state from a read receipt.
    #[must_use]
    pub fn from_read_state(read: &ReadState) -> Self {
        Self {
            last_read: read.last_read,
            last_read_message_id: read.last_read_message_id.clone(),
            first_unread_message_id: None,
            unread_messages: read.unread_messages,
        }
    }

    /// Merges a newer read marker. `last_read` never moves backward here;
    /// moving it back is reserved for an explicit mark-unread.
    #[must_use]
    pub fn advance(self, next: Self) -> Self {
        if next.last_read < self.last_read {
            self
        } else {
            next
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_advance_is_monotonic() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        let current = ChannelUnreadState::new(later);
        let stale = ChannelUnreadState::new(earlier);

        assert_eq!(current.clone().advance(stale).last_read, later);

        let fresher = ChannelUnreadState::new(later + chrono::Duration::minutes(1));
        assert!(current.advance(fresher).last_read > later);
    }
}
