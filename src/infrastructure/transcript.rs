//! Recorded channel transcripts for offline replay.

use std::path::Path;
use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr, eyre};
use serde::Deserialize;
use tracing::info;

use super::memory::{DEFAULT_WATCH_LIMIT, InMemoryChannel};
use crate::domain::entities::{ChannelData, Member, Message, ReadState, User};
use crate::domain::events::ChatEvent;

/// A channel's starting state plus the events that followed it.
#[derive(Debug, Clone, Deserialize)]
pub struct Transcript {
    /// Channel type.
    #[serde(rename = "type", default = "default_channel_type")]
    pub channel_type: String,
    /// Channel ID.
    pub id: String,
    /// Viewing user.
    #[serde(default)]
    pub user: Option<User>,
    /// Channel data, including capabilities.
    #[serde(default)]
    pub data: Option<ChannelData>,
    /// Channel members.
    #[serde(default)]
    pub members: Vec<Member>,
    /// Read state per user.
    #[serde(default)]
    pub read: Vec<ReadState>,
    /// Full server-side history, in any order.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Size of the initially loaded window.
    #[serde(default = "default_window")]
    pub window: usize,
    /// Events to replay, in order.
    #[serde(default)]
    pub events: Vec<ChatEvent>,
}

fn default_channel_type() -> String {
    "messaging".to_string()
}

const fn default_window() -> usize {
    DEFAULT_WATCH_LIMIT
}

impl Transcript {
    /// Reads a transcript from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid
    /// transcript.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read transcript {}", path.display()))?;
        let transcript = Self::parse(&content)
            .wrap_err_with(|| format!("invalid transcript {}", path.display()))?;
        info!(
            path = %path.display(),
            messages = transcript.messages.len(),
            events = transcript.events.len(),
            "Loaded transcript"
        );
        Ok(transcript)
    }

    /// Parses a transcript from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the channel ID is empty.
    pub fn parse(content: &str) -> Result<Self> {
        let transcript: Self = serde_json::from_str(content)?;
        if transcript.id.is_empty() {
            return Err(eyre!("transcript channel id is empty"));
        }
        Ok(transcript)
    }

    /// Builds the in-memory channel the transcript starts from.
    #[must_use]
    pub fn channel(&self) -> Arc<InMemoryChannel> {
        let mut channel = InMemoryChannel::new(&self.channel_type, Some(&self.id))
            .with_history(self.messages.clone(), self.window)
            .with_members(self.members.clone())
            .with_read(self.read.clone());
        if let Some(data) = &self.data {
            channel = channel.with_data(data.clone());
        }
        if let Some(user) = &self.user {
            channel = channel.with_own_user(user.clone());
        }
        Arc::new(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ChannelPort;

    const SAMPLE: &str = r#"{
        "type": "messaging",
        "id": "general",
        "user": {"id": "me"},
        "messages": [
            {"id": "m2", "user": {"id": "a"}, "text": "second", "created_at": "2024-03-01T10:01:00Z"},
            {"id": "m1", "user": {"id": "a"}, "text": "first", "created_at": "2024-03-01T10:00:00Z"}
        ],
        "events": [
            {"type": "typing.start", "cid": "messaging:general", "user": {"id": "a"}},
            {"type": "poll.closed", "cid": "messaging:general"}
        ]
    }"#;

    #[test]
    fn test_parse_transcript() {
        let transcript = Transcript::parse(SAMPLE).unwrap();

        assert_eq!(transcript.channel_type, "messaging");
        assert_eq!(transcript.window, DEFAULT_WATCH_LIMIT);
        assert_eq!(transcript.events.len(), 2);
        assert_eq!(transcript.events[1], ChatEvent::Unrecognized);
    }

    #[test]
    fn test_channel_orders_history() {
        let transcript = Transcript::parse(SAMPLE).unwrap();
        let channel = transcript.channel();

        let ids: Vec<_> = channel
            .snapshot()
            .messages
            .iter()
            .map(|m| m.id().to_string())
            .collect();
        assert_eq!(ids, ["m1", "m2"]);
        assert_eq!(channel.cid().unwrap().to_string(), "messaging:general");
    }

    #[test]
    fn test_empty_id_rejected() {
        assert!(Transcript::parse(r#"{"id": ""}"#).is_err());
    }
}
