//! Ordered, de-duplicated channel list operations.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::entities::{ChannelCid, Member, Message, UserCache, UserId};
use crate::domain::ports::{ChannelPort, I18nPort};

/// Shared handle to a channel in the list.
pub type ChannelHandle = Arc<dyn ChannelPort>;

fn key(channel: &ChannelHandle) -> Option<ChannelCid> {
    channel.cid()
}

fn uniq_by_cid(channels: impl IntoIterator<Item = ChannelHandle>) -> Vec<ChannelHandle> {
    let mut seen = HashSet::new();
    channels
        .into_iter()
        .filter(|channel| key(channel).is_none_or(|cid| seen.insert(cid)))
        .collect()
}

/// Moves the channel identified by `cid` to the top.
///
/// `active` is used as the new head when it is the channel in question and
/// lets a channel that is missing from the list be inserted. The output never
/// lists a cid twice, even when nothing moves.
#[must_use]
pub fn move_channel_up(
    channels: &[ChannelHandle],
    cid: &ChannelCid,
    active: Option<&ChannelHandle>,
) -> Vec<ChannelHandle> {
    let active = active.filter(|channel| key(channel).as_ref() == Some(cid));
    let index = channels
        .iter()
        .position(|channel| key(channel).as_ref() == Some(cid));

    let head = match (active, index) {
        (None, None | Some(0)) => return uniq_by_cid(channels.iter().cloned()),
        (Some(active), _) => Arc::clone(active),
        (None, Some(index)) => Arc::clone(&channels[index]),
    };

    uniq_by_cid(std::iter::once(head).chain(channels.iter().cloned()))
}

/// Prepends `channel`, dropping any older copy of it.
#[must_use]
pub fn prepend_channel(channels: &[ChannelHandle], channel: ChannelHandle) -> Vec<ChannelHandle> {
    uniq_by_cid(std::iter::once(channel).chain(channels.iter().cloned()))
}

/// Appends a page, skipping channels already listed.
#[must_use]
pub fn append_page(channels: &[ChannelHandle], page: Vec<ChannelHandle>) -> Vec<ChannelHandle> {
    uniq_by_cid(channels.iter().cloned().chain(page))
}

/// Removes every channel matching `cid`.
#[must_use]
pub fn remove_channel(channels: &[ChannelHandle], cid: &ChannelCid) -> Vec<ChannelHandle> {
    channels
        .iter()
        .filter(|channel| key(channel).as_ref() != Some(cid))
        .cloned()
        .collect()
}

/// Channel name, or the other member's name in a two-person conversation.
#[must_use]
pub fn display_title(channel: &dyn ChannelPort, own_user_id: Option<&UserId>) -> Option<String> {
    if let Some(name) = channel.data().name.filter(|name| !name.is_empty()) {
        return Some(name);
    }

    let members = channel.snapshot().members;
    if members.len() != 2 {
        return None;
    }
    members
        .values()
        .find(|member| Some(&member.user_id) != own_user_id)
        .map(|member| member.display_name().to_string())
}

/// Preview line for the channel's latest message.
#[must_use]
pub fn latest_message_preview(messages: &[Message], i18n: &dyn I18nPort) -> String {
    let Some(latest) = messages.last() else {
        return i18n.t("Nothing yet...", &[]);
    };

    if latest.is_deleted() {
        return i18n.t("Message deleted", &[]);
    }
    if !latest.text().is_empty() {
        return latest.text().to_string();
    }
    if let Some(command) = latest.command() {
        return format!("/{command}");
    }
    if latest.has_attachments() {
        return i18n.t("🏙 Attachment...", &[]);
    }
    i18n.t("Empty message...", &[])
}

/// Display-ready channel list row.
#[derive(Clone)]
pub struct ChannelListEntry {
    /// Channel the row shows.
    pub channel: ChannelHandle,
    /// Channel name, or the other member in a direct conversation.
    pub title: Option<String>,
    /// Latest message preview text.
    pub preview: String,
    /// Members annotated with cached profiles.
    pub members: Vec<Member>,
}

impl ChannelListEntry {
    /// Builds a row, annotating members from `users`.
    #[must_use]
    pub fn new(
        channel: ChannelHandle,
        own_user_id: Option<&UserId>,
        users: &UserCache,
        i18n: &dyn I18nPort,
    ) -> Self {
        let snapshot = channel.snapshot();
        let title = display_title(channel.as_ref(), own_user_id);
        let preview = latest_message_preview(&snapshot.messages, i18n);
        let members = users.annotate(snapshot.members.into_values().collect());
        Self {
            channel,
            title,
            preview,
            members,
        }
    }

    /// Channel composite ID, if the channel has one.
    #[must_use]
    pub fn cid(&self) -> Option<ChannelCid> {
        self.channel.cid()
    }
}

impl std::fmt::Debug for ChannelListEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelListEntry")
            .field("cid", &self.cid())
            .field("title", &self.title)
            .field("preview", &self.preview)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::entities::{ChannelData, MessageKind, User};
    use crate::infrastructure::i18n::PassthroughTranslator;
    use crate::infrastructure::memory::InMemoryChannel;

    fn channel(id: &str) -> ChannelHandle {
        Arc::new(InMemoryChannel::new("messaging", Some(id)))
    }

    fn ids(channels: &[ChannelHandle]) -> Vec<String> {
        channels
            .iter()
            .filter_map(|c| c.channel_id())
            .collect()
    }

    fn cid(id: &str) -> ChannelCid {
        ChannelCid::new("messaging", id)
    }

    #[test]
    fn test_move_channel_up() {
        let list = vec![channel("a"), channel("b"), channel("c")];

        let moved = move_channel_up(&list, &cid("c"), None);
        assert_eq!(ids(&moved), ["c", "a", "b"]);

        let at_head = move_channel_up(&list, &cid("a"), None);
        assert_eq!(ids(&at_head), ["a", "b", "c"]);

        let absent = move_channel_up(&list, &cid("zzz"), None);
        assert_eq!(ids(&absent), ["a", "b", "c"]);
    }

    #[test]
    fn test_move_channel_up_noop_cases() {
        let list = vec![channel("a"), channel("b")];

        assert_eq!(ids(&move_channel_up(&list, &cid("a"), None)), ["a", "b"]);
        assert_eq!(ids(&move_channel_up(&list, &cid("zzz"), None)), ["a", "b"]);
    }

    #[test]
    fn test_move_channel_up_inserts_active_channel() {
        let list = vec![channel("a"), channel("b")];
        let active = channel("c");

        let moved = move_channel_up(&list, &cid("c"), Some(&active));

        assert_eq!(ids(&moved), ["c", "a", "b"]);
    }

    #[test]
    fn test_move_channel_up_never_duplicates() {
        let list = vec![
            channel("a"),
            channel("b"),
            channel("a"),
            channel("c"),
            channel("b"),
        ];

        let moved = move_channel_up(&list, &cid("c"), None);
        assert_eq!(ids(&moved), ["c", "a", "b"]);

        let at_head = move_channel_up(&list, &cid("a"), None);
        assert_eq!(ids(&at_head), ["a", "b", "c"]);

        let absent = move_channel_up(&list, &cid("zzz"), None);
        assert_eq!(ids(&absent), ["a", "b", "c"]);
    }

    #[test]
    fn test_prepend_append_remove() {
        let list = vec![channel("a"), channel("b")];

        let list = prepend_channel(&list, channel("b"));
        assert_eq!(ids(&list), ["b", "a"]);

        let list = append_page(&list, vec![channel("a"), channel("c")]);
        assert_eq!(ids(&list), ["b", "a", "c"]);

        let list = remove_channel(&list, &cid("a"));
        assert_eq!(ids(&list), ["b", "c"]);
    }

    #[test]
    fn test_display_title_for_direct_conversation() {
        let named = InMemoryChannel::new("messaging", Some("a"))
            .with_data(ChannelData::default().with_name("general"));
        assert_eq!(display_title(&named, None).as_deref(), Some("general"));

        let direct = InMemoryChannel::new("messaging", Some("dm")).with_members(vec![
            Member::new(User::new("me")),
            Member::new(User::new("bob").with_name("Bob")),
        ]);
        let me = UserId::from("me");
        assert_eq!(display_title(&direct, Some(&me)).as_deref(), Some("Bob"));

        let group = InMemoryChannel::new("messaging", Some("g")).with_members(vec![
            Member::new(User::new("me")),
            Member::new(User::new("bob")),
            Member::new(User::new("carol")),
        ]);
        assert_eq!(display_title(&group, Some(&me)), None);
    }

    #[test]
    fn test_latest_message_preview() {
        let i18n = PassthroughTranslator;
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();

        assert_eq!(latest_message_preview(&[], &i18n), "Nothing yet...");

        let text = Message::new("m1", None, "hello", at);
        assert_eq!(latest_message_preview(&[text], &i18n), "hello");

        let deleted = Message::new("m1", None, "hello", at).with_kind(MessageKind::Deleted);
        assert_eq!(latest_message_preview(&[deleted], &i18n), "Message deleted");

        let command = Message::new("m1", None, "", at).with_command("giphy");
        assert_eq!(latest_message_preview(&[command], &i18n), "/giphy");

        let empty = Message::new("m1", None, "", at);
        assert_eq!(latest_message_preview(&[empty], &i18n), "Empty message...");
    }
}
