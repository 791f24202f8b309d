//! Display preparation for message lists.
//!
//! Everything here is a pure function over borrowed messages: date separators
//! and the unread marker, visual grouping, read attribution and the intro
//! header.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, SecondsFormat, Utc};
use serde::Serialize;

use crate::domain::entities::{Message, MessageId, MessageKind, ReadState, User, UserId};

/// Entry of a display-ready message sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "custom_type", rename_all = "snake_case")]
pub enum RenderedMessage {
    /// A real message.
    Message(Box<Message>),
    /// Synthetic day boundary. `unread` marks the first unread message.
    #[serde(rename = "message.date")]
    DateSeparator {
        /// Derived from the date; stable across recomputations.
        id: String,
        /// Creation time of the message that follows.
        date: DateTime<Utc>,
        /// Set when the next message is the first unread one.
        unread: bool,
    },
    /// Channel intro header.
    #[serde(rename = "channel.intro")]
    Intro,
}

impl RenderedMessage {
    fn date_separator(date: DateTime<Utc>, unread: bool) -> Self {
        Self::DateSeparator {
            id: date_separator_id(date),
            date,
            unread,
        }
    }

    /// The wrapped message, unless this is a synthetic entry.
    #[must_use]
    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Self::Message(message) => Some(message),
            _ => None,
        }
    }

    /// True for date separators, unread or not.
    #[must_use]
    pub const fn is_date_separator(&self) -> bool {
        matches!(self, Self::DateSeparator { .. })
    }

    /// Timestamp used for ordering; `None` for the intro header.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Message(message) => Some(message.created_at()),
            Self::DateSeparator { date, .. } => Some(*date),
            Self::Intro => None,
        }
    }
}

/// Derived ID of the separator for `date`.
#[must_use]
pub fn date_separator_id(date: DateTime<Utc>) -> String {
    format!(
        "message.date-{}",
        date.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Options for [`process_messages`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessMessagesOptions {
    /// Insert a separator at each calendar day change.
    pub enable_date_separator: bool,
    /// Drop messages of kind `deleted`.
    pub hide_deleted_messages: bool,
    /// Skip the unread separator.
    pub hide_new_message_separator: bool,
    /// When the viewing user last read the channel.
    pub last_read: Option<DateTime<Utc>>,
    /// The viewing user.
    pub user_id: Option<UserId>,
    /// Route ephemeral giphy previews out of the list.
    pub separate_giphy_preview: bool,
    /// Offset used to decide calendar days.
    pub offset: FixedOffset,
}

impl Default for ProcessMessagesOptions {
    fn default() -> Self {
        Self {
            enable_date_separator: true,
            hide_deleted_messages: false,
            hide_new_message_separator: false,
            last_read: None,
            user_id: None,
            separate_giphy_preview: true,
            offset: Utc.fix(),
        }
    }
}

/// Result of [`process_messages`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedMessages {
    /// Display sequence, including synthetic entries.
    pub messages: Vec<RenderedMessage>,
    /// Latest giphy preview pulled out of the list, if any.
    pub giphy_preview: Option<Message>,
}

fn calendar_date(at: DateTime<Utc>, offset: &FixedOffset) -> NaiveDate {
    at.with_timezone(offset).date_naive()
}

/// Turns a chronological message list into a display sequence.
///
/// Single left-to-right pass. Never two separators back to back; the input is
/// left untouched.
#[must_use]
pub fn process_messages(messages: &[Message], options: &ProcessMessagesOptions) -> ProcessedMessages {
    let mut output = Vec::with_capacity(messages.len() + 2);
    let mut giphy_preview = None;
    let mut unread_marked = false;
    let mut last_rendered_date: Option<NaiveDate> = None;

    let show_unread_separator =
        options.enable_date_separator && !options.hide_new_message_separator;

    for message in messages {
        if options.hide_deleted_messages && message.kind() == MessageKind::Deleted {
            continue;
        }

        if options.separate_giphy_preview && message.is_giphy_preview() {
            giphy_preview = Some(message.clone());
            continue;
        }

        let created_at = message.created_at();
        let own = options
            .user_id
            .as_ref()
            .is_some_and(|user_id| message.is_from(user_id));

        if !unread_marked
            && !own
            && let Some(last_read) = options.last_read
            && created_at > last_read
        {
            unread_marked = true;
            if show_unread_separator {
                output.push(RenderedMessage::date_separator(created_at, true));
            }
        }

        let date = calendar_date(created_at, &options.offset);
        let date_changed = last_rendered_date != Some(date);
        let previous_is_separator = output
            .last()
            .is_some_and(RenderedMessage::is_date_separator);

        if options.enable_date_separator && date_changed && !previous_is_separator {
            output.push(RenderedMessage::date_separator(created_at, false));
        }

        last_rendered_date = Some(date);
        output.push(RenderedMessage::Message(Box::new(message.clone())));
    }

    ProcessedMessages {
        messages: output,
        giphy_preview,
    }
}

/// Visual position of a message within a run of grouped messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupStyle {
    /// Not grouped with either neighbour.
    Single,
    /// First of a run.
    Top,
    /// Inside a run.
    Middle,
    /// Last of a run.
    Bottom,
    /// Non-message entries carry no group style.
    #[serde(rename = "")]
    None,
}

impl GroupStyle {
    /// Class-name form used by renderers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Top => "top",
            Self::Middle => "middle",
            Self::Bottom => "bottom",
            Self::None => "",
        }
    }
}

impl std::fmt::Display for GroupStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn exceeds_gap(earlier: &Message, later: &Message, max_gap_ms: Option<i64>) -> bool {
    max_gap_ms.is_some_and(|max| {
        (later.created_at() - earlier.created_at()).num_milliseconds() > max
    })
}

fn is_error(message: &Message) -> bool {
    message.kind() == MessageKind::Error
}

/// Classifies `message` given its rendered neighbours.
#[must_use]
pub fn get_group_styles(
    message: &RenderedMessage,
    previous: Option<&RenderedMessage>,
    next: Option<&RenderedMessage>,
    no_group_by_user: bool,
    max_time_between_grouped_ms: Option<i64>,
) -> GroupStyle {
    let Some(message) = message.as_message() else {
        return GroupStyle::None;
    };

    if no_group_by_user || message.has_attachments() {
        return GroupStyle::Single;
    }

    let is_top = match previous.and_then(RenderedMessage::as_message) {
        None => true,
        Some(previous) => {
            previous.kind().breaks_grouping()
                || previous.has_attachments()
                || previous.user_id() != message.user_id()
                || previous.is_deleted()
                || message.has_reactions()
                || previous.is_edited()
                || exceeds_gap(previous, message, max_time_between_grouped_ms)
        }
    };

    let is_bottom = match next.and_then(RenderedMessage::as_message) {
        None => true,
        Some(next) => {
            next.kind().breaks_grouping()
                || next.has_attachments()
                || next.user_id() != message.user_id()
                || next.is_deleted()
                || next.has_reactions()
                || message.is_edited()
                || exceeds_gap(message, next, max_time_between_grouped_ms)
        }
    };

    let standalone = message.is_deleted() || is_error(message);

    match (is_top, is_bottom) {
        (false, false) if standalone => GroupStyle::Single,
        (false, false) => GroupStyle::Middle,
        (true, true) => GroupStyle::Single,
        (false, true) if standalone => GroupStyle::Single,
        (false, true) => GroupStyle::Bottom,
        (true, false) => GroupStyle::Top,
    }
}

/// Group styles for every message of a rendered sequence, keyed by ID.
#[must_use]
pub fn group_styles(
    entries: &[RenderedMessage],
    no_group_by_user: bool,
    max_time_between_grouped_ms: Option<i64>,
) -> HashMap<MessageId, GroupStyle> {
    entries
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| {
            let message = entry.as_message()?;
            let previous = i.checked_sub(1).and_then(|p| entries.get(p));
            let style = get_group_styles(
                entry,
                previous,
                entries.get(i + 1),
                no_group_by_user,
                max_time_between_grouped_ms,
            );
            Some((message.id().clone(), style))
        })
        .collect()
}

/// Attributes each reader to the messages they have read.
///
/// With `return_all` false a reader lands only on the last message created
/// strictly before their `last_read`; otherwise on every such message. The
/// caller removes the viewing user from `read`.
#[must_use]
pub fn get_read_states(
    messages: &[Message],
    read: &BTreeMap<UserId, ReadState>,
    return_all: bool,
) -> HashMap<MessageId, Vec<User>> {
    let mut read_data: HashMap<MessageId, Vec<User>> = HashMap::new();

    for state in read.values() {
        let mut last_read_id = None;

        for message in messages
            .iter()
            .filter(|message| message.created_at() < state.last_read)
        {
            last_read_id = Some(message.id());
            if return_all {
                read_data
                    .entry(message.id().clone())
                    .or_default()
                    .push(state.user.clone());
            }
        }

        if !return_all && let Some(id) = last_read_id {
            read_data
                .entry(id.clone())
                .or_default()
                .push(state.user.clone());
        }
    }

    read_data
}

/// Inserts the intro header.
///
/// Without a threshold it goes first; otherwise before the first entry
/// created after `threshold`, or last if there is none.
#[must_use]
pub fn insert_intro(
    mut entries: Vec<RenderedMessage>,
    threshold: Option<DateTime<Utc>>,
) -> Vec<RenderedMessage> {
    let position = threshold.map_or(0, |threshold| {
        entries
            .iter()
            .position(|entry| entry.created_at().is_some_and(|at| at > threshold))
            .unwrap_or(entries.len())
    });
    entries.insert(position, RenderedMessage::Intro);
    entries
}
