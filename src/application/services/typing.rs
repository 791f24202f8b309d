//! Typing indicator selection.

use std::collections::BTreeMap;

use crate::domain::entities::{MessageId, TypingEntry, User, UserId};
use crate::domain::ports::I18nPort;

/// Users typing in the main list (`thread` is `None`) or in the given
/// thread, excluding the viewing user.
#[must_use]
pub fn typing_users<'a>(
    typing: &'a BTreeMap<UserId, TypingEntry>,
    own_user_id: Option<&UserId>,
    thread: Option<&MessageId>,
) -> Vec<&'a User> {
    typing
        .values()
        .filter(|entry| Some(entry.user.id()) != own_user_id)
        .filter(|entry| entry.parent_id.as_ref() == thread)
        .map(|entry| &entry.user)
        .collect()
}

/// Localized indicator line, or `None` when nobody is typing.
#[must_use]
pub fn format_typing_indicator(users: &[&User], i18n: &dyn I18nPort) -> Option<String> {
    match users {
        [] => None,
        [user] => Some(i18n.t(
            "{{ user }} is typing...",
            &[("user", user.display_name())],
        )),
        [first, second] => {
            let names = format!("{}, {}", first.display_name(), second.display_name());
            Some(i18n.t("{{ users }} are typing...", &[("users", &names)]))
        }
        [first, second, ..] => {
            let names = format!("{}, {}", first.display_name(), second.display_name());
            Some(i18n.t("{{ users }} and more are typing...", &[("users", &names)]))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::infrastructure::i18n::PassthroughTranslator;

    fn entry(user: &str, parent: Option<&str>) -> (UserId, TypingEntry) {
        (
            UserId::from(user),
            TypingEntry {
                user: User::new(user).with_name(user.to_uppercase()),
                parent_id: parent.map(MessageId::from),
                received_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            },
        )
    }

    #[test]
    fn test_excludes_self_and_scopes_by_thread() {
        let typing: BTreeMap<_, _> = [
            entry("me", None),
            entry("alice", None),
            entry("bob", Some("p1")),
        ]
        .into_iter()
        .collect();
        let me = UserId::from("me");

        let main = typing_users(&typing, Some(&me), None);
        assert_eq!(main.len(), 1);
        assert_eq!(main[0].id().as_str(), "alice");

        let thread_id = MessageId::from("p1");
        let thread = typing_users(&typing, Some(&me), Some(&thread_id));
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].id().as_str(), "bob");
    }

    #[test]
    fn test_format_indicator() {
        let i18n = PassthroughTranslator;
        let alice = User::new("alice").with_name("Alice");
        let bob = User::new("bob");
        let carol = User::new("carol");

        assert_eq!(format_typing_indicator(&[], &i18n), None);
        assert_eq!(
            format_typing_indicator(&[&alice], &i18n).as_deref(),
            Some("Alice is typing...")
        );
        assert_eq!(
            format_typing_indicator(&[&alice, &bob], &i18n).as_deref(),
            Some("Alice, bob are typing...")
        );
        assert_eq!(
            format_typing_indicator(&[&alice, &bob, &carol], &i18n).as_deref(),
            Some("Alice, bob and more are typing...")
        );
    }
}
