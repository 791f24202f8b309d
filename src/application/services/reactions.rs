//! Optimistic reaction deltas.

use chrono::{DateTime, Utc};

use crate::domain::entities::{Message, Reaction, ReactionGroup};

/// Returns true if the current user already reacted with `kind`.
#[must_use]
pub fn has_own_reaction(message: &Message, kind: &str) -> bool {
    message.own_reactions().iter().any(|r| r.kind == kind)
}

/// Builds the optimistic copy of `message` after adding or removing
/// `reaction`.
///
/// Adding bumps the group count (or creates the group) and prepends the
/// reaction to the latest and own lists. Removing decrements the count,
/// dropping the group when it would reach zero, and filters the lists.
#[must_use]
pub fn reaction_preview(
    message: &Message,
    reaction: &Reaction,
    add: bool,
    now: DateTime<Utc>,
) -> Message {
    let mut groups = message.reaction_groups().clone();
    let kind = reaction.kind.as_str();

    if add {
        groups
            .entry(kind.to_string())
            .and_modify(|group| group.count += 1)
            .or_insert_with(|| ReactionGroup::single(now));
    } else {
        match groups.get_mut(kind) {
            Some(group) if group.count > 1 => group.count -= 1,
            _ => {
                groups.remove(kind);
            }
        }
    }

    let (latest, own) = if add {
        let latest = std::iter::once(reaction.clone())
            .chain(message.latest_reactions().iter().cloned())
            .collect();
        let own = std::iter::once(reaction.clone())
            .chain(message.own_reactions().iter().cloned())
            .collect();
        (latest, own)
    } else {
        let latest = message
            .latest_reactions()
            .iter()
            .filter(|r| !(r.kind == reaction.kind && r.author_id() == reaction.author_id()))
            .cloned()
            .collect();
        let own = message
            .own_reactions()
            .iter()
            .filter(|r| r.kind != reaction.kind)
            .cloned()
            .collect();
        (latest, own)
    };

    message.clone().with_reactions(groups, latest, own)
}
