use lingo_types::Reaction;

/// Reactions offered by the quick-reaction bar
pub const QUICK_REACTIONS: [&str; 6] = ["👍", "❤️", "😂", "🎉", "🤔", "🙏"];

/// Resolves user input to an emoji.
///
/// Accepts the emoji itself or a shortcode with or without colons
/// (`:fire:`, `fire`). Returns `None` for anything that is not an emoji.
pub fn resolve_emoji(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Some(emoji) = emojis::get(input) {
        return Some(emoji.as_str().to_string());
    }
    let shortcode = input.trim_start_matches(':').trim_end_matches(':');
    emojis::get_by_shortcode(shortcode).map(|emoji| emoji.as_str().to_string())
}

/// Returns `reactions` with `user_id`'s `emoji` reaction flipped.
///
/// The bucket's `users`, `count` and `has_reacted` change together. A
/// bucket left with no users is dropped; a new bucket goes to the end.
pub fn toggled(reactions: &[Reaction], emoji: &str, user_id: &str) -> Vec<Reaction> {
    let mut next = reactions.to_vec();

    match next.iter().position(|r| r.emoji == emoji) {
        Some(index) => {
            let bucket = &mut next[index];
            if bucket.users.iter().any(|u| u == user_id) {
                bucket.users.retain(|u| u != user_id);
                bucket.has_reacted = false;
            } else {
                bucket.users.push(user_id.to_string());
                bucket.has_reacted = true;
            }
            bucket.count = bucket.users.len() as u32;
            if bucket.users.is_empty() {
                next.remove(index);
            }
        }
        None => next.push(Reaction {
            emoji: emoji.to_string(),
            count: 1,
            has_reacted: true,
            users: vec![user_id.to_string()],
        }),
    }

    next
}

/// Whether `user_id` currently holds `emoji` in `reactions`
pub fn has_reacted(reactions: &[Reaction], emoji: &str, user_id: &str) -> bool {
    reactions
        .iter()
        .any(|r| r.emoji == emoji && r.users.iter().any(|u| u == user_id))
}

pub fn total_count(reactions: &[Reaction]) -> u32 {
    reactions.iter().map(|r| r.count).sum()
}
