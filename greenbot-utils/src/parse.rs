use twilight_model::id::{Id, marker::UserMarker};

/// Parse a target user from a raw argument (`<@id>`, `<@!id>`, or raw ID).
pub fn parse_target_user_id(raw: &str) -> Option<Id<UserMarker>> {
    let trimmed = raw.trim();

    let numeric = match trimmed.strip_prefix("<@").and_then(|rest| rest.strip_suffix('>')) {
        Some(inner) => inner.strip_prefix('!').unwrap_or(inner),
        None => trimmed,
    };

    let id = numeric.parse::<u64>().ok()?;

    Id::new_checked(id)
}

/// Split text into its first whitespace-delimited token and the trimmed tail.
///
/// Both halves are `None` when empty.
pub fn split_first_token(text: &str) -> (Option<&str>, Option<&str>) {
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let head = parts.next().filter(|token| !token.is_empty());
    let tail = parts
        .next()
        .map(str::trim)
        .filter(|remaining| !remaining.is_empty());

    (head, tail)
}

/// Return the whitespace-delimited token at `index`, or `""` when out of range.
pub fn token_at(message: Option<&str>, index: usize) -> &str {
    message
        .and_then(|text| text.split_whitespace().nth(index))
        .unwrap_or("")
}
