/// Count parsing for play, favorite and follower labels

/// Unit suffix shown after a set's play count
pub const PLAYS_SUFFIX: &str = "plays";

/// Unit suffix shown after a set's favorite count
pub const FAVORITES_SUFFIX: &str = "favorites";

/// Parse a count such as `"1,234 plays"` into `1234`.
///
/// The suffix is matched case-insensitively and may be absent or singular
/// (`"1 play"`). Thousands separators are removed before parsing.
pub fn parse_count(raw: &str, suffix: &str) -> Option<u64> {
    let trimmed = raw.trim();
    let without_suffix = strip_suffix_ci(trimmed, suffix)
        .or_else(|| strip_suffix_ci(trimmed, suffix.trim_end_matches('s')))
        .unwrap_or(trimmed);

    let digits: String = without_suffix
        .chars()
        .filter(|c| *c != ',')
        .collect();

    digits.trim().parse::<u64>().ok()
}

/// Pull the first run of digits out of a label like `"Followers 12,400"`.
pub fn first_integer(raw: &str) -> Option<u64> {
    let without_separators: String = raw.chars().filter(|c| *c != ',').collect();
    let digits: String = without_separators
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    if digits.is_empty() {
        None
    } else {
        digits.parse::<u64>().ok()
    }
}

fn strip_suffix_ci<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
    if suffix.is_empty() || text.len() < suffix.len() {
        return None;
    }
    let split = text.len() - suffix.len();
    if !text.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = text.split_at(split);
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}
