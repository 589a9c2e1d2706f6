/// Genre tag cleaning
use regex::Regex;
use std::sync::OnceLock;

/// Separator used when joining cleaned tags
pub const TAG_SEPARATOR: &str = ", ";

fn ordinal_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:st|nd|rd|th)").expect("ordinal pattern is valid"))
}

/// Strip ordinal chart-position noise ("1st", "23rd") and tidy whitespace.
pub fn clean_tag(tag: &str) -> String {
    let stripped = ordinal_regex().replace_all(tag, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clean every tag and join them into one comma-separated string.
///
/// Order and case are preserved and repeated tags are kept. Tags that are
/// nothing but noise are dropped.
pub fn clean_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| clean_tag(tag))
        .filter(|tag| !tag.is_empty())
        .collect::<Vec<_>>()
        .join(TAG_SEPARATOR)
}

/// Split a cleaned tag string back into its tokens
pub fn split_cleaned_tags(cleaned: &str) -> Vec<String> {
    cleaned
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_clean_tags_strips_ordinals() {
        let raw = tags(&["1st Zouk", " R&B 23rd ", "Kizomba"]);
        assert_eq!(clean_tags(&raw), "Zouk, R&B, Kizomba");
    }

    #[test]
    fn test_clean_tags_keeps_duplicates_and_order() {
        let raw = tags(&["Zouk", "zouk", "Zouk"]);
        assert_eq!(clean_tags(&raw), "Zouk, zouk, Zouk");
    }

    #[test]
    fn test_ordinal_glued_to_word_is_stripped() {
        let raw = tags(&["1stZouk", "Top 40"]);
        assert_eq!(clean_tags(&raw), "Zouk, Top 40");
    }

    #[test]
    fn test_noise_only_tags_dropped() {
        let raw = tags(&["2nd", "Brazilian Zouk"]);
        assert_eq!(clean_tags(&raw), "Brazilian Zouk");
        assert_eq!(clean_tags(&[]), "");
    }

    #[test]
    fn test_split_cleaned_tags() {
        assert_eq!(split_cleaned_tags("Zouk, R&B"), vec!["Zouk", "R&B"]);
        assert!(split_cleaned_tags("").is_empty());
    }
}
