/// Relative post-time resolution ("2 days ago" -> calendar date)
///
/// Weeks, months and years are converted with fixed multipliers (7, 30 and
/// 365 days). Older posts therefore drift from their true calendar date.
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use regex::Regex;
use std::sync::OnceLock;

/// Unit of a relative time phrase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl TimeUnit {
    fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "second" => Some(TimeUnit::Second),
            "minute" => Some(TimeUnit::Minute),
            "hour" => Some(TimeUnit::Hour),
            "day" => Some(TimeUnit::Day),
            "week" => Some(TimeUnit::Week),
            "month" => Some(TimeUnit::Month),
            "year" => Some(TimeUnit::Year),
            _ => None,
        }
    }

    /// Day multiplier for calendar units; sub-day units are native
    pub fn day_multiplier(self) -> i64 {
        match self {
            TimeUnit::Week => 7,
            TimeUnit::Month => 30,
            TimeUnit::Year => 365,
            _ => 1,
        }
    }

    fn delta(self, amount: i64) -> Option<TimeDelta> {
        match self {
            TimeUnit::Second => TimeDelta::try_seconds(amount),
            TimeUnit::Minute => TimeDelta::try_minutes(amount),
            TimeUnit::Hour => TimeDelta::try_hours(amount),
            TimeUnit::Day | TimeUnit::Week | TimeUnit::Month | TimeUnit::Year => {
                TimeDelta::try_days(amount.checked_mul(self.day_multiplier())?)
            }
        }
    }
}

/// A parsed `<N> <unit> ago` phrase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeTime {
    pub amount: i64,
    pub unit: TimeUnit,
}

impl RelativeTime {
    /// Resolve against a snapshot instant, returning the calendar date
    pub fn resolve(&self, snapshot: NaiveDateTime) -> Option<NaiveDate> {
        let delta = self.unit.delta(self.amount)?;
        snapshot.checked_sub_signed(delta).map(|dt| dt.date())
    }
}

fn relative_time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d+|an?)\s+(second|minute|hour|day|week|month|year)s?\b")
            .expect("relative time pattern is valid")
    })
}

/// Parse phrases like `"3 weeks ago"`, `"an hour ago"` or `"1 year ago"`.
pub fn parse_relative_time(raw: &str) -> Option<RelativeTime> {
    let captures = relative_time_regex().captures(raw)?;
    let amount_text = captures.get(1)?.as_str();
    let amount = if amount_text.eq_ignore_ascii_case("a") || amount_text.eq_ignore_ascii_case("an") {
        1
    } else {
        amount_text.parse::<i64>().ok()?
    };
    let unit = TimeUnit::from_word(captures.get(2)?.as_str())?;

    Some(RelativeTime { amount, unit })
}

/// Resolve a relative post-time phrase into an absolute date.
///
/// Returns `None` when the phrase does not match.
pub fn resolve_relative_date(raw: &str, snapshot: NaiveDateTime) -> Option<NaiveDate> {
    parse_relative_time(raw)?.resolve(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 30)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_and_weeks() {
        assert_eq!(resolve_relative_date("2 days ago", snapshot()), Some(date(2025, 1, 28)));
        assert_eq!(resolve_relative_date("1 week ago", snapshot()), Some(date(2025, 1, 23)));
    }

    #[test]
    fn test_month_and_year_approximation() {
        assert_eq!(resolve_relative_date("1 month ago", snapshot()), Some(date(2024, 12, 31)));
        assert_eq!(resolve_relative_date("2 years ago", snapshot()), Some(date(2023, 1, 31)));
    }

    #[test]
    fn test_sub_day_units_cross_midnight() {
        let early = NaiveDate::from_ymd_opt(2025, 1, 30)
            .unwrap()
            .and_hms_opt(1, 0, 0)
            .unwrap();
        assert_eq!(resolve_relative_date("3 hours ago", early), Some(date(2025, 1, 29)));
        assert_eq!(resolve_relative_date("45 minutes ago", early), Some(date(2025, 1, 30)));
        assert_eq!(resolve_relative_date("10 seconds ago", early), Some(date(2025, 1, 30)));
    }

    #[test]
    fn test_articles_count_as_one() {
        assert_eq!(resolve_relative_date("a day ago", snapshot()), Some(date(2025, 1, 29)));
        assert_eq!(resolve_relative_date("An hour ago", snapshot()), Some(date(2025, 1, 30)));
    }

    #[test]
    fn test_unmatched_phrases() {
        assert_eq!(resolve_relative_date("yesterday", snapshot()), None);
        assert_eq!(resolve_relative_date("", snapshot()), None);
        assert_eq!(parse_relative_time("5 fortnights ago"), None);
    }

    #[test]
    fn test_parse_relative_time() {
        let parsed = parse_relative_time("Uploaded 3 months ago").unwrap();
        assert_eq!(parsed.amount, 3);
        assert_eq!(parsed.unit, TimeUnit::Month);
        assert_eq!(parsed.unit.day_multiplier(), 30);
    }
}
