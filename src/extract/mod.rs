/// Text field extraction
///
/// Pure functions that pull structured values out of the loosely formatted
/// text scraped from set pages. None of them perform I/O and none of them
/// fail: a value that cannot be recovered comes back as `None`.

pub mod counts;
pub mod dates;
pub mod ranges;
pub mod tags;

pub use counts::{first_integer, parse_count, FAVORITES_SUFFIX, PLAYS_SUFFIX};
pub use dates::{parse_relative_time, resolve_relative_date, RelativeTime, TimeUnit};
pub use ranges::{extract_bpm, extract_energy, extract_range_from_blocks, IntRange, RangeKind};
pub use tags::{clean_tag, clean_tags, split_cleaned_tags};
