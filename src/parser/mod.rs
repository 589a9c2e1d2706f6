/// Entity parsing: profile and set pages into raw records
///
/// Every field is looked up on its own. A field that cannot be found becomes
/// `None` and a [`FieldMiss`]; it never stops the remaining fields or the
/// remaining pages of a run.

pub mod profile;
pub mod set;

use crate::config::SelectorConfig;
use crate::error::{Result, ScrapeError};
use crate::fetch::ParsedDocument;
use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

/// A creator profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Display name; the join key for set records
    pub name: String,
    /// Biography text
    pub bio: Option<String>,
    pub followers: Option<u64>,
    pub following: Option<u64>,
    /// Child set URLs in document order, without duplicates
    pub set_urls: Vec<String>,
}

/// One set page as scraped, before normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSetRecord {
    /// Owning profile's display name
    pub name: String,
    pub title: Option<String>,
    pub play_count_raw: Option<String>,
    pub fav_count_raw: Option<String>,
    pub date_posted_raw: Option<String>,
    /// Tag labels, possibly carrying ordinal noise like "1st"
    pub tags: Vec<String>,
    /// Up to four description blocks
    pub info_blocks: [Option<String>; 4],
    /// Artist / track listing block
    pub artists: Option<String>,
    /// Canonical URL; unique within a run
    pub url: String,
}

impl RawSetRecord {
    /// A record with only its URL and owner set
    pub fn empty(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            title: None,
            play_count_raw: None,
            fav_count_raw: None,
            date_posted_raw: None,
            tags: Vec::new(),
            info_blocks: [None, None, None, None],
            artists: None,
            url: url.to_string(),
        }
    }
}

/// A field that could not be extracted from a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMiss {
    pub url: String,
    pub field: &'static str,
}

/// A best-effort record plus the fields that were missing
#[derive(Debug, Clone)]
pub struct Extraction<T> {
    pub record: T,
    pub misses: Vec<FieldMiss>,
}

/// Compiled selectors for the source site's layout
#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    pub profile_name: Selector,
    pub profile_bio: Selector,
    pub profile_count_button: Selector,
    pub profile_set_link: Selector,
    pub set_title: Selector,
    pub set_stat_label: Selector,
    pub set_posted: Selector,
    pub set_tag: Selector,
    pub set_info_blocks: Vec<Selector>,
    pub set_artists: Selector,
}

impl CompiledSelectors {
    pub fn compile(config: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            profile_name: compile("profile_name", &config.profile_name)?,
            profile_bio: compile("profile_bio", &config.profile_bio)?,
            profile_count_button: compile("profile_count_button", &config.profile_count_button)?,
            profile_set_link: compile("profile_set_link", &config.profile_set_link)?,
            set_title: compile("set_title", &config.set_title)?,
            set_stat_label: compile("set_stat_label", &config.set_stat_label)?,
            set_posted: compile("set_posted", &config.set_posted)?,
            set_tag: compile("set_tag", &config.set_tag)?,
            set_info_blocks: config
                .set_info_blocks
                .iter()
                .map(|css| compile("set_info_blocks", css))
                .collect::<Result<Vec<_>>>()?,
            set_artists: compile("set_artists", &config.set_artists)?,
        })
    }
}

fn compile(name: &str, css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| ScrapeError::InvalidConfig(format!("selector {} ('{}'): {}", name, css, e)))
}

/// Parses profile and set documents into raw records
#[derive(Debug, Clone)]
pub struct EntityParser {
    selectors: CompiledSelectors,
    base_url: Url,
}

impl EntityParser {
    pub fn new(selectors: &SelectorConfig, site_base_url: &str) -> Result<Self> {
        let base_url = Url::parse(site_base_url)
            .map_err(|e| ScrapeError::InvalidConfig(format!("site_base_url: {}", e)))?;
        Ok(Self {
            selectors: CompiledSelectors::compile(selectors)?,
            base_url,
        })
    }

    /// Extract a profile record from a rendered profile page
    pub fn parse_profile(&self, document: &ParsedDocument) -> Extraction<ProfileRecord> {
        profile::parse_profile(document, &self.selectors, &self.base_url)
    }

    /// Extract a raw set record from a set page
    pub fn parse_set(&self, document: &ParsedDocument) -> Extraction<RawSetRecord> {
        set::parse_set(document, &self.selectors)
    }
}

/// Trimmed text of an element, joining text nodes with `separator`.
/// Empty text counts as missing.
pub(crate) fn element_text(element: &ElementRef<'_>, separator: &str) -> Option<String> {
    let text = element
        .text()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(separator);

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Record a miss for an absent field and pass the value through
pub(crate) fn track<T>(
    misses: &mut Vec<FieldMiss>,
    url: &str,
    field: &'static str,
    value: Option<T>,
) -> Option<T> {
    if value.is_none() {
        warn!("⚠️ Field '{}' not found on {}", field, url);
        misses.push(FieldMiss {
            url: url.to_string(),
            field,
        });
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_selectors_compile() {
        assert!(CompiledSelectors::compile(&SelectorConfig::default()).is_ok());
    }

    #[test]
    fn test_bad_selector_is_config_error() {
        let mut selectors = SelectorConfig::default();
        selectors.profile_name = "h1[".to_string();
        let err = EntityParser::new(&selectors, "https://www.mixcloud.com/").unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidConfig(_)));
    }

    #[test]
    fn test_element_text_joins_and_trims() {
        let doc = ParsedDocument::parse(
            "https://www.mixcloud.com/x/",
            "<div id='a'>  Line one <br> Line two  </div><div id='b'>   </div>",
        );
        let a = doc.select_first(&Selector::parse("#a").unwrap()).unwrap();
        let b = doc.select_first(&Selector::parse("#b").unwrap()).unwrap();
        assert_eq!(element_text(&a, "\n").as_deref(), Some("Line one\nLine two"));
        assert_eq!(element_text(&b, " "), None);
    }

    #[test]
    fn test_track_records_misses() {
        let mut misses = Vec::new();
        assert_eq!(track(&mut misses, "u", "title", Some(1)), Some(1));
        assert_eq!(track::<u32>(&mut misses, "u", "bio", None), None);
        assert_eq!(misses, vec![FieldMiss { url: "u".to_string(), field: "bio" }]);
    }
}
