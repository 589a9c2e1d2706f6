/// Profile page extraction
use super::{element_text, track, CompiledSelectors, Extraction, ProfileRecord};
use crate::extract::first_integer;
use crate::fetch::ParsedDocument;
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

pub fn parse_profile(
    document: &ParsedDocument,
    selectors: &CompiledSelectors,
    base_url: &Url,
) -> Extraction<ProfileRecord> {
    let url = document.url();
    let mut misses = Vec::new();

    let name = track(&mut misses, url, "profile_name", display_name(document, selectors))
        .unwrap_or_else(|| {
            let fallback = slug_from_url(url).unwrap_or_default();
            warn!("Using profile slug '{}' as display name for {}", fallback, url);
            fallback
        });
    let bio = track(&mut misses, url, "profile_bio", biography(document, selectors));
    let followers = track(
        &mut misses,
        url,
        "followers",
        labelled_count(document, selectors, "Followers"),
    );
    let following = track(
        &mut misses,
        url,
        "following",
        labelled_count(document, selectors, "Following"),
    );
    let set_urls = set_links(document, selectors, base_url);
    if set_urls.is_empty() {
        warn!("⚠️ No set links found on {}", url);
    }

    debug!(
        "Profile '{}': {} sets, followers={:?}, following={:?}",
        name,
        set_urls.len(),
        followers,
        following
    );

    Extraction {
        record: ProfileRecord {
            name,
            bio,
            followers,
            following,
            set_urls,
        },
        misses,
    }
}

fn display_name(document: &ParsedDocument, selectors: &CompiledSelectors) -> Option<String> {
    document
        .select_first(&selectors.profile_name)
        .and_then(|el| element_text(&el, " "))
}

fn biography(document: &ParsedDocument, selectors: &CompiledSelectors) -> Option<String> {
    document
        .select_first(&selectors.profile_bio)
        .and_then(|el| element_text(&el, "\n"))
}

/// Count from the first button whose label contains `label`
fn labelled_count(
    document: &ParsedDocument,
    selectors: &CompiledSelectors,
    label: &str,
) -> Option<u64> {
    document
        .select_all(&selectors.profile_count_button)
        .iter()
        .filter_map(|el| element_text(el, " "))
        .find(|text| text.contains(label))
        .and_then(|text| first_integer(&text))
}

/// Absolute set URLs in document order, first occurrence wins
fn set_links(document: &ParsedDocument, selectors: &CompiledSelectors, base_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    document
        .select_all(&selectors.profile_set_link)
        .iter()
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| match base_url.join(href.trim()) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                debug!("Skipping unresolvable set link '{}': {}", href, e);
                None
            }
        })
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

fn slug_from_url(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .path_segments()?
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use crate::config::SelectorConfig;
    use crate::fetch::ParsedDocument;
    use crate::parser::EntityParser;

    const PROFILE_HTML: &str = r#"
        <html><body>
          <h1 class="styles__DisplayTitle-css-in-js__sc-go2u8s-3 ieRAVV">DJ Sprenk</h1>
          <div class="styles__Text-css-in-js__sc-3bsl01-4 KPhJf"> Zouk DJ from Amsterdam </div>
          <span class="button__StyledChildren-css-in-js__sc-1hu2thj-1 eRIoOB">1,204 Followers</span>
          <span class="button__StyledChildren-css-in-js__sc-1hu2thj-1 eRIoOB">37 Following</span>
          <a class="styles__PlainLink-css-in-js__sc-1d6v1iv-0 styles__TitleLink-css-in-js__sc-1d6v1iv-5" href="/djsprenk/set-one/">Set One</a>
          <a class="styles__PlainLink-css-in-js__sc-1d6v1iv-0 styles__TitleLink-css-in-js__sc-1d6v1iv-5" href="/djsprenk/set-two/">Set Two</a>
          <a class="styles__PlainLink-css-in-js__sc-1d6v1iv-0 styles__TitleLink-css-in-js__sc-1d6v1iv-5" href="/djsprenk/set-one/">Set One again</a>
        </body></html>
    "#;

    fn parser() -> EntityParser {
        EntityParser::new(&SelectorConfig::default(), "https://www.mixcloud.com/").unwrap()
    }

    #[test]
    fn test_parse_full_profile() {
        let doc = ParsedDocument::parse("https://www.mixcloud.com/djsprenk/", PROFILE_HTML);
        let extraction = parser().parse_profile(&doc);
        let profile = extraction.record;

        assert_eq!(profile.name, "DJ Sprenk");
        assert_eq!(profile.bio.as_deref(), Some("Zouk DJ from Amsterdam"));
        assert_eq!(profile.followers, Some(1204));
        assert_eq!(profile.following, Some(37));
        assert_eq!(
            profile.set_urls,
            vec![
                "https://www.mixcloud.com/djsprenk/set-one/",
                "https://www.mixcloud.com/djsprenk/set-two/",
            ]
        );
        assert!(extraction.misses.is_empty());
    }

    #[test]
    fn test_missing_heading_keeps_other_fields() {
        let html = PROFILE_HTML.replace("DisplayTitle", "Renamed");
        let doc = ParsedDocument::parse("https://www.mixcloud.com/djsprenk/", &html);
        let extraction = parser().parse_profile(&doc);

        assert_eq!(extraction.record.name, "djsprenk");
        assert_eq!(extraction.record.followers, Some(1204));
        assert_eq!(extraction.record.set_urls.len(), 2);
        assert_eq!(extraction.misses.len(), 1);
        assert_eq!(extraction.misses[0].field, "profile_name");
    }

    #[test]
    fn test_empty_page_yields_partial_record() {
        let doc = ParsedDocument::parse("https://www.mixcloud.com/nobody/", "<html></html>");
        let extraction = parser().parse_profile(&doc);

        assert_eq!(extraction.record.name, "nobody");
        assert_eq!(extraction.record.bio, None);
        assert_eq!(extraction.record.followers, None);
        assert!(extraction.record.set_urls.is_empty());
        assert_eq!(extraction.misses.len(), 4);
    }
}
