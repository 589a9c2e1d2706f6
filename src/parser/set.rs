/// Set page extraction
use super::{element_text, track, CompiledSelectors, Extraction, RawSetRecord};
use crate::fetch::ParsedDocument;
use scraper::ElementRef;
use tracing::debug;

/// Parse one set page. The owner name is left empty for the caller to fill.
pub fn parse_set(document: &ParsedDocument, selectors: &CompiledSelectors) -> Extraction<RawSetRecord> {
    let url = document.url();
    let mut misses = Vec::new();
    let mut record = RawSetRecord::empty("", url);

    record.title = track(
        &mut misses,
        url,
        "title",
        document
            .select_first(&selectors.set_title)
            .and_then(|el| element_text(&el, " ")),
    );

    let labels: Vec<String> = document
        .select_all(&selectors.set_stat_label)
        .iter()
        .filter_map(|el| element_text(el, " "))
        .collect();
    record.play_count_raw = track(&mut misses, url, "play_count", stat_label(&labels, "play", 0));
    record.fav_count_raw = track(
        &mut misses,
        url,
        "fav_count",
        stat_label(&labels, "favorite", 1),
    );

    record.date_posted_raw = track(
        &mut misses,
        url,
        "date_posted",
        document
            .select_first(&selectors.set_posted)
            .and_then(|el| posted_text(&el)),
    );

    record.tags = document
        .select_all(&selectors.set_tag)
        .iter()
        .filter_map(|el| element_text(el, " "))
        .collect();
    if record.tags.is_empty() {
        track::<()>(&mut misses, url, "tags", None);
    }

    for (slot, selector) in record.info_blocks.iter_mut().zip(&selectors.set_info_blocks) {
        *slot = document
            .select_first(selector)
            .and_then(|el| element_text(&el, "\n"));
    }
    if record.info_blocks.iter().all(Option::is_none) {
        debug!("No description blocks on {}", url);
    }

    record.artists = track(
        &mut misses,
        url,
        "artists",
        document
            .select_first(&selectors.set_artists)
            .and_then(|el| element_text(&el, "\n")),
    );

    Extraction { record, misses }
}

/// Pick the stat label mentioning `keyword`, else the one at `fallback_index`
fn stat_label(labels: &[String], keyword: &str, fallback_index: usize) -> Option<String> {
    labels
        .iter()
        .find(|label| label.to_lowercase().contains(keyword))
        .or_else(|| {
            labels
                .get(fallback_index)
                .filter(|label| !label.to_lowercase().contains(other_keyword(keyword)))
        })
        .cloned()
}

fn other_keyword(keyword: &str) -> &'static str {
    if keyword == "play" {
        "favorite"
    } else {
        "play"
    }
}

/// Posted time: the tooltip attribute when present, otherwise the visible text
fn posted_text(element: &ElementRef<'_>) -> Option<String> {
    element
        .value()
        .attr("aria-label")
        .or_else(|| element.value().attr("title"))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| element_text(element, " "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectorConfig;
    use crate::parser::EntityParser;

    const SET_URL: &str = "https://www.mixcloud.com/djsprenk/zouk-night/";

    const SET_HTML: &str = r#"
        <html><body>
          <h1>Zouk Night Vol. 3</h1>
          <p class="styles__Label-css-in-js__sc-1lsttd8-2">1,234 plays</p>
          <p class="styles__Label-css-in-js__sc-1lsttd8-2">56 favorites</p>
          <div class="styles__TimeSinceDesktop-css-in-js__sc-dz5x5m-1" aria-label="2 days ago">2d</div>
          <ul>
            <li class="styles__GenreTagListItem-css-in-js__sc-1bxlp52-1"><a>1st</a></li>
            <li class="styles__GenreTagListItem-css-in-js__sc-1bxlp52-1"><a>Zouk</a></li>
            <li class="styles__GenreTagListItem-css-in-js__sc-1bxlp52-1"><a>Brazilian Zouk</a></li>
          </ul>
          <span id="L1">Energy: 4-8</span>
          <span id="L2">Tempo 90-110 BPM</span>
          <div class="styles__Paragraph-css-in-js__sc-1p2o9ke-0">Kizomba Artist - Track One</div>
        </body></html>
    "#;

    fn parse(html: &str) -> Extraction<RawSetRecord> {
        let parser = EntityParser::new(&SelectorConfig::default(), "https://www.mixcloud.com/").unwrap();
        parser.parse_set(&ParsedDocument::parse(SET_URL, html))
    }

    #[test]
    fn test_parse_full_set_page() {
        let extraction = parse(SET_HTML);
        let set = extraction.record;

        assert_eq!(set.url, SET_URL);
        assert_eq!(set.name, "");
        assert_eq!(set.title.as_deref(), Some("Zouk Night Vol. 3"));
        assert_eq!(set.play_count_raw.as_deref(), Some("1,234 plays"));
        assert_eq!(set.fav_count_raw.as_deref(), Some("56 favorites"));
        assert_eq!(set.date_posted_raw.as_deref(), Some("2 days ago"));
        assert_eq!(set.tags, vec!["1st", "Zouk", "Brazilian Zouk"]);
        assert_eq!(set.info_blocks[0].as_deref(), Some("Energy: 4-8"));
        assert_eq!(set.info_blocks[1].as_deref(), Some("Tempo 90-110 BPM"));
        assert_eq!(set.info_blocks[2], None);
        assert_eq!(set.info_blocks[3], None);
        assert_eq!(set.artists.as_deref(), Some("Kizomba Artist - Track One"));
        assert!(extraction.misses.is_empty());
    }

    #[test]
    fn test_missing_title_does_not_affect_other_fields() {
        let html = SET_HTML.replace("<h1>Zouk Night Vol. 3</h1>", "");
        let extraction = parse(&html);

        assert_eq!(extraction.record.title, None);
        assert_eq!(extraction.record.play_count_raw.as_deref(), Some("1,234 plays"));
        assert_eq!(extraction.record.tags.len(), 3);
        assert_eq!(extraction.misses.len(), 1);
        assert_eq!(extraction.misses[0].field, "title");
    }

    #[test]
    fn test_single_favorite_label_is_not_taken_as_plays() {
        let html = SET_HTML.replace(
            r#"<p class="styles__Label-css-in-js__sc-1lsttd8-2">1,234 plays</p>"#,
            "",
        );
        let extraction = parse(&html);

        assert_eq!(extraction.record.play_count_raw, None);
        assert_eq!(extraction.record.fav_count_raw.as_deref(), Some("56 favorites"));
    }

    #[test]
    fn test_posted_falls_back_to_text() {
        let html = SET_HTML.replace(r#" aria-label="2 days ago">2d"#, ">3 weeks ago");
        let extraction = parse(&html);
        assert_eq!(extraction.record.date_posted_raw.as_deref(), Some("3 weeks ago"));
    }

    #[test]
    fn test_blank_page_is_all_none() {
        let extraction = parse("<html><body></body></html>");
        let set = extraction.record;

        assert_eq!(set.title, None);
        assert!(set.tags.is_empty());
        assert!(set.info_blocks.iter().all(Option::is_none));
        assert_eq!(set.url, SET_URL);
        let fields: Vec<&str> = extraction.misses.iter().map(|m| m.field).collect();
        assert_eq!(
            fields,
            vec!["title", "play_count", "fav_count", "date_posted", "tags", "artists"]
        );
    }
}
