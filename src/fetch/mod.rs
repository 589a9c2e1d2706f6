/// Document fetching: browser sessions and static page fetches
///
/// The parser and normalizer only ever see a [`ParsedDocument`]. Everything
/// that talks to a browser goes through the [`BrowserDriver`] trait so runs
/// can be replayed against fixture pages.

pub mod driver_process;
pub mod http;
pub mod session;
pub mod webdriver;

pub use http::HttpFetcher;
pub use session::Session;
pub use webdriver::WebDriverClient;

use crate::config::Config;
use crate::error::{Result, ScrapeError};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Low-level browser operations a [`Session`] is built on
#[async_trait]
pub trait BrowserDriver: Send {
    /// Start the browser; failures here are fatal for the run
    async fn start(&mut self) -> Result<()>;

    /// Navigate the current tab to `url`
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Whether an element matching the CSS selector is present
    async fn has_element(&mut self, css: &str) -> Result<bool>;

    /// Scroll to the bottom of the page to trigger lazy loading
    async fn scroll_to_bottom(&mut self) -> Result<()>;

    /// Scroll down by a fixed number of pixels
    async fn scroll_by(&mut self, pixels: i64) -> Result<()>;

    /// Click the element at `xpath`; `Ok(false)` when it does not exist
    async fn click_xpath(&mut self, xpath: &str) -> Result<bool>;

    /// Serialized DOM of the current page
    async fn page_source(&mut self) -> Result<String>;

    /// Release the browser and every resource behind it
    async fn quit(&mut self) -> Result<()>;
}

/// Fetches pages that do not need script execution
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Create the WebDriver-backed browser driver described by `config`
pub fn create_driver(config: &Config, headless: bool) -> Result<Box<dyn BrowserDriver>> {
    Ok(Box::new(WebDriverClient::new(&config.browser, headless)?))
}

/// Fetch a static page and parse it
pub async fn fetch_static(fetcher: &dyn PageFetcher, url: &str) -> Result<ParsedDocument> {
    let source = fetcher.fetch(url).await?;
    Ok(ParsedDocument::parse(url, &source))
}

/// A parsed HTML document together with the URL it came from
pub struct ParsedDocument {
    url: String,
    html: Html,
}

impl ParsedDocument {
    pub fn parse(url: &str, source: &str) -> Self {
        Self {
            url: url.to_string(),
            html: Html::parse_document(source),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// First element matching `selector`
    pub fn select_first(&self, selector: &Selector) -> Option<ElementRef<'_>> {
        self.html.select(selector).next()
    }

    /// All elements matching `selector`, in document order
    pub fn select_all(&self, selector: &Selector) -> Vec<ElementRef<'_>> {
        self.html.select(selector).collect()
    }
}

/// Check that `raw` is an http(s) profile URL on one of `allowed_hosts`.
///
/// Runs before any browser or network action.
pub fn validate_profile_url(raw: &str, allowed_hosts: &[String]) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ScrapeError::InvalidUrl(format!("{}: {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ScrapeError::InvalidUrl(format!(
            "{}: only http and https are supported",
            raw
        )));
    }

    let host = url
        .host_str()
        .ok_or_else(|| ScrapeError::InvalidUrl(format!("{}: missing host", raw)))?
        .to_ascii_lowercase();
    if !allowed_hosts.iter().any(|allowed| allowed.eq_ignore_ascii_case(&host)) {
        return Err(ScrapeError::InvalidUrl(format!(
            "{}: host '{}' is not one of {:?}",
            raw, host, allowed_hosts
        )));
    }

    if url.path().trim_matches('/').is_empty() {
        return Err(ScrapeError::InvalidUrl(format!("{}: missing profile path", raw)));
    }

    Ok(url)
}

/// Profile slug (first path segment) of a validated profile URL
pub fn profile_slug(url: &Url) -> Option<String> {
    url.path_segments()?
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts() -> Vec<String> {
        vec!["mixcloud.com".to_string(), "www.mixcloud.com".to_string()]
    }

    #[test]
    fn test_valid_profile_urls() {
        assert!(validate_profile_url("https://www.mixcloud.com/djsprenk", &hosts()).is_ok());
        assert!(validate_profile_url("http://mixcloud.com/djsprenk/", &hosts()).is_ok());
    }

    #[test]
    fn test_invalid_profile_urls() {
        for raw in [
            "not a url",
            "ftp://www.mixcloud.com/djsprenk",
            "https://example.com/djsprenk",
            "https://www.mixcloud.com/",
        ] {
            let err = validate_profile_url(raw, &hosts()).unwrap_err();
            assert!(matches!(err, ScrapeError::InvalidUrl(_)), "{}", raw);
        }
    }

    #[test]
    fn test_profile_slug() {
        let url = validate_profile_url("https://www.mixcloud.com/djsprenk/", &hosts()).unwrap();
        assert_eq!(profile_slug(&url).as_deref(), Some("djsprenk"));
    }

    #[test]
    fn test_parsed_document_selects_in_order() {
        let doc = ParsedDocument::parse(
            "https://www.mixcloud.com/a/",
            "<html><body><p>one</p><p>two</p></body></html>",
        );
        let selector = Selector::parse("p").unwrap();
        let texts: Vec<String> = doc
            .select_all(&selector)
            .iter()
            .map(|el| el.text().collect())
            .collect();
        assert_eq!(texts, vec!["one", "two"]);
        assert_eq!(doc.url(), "https://www.mixcloud.com/a/");
    }
}
