/// Error types for the scraping pipeline
///
/// Only session-initialisation and configuration failures are meant to reach
/// the caller of a run. Page-level and field-level problems are absorbed by the
/// fetcher and parser and surface as `None` values plus log entries.

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    #[error("Browser initialization failed: {0}")]
    FatalInit(String),

    #[error("Navigation timed out: {0}")]
    NavigationTimeout(String),

    #[error("WebDriver error: {0}")]
    WebDriver(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    /// Whether this failure must abort the whole run rather than a single page
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScrapeError::FatalInit(_) | ScrapeError::InvalidUrl(_) | ScrapeError::InvalidConfig(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ScrapeError::FatalInit("no chromedriver".into()).is_fatal());
        assert!(ScrapeError::InvalidUrl("ftp://x".into()).is_fatal());
        assert!(!ScrapeError::NavigationTimeout("https://x".into()).is_fatal());
        assert!(!ScrapeError::WebDriver("stale element".into()).is_fatal());
    }
}
