/// Stateful browser session bound to one run
use super::{BrowserDriver, ParsedDocument};
use crate::error::{Result, ScrapeError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// One browser instance, opened on a starting URL.
///
/// All navigation is sequential: the session owns the current page and scroll
/// position, so every method takes `&mut self`. Call [`Session::close`] on
/// every exit path; dropping an open session falls back to a background quit.
pub struct Session {
    driver: Option<Box<dyn BrowserDriver>>,
    current_url: String,
    page_timeout: Duration,
    ready_marker: String,
    initial_timed_out: bool,
}

impl Session {
    /// Start the browser and load `url`.
    ///
    /// Only a failure to start the browser is an error. A slow or failing
    /// first page is logged and the session is returned anyway.
    pub async fn open(
        mut driver: Box<dyn BrowserDriver>,
        url: &str,
        page_timeout: Duration,
        ready_marker: &str,
    ) -> Result<Self> {
        info!("🌐 Starting browser session for {}", url);

        if let Err(e) = driver.start().await {
            let _ = driver.quit().await;
            return Err(match e {
                ScrapeError::FatalInit(msg) => ScrapeError::FatalInit(msg),
                other => ScrapeError::FatalInit(other.to_string()),
            });
        }

        let mut session = Self {
            driver: Some(driver),
            current_url: url.to_string(),
            page_timeout,
            ready_marker: ready_marker.to_string(),
            initial_timed_out: false,
        };

        match session.navigate(url).await {
            Ok(ready) => session.initial_timed_out = !ready,
            Err(e) => warn!("⚠️ Initial navigation to {} failed, continuing: {}", url, e),
        }

        Ok(session)
    }

    fn driver(&mut self) -> Result<&mut Box<dyn BrowserDriver>> {
        self.driver
            .as_mut()
            .ok_or_else(|| ScrapeError::WebDriver("session already closed".to_string()))
    }

    /// Whether the starting page missed its readiness deadline
    pub fn initial_load_timed_out(&self) -> bool {
        self.initial_timed_out
    }

    /// URL of the page the session was last sent to
    pub fn current_url(&self) -> &str {
        &self.current_url
    }

    /// Navigate and wait for the ready marker.
    ///
    /// Returns whether the page signalled readiness in time. A navigation
    /// timeout is not an error; the caller works with whatever rendered.
    pub async fn navigate(&mut self, url: &str) -> Result<bool> {
        self.current_url = url.to_string();
        match self.driver()?.goto(url).await {
            Ok(()) => {}
            Err(ScrapeError::NavigationTimeout(_)) => {
                warn!("⏰ Page load timed out for {}, using partial content", url);
            }
            Err(e) => return Err(e),
        }
        Ok(self.wait_until_ready().await)
    }

    /// Poll for the ready marker until the page timeout elapses
    pub async fn wait_until_ready(&mut self) -> bool {
        let deadline = Instant::now() + self.page_timeout;
        let marker = self.ready_marker.clone();
        let url = self.current_url.clone();

        loop {
            match self.driver() {
                Ok(driver) => match driver.has_element(&marker).await {
                    Ok(true) => return true,
                    Ok(false) => {}
                    Err(e) => debug!("Ready check failed on {}: {}", url, e),
                },
                Err(_) => return false,
            }

            if Instant::now() >= deadline {
                warn!(
                    "⏰ Timed out after {}s waiting for '{}' on {}",
                    self.page_timeout.as_secs(),
                    marker,
                    url
                );
                return false;
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    /// Trigger lazy loading `times` times, settling `pause` after each.
    pub async fn scroll(&mut self, times: u32, pause: Duration) -> Result<()> {
        for i in 0..times {
            self.driver()?.scroll_to_bottom().await?;
            debug!("📜 Scroll {}/{} on {}", i + 1, times, self.current_url);
            tokio::time::sleep(pause).await;
        }
        Ok(())
    }

    /// Scroll down a fixed amount without reaching the bottom
    pub async fn scroll_by(&mut self, pixels: i64) -> Result<()> {
        self.driver()?.scroll_by(pixels).await
    }

    /// Click an optional in-page control. Never fails the caller.
    pub async fn click_if_present(&mut self, xpath: &str, pause: Duration) -> bool {
        let url = self.current_url.clone();
        let outcome = match self.driver() {
            Ok(driver) => driver.click_xpath(xpath).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(true) => {
                tokio::time::sleep(pause).await;
                true
            }
            Ok(false) => {
                debug!("No advance button found for {}, proceeding to scrape", url);
                false
            }
            Err(e) => {
                warn!("Error interacting with advance button for {}: {}", url, e);
                false
            }
        }
    }

    /// Raw page source of the current page
    pub async fn page_source(&mut self) -> Result<String> {
        self.driver()?.page_source().await
    }

    /// Parsed document for the current page
    pub async fn document(&mut self) -> Result<ParsedDocument> {
        let source = self.page_source().await?;
        Ok(ParsedDocument::parse(&self.current_url, &source))
    }

    /// Release the browser. Consumes the session so it cannot be reused.
    pub async fn close(mut self) -> Result<()> {
        match self.driver.take() {
            Some(mut driver) => {
                info!("🧹 Closing browser session");
                driver.quit().await
            }
            None => Ok(()),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            warn!("Browser session dropped without close(), releasing in background");
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = driver.quit().await;
                });
            }
        }
    }
}
