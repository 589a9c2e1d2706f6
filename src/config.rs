use crate::error::{Result, ScrapeError};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Configuration for the catalog scraper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Browser and WebDriver settings
    pub browser: BrowserConfig,

    /// Scrape run settings
    pub scrape: ScrapeConfig,

    /// CSS selectors for the source site's current layout
    pub selectors: SelectorConfig,

    /// Output and storage settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// WebDriver endpoint (chromedriver listens on 9515 by default)
    pub webdriver_url: String,

    /// Optional chromedriver binary to start before the run
    pub driver_path: Option<PathBuf>,

    /// Optional Chrome/Chromium binary
    pub browser_binary: Option<PathBuf>,

    /// Run the browser without a window
    pub headless: bool,

    /// Seconds to wait for a page's top-level heading
    pub page_load_timeout_seconds: u64,

    /// Milliseconds to wait for an autostarted driver to accept connections
    pub driver_start_timeout_ms: u64,

    /// Window size passed to the browser, "width,height"
    pub window_size: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Base URL that relative set links are resolved against
    pub site_base_url: String,

    /// Hosts a profile URL may point at
    pub allowed_hosts: Vec<String>,

    /// Number of scroll-to-bottom triggers on the profile page
    pub scroll_count: u32,

    /// Settle delay after each scroll (seconds)
    pub scroll_pause_seconds: f64,

    /// Number of sets to visit; 0 or negative means all
    pub sample_size: i64,

    /// Settle delay after clicking the in-page advance button (milliseconds)
    pub advance_pause_ms: u64,

    /// Pixels to scroll on a set page before looking for the advance button
    pub in_page_scroll_pixels: i64,

    /// Re-fetch each set page over plain HTTP after the browser visit
    pub static_fetch: bool,

    /// HTTP request timeout in seconds
    pub request_timeout_seconds: u64,

    /// User agent for static fetches
    pub user_agent: String,
}

/// Selectors used by the entity parser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub profile_name: String,
    pub profile_bio: String,
    pub profile_count_button: String,
    pub profile_set_link: String,
    pub set_title: String,
    pub set_stat_label: String,
    pub set_posted: String,
    pub set_tag: String,
    pub set_info_blocks: Vec<String>,
    pub set_artists: String,
    /// XPath of the "next" button that reveals the full description
    pub advance_button_xpath: String,
    /// Element whose presence marks a page as ready
    pub ready_marker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Base output directory
    pub output_dir: PathBuf,

    /// Export formats
    pub formats: Vec<ExportFormat>,

    /// File stem for exports; `{profile}` is replaced by the profile slug
    pub stem_template: String,
}

impl OutputConfig {
    pub fn file_stem(&self, profile_slug: &str) -> String {
        self.stem_template.replace("{profile}", profile_slug)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    CSV,
    JSON,
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let config_paths = ["mixset-catalog.toml", "config/mixset-catalog.toml"];

        for path in &config_paths {
            if Path::new(path).exists() {
                match Self::load_from(Path::new(path)) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from a specific TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)?;
        toml::from_str(&config_str)
            .map_err(|e| ScrapeError::InvalidConfig(format!("{}: {}", path.display(), e)))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("MIXSET_WEBDRIVER_URL") {
            config.browser.webdriver_url = url;
        }

        if let Ok(path) = std::env::var("MIXSET_DRIVER_PATH") {
            config.browser.driver_path = Some(PathBuf::from(path));
        }

        if let Ok(headless) = std::env::var("MIXSET_HEADLESS") {
            config.browser.headless = !matches!(headless.as_str(), "0" | "false" | "no");
        }

        if let Ok(scrolls) = std::env::var("MIXSET_SCROLL_COUNT") {
            config.scrape.scroll_count = scrolls.parse().unwrap_or(10);
        }

        if let Ok(sample) = std::env::var("MIXSET_SAMPLE_SIZE") {
            config.scrape.sample_size = sample.parse().unwrap_or(0);
        }

        if let Ok(output_dir) = std::env::var("MIXSET_OUTPUT_DIR") {
            config.output.output_dir = PathBuf::from(output_dir);
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)
            .map_err(|e| ScrapeError::InvalidConfig(e.to_string()))?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.browser.webdriver_url).map_err(|e| {
            ScrapeError::InvalidConfig(format!(
                "webdriver_url '{}' is not a URL: {}",
                self.browser.webdriver_url, e
            ))
        })?;

        Url::parse(&self.scrape.site_base_url).map_err(|e| {
            ScrapeError::InvalidConfig(format!(
                "site_base_url '{}' is not a URL: {}",
                self.scrape.site_base_url, e
            ))
        })?;

        if self.browser.page_load_timeout_seconds == 0 {
            return Err(ScrapeError::InvalidConfig(
                "page_load_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.scrape.scroll_count > 100 {
            return Err(ScrapeError::InvalidConfig(
                "scroll_count must not exceed 100".to_string(),
            ));
        }

        if self.scrape.scroll_pause_seconds < 0.0 || !self.scrape.scroll_pause_seconds.is_finite() {
            return Err(ScrapeError::InvalidConfig(
                "scroll_pause_seconds must be a non-negative number".to_string(),
            ));
        }

        if self.scrape.allowed_hosts.is_empty() {
            return Err(ScrapeError::InvalidConfig(
                "allowed_hosts must name at least one host".to_string(),
            ));
        }

        if self.selectors.set_info_blocks.len() != 4 {
            return Err(ScrapeError::InvalidConfig(format!(
                "expected 4 info block selectors, found {}",
                self.selectors.set_info_blocks.len()
            )));
        }

        for (name, selector) in self.selectors.css_entries() {
            Selector::parse(selector).map_err(|e| {
                ScrapeError::InvalidConfig(format!("selector {} ('{}'): {}", name, selector, e))
            })?;
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Mixset Catalog Configuration:\n\
            - WebDriver: {}\n\
            - Headless: {}\n\
            - Page Timeout: {}s\n\
            - Scrolls: {} (pause {:.1}s)\n\
            - Sample Size: {}\n\
            - Static Fetch: {}\n\
            - Output Directory: {}",
            self.browser.webdriver_url,
            self.browser.headless,
            self.browser.page_load_timeout_seconds,
            self.scrape.scroll_count,
            self.scrape.scroll_pause_seconds,
            if self.scrape.sample_size > 0 {
                self.scrape.sample_size.to_string()
            } else {
                "all".to_string()
            },
            self.scrape.static_fetch,
            self.output.output_dir.display(),
        )
    }
}

impl SelectorConfig {
    /// Every CSS selector paired with its field name
    pub fn css_entries(&self) -> Vec<(String, &str)> {
        let mut entries = vec![
            ("profile_name".to_string(), self.profile_name.as_str()),
            ("profile_bio".to_string(), self.profile_bio.as_str()),
            ("profile_count_button".to_string(), self.profile_count_button.as_str()),
            ("profile_set_link".to_string(), self.profile_set_link.as_str()),
            ("set_title".to_string(), self.set_title.as_str()),
            ("set_stat_label".to_string(), self.set_stat_label.as_str()),
            ("set_posted".to_string(), self.set_posted.as_str()),
            ("set_tag".to_string(), self.set_tag.as_str()),
            ("set_artists".to_string(), self.set_artists.as_str()),
            ("ready_marker".to_string(), self.ready_marker.as_str()),
        ];
        for (i, block) in self.set_info_blocks.iter().enumerate() {
            entries.push((format!("set_info_blocks[{}]", i), block.as_str()));
        }
        entries
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            profile_name: "h1[class*='DisplayTitle']".to_string(),
            profile_bio: "div[class*='styles__Text-css-in-js']".to_string(),
            profile_count_button: "span[class*='StyledChildren']".to_string(),
            profile_set_link: "a[class*='TitleLink']".to_string(),
            set_title: "h1".to_string(),
            set_stat_label: "p[class*='styles__Label-css-in-js']".to_string(),
            set_posted: "div[class*='TimeSinceDesktop']".to_string(),
            set_tag: "li[class*='GenreTagListItem']".to_string(),
            set_info_blocks: vec![
                "span#L1".to_string(),
                "span#L2".to_string(),
                "span#L3".to_string(),
                "span#L4".to_string(),
            ],
            set_artists: "div[class*='styles__Paragraph-css-in-js']".to_string(),
            advance_button_xpath:
                "//*[@id=\"react-root\"]/div[1]/div[2]/div[3]/div/div/div[1]/div/div[2]/button"
                    .to_string(),
            ready_marker: "h1".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser: BrowserConfig {
                webdriver_url: "http://localhost:9515".to_string(),
                driver_path: None,
                browser_binary: None,
                headless: true,
                page_load_timeout_seconds: 10,
                driver_start_timeout_ms: 10_000,
                window_size: "1920,1080".to_string(),
            },
            scrape: ScrapeConfig {
                site_base_url: "https://www.mixcloud.com/".to_string(),
                allowed_hosts: vec!["mixcloud.com".to_string(), "www.mixcloud.com".to_string()],
                scroll_count: 10,
                scroll_pause_seconds: 3.0,
                sample_size: 2,
                advance_pause_ms: 500,
                in_page_scroll_pixels: 300,
                static_fetch: true,
                request_timeout_seconds: 30,
                user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            },
            selectors: SelectorConfig::default(),
            output: OutputConfig {
                output_dir: PathBuf::from("./data"),
                formats: vec![ExportFormat::CSV, ExportFormat::JSON],
                stem_template: "{profile}".to_string(),
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_webdriver_url(mut self, url: impl Into<String>) -> Self {
        self.config.browser.webdriver_url = url.into();
        self
    }

    pub fn with_driver_path(mut self, path: PathBuf) -> Self {
        self.config.browser.driver_path = Some(path);
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.config.browser.headless = headless;
        self
    }

    pub fn with_page_timeout(mut self, seconds: u64) -> Self {
        self.config.browser.page_load_timeout_seconds = seconds;
        self
    }

    pub fn with_scroll_count(mut self, count: u32) -> Self {
        self.config.scrape.scroll_count = count;
        self
    }

    pub fn with_scroll_pause(mut self, seconds: f64) -> Self {
        self.config.scrape.scroll_pause_seconds = seconds;
        self
    }

    pub fn with_sample_size(mut self, size: i64) -> Self {
        self.config.scrape.sample_size = size;
        self
    }

    pub fn with_advance_pause_ms(mut self, millis: u64) -> Self {
        self.config.scrape.advance_pause_ms = millis;
        self
    }

    pub fn static_fetch(mut self, enable: bool) -> Self {
        self.config.scrape.static_fetch = enable;
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.output_dir = dir;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
