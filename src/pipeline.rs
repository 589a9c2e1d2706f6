/// Scrape pipeline: profile URL in, profile record and typed dataset out
use crate::config::Config;
use crate::error::{Result, ScrapeError};
use crate::fetch::{create_driver, profile_slug, validate_profile_url, BrowserDriver, HttpFetcher, PageFetcher};
use crate::normalize::{Dataset, Normalizer};
use crate::parser::{EntityParser, ProfileRecord};
use crate::walker::{stage, CollectionWalker, ScrapeReport, WalkerSettings};
use std::sync::Arc;
use tracing::info;
use url::Url;

/// Per-run overrides of the configured scrape settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeOptions {
    /// 0 or negative takes every discovered set
    pub sample_size: i64,
    pub scroll_count: u32,
    pub headless: bool,
    /// Log stage banners at info level
    pub verbose: bool,
}

impl ScrapeOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            sample_size: config.scrape.sample_size,
            scroll_count: config.scrape.scroll_count,
            headless: config.browser.headless,
            verbose: false,
        }
    }
}

/// Result of one profile scrape
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub profile: ProfileRecord,
    pub dataset: Dataset,
    pub report: ScrapeReport,
}

impl ScrapeOutcome {
    /// Slug used to name output files
    pub fn profile_slug(&self) -> String {
        Url::parse(&self.report.profile_url)
            .ok()
            .and_then(|url| profile_slug(&url))
            .unwrap_or_else(|| self.profile.name.clone())
    }
}

pub struct ScrapePipeline {
    config: Config,
    parser: EntityParser,
    fetcher: Option<Arc<dyn PageFetcher>>,
}

impl ScrapePipeline {
    /// Validate `config` and build the parser and optional static fetcher
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let parser = EntityParser::new(&config.selectors, &config.scrape.site_base_url)?;
        let fetcher: Option<Arc<dyn PageFetcher>> = if config.scrape.static_fetch {
            Some(Arc::new(HttpFetcher::new(&config.scrape)?))
        } else {
            None
        };

        Ok(Self {
            config,
            parser,
            fetcher,
        })
    }

    /// Replace the static fetcher; `None` reads set pages from the browser
    pub fn with_page_fetcher(mut self, fetcher: Option<Arc<dyn PageFetcher>>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Scrape one profile with a WebDriver browser
    pub async fn scrape_profile(
        &self,
        profile_url: &str,
        sample_size: i64,
        scroll_count: u32,
        headless: bool,
        verbose: bool,
    ) -> Result<ScrapeOutcome> {
        let options = ScrapeOptions {
            sample_size,
            scroll_count,
            headless,
            verbose,
        };
        // Reject bad input before a driver process is involved
        validate_profile_url(profile_url, &self.config.scrape.allowed_hosts)?;
        let driver = create_driver(&self.config, headless)?;
        self.scrape_profile_with_driver(driver, profile_url, options)
            .await
    }

    /// Scrape one profile through an already constructed driver
    pub async fn scrape_profile_with_driver(
        &self,
        driver: Box<dyn BrowserDriver>,
        profile_url: &str,
        options: ScrapeOptions,
    ) -> Result<ScrapeOutcome> {
        let url = validate_profile_url(profile_url, &self.config.scrape.allowed_hosts)?;
        if options.scroll_count > 100 {
            return Err(ScrapeError::InvalidConfig(
                "scroll_count must not exceed 100".to_string(),
            ));
        }

        info!("🚀 Scraping profile {}", url);
        let mut settings = WalkerSettings::from_config(&self.config);
        settings.sample_size = options.sample_size;
        settings.scroll_count = options.scroll_count;
        settings.verbose = options.verbose;

        let mut walker = CollectionWalker::new(&self.parser, settings);
        if let Some(fetcher) = &self.fetcher {
            walker = walker.with_static_fetcher(fetcher.as_ref());
        }
        let walk = walker.walk(driver, url.as_str()).await?;

        stage(options.verbose, "6️⃣ Building dataset");
        let normalizer = Normalizer::new();
        let dataset = Dataset::new(normalizer.normalize(&walk.sets));
        info!(
            "📊 Dataset for '{}': {} row(s)",
            walk.profile.name,
            dataset.len()
        );
        walk.report.log_summary();

        Ok(ScrapeOutcome {
            profile: walk.profile,
            dataset,
            report: walk.report,
        })
    }
}

/// Scrape with the configuration found on disk or in the environment
pub async fn scrape_profile(
    profile_url: &str,
    sample_size: i64,
    scroll_count: u32,
    headless: bool,
    verbose: bool,
) -> Result<ScrapeOutcome> {
    let pipeline = ScrapePipeline::new(Config::load()?)?;
    pipeline
        .scrape_profile(profile_url, sample_size, scroll_count, headless, verbose)
        .await
}
