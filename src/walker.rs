/// Collection walker: one profile visit from opening the browser to closing it
///
/// Stages run in a fixed order: open the session on the profile, scroll to
/// materialise lazy-loaded set links, parse the profile, bound the set list,
/// visit each set in document order, close the session.
use crate::config::Config;
use crate::error::Result;
use crate::fetch::{BrowserDriver, PageFetcher, ParsedDocument, Session};
use crate::parser::{EntityParser, Extraction, FieldMiss, ProfileRecord, RawSetRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Knobs for a single walk
#[derive(Debug, Clone)]
pub struct WalkerSettings {
    pub scroll_count: u32,
    pub scroll_pause: Duration,
    /// 0 or negative visits every discovered set
    pub sample_size: i64,
    pub page_timeout: Duration,
    pub ready_marker: String,
    pub advance_button_xpath: String,
    pub advance_pause: Duration,
    pub in_page_scroll_pixels: i64,
    pub verbose: bool,
}

impl WalkerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scroll_count: config.scrape.scroll_count,
            scroll_pause: Duration::from_secs_f64(config.scrape.scroll_pause_seconds.max(0.0)),
            sample_size: config.scrape.sample_size,
            page_timeout: Duration::from_secs(config.browser.page_load_timeout_seconds),
            ready_marker: config.selectors.ready_marker.clone(),
            advance_button_xpath: config.selectors.advance_button_xpath.clone(),
            advance_pause: Duration::from_millis(config.scrape.advance_pause_ms),
            in_page_scroll_pixels: config.scrape.in_page_scroll_pixels,
            verbose: false,
        }
    }
}

/// Summary of one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeReport {
    pub profile_url: String,
    pub sets_discovered: usize,
    pub sets_visited: usize,
    /// Visits that produced only an empty placeholder record
    pub failed_visits: usize,
    pub navigation_timeouts: usize,
    /// Missing-field counts keyed by field name
    pub field_misses: BTreeMap<String, usize>,
    pub elapsed: Duration,
}

impl ScrapeReport {
    fn record_misses(&mut self, misses: &[FieldMiss]) {
        for miss in misses {
            *self.field_misses.entry(miss.field.to_string()).or_insert(0) += 1;
        }
    }

    pub fn total_misses(&self) -> usize {
        self.field_misses.values().sum()
    }

    pub fn log_summary(&self) {
        info!("🎉 Scrape completed in {:.2}s", self.elapsed.as_secs_f64());
        info!(
            "🎧 Sets: {} discovered, {} visited, {} failed",
            self.sets_discovered, self.sets_visited, self.failed_visits
        );
        if self.navigation_timeouts > 0 {
            info!("⏰ Navigation timeouts: {}", self.navigation_timeouts);
        }
        for (field, count) in &self.field_misses {
            info!("⚠️ Missing '{}' on {} page(s)", field, count);
        }
    }
}

/// Everything one walk produced
#[derive(Debug, Clone)]
pub struct WalkResult {
    pub profile: ProfileRecord,
    pub sets: Vec<RawSetRecord>,
    pub report: ScrapeReport,
}

/// Drives one browser session over a profile and its sets
pub struct CollectionWalker<'a> {
    parser: &'a EntityParser,
    fetcher: Option<&'a dyn PageFetcher>,
    settings: WalkerSettings,
}

impl<'a> CollectionWalker<'a> {
    pub fn new(parser: &'a EntityParser, settings: WalkerSettings) -> Self {
        Self {
            parser,
            fetcher: None,
            settings,
        }
    }

    /// Re-fetch set pages through `fetcher` instead of reading the browser DOM
    pub fn with_static_fetcher(mut self, fetcher: &'a dyn PageFetcher) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Walk `profile_url`. Only a browser start failure is returned as an error;
    /// the session is closed on every other path.
    pub async fn walk(&self, driver: Box<dyn BrowserDriver>, profile_url: &str) -> Result<WalkResult> {
        let start = Instant::now();

        stage(self.settings.verbose, "1️⃣ Initializing browser session");
        let mut session = Session::open(
            driver,
            profile_url,
            self.settings.page_timeout,
            &self.settings.ready_marker,
        )
        .await?;

        let (profile, sets, mut report) = self.run(&mut session, profile_url).await;

        stage(self.settings.verbose, "7️⃣ Closing browser session");
        if let Err(e) = session.close().await {
            warn!("Failed to close browser session cleanly: {}", e);
        }

        report.elapsed = start.elapsed();
        Ok(WalkResult {
            profile,
            sets,
            report,
        })
    }

    async fn run(
        &self,
        session: &mut Session,
        profile_url: &str,
    ) -> (ProfileRecord, Vec<RawSetRecord>, ScrapeReport) {
        let mut report = ScrapeReport {
            profile_url: profile_url.to_string(),
            ..Default::default()
        };
        if session.initial_load_timed_out() {
            report.navigation_timeouts += 1;
        }

        stage(
            self.settings.verbose,
            &format!("2️⃣ Scrolling profile {} time(s)", self.settings.scroll_count),
        );
        if let Err(e) = session
            .scroll(self.settings.scroll_count, self.settings.scroll_pause)
            .await
        {
            warn!("⚠️ Scrolling {} stopped early: {}", profile_url, e);
        }

        stage(self.settings.verbose, "3️⃣ Reading profile page source");
        let source = match session.page_source().await {
            Ok(source) => source,
            Err(e) => {
                warn!("⚠️ Could not read profile page {}: {}", profile_url, e);
                String::new()
            }
        };

        stage(self.settings.verbose, "4️⃣ Extracting profile");
        let extraction = self.parse_profile_source(profile_url, &source);
        report.record_misses(&extraction.misses);
        let profile = extraction.record;
        report.sets_discovered = profile.set_urls.len();
        info!(
            "👤 Profile '{}' lists {} set(s)",
            profile.name, report.sets_discovered
        );

        let selected = bound_sample(&profile.set_urls, self.settings.sample_size);
        stage(
            self.settings.verbose,
            &format!(
                "5️⃣ Visiting {} of {} set(s)",
                selected.len(),
                report.sets_discovered
            ),
        );

        let total = selected.len();
        let mut sets = Vec::with_capacity(total);
        for (index, url) in selected.iter().enumerate() {
            info!("🎧 Scraping set {}/{}: {}", index + 1, total, url);
            let record = match self.visit_set(session, url, &mut report).await {
                Ok(mut record) => {
                    record.name = profile.name.clone();
                    record
                }
                Err(e) => {
                    warn!("❌ Visiting {} failed, keeping an empty record: {}", url, e);
                    report.failed_visits += 1;
                    RawSetRecord::empty(&profile.name, url)
                }
            };
            report.sets_visited += 1;
            sets.push(record);
        }

        (profile, sets, report)
    }

    async fn visit_set(
        &self,
        session: &mut Session,
        url: &str,
        report: &mut ScrapeReport,
    ) -> Result<RawSetRecord> {
        if !session.navigate(url).await? {
            report.navigation_timeouts += 1;
        }

        if let Err(e) = session.scroll_by(self.settings.in_page_scroll_pixels).await {
            debug!("In-page scroll failed on {}: {}", url, e);
        }
        session
            .click_if_present(&self.settings.advance_button_xpath, self.settings.advance_pause)
            .await;

        let source = match self.fetcher {
            Some(fetcher) => match fetcher.fetch(url).await {
                Ok(source) => source,
                Err(e) => {
                    warn!("⚠️ Static fetch of {} failed, using browser DOM: {}", url, e);
                    session.page_source().await?
                }
            },
            None => session.page_source().await?,
        };

        let extraction = self.parse_set_source(url, &source);
        report.record_misses(&extraction.misses);
        Ok(extraction.record)
    }

    fn parse_profile_source(&self, url: &str, source: &str) -> Extraction<ProfileRecord> {
        let document = ParsedDocument::parse(url, source);
        self.parser.parse_profile(&document)
    }

    fn parse_set_source(&self, url: &str, source: &str) -> Extraction<RawSetRecord> {
        let document = ParsedDocument::parse(url, source);
        self.parser.parse_set(&document)
    }
}

/// The first `sample_size` URLs, or all of them when `sample_size` is not
/// positive or exceeds what was discovered
pub fn bound_sample(urls: &[String], sample_size: i64) -> &[String] {
    if sample_size <= 0 {
        return urls;
    }
    let take = usize::try_from(sample_size).unwrap_or(usize::MAX).min(urls.len());
    &urls[..take]
}

/// Stage banner: `info` when the run is verbose, `debug` otherwise
pub(crate) fn stage(verbose: bool, message: &str) {
    if verbose {
        info!("{}", message);
    } else {
        debug!("{}", message);
    }
}
