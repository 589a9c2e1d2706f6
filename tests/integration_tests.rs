use async_trait::async_trait;
use mixset_catalog::config::{Config, ConfigBuilder, ExportFormat};
use mixset_catalog::error::{Result, ScrapeError};
use mixset_catalog::export::{load_dataset_csv, Exporter};
use mixset_catalog::filter::{apply_filters, tag_vocabulary, FilterCriteria};
use mixset_catalog::{build_documents, BrowserDriver, ScrapeOptions, ScrapePipeline};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const PROFILE_URL: &str = "https://www.mixcloud.com/djfixture/";
const FULL_SET_URL: &str = "https://www.mixcloud.com/djfixture/zouk-night-full/";
const BARE_SET_URL: &str = "https://www.mixcloud.com/djfixture/kizomba-bare/";

/// Browser stand-in serving canned pages by URL
struct FixtureBrowser {
    pages: HashMap<String, String>,
    broken: HashSet<String>,
    fail_start: bool,
    never_ready: bool,
    slow: HashSet<String>,
    current: Option<String>,
    quits: Arc<AtomicUsize>,
    visits: Arc<Mutex<Vec<String>>>,
}

impl FixtureBrowser {
    fn new() -> Self {
        let mut pages = HashMap::new();
        pages.insert(PROFILE_URL.to_string(), include_str!("fixtures/profile.html").to_string());
        pages.insert(FULL_SET_URL.to_string(), include_str!("fixtures/set_full.html").to_string());
        pages.insert(BARE_SET_URL.to_string(), include_str!("fixtures/set_bare.html").to_string());

        Self {
            pages,
            broken: HashSet::new(),
            fail_start: false,
            never_ready: false,
            slow: HashSet::new(),
            current: None,
            quits: Arc::new(AtomicUsize::new(0)),
            visits: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_broken(mut self, url: &str) -> Self {
        self.broken.insert(url.to_string());
        self
    }

    fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    fn never_ready(mut self) -> Self {
        self.never_ready = true;
        self
    }

    fn with_slow(mut self, url: &str) -> Self {
        self.slow.insert(url.to_string());
        self
    }

    fn quit_counter(&self) -> Arc<AtomicUsize> {
        self.quits.clone()
    }

    fn visit_log(&self) -> Arc<Mutex<Vec<String>>> {
        self.visits.clone()
    }
}

#[async_trait]
impl BrowserDriver for FixtureBrowser {
    async fn start(&mut self) -> Result<()> {
        if self.fail_start {
            return Err(ScrapeError::FatalInit("chromedriver not found".to_string()));
        }
        Ok(())
    }

    async fn goto(&mut self, url: &str) -> Result<()> {
        self.visits.lock().unwrap().push(url.to_string());
        if self.broken.contains(url) {
            return Err(ScrapeError::WebDriver("unknown error: net::ERR_FAILED".to_string()));
        }
        self.current = Some(url.to_string());
        if self.slow.contains(url) {
            return Err(ScrapeError::NavigationTimeout(url.to_string()));
        }
        Ok(())
    }

    async fn has_element(&mut self, _css: &str) -> Result<bool> {
        if self.never_ready {
            return Ok(false);
        }
        Ok(self
            .current
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .map(|page| page.contains("<h1"))
            .unwrap_or(false))
    }

    async fn scroll_to_bottom(&mut self) -> Result<()> {
        Ok(())
    }

    async fn scroll_by(&mut self, _pixels: i64) -> Result<()> {
        Ok(())
    }

    async fn click_xpath(&mut self, _xpath: &str) -> Result<bool> {
        Ok(false)
    }

    async fn page_source(&mut self) -> Result<String> {
        Ok(self
            .current
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .cloned()
            .unwrap_or_default())
    }

    async fn quit(&mut self) -> Result<()> {
        self.quits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn test_config() -> Config {
    ConfigBuilder::new()
        .static_fetch(false)
        .with_scroll_count(2)
        .with_scroll_pause(0.0)
        .with_advance_pause_ms(0)
        .with_page_timeout(1)
        .build()
}

fn options(sample_size: i64) -> ScrapeOptions {
    ScrapeOptions {
        sample_size,
        scroll_count: 2,
        headless: true,
        verbose: true,
    }
}

#[tokio::test]
async fn test_end_to_end_two_sets() {
    let browser = FixtureBrowser::new();
    let quits = browser.quit_counter();
    let pipeline = ScrapePipeline::new(test_config()).unwrap();

    let outcome = pipeline
        .scrape_profile_with_driver(Box::new(browser), PROFILE_URL, options(0))
        .await
        .unwrap();

    assert_eq!(outcome.profile.name, "DJ Fixture");
    assert_eq!(outcome.profile.followers, Some(2048));
    assert_eq!(outcome.profile.following, Some(12));
    assert_eq!(outcome.profile.set_urls, vec![FULL_SET_URL, BARE_SET_URL]);

    let rows = &outcome.dataset.records;
    assert_eq!(rows.len(), 2);

    let full = &rows[0];
    assert_eq!(full.name, "DJ Fixture");
    assert_eq!(full.show_url, FULL_SET_URL);
    assert_eq!(full.play_count, Some(1234));
    assert_eq!(full.fav_count, Some(56));
    assert!(full.date_uploaded.is_some());
    assert_eq!(full.show_tags_cleaned, "Zouk, R&B");
    assert_eq!((full.energy_min, full.energy_max), (Some(4), Some(7)));
    assert_eq!((full.bpm_min, full.bpm_max), (Some(100), Some(120)));

    let bare = &rows[1];
    assert_eq!(bare.show_url, BARE_SET_URL);
    assert_eq!(bare.play_count, Some(87));
    assert_eq!(bare.fav_count, None);
    assert_eq!(bare.energy_min, None);
    assert_eq!(bare.energy_max, None);
    assert_eq!(bare.bpm_min, None);
    assert_eq!(bare.bpm_max, None);
    assert!(bare.show_info_combined.contains("show_info_1:\nno info"));

    assert_eq!(quits.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.report.sets_discovered, 2);
    assert_eq!(outcome.report.sets_visited, 2);
    assert_eq!(outcome.report.failed_visits, 0);
}

#[tokio::test]
async fn test_sample_size_bounds_visits_in_document_order() {
    let browser = FixtureBrowser::new();
    let visits = browser.visit_log();
    let pipeline = ScrapePipeline::new(test_config()).unwrap();

    let outcome = pipeline
        .scrape_profile_with_driver(Box::new(browser), PROFILE_URL, options(1))
        .await
        .unwrap();

    assert_eq!(outcome.dataset.len(), 1);
    assert_eq!(outcome.dataset.records[0].show_url, FULL_SET_URL);
    assert_eq!(outcome.report.sets_discovered, 2);
    assert_eq!(*visits.lock().unwrap(), vec![PROFILE_URL, FULL_SET_URL]);
}

#[tokio::test]
async fn test_broken_set_page_keeps_placeholder_row() {
    let browser = FixtureBrowser::new().with_broken(FULL_SET_URL);
    let quits = browser.quit_counter();
    let pipeline = ScrapePipeline::new(test_config()).unwrap();

    let outcome = pipeline
        .scrape_profile_with_driver(Box::new(browser), PROFILE_URL, options(-1))
        .await
        .unwrap();

    let rows = &outcome.dataset.records;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].show_url, FULL_SET_URL);
    assert_eq!(rows[0].name, "DJ Fixture");
    assert_eq!(rows[0].title, None);
    assert_eq!(rows[1].title.as_deref(), Some("Kizomba Bare"));
    assert_eq!(outcome.report.failed_visits, 1);
    assert_eq!(quits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_pages_never_ready_still_yield_every_row() {
    let browser = FixtureBrowser::new().never_ready();
    let quits = browser.quit_counter();
    let pipeline = ScrapePipeline::new(test_config()).unwrap();

    let outcome = pipeline
        .scrape_profile_with_driver(Box::new(browser), PROFILE_URL, options(0))
        .await
        .unwrap();

    assert_eq!(outcome.dataset.len(), 2);
    assert_eq!(outcome.dataset.records[0].play_count, Some(1234));
    assert_eq!(outcome.report.navigation_timeouts, 3);
    assert_eq!(outcome.report.failed_visits, 0);
    assert_eq!(quits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_page_load_timeout_uses_partial_content() {
    let browser = FixtureBrowser::new().with_slow(FULL_SET_URL);
    let pipeline = ScrapePipeline::new(test_config()).unwrap();

    let outcome = pipeline
        .scrape_profile_with_driver(Box::new(browser), PROFILE_URL, options(0))
        .await
        .unwrap();

    let rows = &outcome.dataset.records;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].title.as_deref(), Some("Zouk Night Vol. 1"));
    assert_eq!(outcome.report.failed_visits, 0);
    assert_eq!(outcome.report.navigation_timeouts, 0);
}

#[tokio::test]
async fn test_browser_start_failure_is_fatal_and_released() {
    let browser = FixtureBrowser::new().failing_start();
    let quits = browser.quit_counter();
    let pipeline = ScrapePipeline::new(test_config()).unwrap();

    let err = pipeline
        .scrape_profile_with_driver(Box::new(browser), PROFILE_URL, options(0))
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::FatalInit(_)));
    assert!(err.is_fatal());
    assert_eq!(quits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_invalid_profile_url_never_touches_browser() {
    let browser = FixtureBrowser::new();
    let quits = browser.quit_counter();
    let visits = browser.visit_log();
    let pipeline = ScrapePipeline::new(test_config()).unwrap();

    let err = pipeline
        .scrape_profile_with_driver(Box::new(browser), "https://example.com/djfixture/", options(0))
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::InvalidUrl(_)));
    assert_eq!(quits.load(Ordering::SeqCst), 0);
    assert!(visits.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_scrape_export_reload_and_filter() {
    let temp_dir = TempDir::new().unwrap();
    let pipeline = ScrapePipeline::new(test_config()).unwrap();
    let outcome = pipeline
        .scrape_profile_with_driver(Box::new(FixtureBrowser::new()), PROFILE_URL, options(0))
        .await
        .unwrap();

    let exporter = Exporter::new(temp_dir.path(), vec![ExportFormat::CSV, ExportFormat::JSON]);
    let stem = outcome.profile_slug();
    assert_eq!(stem, "djfixture");
    exporter
        .export(&stem, &outcome.profile, &outcome.dataset)
        .await
        .unwrap();

    let loaded = load_dataset_csv(&temp_dir.path().join("djfixture_sets.csv")).unwrap();
    assert_eq!(loaded, outcome.dataset);
    assert_eq!(tag_vocabulary(&loaded), vec!["Kizomba", "R&B", "Zouk"]);

    let zouk = FilterCriteria::builder().with_tags(["zouk"]).build();
    let filtered = apply_filters(&loaded, &zouk);
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered.records[0].show_url, FULL_SET_URL);

    let energetic = FilterCriteria::builder().energy_overlapping(7, 10).build();
    assert_eq!(apply_filters(&loaded, &energetic).len(), 1);
}

#[tokio::test]
async fn test_documents_for_scraped_profile() {
    let pipeline = ScrapePipeline::new(test_config()).unwrap();
    let outcome = pipeline
        .scrape_profile_with_driver(Box::new(FixtureBrowser::new()), PROFILE_URL, options(0))
        .await
        .unwrap();

    let documents = build_documents(&outcome.dataset, &[outcome.profile.clone()]);
    assert_eq!(documents.len(), 2);
    assert!(documents[0].content.starts_with("dj_name: DJ Fixture,\n"));
    assert!(documents[0].content.contains("df_followers: 2048,\n"));
    assert!(documents[1].content.contains("energy_min: None,\n"));
}
