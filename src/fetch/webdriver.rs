/// Minimal W3C WebDriver client (chromedriver) over reqwest
use super::driver_process::DriverProcess;
use super::BrowserDriver;
use crate::config::BrowserConfig;
use crate::error::{Result, ScrapeError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// W3C element reference key
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4a4b9ab82b9b";

/// Browser driven through a WebDriver endpoint.
///
/// When `driver_path` is configured the chromedriver process is started on
/// `start()` and killed on `quit()`.
pub struct WebDriverClient {
    client: Client,
    endpoint: String,
    session_id: Option<String>,
    capabilities: Value,
    driver_path: Option<std::path::PathBuf>,
    driver_start_timeout: Duration,
    process: Option<DriverProcess>,
}

impl WebDriverClient {
    pub fn new(config: &BrowserConfig, headless: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.page_load_timeout_seconds + 30))
            .build()
            .map_err(|e| ScrapeError::FatalInit(format!("webdriver client build failed: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.webdriver_url.trim_end_matches('/').to_string(),
            session_id: None,
            capabilities: chrome_capabilities(config, headless),
            driver_path: config.driver_path.clone(),
            driver_start_timeout: Duration::from_millis(config.driver_start_timeout_ms),
            process: None,
        })
    }

    fn session_url(&self, path: &str) -> Result<String> {
        let session_id = self
            .session_id
            .as_ref()
            .ok_or_else(|| ScrapeError::WebDriver("no active browser session".to_string()))?;
        Ok(format!("{}/session/{}{}", self.endpoint, session_id, path))
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let url = self.session_url(path)?;
        let response = self.client.post(&url).json(&body).send().await?;
        read_webdriver_value(response).await
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let url = self.session_url(path)?;
        let response = self.client.get(&url).send().await?;
        read_webdriver_value(response).await
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.post("/execute/sync", json!({ "script": script, "args": args }))
            .await
    }

    async fn find_elements(&self, using: &str, value: &str) -> Result<Vec<String>> {
        let found = self
            .post("/elements", json!({ "using": using, "value": value }))
            .await?;
        Ok(found
            .as_array()
            .map(|elements| {
                elements
                    .iter()
                    .filter_map(|el| el.get(ELEMENT_KEY).and_then(|id| id.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl BrowserDriver for WebDriverClient {
    async fn start(&mut self) -> Result<()> {
        if let Some(driver_path) = &self.driver_path {
            let process =
                DriverProcess::spawn(driver_path, &self.endpoint, self.driver_start_timeout).await?;
            self.process = Some(process);
        }

        let response = self
            .client
            .post(format!("{}/session", self.endpoint))
            .json(&self.capabilities)
            .send()
            .await
            .map_err(|e| ScrapeError::FatalInit(format!("session create request failed: {}", e)))?;
        let value = read_webdriver_value(response)
            .await
            .map_err(|e| ScrapeError::FatalInit(format!("session create failed: {}", e)))?;

        let session_id = value
            .get("sessionId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ScrapeError::FatalInit("session id missing in response".to_string()))?;

        info!("✅ Browser session started: {}", session_id);
        self.session_id = Some(session_id.to_string());
        Ok(())
    }

    async fn goto(&mut self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);
        match self.post("/url", json!({ "url": url })).await {
            Err(ScrapeError::WebDriver(msg)) if msg.starts_with("timeout") => {
                Err(ScrapeError::NavigationTimeout(url.to_string()))
            }
            other => other.map(|_| ()),
        }
    }

    async fn has_element(&mut self, css: &str) -> Result<bool> {
        Ok(!self.find_elements("css selector", css).await?.is_empty())
    }

    async fn scroll_to_bottom(&mut self) -> Result<()> {
        self.execute("window.scrollTo(0, document.body.scrollHeight);", vec![])
            .await
            .map(|_| ())
    }

    async fn scroll_by(&mut self, pixels: i64) -> Result<()> {
        self.execute("window.scrollBy(0, arguments[0]);", vec![json!(pixels)])
            .await
            .map(|_| ())
    }

    async fn click_xpath(&mut self, xpath: &str) -> Result<bool> {
        let elements = self.find_elements("xpath", xpath).await?;
        let Some(element_id) = elements.first() else {
            return Ok(false);
        };
        self.post(&format!("/element/{}/click", element_id), json!({}))
            .await?;
        Ok(true)
    }

    async fn page_source(&mut self) -> Result<String> {
        let value = self.get("/source").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ScrapeError::WebDriver("page source was not a string".to_string()))
    }

    async fn quit(&mut self) -> Result<()> {
        let mut result = Ok(());

        if let Some(session_id) = self.session_id.take() {
            let url = format!("{}/session/{}", self.endpoint, session_id);
            match self.client.delete(&url).send().await {
                Ok(_) => debug!("Deleted browser session {}", session_id),
                Err(e) => {
                    warn!("Failed to delete browser session {}: {}", session_id, e);
                    result = Err(ScrapeError::Http(e));
                }
            }
        }

        if let Some(mut process) = self.process.take() {
            process.stop().await;
        }

        result
    }
}

/// Unwrap a WebDriver response body into its `value`, mapping protocol
/// errors to `ScrapeError::WebDriver("<error>: <message>")`.
async fn read_webdriver_value(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let body = response.text().await?;
    let parsed: Value = serde_json::from_str(&body).unwrap_or_default();

    if let Some(err) = parsed.pointer("/value/error").and_then(|v| v.as_str()) {
        let message = parsed
            .pointer("/value/message")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown webdriver error");
        return Err(ScrapeError::WebDriver(format!("{}: {}", err, message)));
    }

    if !status.is_success() {
        return Err(ScrapeError::WebDriver(format!(
            "HTTP {}: {}",
            status.as_u16(),
            truncate_for_log(&body, 240)
        )));
    }

    Ok(parsed.get("value").cloned().unwrap_or(Value::Null))
}

/// Chrome capabilities for a scraping session
fn chrome_capabilities(config: &BrowserConfig, headless: bool) -> Value {
    let mut args = vec![
        "--disable-extensions".to_string(),
        "--disable-gpu".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--no-sandbox".to_string(),
    ];
    if headless {
        args.push("--headless=new".to_string());
        args.push(format!("--window-size={}", config.window_size));
    }

    let mut chrome_options = json!({ "args": args });
    if let Some(binary) = &config.browser_binary {
        chrome_options["binary"] = json!(binary.to_string_lossy().to_string());
    }

    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "pageLoadStrategy": "eager",
                "timeouts": { "pageLoad": config.page_load_timeout_seconds * 1000 },
                "goog:chromeOptions": chrome_options
            }
        }
    })
}

fn truncate_for_log(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        input.to_string()
    } else {
        let truncated: String = input.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
