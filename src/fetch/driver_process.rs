/// Local chromedriver process management
use crate::error::{Result, ScrapeError};
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};
use url::Url;

const CONNECT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A chromedriver child process listening on the configured endpoint.
///
/// The process is killed when this value is stopped or dropped.
pub struct DriverProcess {
    child: Child,
    port: u16,
}

impl DriverProcess {
    /// Start `driver_path` on the port of `endpoint` and wait until it
    /// accepts TCP connections.
    pub async fn spawn(driver_path: &Path, endpoint: &str, start_timeout: Duration) -> Result<Self> {
        let (host, port) = local_endpoint(endpoint)?;

        let mut child = Command::new(driver_path)
            .arg(format!("--port={}", port))
            .arg("--log-level=SEVERE")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ScrapeError::FatalInit(format!("failed to spawn {}: {}", driver_path.display(), e))
            })?;

        let deadline = Instant::now() + start_timeout;
        loop {
            if TcpStream::connect((host.as_str(), port)).await.is_ok() {
                info!("🚗 chromedriver ready on port {}", port);
                return Ok(Self { child, port });
            }

            if let Ok(Some(status)) = child.try_wait() {
                return Err(ScrapeError::FatalInit(format!(
                    "{} exited early with status {}",
                    driver_path.display(),
                    status
                )));
            }

            if Instant::now() >= deadline {
                let _ = child.kill().await;
                return Err(ScrapeError::FatalInit(format!(
                    "{} did not become ready within {}ms",
                    driver_path.display(),
                    start_timeout.as_millis()
                )));
            }

            tokio::time::sleep(CONNECT_POLL_INTERVAL).await;
        }
    }

    /// Kill the process and reap it
    pub async fn stop(&mut self) {
        match self.child.kill().await {
            Ok(()) => debug!("Stopped chromedriver on port {}", self.port),
            Err(e) => warn!("Failed to stop chromedriver on port {}: {}", self.port, e),
        }
    }
}

/// Host and port of a WebDriver endpoint; autostart is limited to loopback
fn local_endpoint(endpoint: &str) -> Result<(String, u16)> {
    let parsed = Url::parse(endpoint)
        .map_err(|e| ScrapeError::InvalidConfig(format!("invalid webdriver url: {}", e)))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| ScrapeError::InvalidConfig("webdriver url has no host".to_string()))?
        .to_ascii_lowercase();

    if host != "localhost" && host != "127.0.0.1" {
        return Err(ScrapeError::InvalidConfig(
            "chromedriver autostart only supports localhost endpoints".to_string(),
        ));
    }

    let port = parsed.port_or_known_default().unwrap_or(9515);
    Ok((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_endpoint() {
        assert_eq!(
            local_endpoint("http://localhost:9515").unwrap(),
            ("localhost".to_string(), 9515)
        );
        assert_eq!(
            local_endpoint("http://127.0.0.1:4444/").unwrap(),
            ("127.0.0.1".to_string(), 4444)
        );
        assert!(local_endpoint("http://remote-grid:4444").is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_is_fatal() {
        let err = DriverProcess::spawn(
            Path::new("/nonexistent/chromedriver"),
            "http://localhost:9515",
            Duration::from_millis(100),
        )
        .await
        .err()
        .unwrap();
        assert!(err.is_fatal());
    }
}
