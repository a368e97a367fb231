//! Headless browser session for the map scraper.
//!
//! Uses chromiumoxide (CDP) to drive a local or remote Chrome. A session owns
//! one browser and one page and lives for a single search.

#[cfg(feature = "browser")]
mod chrome;
mod page;

#[cfg(feature = "browser")]
pub use chrome::ChromePage;
pub use page::{MapPage, TextRead};

use thiserror::Error;

#[cfg(feature = "browser")]
use std::path::PathBuf;
#[cfg(feature = "browser")]
use std::time::Duration;

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;
#[cfg(feature = "browser")]
use tokio::task::JoinHandle;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

#[cfg(feature = "browser")]
use crate::config::{BrowserEngineConfig, ScrapeConfig};

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Chrome/Chromium not found. Install it or set CHROME_EXECUTABLE")]
    ExecutableNotFound,
    #[error("Failed to launch browser: {0}")]
    Launch(String),
    #[error("Failed to connect to remote browser at {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("Element not found: {0}")]
    ElementNotFound(String),
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("Browser protocol error: {0}")]
    Cdp(String),
    #[error("Browser support not compiled. Rebuild with: cargo build --features browser")]
    NotCompiled,
}

#[cfg(feature = "browser")]
impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        BrowserError::Cdp(e.to_string())
    }
}

/// Scoped browser session: one browser, one page.
///
/// Call [`BrowserSession::close`] when done. A session dropped without it
/// (a cancelled request) is shut down on a background task.
#[cfg(feature = "browser")]
pub struct BrowserSession {
    /// `None` once shut down.
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    page: ChromePage,
    /// Remote browsers are shared; only the page is closed.
    remote: bool,
}

#[cfg(feature = "browser")]
impl BrowserSession {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        // Common install locations
        "/opt/google/chrome/google-chrome",
    ];

    /// Names looked up on PATH.
    const CHROME_COMMANDS: &'static [&'static str] = &[
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
    ];

    /// Launch a local browser, or connect to a remote one, and open a page.
    pub async fn open(
        config: &BrowserEngineConfig,
        scrape: &ScrapeConfig,
    ) -> Result<Self, BrowserError> {
        let (browser, handler) = match config.remote_url.as_deref() {
            Some(url) => Self::connect_remote(config, url).await?,
            None => Self::launch(config).await?,
        };

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(e.into());
            }
        };

        if let Err(e) = page
            .execute(SetUserAgentOverrideParams::new(config.user_agent.clone()))
            .await
        {
            warn!("Could not override user agent: {}", e);
        }

        Ok(Self {
            browser: Some(browser),
            handler: Some(handler),
            page: ChromePage::new(page, config.timeout, scrape.poll_interval()),
            remote: config.remote_url.is_some(),
        })
    }

    /// The session's page.
    pub fn page(&self) -> &ChromePage {
        &self.page
    }

    /// Close the page and the browser.
    pub async fn close(mut self) {
        if let Some(browser) = self.browser.take() {
            shutdown(
                self.page.inner().clone(),
                browser,
                self.handler.take(),
                self.remote,
            )
            .await;
        }
    }

    /// Whether the browser is still owned by this session.
    pub fn is_open(&self) -> bool {
        self.browser.is_some()
    }

    /// Find Chrome executable.
    fn find_chrome(config: &BrowserEngineConfig) -> Result<PathBuf, BrowserError> {
        if let Some(path) = &config.chrome_executable {
            if path.exists() {
                return Ok(path.clone());
            }
            warn!(
                "Configured Chrome executable {} does not exist, searching",
                path.display()
            );
        }

        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                info!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in Self::CHROME_COMMANDS {
            if let Ok(path) = which::which(cmd) {
                info!("Found Chrome in PATH: {}", path.display());
                return Ok(path);
            }
        }

        Err(BrowserError::ExecutableNotFound)
    }

    async fn launch(
        config: &BrowserEngineConfig,
    ) -> Result<(Browser, JoinHandle<()>), BrowserError> {
        info!("Launching browser (headless={})", config.headless);

        let chrome_path = Self::find_chrome(config)?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(config.window_width, config.window_height)
            .request_timeout(Duration::from_secs(config.timeout));

        // with_head means NOT headless
        if !config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-gpu");

        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        let browser_config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handle = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok((browser, handle))
    }

    /// Connect to a remote Chrome instance.
    async fn connect_remote(
        config: &BrowserEngineConfig,
        url: &str,
    ) -> Result<(Browser, JoinHandle<()>), BrowserError> {
        info!(
            "Connecting to remote browser at {} (timeout: {}s)",
            url, config.timeout
        );

        let ws_url = resolve_ws_url(url).await?;
        debug!("Connecting to WebSocket: {}", ws_url);

        let handler_config = chromiumoxide::handler::HandlerConfig {
            request_timeout: Duration::from_secs(config.timeout),
            ..Default::default()
        };

        let (browser, mut handler) = Browser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(|e| BrowserError::Connect {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let handle = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok((browser, handle))
    }
}

#[cfg(feature = "browser")]
impl Drop for BrowserSession {
    fn drop(&mut self) {
        let Some(browser) = self.browser.take() else {
            return;
        };
        warn!("Browser session dropped without close, shutting down in background");
        let page = self.page.inner().clone();
        let handler = self.handler.take();
        let remote = self.remote;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(shutdown(page, browser, handler, remote));
            }
            // No runtime left: chromiumoxide kills the child when `browser` drops.
            Err(_) => {
                if let Some(handler) = handler {
                    handler.abort();
                }
            }
        }
    }
}

/// Close the page, then the browser unless it is shared, then stop the handler.
#[cfg(feature = "browser")]
async fn shutdown(
    page: Page,
    mut browser: Browser,
    handler: Option<JoinHandle<()>>,
    remote: bool,
) {
    if let Err(e) = page.close().await {
        debug!("Page close failed: {}", e);
    }
    if !remote {
        if let Err(e) = browser.close().await {
            debug!("Browser close failed: {}", e);
        }
        let _ = browser.wait().await;
    }
    if let Some(handler) = handler {
        handler.abort();
    }
}

/// Resolve a DevTools WebSocket URL from a `ws://host:port` or `http://host:port` base.
#[cfg(feature = "browser")]
async fn resolve_ws_url(url: &str) -> Result<String, BrowserError> {
    let connect_err = |reason: String| BrowserError::Connect {
        url: url.to_string(),
        reason,
    };

    // Already a full debugger URL
    if url.contains("/devtools/browser/") {
        return Ok(url.to_string());
    }

    let version_url = format!("{}/json/version", devtools_http_base(url));

    let resp: serde_json::Value = reqwest::Client::new()
        .get(&version_url)
        .send()
        .await
        .map_err(|e| connect_err(e.to_string()))?
        .json()
        .await
        .map_err(|e| connect_err(format!("invalid /json/version response: {}", e)))?;

    resp.get("webSocketDebuggerUrl")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| connect_err("no webSocketDebuggerUrl in response".to_string()))
}

/// HTTP base of a DevTools endpoint.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn devtools_http_base(url: &str) -> String {
    url.replace("ws://", "http://")
        .replace("wss://", "https://")
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_devtools_http_base() {
        assert_eq!(
            devtools_http_base("ws://localhost:9222/"),
            "http://localhost:9222"
        );
        assert_eq!(
            devtools_http_base("wss://chrome.internal:443"),
            "https://chrome.internal:443"
        );
        assert_eq!(
            devtools_http_base("http://127.0.0.1:9222"),
            "http://127.0.0.1:9222"
        );
    }

    /// Needs a local Chrome.
    ///
    /// Run with: cargo test dropped_session -- --ignored
    #[cfg(feature = "browser")]
    #[tokio::test]
    #[ignore]
    async fn test_dropped_session_shuts_down_in_background() {
        let browser = BrowserEngineConfig::default();
        let scrape = ScrapeConfig::default();

        let first = BrowserSession::open(&browser, &scrape).await.unwrap();
        assert!(first.is_open());
        drop(first);
        tokio::time::sleep(Duration::from_secs(2)).await;

        let second = BrowserSession::open(&browser, &scrape).await.unwrap();
        second.page().navigate("about:blank").await.unwrap();
        second.close().await;
    }

    #[test]
    fn test_error_messages() {
        let err = BrowserError::Navigation {
            url: "https://example.com".into(),
            reason: "net::ERR_NAME_NOT_RESOLVED".into(),
        };
        assert_eq!(
            err.to_string(),
            "Navigation to https://example.com failed: net::ERR_NAME_NOT_RESOLVED"
        );
    }
}
