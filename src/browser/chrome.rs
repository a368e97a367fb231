//! `MapPage` implementation over a chromiumoxide page.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::layout::Point;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::page::{MapPage, TextRead};
use super::BrowserError;

/// JavaScript to wait for page ready state.
const WAIT_FOR_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
            setTimeout(() => resolve('timeout'), 10000);
        }
    })
"#;

/// Quote a string as a JavaScript literal.
fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Chrome-backed page.
pub struct ChromePage {
    page: Page,
    timeout: Duration,
    poll_interval: Duration,
}

impl ChromePage {
    pub fn new(page: Page, timeout_secs: u64, poll_interval: Duration) -> Self {
        Self {
            page,
            timeout: Duration::from_secs(timeout_secs),
            poll_interval,
        }
    }

    pub(crate) fn inner(&self) -> &Page {
        &self.page
    }

    /// Evaluate a script, logging and returning `None` on any failure.
    async fn eval<T: DeserializeOwned>(&self, script: String) -> Option<T> {
        match tokio::time::timeout(self.timeout, self.page.evaluate(script)).await {
            Ok(Ok(result)) => match result.into_value() {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!("Unexpected script result: {}", e);
                    None
                }
            },
            Ok(Err(e)) => {
                debug!("Script evaluation failed: {}", e);
                None
            }
            Err(_) => {
                warn!("Script evaluation timed out after {:?}", self.timeout);
                None
            }
        }
    }

    async fn wait_for_ready(&self) {
        let ready = self.page.evaluate(WAIT_FOR_READY_SCRIPT.to_string());
        match tokio::time::timeout(self.timeout, ready).await {
            Ok(Ok(result)) => {
                let state: String = result
                    .into_value()
                    .unwrap_or_else(|_| "unknown".to_string());
                debug!("Page ready state: {}", state);
            }
            Ok(Err(e)) => debug!("Could not check ready state: {}", e),
            Err(_) => warn!("Timeout waiting for page ready state"),
        }
    }
}

#[async_trait]
impl MapPage for ChromePage {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        tracing::info!("Navigating to {}", url);
        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|reason| BrowserError::Navigation {
                url: url.to_string(),
                reason,
            })?;

        tokio::time::timeout(self.timeout, self.page.execute(nav_params))
            .await
            .map_err(|_| BrowserError::Timeout(self.timeout))?
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        self.wait_for_ready().await;
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
        let element = tokio::time::timeout(self.timeout, self.page.find_element(selector))
            .await
            .map_err(|_| BrowserError::Timeout(self.timeout))?
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;

        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn press_key(&self, key: &str) {
        // Key events go to whatever has focus; body is just a handle.
        let result = async {
            let body = self.page.find_element("body").await?;
            body.press_key(key).await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        };
        match tokio::time::timeout(self.timeout, result).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Key press {} failed: {}", key, e),
            Err(_) => warn!("Key press {} timed out", key),
        }
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.count(selector).await > 0 {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                debug!("Timed out waiting for {}", selector);
                return false;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn count(&self, selector: &str) -> usize {
        let script = format!(
            "document.querySelectorAll({}).length",
            js_str(selector)
        );
        self.eval::<usize>(script).await.unwrap_or(0)
    }

    async fn hrefs(&self, selector: &str) -> Vec<String> {
        let script = format!(
            "Array.from(document.querySelectorAll({})).map(a => a.getAttribute('href') || '')",
            js_str(selector)
        );
        self.eval::<Vec<String>>(script).await.unwrap_or_default()
    }

    async fn click(&self, selector: &str) -> bool {
        let result = async {
            let element = self.page.find_element(selector).await?;
            element.click().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        };
        match tokio::time::timeout(self.timeout, result).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                debug!("Click on {} failed: {}", selector, e);
                false
            }
            Err(_) => {
                warn!("Click on {} timed out", selector);
                false
            }
        }
    }

    async fn click_at(&self, x: f64, y: f64) -> bool {
        match tokio::time::timeout(self.timeout, self.page.click(Point::new(x, y))).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("Click at ({}, {}) failed: {}", x, y, e);
                false
            }
            Err(_) => false,
        }
    }

    async fn read_text(&self, selector: &str, timeout: Duration) -> TextRead {
        let read = async {
            let elements = self.page.find_elements(selector).await?;
            match elements.into_iter().next() {
                Some(element) => Ok(Some(element.inner_text().await?.unwrap_or_default())),
                None => Ok::<_, chromiumoxide::error::CdpError>(None),
            }
        };
        match tokio::time::timeout(timeout, read).await {
            Ok(Ok(Some(text))) => TextRead::Found(text),
            Ok(Ok(None)) => TextRead::Missing,
            Ok(Err(e)) => {
                debug!("Read of {} failed: {}", selector, e);
                TextRead::Missing
            }
            Err(_) => TextRead::TimedOut,
        }
    }

    async fn scroll_to_bottom(&self, selector: &str) -> bool {
        let script = format!(
            "(() => {{ const node = document.querySelector({}); if (!node) return false; node.scrollTop = node.scrollHeight; return true; }})()",
            js_str(selector)
        );
        self.eval::<bool>(script).await.unwrap_or(false)
    }

    async fn contains_text(&self, selector: &str, text: &str) -> bool {
        let script = format!(
            "(() => {{ const node = document.querySelector({}); return !!node && node.innerText.includes({}); }})()",
            js_str(selector),
            js_str(text)
        );
        self.eval::<bool>(script).await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_str_escapes_quotes() {
        assert_eq!(
            js_str(r#"a[href*="maps/place"]"#),
            r#""a[href*=\"maps/place\"]""#
        );
        assert_eq!(js_str("You've reached"), r#""You've reached""#);
    }
}
