//! Page capability consumed by the scraper.
//!
//! The collector and extractor only see this trait. Every operation except
//! navigation and typing is tolerant: failures come back as values
//! (`TextRead::Missing`, `false`, `0`) instead of errors, so the retry loops
//! decide what to do with them.

use std::time::Duration;

use async_trait::async_trait;

use super::BrowserError;

/// Outcome of a bounded text read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextRead {
    /// The element exists and its inner text was read.
    Found(String),
    /// No element matched the selector.
    Missing,
    /// An element matched but the read did not finish in time.
    TimedOut,
}

impl TextRead {
    /// The text read, or an empty string.
    pub fn into_text(self) -> String {
        match self {
            TextRead::Found(text) => text,
            TextRead::Missing | TextRead::TimedOut => String::new(),
        }
    }

    /// The text read if it is non-blank.
    pub fn non_empty(&self) -> Option<&str> {
        match self {
            TextRead::Found(text) if !text.trim().is_empty() => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Browser operations the scraper needs from a single page.
#[async_trait]
pub trait MapPage: Send + Sync {
    /// Load a URL.
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Focus the first element matching `selector` and type `text` into it.
    async fn fill(&self, selector: &str, text: &str) -> Result<(), BrowserError>;

    /// Press a key on the page (`"Enter"`, `"Escape"`).
    async fn press_key(&self, key: &str);

    /// Poll until `selector` matches at least one element.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> bool;

    /// Number of elements matching `selector`.
    async fn count(&self, selector: &str) -> usize;

    /// `href` attributes of every element matching `selector`, in DOM order.
    async fn hrefs(&self, selector: &str) -> Vec<String>;

    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str) -> bool;

    /// Click a point in the viewport.
    async fn click_at(&self, x: f64, y: f64) -> bool;

    /// Read the inner text of the first element matching `selector`.
    async fn read_text(&self, selector: &str, timeout: Duration) -> TextRead;

    /// Scroll the container matching `selector` to its bottom.
    async fn scroll_to_bottom(&self, selector: &str) -> bool;

    /// Whether the inner text of the container matching `selector` contains `text`.
    async fn contains_text(&self, selector: &str, text: &str) -> bool;

    /// Fixed wait between actions.
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
