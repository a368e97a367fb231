//! Browser engine configuration types.
//!
//! These types live here (always compiled) rather than behind
//! `#[cfg(feature = "browser")]` so that config parsing works without the
//! browser feature.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Default user agent presented to the map application.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Browser engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrowserEngineConfig {
    /// Run in headless mode (default: true).
    /// Set to false to watch the scraper drive the page.
    pub headless: bool,

    /// Explicit Chrome/Chromium executable. Searched on PATH when unset.
    pub chrome_executable: Option<PathBuf>,

    /// Additional Chrome arguments.
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to an existing browser instead of launching one.
    /// Can also be set via BROWSER_URL environment variable.
    pub remote_url: Option<String>,

    /// User agent override applied to every page.
    pub user_agent: String,

    /// CDP request and navigation timeout in seconds.
    pub timeout: u64,

    /// Viewport width in pixels.
    pub window_width: u32,

    /// Viewport height in pixels.
    pub window_height: u32,
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            chrome_executable: None,
            chrome_args: Vec::new(),
            remote_url: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: default_timeout(),
            window_width: 1280,
            window_height: 900,
        }
    }
}

impl BrowserEngineConfig {
    /// Apply environment variable overrides.
    ///
    /// - `BROWSER_URL` - Remote Chrome DevTools URL
    /// - `CHROME_EXECUTABLE` - Path to the Chrome binary
    /// - `BROWSER_HEADLESS` - `true`/`false`
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(val) = std::env::var("BROWSER_URL") {
            if !val.is_empty() {
                self.remote_url = Some(val);
            }
        }

        if let Ok(val) = std::env::var("CHROME_EXECUTABLE") {
            if !val.is_empty() {
                self.chrome_executable = Some(PathBuf::from(val));
            }
        }

        if let Ok(val) = std::env::var("BROWSER_HEADLESS") {
            self.headless = parse_bool("BROWSER_HEADLESS", &val)?;
        }

        Ok(self)
    }
}

pub fn default_headless() -> bool {
    true
}

pub fn default_timeout() -> u64 {
    60
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}
