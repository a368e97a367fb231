//! Scrape heuristics and page selectors.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// DOM selectors for the map application.
///
/// The target page's markup changes without notice, so every selector is
/// configurable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MapSelectors {
    pub search_box: String,
    pub results_feed: String,
    pub listing_link: String,
    pub place_name: String,
    pub address: String,
    pub website: String,
    pub phone: String,
    /// Text that appears in the results feed once it cannot grow further.
    pub end_of_list_marker: String,
}

impl Default for MapSelectors {
    fn default() -> Self {
        Self {
            search_box: "input#searchboxinput".to_string(),
            results_feed: r#"div[aria-label*="Results for"][role="feed"]"#.to_string(),
            listing_link: r#"a[href*="https://www.google.com/maps/place"]"#.to_string(),
            place_name: "h1.DUwDvf.lfPIob".to_string(),
            address: r#"button[data-item-id="address"] div.fontBodyMedium"#.to_string(),
            website: r#"a[data-item-id="authority"] div.fontBodyMedium"#.to_string(),
            phone: r#"button[data-item-id^="phone:tel:"] div.fontBodyMedium"#.to_string(),
            end_of_list_marker: "You've reached the end of the list".to_string(),
        }
    }
}

impl MapSelectors {
    /// Selector for the listing anchor whose href carries `place_id`.
    pub fn listing_for(&self, place_id: &str) -> String {
        format!(r#"a[href*="{}"]"#, place_id.replace('"', "\\\""))
    }
}

/// Scrape loop thresholds and timing budgets.
///
/// Times are in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Start page of the map application.
    pub maps_url: String,
    /// Consecutive scrolls without a new listing before recovery kicks in.
    pub no_progress_limit: u32,
    /// Recovery clicks allowed before the collector gives up.
    pub max_recovery_clicks: u32,
    /// Attempts per listing in the detail extractor.
    pub max_retries: u32,
    /// Hard cap on scroll iterations.
    pub max_scroll_iterations: u32,
    /// Upper bound applied to a requested total.
    pub max_total: u32,
    pub initial_delay_ms: u64,
    pub scroll_delay_ms: u64,
    pub settle_delay_ms: u64,
    pub results_timeout_ms: u64,
    pub panel_timeout_ms: u64,
    pub field_timeout_ms: u64,
    /// Polling interval for bounded waits.
    pub poll_interval_ms: u64,
    /// Viewport point clicked to dismiss the panel without selecting a listing.
    pub neutral_point: (f64, f64),
    pub selectors: MapSelectors,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            maps_url: "https://www.google.com/maps".to_string(),
            no_progress_limit: 7,
            max_recovery_clicks: 3,
            max_retries: 3,
            max_scroll_iterations: 200,
            max_total: 120,
            initial_delay_ms: 2000,
            scroll_delay_ms: 1000,
            settle_delay_ms: 500,
            results_timeout_ms: 30_000,
            panel_timeout_ms: 5000,
            field_timeout_ms: 3000,
            poll_interval_ms: 100,
            neutral_point: (900.0, 450.0),
            selectors: MapSelectors::default(),
        }
    }
}

impl ScrapeConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn scroll_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn results_timeout(&self) -> Duration {
        Duration::from_millis(self.results_timeout_ms)
    }

    pub fn panel_timeout(&self) -> Duration {
        Duration::from_millis(self.panel_timeout_ms)
    }

    pub fn field_timeout(&self) -> Duration {
        Duration::from_millis(self.field_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Clamp a requested total to the configured maximum.
    pub fn clamp_total(&self, total: u32) -> usize {
        total.min(self.max_total) as usize
    }

    /// Apply environment variable overrides.
    ///
    /// - `SCRAPE_NO_PROGRESS_LIMIT`
    /// - `SCRAPE_MAX_RECOVERY_CLICKS`
    /// - `SCRAPE_MAX_RETRIES`
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(v) = env_u32("SCRAPE_NO_PROGRESS_LIMIT")? {
            self.no_progress_limit = v;
        }
        if let Some(v) = env_u32("SCRAPE_MAX_RECOVERY_CLICKS")? {
            self.max_recovery_clicks = v;
        }
        if let Some(v) = env_u32("SCRAPE_MAX_RETRIES")? {
            self.max_retries = v;
        }
        Ok(self)
    }

    /// Reject thresholds that would make the loops meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.no_progress_limit == 0 {
            return Err(ConfigError::Invalid(
                "scrape.no_progress_limit must be at least 1".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "scrape.max_retries must be at least 1".to_string(),
            ));
        }
        url::Url::parse(&self.maps_url).map_err(|e| {
            ConfigError::Invalid(format!("scrape.maps_url '{}': {}", self.maps_url, e))
        })?;
        Ok(())
    }
}

fn env_u32(name: &str) -> Result<Option<u32>, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.trim().is_empty() => {
            val.trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::InvalidEnv {
                    name: name.to_string(),
                    value: val,
                })
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_selector_quotes_id() {
        let selectors = MapSelectors::default();
        assert_eq!(
            selectors.listing_for("0x54906abc:0x1"),
            r#"a[href*="0x54906abc:0x1"]"#
        );
    }

    #[test]
    fn test_clamp_total() {
        let cfg = ScrapeConfig {
            max_total: 10,
            ..Default::default()
        };
        assert_eq!(cfg.clamp_total(3), 3);
        assert_eq!(cfg.clamp_total(50), 10);
        assert_eq!(cfg.clamp_total(0), 0);
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        let cfg = ScrapeConfig {
            max_retries: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
        assert!(ScrapeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_nested_selectors_from_toml() {
        let cfg: ScrapeConfig = toml::from_str(
            r#"
            no_progress_limit = 4

            [selectors]
            place_name = "h1.title"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.no_progress_limit, 4);
        assert_eq!(cfg.max_recovery_clicks, 3);
        assert_eq!(cfg.selectors.place_name, "h1.title");
        assert_eq!(cfg.selectors.search_box, "input#searchboxinput");
    }
}
