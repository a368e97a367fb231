//! End-to-end search: query the map, collect listings, read details, filter.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{DetailExtractor, ListingCollector, ResultTable};
use crate::browser::{BrowserError, MapPage};
use crate::config::{BrowserEngineConfig, ScrapeConfig};

/// A business category searched for in a location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchQuery {
    pub business_type: String,
    pub location: String,
    /// Number of listings to collect before filtering.
    #[serde(default = "default_total")]
    pub total: u32,
}

pub fn default_total() -> u32 {
    1
}

impl SearchQuery {
    pub fn new(business_type: impl Into<String>, location: impl Into<String>, total: u32) -> Self {
        Self {
            business_type: business_type.into(),
            location: location.into(),
            total,
        }
    }

    /// Text typed into the map search box.
    pub fn search_text(&self) -> String {
        format!("{} in {}", self.business_type, self.location)
    }
}

/// Run one search on an already open page.
///
/// Only failures to reach the page or submit the query are errors; anything
/// later degrades to fewer or emptier records.
pub async fn run_search<P: MapPage + ?Sized>(
    page: &P,
    query: &SearchQuery,
    config: &ScrapeConfig,
) -> Result<ResultTable, BrowserError> {
    let target = config.clamp_total(query.total);
    if target == 0 {
        return Ok(ResultTable::default());
    }
    if target < query.total as usize {
        warn!(
            "Requested {} listings, capped at {}",
            query.total, config.max_total
        );
    }

    let selectors = &config.selectors;

    page.navigate(&config.maps_url).await?;
    page.pause(config.initial_delay()).await;

    let search_text = query.search_text();
    info!("Searching for '{}'", search_text);
    page.fill(&selectors.search_box, &search_text).await?;
    page.press_key("Enter").await;

    if !page
        .wait_for(&selectors.listing_link, config.results_timeout())
        .await
    {
        warn!("No listings appeared for '{}'", search_text);
        return Ok(ResultTable::default());
    }

    let collection = ListingCollector::new(page, config).collect(target).await;
    let records = DetailExtractor::new(page, config)
        .extract_all(&collection.ids)
        .await;

    let table = ResultTable::new(records);
    let scraped = table.len();
    let filtered = table.filter_by_location(&query.location);
    info!(
        "Kept {} of {} listing(s) located in '{}'",
        filtered.len(),
        scraped,
        query.location
    );

    Ok(filtered)
}

/// Runs searches on behalf of the HTTP layer.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<ResultTable, BrowserError>;
}

/// Opens a fresh browser session for every search.
pub struct ChromeSearchBackend {
    browser: BrowserEngineConfig,
    scrape: ScrapeConfig,
    /// Searches run one at a time.
    lock: Mutex<()>,
}

impl ChromeSearchBackend {
    pub fn new(browser: BrowserEngineConfig, scrape: ScrapeConfig) -> Self {
        Self {
            browser,
            scrape,
            lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl SearchBackend for ChromeSearchBackend {
    #[cfg(feature = "browser")]
    async fn search(&self, query: &SearchQuery) -> Result<ResultTable, BrowserError> {
        use crate::browser::BrowserSession;

        if self.scrape.clamp_total(query.total) == 0 {
            return Ok(ResultTable::default());
        }

        let _guard = self.lock.lock().await;
        let session = BrowserSession::open(&self.browser, &self.scrape).await?;
        let result = run_search(session.page(), query, &self.scrape).await;
        session.close().await;
        result
    }

    #[cfg(not(feature = "browser"))]
    async fn search(&self, _query: &SearchQuery) -> Result<ResultTable, BrowserError> {
        let _ = (&self.browser, &self.scrape, &self.lock);
        Err(BrowserError::NotCompiled)
    }
}
