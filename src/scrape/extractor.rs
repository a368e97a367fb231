//! Detail panel extraction for collected listings.

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{ListingRecord, PlaceId};
use crate::browser::MapPage;
use crate::config::ScrapeConfig;

/// Result of a single attempt on one listing.
#[derive(Debug)]
enum Attempt {
    Loaded(ListingRecord),
    /// The listing anchor could not be clicked.
    NotClickable,
    /// The panel kept showing another listing's heading (or none).
    Stale,
}

/// The detail panel last known to be on screen.
#[derive(Debug, Clone)]
struct OpenPanel {
    id: PlaceId,
    heading: String,
}

/// Heading that proves nothing when waiting for `id`'s panel: the one on
/// screen, unless it already belongs to `id`.
fn stale_heading<'p>(last: Option<&'p OpenPanel>, id: &PlaceId) -> &'p str {
    match last {
        Some(panel) if panel.id != *id => &panel.heading,
        _ => "",
    }
}

/// Opens each listing and reads its detail panel.
pub struct DetailExtractor<'a, P: MapPage + ?Sized> {
    page: &'a P,
    config: &'a ScrapeConfig,
}

impl<'a, P: MapPage + ?Sized> DetailExtractor<'a, P> {
    pub fn new(page: &'a P, config: &'a ScrapeConfig) -> Self {
        Self { page, config }
    }

    /// One record per identifier, in the same order.
    ///
    /// Listings that never load produce `ListingRecord::unavailable()`;
    /// the batch always runs to the end.
    pub async fn extract_all(&self, ids: &[PlaceId]) -> Vec<ListingRecord> {
        let mut last: Option<OpenPanel> = None;
        let mut records = Vec::with_capacity(ids.len());

        for index in 0..ids.len() {
            let record = self.extract_one(ids, index, &mut last).await;
            records.push(record);
        }

        let failed = records.iter().filter(|r| r.is_unavailable()).count();
        info!(
            "Extracted {} listing(s), {} unavailable",
            records.len(),
            failed
        );
        records
    }

    async fn extract_one(
        &self,
        ids: &[PlaceId],
        index: usize,
        last: &mut Option<OpenPanel>,
    ) -> ListingRecord {
        let id = &ids[index];
        let max_retries = self.config.max_retries;

        for attempt in 1..=max_retries {
            let outcome = self.attempt(id, stale_heading(last.as_ref(), id)).await;
            match outcome {
                Attempt::Loaded(record) => {
                    debug!("Listing {} loaded on attempt {}", id, attempt);
                    *last = Some(OpenPanel {
                        id: id.clone(),
                        heading: record.name.clone(),
                    });
                    self.close_panel().await;
                    return record;
                }
                outcome => {
                    warn!(
                        "Listing {} attempt {}/{} failed: {:?}",
                        id, attempt, max_retries, outcome
                    );
                    if attempt < max_retries {
                        if let Some(panel) = self.recover(ids, index, last.as_ref()).await {
                            debug!("Recovery left {} ('{}') on screen", panel.id, panel.heading);
                            *last = Some(panel);
                        }
                    }
                }
            }
        }

        warn!("Giving up on listing {} after {} attempts", id, max_retries);
        self.close_panel().await;
        ListingRecord::unavailable()
    }

    async fn attempt(&self, id: &PlaceId, stale: &str) -> Attempt {
        let selectors = &self.config.selectors;

        if !self.page.click(&selectors.listing_for(id.as_str())).await {
            return Attempt::NotClickable;
        }

        let Some(name) = self.wait_for_new_heading(stale).await else {
            return Attempt::Stale;
        };

        Attempt::Loaded(ListingRecord {
            name,
            address: self.read_field(&selectors.address).await,
            website: self.read_field(&selectors.website).await,
            phone: self.read_field(&selectors.phone).await,
        })
    }

    /// Poll the heading until it shows something other than `stale`, for at
    /// most `panel_timeout`. Each read is capped by the time remaining.
    async fn wait_for_new_heading(&self, stale: &str) -> Option<String> {
        let selector = &self.config.selectors.place_name;
        let deadline = Instant::now() + self.config.panel_timeout();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let read = self
                .page
                .read_text(selector, remaining.min(self.config.field_timeout()))
                .await;
            if let Some(heading) = read.non_empty() {
                let heading = heading.trim();
                if heading != stale {
                    return Some(heading.to_string());
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            self.page
                .pause(self.config.poll_interval().min(remaining))
                .await;
        }
    }

    async fn read_field(&self, selector: &str) -> String {
        let read = self
            .page
            .read_text(selector, self.config.field_timeout())
            .await;
        debug!("{} -> {:?}", selector, read);
        read.into_text().trim().to_string()
    }

    async fn close_panel(&self) {
        self.page.press_key("Escape").await;
        self.page.pause(self.config.settle_delay()).await;
    }

    /// Force a DOM change before retrying: open a neighbouring listing, or
    /// click an empty spot on the map when there is none.
    ///
    /// Returns the neighbour's panel when it is confirmed on screen, since
    /// it may linger after Escape.
    async fn recover(
        &self,
        ids: &[PlaceId],
        index: usize,
        last: Option<&OpenPanel>,
    ) -> Option<OpenPanel> {
        let neighbour = if index > 0 {
            ids.get(index - 1)
        } else {
            ids.get(index + 1)
        };

        if let Some(other) = neighbour {
            let selectors = &self.config.selectors;
            if self.page.click(&selectors.listing_for(other.as_str())).await {
                let heading = self.wait_for_new_heading(stale_heading(last, other)).await;
                self.close_panel().await;
                return heading.map(|heading| OpenPanel {
                    id: other.clone(),
                    heading,
                });
            }
        }

        let (x, y) = self.config.neutral_point;
        self.page.click_at(x, y).await;
        self.page.pause(self.config.settle_delay()).await;
        None
    }
}
