//! Listing collection from the scrolling results feed.
//!
//! The collector is a small state machine:
//!
//! ```text
//! Scrolling --(no progress x limit, recoveries left)--> Recovering --> Scrolling
//!     |
//!     +--(target reached | end marker | no progress, recoveries spent)--> Done
//! ```
//!
//! `Done` is absorbing.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::PlaceId;
use crate::browser::MapPage;
use crate::config::ScrapeConfig;

/// Why collection stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The requested number of identifiers was collected.
    TargetReached,
    /// The feed showed its end-of-list marker.
    EndOfList,
    /// The feed stopped growing and every recovery click was spent.
    NoProgress,
    /// The scroll iteration cap was hit.
    IterationLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Scrolling,
    Recovering,
    Done(StopReason),
}

/// Identifiers collected from the feed, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub ids: Vec<PlaceId>,
    pub stop: StopReason,
}

/// Scrolls the results feed and gathers unique listing identifiers.
pub struct ListingCollector<'a, P: MapPage + ?Sized> {
    page: &'a P,
    config: &'a ScrapeConfig,
}

impl<'a, P: MapPage + ?Sized> ListingCollector<'a, P> {
    pub fn new(page: &'a P, config: &'a ScrapeConfig) -> Self {
        Self { page, config }
    }

    /// Collect up to `target` unique identifiers.
    pub async fn collect(&self, target: usize) -> Collection {
        let mut ids: Vec<PlaceId> = Vec::new();
        let mut seen: HashSet<PlaceId> = HashSet::new();
        let mut no_progress = 0u32;
        let mut recoveries = 0u32;
        let mut iterations = 0u32;

        let mut state = if target == 0 {
            State::Done(StopReason::TargetReached)
        } else {
            State::Scrolling
        };

        loop {
            state = match state {
                State::Done(stop) => {
                    info!(
                        "Collected {} of {} listing(s) ({:?})",
                        ids.len(),
                        target,
                        stop
                    );
                    return Collection { ids, stop };
                }
                State::Scrolling => {
                    if iterations >= self.config.max_scroll_iterations {
                        warn!("Stopping after {} scroll iterations", iterations);
                        State::Done(StopReason::IterationLimit)
                    } else {
                        iterations += 1;
                        let added = self.scroll_and_scan(&mut ids, &mut seen, target).await;
                        debug!(
                            "Scroll {}: {} new, {} total, no-progress {}",
                            iterations,
                            added,
                            ids.len(),
                            no_progress
                        );

                        if ids.len() >= target {
                            State::Done(StopReason::TargetReached)
                        } else if self.end_of_list().await {
                            State::Done(StopReason::EndOfList)
                        } else if added > 0 {
                            no_progress = 0;
                            State::Scrolling
                        } else {
                            no_progress += 1;
                            if no_progress < self.config.no_progress_limit {
                                State::Scrolling
                            } else if recoveries < self.config.max_recovery_clicks {
                                State::Recovering
                            } else {
                                State::Done(StopReason::NoProgress)
                            }
                        }
                    }
                }
                State::Recovering => {
                    recoveries += 1;
                    warn!(
                        "Feed stalled at {} listing(s), recovery click {}/{}",
                        ids.len(),
                        recoveries,
                        self.config.max_recovery_clicks
                    );
                    self.recover(ids.last()).await;
                    no_progress = 0;
                    State::Scrolling
                }
            };
        }
    }

    /// Scroll the feed once and record unseen identifiers. Returns how many were added.
    async fn scroll_and_scan(
        &self,
        ids: &mut Vec<PlaceId>,
        seen: &mut HashSet<PlaceId>,
        target: usize,
    ) -> usize {
        let selectors = &self.config.selectors;

        if !self.page.scroll_to_bottom(&selectors.results_feed).await {
            debug!("Results feed not found for scrolling");
        }
        self.page.pause(self.config.scroll_delay()).await;

        let before = ids.len();
        for href in self.page.hrefs(&selectors.listing_link).await {
            if ids.len() >= target {
                break;
            }
            if let Some(id) = PlaceId::from_href(&href) {
                if seen.insert(id.clone()) {
                    ids.push(id);
                }
            }
        }
        ids.len() - before
    }

    async fn end_of_list(&self) -> bool {
        let selectors = &self.config.selectors;
        self.page
            .contains_text(&selectors.results_feed, &selectors.end_of_list_marker)
            .await
    }

    /// Nudge the feed by opening the last known listing, then closing it.
    async fn recover(&self, last: Option<&PlaceId>) {
        let selectors = &self.config.selectors;

        let clicked = match last {
            Some(id) => self.page.click(&selectors.listing_for(id.as_str())).await,
            None => false,
        };

        if clicked {
            if !self
                .page
                .wait_for(&selectors.place_name, self.config.panel_timeout())
                .await
            {
                debug!("Detail panel did not open during recovery");
            }
            self.page.press_key("Escape").await;
        } else {
            let (x, y) = self.config.neutral_point;
            self.page.click_at(x, y).await;
        }
        self.page.pause(self.config.settle_delay()).await;
    }
}
