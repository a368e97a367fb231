//! Scripted in-memory page for exercising the scrape loops without a browser.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::browser::{BrowserError, MapPage, TextRead};
use crate::config::MapSelectors;

/// How a listing's detail panel responds to clicks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelBehavior {
    Loads,
    /// The heading never appears.
    NeverLoads,
    /// The heading appears from the given click onwards (1-based).
    LoadsOnClick(u32),
}

#[derive(Debug, Clone)]
pub struct FakeListing {
    pub id: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub website: String,
    pub behavior: PanelBehavior,
    pub timed_out_fields: Vec<&'static str>,
}

impl FakeListing {
    pub fn new(id: &str, name: &str, address: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            address: address.to_string(),
            phone: format!("+1 555 {}", id.len()),
            website: format!("{}.example.com", id),
            behavior: PanelBehavior::Loads,
            timed_out_fields: Vec::new(),
        }
    }

    pub fn behavior(mut self, behavior: PanelBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn timing_out(mut self, field: &'static str) -> Self {
        self.timed_out_fields.push(field);
        self
    }

    pub fn href(&self) -> String {
        format!(
            "https://www.google.com/maps/place/{}/data=!4m7!3m6!1s{}!8m2",
            self.name.replace(' ', "+"),
            self.id
        )
    }
}

#[derive(Debug, Default)]
struct State {
    rendered: usize,
    scrolls: usize,
    clicks: HashMap<String, u32>,
    shown: Option<String>,
    actions: Vec<String>,
    navigated: Vec<String>,
    typed: Vec<String>,
}

/// Results feed that renders `per_scroll` more listings on every scroll.
pub struct FakePage {
    selectors: MapSelectors,
    listings: Vec<FakeListing>,
    /// Extra hrefs rendered on every scroll (ads, duplicates, junk).
    noise: Vec<String>,
    per_scroll: usize,
    /// Feed grows only on every n-th scroll.
    grow_every: usize,
    /// Feed stops growing after this many listings even if more exist.
    growth_cap: usize,
    show_end_marker: bool,
    results_appear: bool,
    /// Escape leaves the detail panel on screen.
    sticky_panel: bool,
    /// Time every text read takes; longer than the caller's timeout means `TimedOut`.
    read_delay: Duration,
    state: Mutex<State>,
}

impl FakePage {
    pub fn new(listings: Vec<FakeListing>) -> Self {
        let growth_cap = listings.len();
        Self {
            selectors: MapSelectors::default(),
            listings,
            noise: Vec::new(),
            per_scroll: 2,
            grow_every: 1,
            growth_cap,
            show_end_marker: false,
            results_appear: true,
            sticky_panel: false,
            read_delay: Duration::ZERO,
            state: Mutex::new(State::default()),
        }
    }

    pub fn per_scroll(mut self, n: usize) -> Self {
        self.per_scroll = n;
        self
    }

    pub fn grow_every(mut self, n: usize) -> Self {
        self.grow_every = n.max(1);
        self
    }

    pub fn growth_cap(mut self, n: usize) -> Self {
        self.growth_cap = n;
        self
    }

    pub fn with_end_marker(mut self) -> Self {
        self.show_end_marker = true;
        self
    }

    pub fn with_noise(mut self, hrefs: &[&str]) -> Self {
        self.noise = hrefs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn without_results(mut self) -> Self {
        self.results_appear = false;
        self
    }

    pub fn sticky_panel(mut self) -> Self {
        self.sticky_panel = true;
        self
    }

    pub fn read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    pub fn scrolls(&self) -> usize {
        self.state.lock().unwrap().scrolls
    }

    pub fn clicks_on(&self, id: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .clicks
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    pub fn actions(&self) -> Vec<String> {
        self.state.lock().unwrap().actions.clone()
    }

    pub fn navigated(&self) -> Vec<String> {
        self.state.lock().unwrap().navigated.clone()
    }

    pub fn typed(&self) -> Vec<String> {
        self.state.lock().unwrap().typed.clone()
    }

    fn visible_limit(&self) -> usize {
        self.growth_cap.min(self.listings.len())
    }

    fn listing_by_selector(&self, selector: &str) -> Option<&FakeListing> {
        self.listings
            .iter()
            .find(|l| selector == self.selectors.listing_for(&l.id))
    }

    fn shown_listing(&self, state: &State) -> Option<&FakeListing> {
        let id = state.shown.as_ref()?;
        self.listings.iter().find(|l| &l.id == id)
    }
}

#[async_trait]
impl MapPage for FakePage {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.state.lock().unwrap().navigated.push(url.to_string());
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
        if selector != self.selectors.search_box {
            return Err(BrowserError::ElementNotFound(selector.to_string()));
        }
        self.state.lock().unwrap().typed.push(text.to_string());
        Ok(())
    }

    async fn press_key(&self, key: &str) {
        let mut state = self.state.lock().unwrap();
        state.actions.push(format!("key:{}", key));
        if key == "Enter" && self.results_appear {
            state.rendered = self.per_scroll.min(self.visible_limit());
        }
        if key == "Escape" && !self.sticky_panel {
            state.shown = None;
        }
    }

    async fn wait_for(&self, selector: &str, _timeout: Duration) -> bool {
        self.count(selector).await > 0
    }

    async fn count(&self, selector: &str) -> usize {
        let state = self.state.lock().unwrap();
        if selector == self.selectors.listing_link {
            state.rendered
        } else if selector == self.selectors.place_name {
            usize::from(state.shown.is_some())
        } else {
            0
        }
    }

    async fn hrefs(&self, selector: &str) -> Vec<String> {
        if selector != self.selectors.listing_link {
            return Vec::new();
        }
        let rendered = self.state.lock().unwrap().rendered;
        let mut hrefs: Vec<String> = self.listings[..rendered]
            .iter()
            .map(FakeListing::href)
            .collect();
        if rendered > 0 {
            hrefs.extend(self.noise.iter().cloned());
        }
        hrefs
    }

    async fn click(&self, selector: &str) -> bool {
        let Some(listing) = self.listing_by_selector(selector) else {
            return false;
        };
        let mut state = self.state.lock().unwrap();
        let clicks = state.clicks.entry(listing.id.clone()).or_insert(0);
        *clicks += 1;
        let clicks = *clicks;
        state.actions.push(format!("click:{}", listing.id));

        let loads = match listing.behavior {
            PanelBehavior::Loads => true,
            PanelBehavior::NeverLoads => false,
            PanelBehavior::LoadsOnClick(n) => clicks >= n,
        };
        if loads {
            state.shown = Some(listing.id.clone());
        }
        true
    }

    async fn click_at(&self, x: f64, y: f64) -> bool {
        let mut state = self.state.lock().unwrap();
        state.actions.push(format!("click_at:{},{}", x, y));
        state.shown = None;
        true
    }

    async fn read_text(&self, selector: &str, timeout: Duration) -> TextRead {
        if !self.read_delay.is_zero() {
            tokio::time::sleep(self.read_delay.min(timeout)).await;
            if self.read_delay > timeout {
                return TextRead::TimedOut;
            }
        }

        let state = self.state.lock().unwrap();
        let Some(listing) = self.shown_listing(&state) else {
            return TextRead::Missing;
        };

        let sel = &self.selectors;
        let (field, value) = if selector == sel.place_name {
            ("name", &listing.name)
        } else if selector == sel.address {
            ("address", &listing.address)
        } else if selector == sel.phone {
            ("phone", &listing.phone)
        } else if selector == sel.website {
            ("website", &listing.website)
        } else {
            return TextRead::Missing;
        };

        if listing.timed_out_fields.contains(&field) {
            TextRead::TimedOut
        } else if value.is_empty() {
            TextRead::Missing
        } else {
            TextRead::Found(value.clone())
        }
    }

    async fn scroll_to_bottom(&self, selector: &str) -> bool {
        if selector != self.selectors.results_feed {
            return false;
        }
        let mut state = self.state.lock().unwrap();
        state.scrolls += 1;
        if state.rendered > 0 && state.scrolls % self.grow_every == 0 {
            state.rendered = (state.rendered + self.per_scroll).min(self.visible_limit());
        }
        true
    }

    async fn contains_text(&self, selector: &str, text: &str) -> bool {
        if selector != self.selectors.results_feed || text != self.selectors.end_of_list_marker {
            return false;
        }
        let state = self.state.lock().unwrap();
        self.show_end_marker && state.rendered >= self.visible_limit()
    }

    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Listings `p0..pN` located in `city`.
pub fn listings_in(city: &str, n: usize) -> Vec<FakeListing> {
    (0..n)
        .map(|i| {
            FakeListing::new(
                &format!("0x{:x}:0x{:x}", 0x5490 + i, i),
                &format!("Place {}", i),
                &format!("{} Main St, {}, WA", 100 + i, city),
            )
        })
        .collect()
}
