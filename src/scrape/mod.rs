//! Map listing scraping: feed collection, detail extraction and the search pipeline.

pub mod collector;
pub mod extractor;
pub mod place_id;
pub mod record;
pub mod search;

#[cfg(test)]
pub(crate) mod fake;

pub use collector::{Collection, ListingCollector, StopReason};
pub use extractor::DetailExtractor;
pub use place_id::PlaceId;
pub use record::{ListingRecord, ResultTable, SENTINEL};
pub use search::{run_search, ChromeSearchBackend, SearchBackend, SearchQuery};
