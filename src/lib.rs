//! mapscrape - business listing search over map results.
//!
//! Drives a Chromium page through a map search, scrolls the results feed to
//! gather listings, reads each listing's detail panel and serves the
//! location-filtered records over an authenticated HTTP API.

pub mod browser;
pub mod cli;
pub mod config;
pub mod scrape;
pub mod server;
