//! Listing identifiers carried in map place URLs.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Place URLs encode the listing token as `!1s<token>!`.
static PLACE_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!1s([^!]+)").unwrap());

/// Token identifying a single listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PlaceId(String);

impl PlaceId {
    /// Extract the place token from a listing href.
    pub fn from_href(href: &str) -> Option<Self> {
        PLACE_ID_PATTERN
            .captures(href)
            .and_then(|caps| caps.get(1))
            .map(|m| PlaceId(m.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
