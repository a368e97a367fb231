//! Listing records and the per-request result table.

use serde::{Deserialize, Serialize};

/// Placeholder for every field of a listing whose details could not be read.
pub const SENTINEL: &str = "N/A";

/// Fields read from one listing's detail panel.
///
/// An empty field means the element was absent or its read timed out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    #[serde(rename = "Company Name")]
    pub name: String,
    #[serde(rename = "Website")]
    pub website: String,
    #[serde(rename = "Phone")]
    pub phone: String,
    #[serde(rename = "Address")]
    pub address: String,
}

impl ListingRecord {
    /// Record used when all attempts on a listing failed.
    pub fn unavailable() -> Self {
        Self {
            name: SENTINEL.to_string(),
            website: SENTINEL.to_string(),
            phone: SENTINEL.to_string(),
            address: SENTINEL.to_string(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        *self == Self::unavailable()
    }

    /// Case-insensitive substring match of `location` against the address.
    pub fn address_contains(&self, location: &str) -> bool {
        self.address
            .to_lowercase()
            .contains(&location.to_lowercase())
    }
}

/// Ordered records, aligned with the identifiers they were read from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResultTable {
    rows: Vec<ListingRecord>,
}

impl ResultTable {
    pub fn new(rows: Vec<ListingRecord>) -> Self {
        Self { rows }
    }

    /// Keep rows whose address contains `location`, ignoring case.
    pub fn filter_by_location(self, location: &str) -> Self {
        let rows = self
            .rows
            .into_iter()
            .filter(|row| row.address_contains(location))
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[ListingRecord] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<ListingRecord> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<ListingRecord> for ResultTable {
    fn from_iter<I: IntoIterator<Item = ListingRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
