//! One-off search command.

use console::style;

use crate::config::Settings;
use crate::scrape::{ChromeSearchBackend, SearchBackend, SearchQuery};

/// Run a single search and print the records as a JSON array on stdout.
pub async fn cmd_search(
    settings: &Settings,
    business_type: String,
    location: String,
    total: u32,
    pretty: bool,
) -> anyhow::Result<()> {
    let query = SearchQuery::new(business_type, location, total);
    eprintln!(
        "{} Searching for '{}' ({} listing(s))",
        style("→").cyan(),
        query.search_text(),
        total
    );

    let backend = ChromeSearchBackend::new(settings.browser.clone(), settings.scrape.clone());
    let table = backend.search(&query).await?;

    eprintln!(
        "  {} {} listing(s) in {}",
        style("✓").green(),
        table.len(),
        query.location
    );

    let json = if pretty {
        serde_json::to_string_pretty(&table)?
    } else {
        serde_json::to_string(&table)?
    };
    println!("{}", json);

    Ok(())
}
