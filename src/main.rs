//! mapscrape - business listing search over map results.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mapscrape::{cli, config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env files if present (before anything else)
    config::load_dotenv();

    // Initialize logging based on verbosity
    let default_filter = if cli::is_verbose() {
        "mapscrape=debug"
    } else {
        "mapscrape=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    cli::run().await
}
