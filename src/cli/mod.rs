//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod search;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings, LoadOptions};

#[derive(Parser)]
#[command(name = "mapscrape")]
#[command(about = "Business listing search over map results")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Address to bind: port, host, or host:port (default: 127.0.0.1:8000)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Run one search and print the results as JSON
    Search {
        /// Business category, e.g. "cafe"
        business_type: String,
        /// Location the results must be in, e.g. "Seattle"
        location: String,
        /// Number of listings to collect before filtering
        #[arg(short, long, default_value = "1")]
        total: u32,
        /// Pretty-print the JSON output
        #[arg(short, long)]
        pretty: bool,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
    };
    let settings = load_settings(&options).await?;

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.as_deref().unwrap_or_else(|| settings.bind());
            serve::cmd_serve(&settings, bind).await
        }
        Commands::Search {
            business_type,
            location,
            total,
            pretty,
        } => search::cmd_search(&settings, business_type, location, total, pretty).await,
    }
}
