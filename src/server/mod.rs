//! HTTP API exposing the listing search.
//!
//! A single authenticated endpoint, `POST /search`, runs one scrape per
//! request and returns the filtered listings as a JSON array.

mod auth;
mod handlers;
mod routes;

pub use handlers::ApiError;
pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Settings;
use crate::scrape::{ChromeSearchBackend, SearchBackend};

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn SearchBackend>,
    pub api_key: Arc<str>,
}

impl AppState {
    pub fn new(backend: Arc<dyn SearchBackend>, api_key: &str) -> Self {
        Self {
            backend,
            api_key: Arc::from(api_key),
        }
    }

    /// State backed by a real browser, built from settings.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_api_key()?;
        let backend = ChromeSearchBackend::new(settings.browser.clone(), settings.scrape.clone());
        Ok(Self::new(Arc::new(backend), api_key))
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::from_settings(settings)?;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
