//! HTTP request handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use super::AppState;
use crate::browser::BrowserError;
use crate::scrape::{search::default_total, SearchQuery};

/// Errors returned to API clients as `{"detail": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid API Key")]
    Unauthorized,
    #[error("Scraping failed: {0}")]
    Scrape(#[from] BrowserError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Scrape(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "detail": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

/// Body of `POST /search`.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub business_type: String,
    pub location: String,
    pub total: Option<u32>,
}

impl From<SearchParams> for SearchQuery {
    fn from(params: SearchParams) -> Self {
        SearchQuery::new(
            params.business_type,
            params.location,
            params.total.unwrap_or_else(default_total),
        )
    }
}

/// Run a search and return the filtered listings.
pub async fn search(
    State(state): State<AppState>,
    Json(params): Json<SearchParams>,
) -> Result<Response, ApiError> {
    let query = SearchQuery::from(params);
    info!(
        "Search request: '{}' (total {})",
        query.search_text(),
        query.total
    );

    match state.backend.search(&query).await {
        Ok(table) => Ok(Json(table).into_response()),
        Err(e) => {
            error!("Search '{}' failed: {}", query.search_text(), e);
            Err(ApiError::Scrape(e))
        }
    }
}
