//! API key check for protected routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use super::handlers::ApiError;
use super::AppState;

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Reject requests whose `X-API-Key` does not match the configured key.
///
/// Runs before body extraction, so an unauthorized request never reaches
/// the scraper.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !has_valid_key(&request, &state.api_key) {
        debug!("Rejected request to {} without a valid API key", request.uri());
        return ApiError::Unauthorized.into_response();
    }

    next.run(request).await
}

fn has_valid_key(request: &Request, expected: &str) -> bool {
    request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|provided| provided == expected)
}
