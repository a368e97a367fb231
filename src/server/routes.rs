//! Router configuration for the web server.

use axum::{middleware, routing::post, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::auth;
use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/search", post(handlers::search))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
