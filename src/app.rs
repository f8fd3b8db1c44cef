//! Application state and HTTP router construction.
//!
//! Used by [main] and by the HTTP integration tests to build the Axum app.

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::config::Config;
use crate::orm::Repository;

/// Shared state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub repository: Repository,
}

impl AppState {
    pub fn new(config: Config, repository: Repository) -> Self {
        Self {
            config: Arc::new(config),
            repository,
        }
    }
}

/// Build the full Axum router with CORS and request tracing.
/// Returns Router<()> (state fully applied) for use with axum::serve.
pub fn build_app(state: AppState) -> Router<()> {
    api::router()
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
