//! Health check endpoints

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use tracing::debug;

use super::entities::MessageResponse;
use super::error::ApiError;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub storage: &'static str,
}

/// Storage connectivity check at the root path
async fn root(State(state): State<AppState>) -> Result<Json<MessageResponse>, ApiError> {
    state.repository.ping().await?;
    Ok(Json(MessageResponse {
        message: "Conexão com o armazenamento estabelecida com sucesso".to_string(),
    }))
}

/// Health check - always returns OK if the server is running
async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness check - verifies the storage engine answers
async fn readyz(State(state): State<AppState>) -> Json<ReadyResponse> {
    let storage_ok = match state.repository.ping().await {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "Readiness probe failed");
            false
        }
    };

    Json(ReadyResponse {
        ready: storage_ok,
        storage: state.repository.store().name(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
}
