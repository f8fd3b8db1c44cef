//! HTTP error rendering
//!
//! Every failure leaves the API as `{"error": <kind>, "detail": <message>}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::orm::{EntityType, QueryError, RepositoryError};

const STORAGE_FAILURE_DETAIL: &str = "Erro ao acessar o armazenamento";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("unknown collection '{0}'")]
    UnknownEntity(String),

    #[error("invalid request body: {0}")]
    InvalidPayload(String),

    #[error("missing query parameter '{0}'")]
    MissingParameter(&'static str),
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        ApiError::Repository(e.into())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub detail: String,
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Repository(e) => e.kind(),
            ApiError::UnknownEntity(_) => "UnknownEntity",
            ApiError::InvalidPayload(_) => "InvalidPayload",
            ApiError::MissingParameter(_) => "MissingParameter",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Repository(e) => match e {
                RepositoryError::InvalidIdentifier(_)
                | RepositoryError::Validation(_)
                | RepositoryError::Query(_) => StatusCode::BAD_REQUEST,
                RepositoryError::NotFound { .. } | RepositoryError::UnknownRelation { .. } => {
                    StatusCode::NOT_FOUND
                }
                RepositoryError::StorageTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                RepositoryError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::UnknownEntity(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidPayload(_) | ApiError::MissingParameter(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn detail(&self) -> String {
        match self {
            ApiError::Repository(RepositoryError::NotFound { entity, .. }) => {
                EntityType::from_collection(entity)
                    .map(|e| e.schema().not_found_message())
                    .unwrap_or_else(|| self.to_string())
            }
            ApiError::Repository(RepositoryError::Storage(_)) => STORAGE_FAILURE_DETAIL.to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        if status.is_server_error() {
            error!(status = status.as_u16(), kind, error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), kind, error = %self, "Request rejected");
        }

        (
            status,
            Json(ErrorResponse {
                error: kind,
                detail: self.detail(),
            }),
        )
            .into_response()
    }
}
