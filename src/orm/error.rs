//! Error types for the entity layer
//!
//! Each error reports a stable `kind()` string so the HTTP layer can render
//! a structured response without matching on every variant.

use std::time::Duration;

use thiserror::Error;

use super::object_id::ObjectIdError;
use crate::db::StoreError;

/// Failures converting an inbound payload into a record or patch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapperError {
    #[error("missing required field '{field}'")]
    MissingRequiredField { field: String },

    #[error("invalid date format for '{field}': '{value}' (use YYYY-MM-DDTHH:MM:SS)")]
    InvalidDateFormat { field: String, value: String },

    #[error("invalid reference in '{field}': '{value}' is not a valid identifier")]
    InvalidReference { field: String, value: String },

    #[error("field '{field}' expects a {expected} value")]
    InvalidFieldType {
        field: String,
        expected: &'static str,
    },
}

impl MapperError {
    pub fn kind(&self) -> &'static str {
        match self {
            MapperError::MissingRequiredField { .. } => "MissingRequiredField",
            MapperError::InvalidDateFormat { .. } => "InvalidDateFormat",
            MapperError::InvalidReference { .. } => "InvalidReference",
            MapperError::InvalidFieldType { .. } => "InvalidFieldType",
        }
    }
}

/// Failures building filter, sort or page specifications.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("unknown filter field '{field}'")]
    UnknownFilterField { field: String },

    #[error("invalid value for filter '{field}': '{value}'")]
    InvalidFilterValue { field: String, value: String },

    #[error("invalid date format for filter '{field}': '{value}' (use YYYY-MM-DDTHH:MM:SS)")]
    InvalidDateFormat { field: String, value: String },

    #[error("invalid reference in filter '{field}': '{value}' is not a valid identifier")]
    InvalidReference { field: String, value: String },

    #[error("cannot sort by '{field}'")]
    InvalidSortField { field: String },

    #[error("page size must be between 1 and 100, got {0}")]
    InvalidPageSize(String),

    #[error("skip must be a non-negative integer, got {0}")]
    InvalidSkip(String),
}

impl QueryError {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::UnknownFilterField { .. } => "UnknownFilterField",
            QueryError::InvalidFilterValue { .. } => "InvalidFilterValue",
            QueryError::InvalidDateFormat { .. } => "InvalidDateFormat",
            QueryError::InvalidReference { .. } => "InvalidReference",
            QueryError::InvalidSortField { .. } => "InvalidSortField",
            QueryError::InvalidPageSize(_) => "InvalidPageSize",
            QueryError::InvalidSkip(_) => "InvalidSkip",
        }
    }
}

/// Errors surfaced by the repository facade and relationship resolver.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    InvalidIdentifier(#[from] ObjectIdError),

    #[error(transparent)]
    Validation(#[from] MapperError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("{entity} record {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("unknown relation '{relation}' on {entity}")]
    UnknownRelation {
        entity: &'static str,
        relation: String,
    },

    #[error("storage call '{operation}' timed out after {timeout:?}")]
    StorageTimeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl RepositoryError {
    pub fn kind(&self) -> &'static str {
        match self {
            RepositoryError::InvalidIdentifier(_) => "InvalidIdentifier",
            RepositoryError::Validation(e) => e.kind(),
            RepositoryError::Query(e) => e.kind(),
            RepositoryError::NotFound { .. } => "NotFound",
            RepositoryError::UnknownRelation { .. } => "UnknownRelation",
            RepositoryError::StorageTimeout { .. } => "StorageTimeout",
            RepositoryError::Storage(_) => "StorageError",
        }
    }
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
