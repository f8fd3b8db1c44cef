//! Document storage engines
//!
//! Every entity collection lives behind the [`DocumentStore`] trait. Two
//! engines are provided: SQLite (JSON documents in one table per collection)
//! and an in-process memory store used by tests and `STORAGE=memory`.

mod matching;
pub mod memory;
pub mod schema_sync;
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(feature = "sqlite")]
pub mod sqlite_helpers;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::orm::filters::{FilterSpec, PageSpec, SortSpec};
use crate::orm::object_id::ObjectId;
use crate::storage_mode::StorageMode;

pub use memory::MemoryStore;
pub use schema_sync::{SchemaSyncResult, sync_collections};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// A JSON object body.
pub type Body = serde_json::Map<String, Value>;

/// One document as the storage engine holds it. `body` is the storage-native
/// form and never contains `_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: ObjectId,
    pub body: Body,
}

/// Single-document merge: `set` overwrites fields, `unset` removes them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentPatch {
    pub set: Body,
    pub unset: Vec<String>,
}

impl DocumentPatch {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }

    /// Apply to a body in place.
    pub fn apply(&self, body: &mut Body) {
        for (key, value) in &self.set {
            body.insert(key.clone(), value.clone());
        }
        for key in &self.unset {
            body.remove(key);
        }
    }
}

/// Failures raised by a storage engine.
#[derive(Debug, Error)]
pub enum StoreError {
    #[cfg(feature = "sqlite")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("document encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("stored document {id} in {collection} is malformed: {reason}")]
    Corrupt {
        collection: String,
        id: String,
        reason: String,
    },

    #[error("a document with id {id} already exists in {collection}")]
    DuplicateId { collection: String, id: String },

    #[error("collection '{0}' is not a valid collection name")]
    InvalidCollection(String),

    #[error("storage engine is closed")]
    Closed,
}

impl StoreError {
    pub fn kind(&self) -> &'static str {
        "StorageError"
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Per-collection document storage.
///
/// Implementations translate [`FilterSpec`] / [`SortSpec`] / [`PageSpec`]
/// into their native query form. Writes touch exactly one document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Engine name for logs and readiness output.
    fn name(&self) -> &'static str;

    /// Create the collection if missing. Returns `true` when it was created.
    async fn ensure_collection(&self, collection: &str) -> StoreResult<bool>;

    async fn insert(&self, collection: &str, document: StoredDocument) -> StoreResult<()>;

    async fn find_by_id(&self, collection: &str, id: ObjectId)
    -> StoreResult<Option<StoredDocument>>;

    async fn find(
        &self,
        collection: &str,
        filter: &FilterSpec,
        sort: &SortSpec,
        page: Option<PageSpec>,
    ) -> StoreResult<Vec<StoredDocument>>;

    async fn count(&self, collection: &str, filter: &FilterSpec) -> StoreResult<u64>;

    /// Merge `patch` into one document. `false` when no document matched.
    async fn update(&self, collection: &str, id: ObjectId, patch: &DocumentPatch)
    -> StoreResult<bool>;

    /// Hard delete. `false` when no document matched.
    async fn delete(&self, collection: &str, id: ObjectId) -> StoreResult<bool>;

    async fn ping(&self) -> StoreResult<()>;

    async fn close(&self);
}

/// Connection settings for [`connect`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub mode: StorageMode,
    pub database_url: String,
    pub max_connections: u32,
    /// Bound on pool acquisition; the repository applies the same bound to
    /// every call.
    pub timeout: Duration,
}

/// Open the configured engine and create every registered collection.
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match config.mode {
        StorageMode::Memory => Arc::new(MemoryStore::new()),
        #[cfg(feature = "sqlite")]
        StorageMode::Sqlite => Arc::new(
            SqliteStore::connect(&config.database_url, config.max_connections, config.timeout)
                .await
                .with_context(|| format!("failed to open {}", config.database_url))?,
        ),
        #[cfg(not(feature = "sqlite"))]
        StorageMode::Sqlite => {
            anyhow::bail!("sqlite storage requested but this build has no `sqlite` feature")
        }
    };

    store
        .ping()
        .await
        .context("storage did not answer ping")?;

    let result = sync_collections(store.as_ref()).await;
    if !result.collections_created.is_empty() {
        info!(
            storage = store.name(),
            collections = ?result.collections_created,
            "Created collections"
        );
    }
    if let Some(err) = result.errors.into_iter().next() {
        anyhow::bail!("collection sync failed: {err}");
    }

    info!(storage = store.name(), "Storage connected");
    Ok(store)
}
