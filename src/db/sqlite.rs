//! SQLite document store
//!
//! One table per collection, `(id TEXT PRIMARY KEY, body TEXT NOT NULL)`,
//! with the body holding the storage-native JSON document. Natural order is
//! `rowid`, i.e. insertion order.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::matching::matches_filter;
use super::sqlite_helpers::{DocumentQuery, id_to_str, str_to_body, str_to_id, table_name};
use super::{DocumentPatch, DocumentStore, StoreError, StoreResult, StoredDocument};
use crate::orm::filters::{FilterSpec, PageSpec, SortSpec};
use crate::orm::object_id::ObjectId;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

/// True for in-memory database URLs, which must stay on one connection.
fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Filesystem path of a file-backed SQLite URL.
fn file_path(url: &str) -> Option<&str> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or(path);
    (!path.is_empty()).then_some(path)
}

impl SqliteStore {
    /// Open a pool. Acquisition is bounded by `timeout`; in-memory
    /// databases use a single, never-recycled connection.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        timeout: Duration,
    ) -> StoreResult<Self> {
        let memory = is_memory_url(url);

        if !memory
            && let Some(parent) = file_path(url).and_then(|p| Path::new(p).parent())
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Database(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(if memory { 1 } else { max_connections.max(1) })
            .acquire_timeout(timeout);
        if memory {
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;
        debug!(url = %url, memory, "SQLite pool opened");
        Ok(Self { pool })
    }

    async fn table_exists(&self, table: &str) -> StoreResult<bool> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
                .bind(table)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    fn decode_row(collection: &str, row: &sqlx::sqlite::SqliteRow) -> StoreResult<StoredDocument> {
        let id: String = row.try_get("id")?;
        let body: String = row.try_get("body")?;
        Ok(StoredDocument {
            id: str_to_id(collection, &id)?,
            body: str_to_body(collection, &id, &body)?,
        })
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn ensure_collection(&self, collection: &str) -> StoreResult<bool> {
        let table = table_name(collection)?;
        if self.table_exists(collection).await? {
            return Ok(false);
        }

        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {table} (id TEXT PRIMARY KEY NOT NULL, body TEXT NOT NULL)"
        );
        debug!(sql = %sql, "Creating collection table");
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(true)
    }

    async fn insert(&self, collection: &str, document: StoredDocument) -> StoreResult<()> {
        let table = table_name(collection)?;
        let body = serde_json::to_string(&document.body)?;
        let sql = format!("INSERT INTO {table} (id, body) VALUES (?, ?)");

        let result = sqlx::query(&sql)
            .bind(id_to_str(document.id))
            .bind(body)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::DuplicateId {
                    collection: collection.to_string(),
                    id: document.id.to_hex(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: ObjectId,
    ) -> StoreResult<Option<StoredDocument>> {
        let table = table_name(collection)?;
        let sql = format!("SELECT id, body FROM {table} WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id_to_str(id))
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| Self::decode_row(collection, &r)).transpose()
    }

    async fn find(
        &self,
        collection: &str,
        filter: &FilterSpec,
        sort: &SortSpec,
        page: Option<PageSpec>,
    ) -> StoreResult<Vec<StoredDocument>> {
        let table = table_name(collection)?;
        let text_match = filter.has_text_match();
        let mut builder = DocumentQuery::new().filter(filter).order(sort);
        if let Some(page) = page
            && !text_match
        {
            builder = builder.page(page.skip, page.limit);
        }
        let (sql, values) = builder.select_sql(&table);
        debug!(sql = %sql, text_match, "Executing document query");

        let mut query = sqlx::query(&sql);
        for value in &values {
            query = value.bind_to_query(query);
        }

        let rows = query.fetch_all(&self.pool).await?;
        let documents = rows
            .iter()
            .map(|r| Self::decode_row(collection, r))
            .collect::<StoreResult<Vec<_>>>()?;
        if !text_match {
            return Ok(documents);
        }

        // SQL only narrowed text predicates to text fields; fold case here
        let matched = documents
            .into_iter()
            .filter(|d| matches_filter(filter, d));
        Ok(match page {
            Some(page) => matched
                .skip(page.skip as usize)
                .take(page.limit as usize)
                .collect(),
            None => matched.collect(),
        })
    }

    async fn count(&self, collection: &str, filter: &FilterSpec) -> StoreResult<u64> {
        if filter.has_text_match() {
            let matched = self
                .find(collection, filter, &SortSpec::natural(), None)
                .await?;
            return Ok(matched.len() as u64);
        }

        let table = table_name(collection)?;
        let (sql, values) = DocumentQuery::new().filter(filter).count_sql(&table);
        debug!(sql = %sql, "Executing count query");

        let mut query = sqlx::query(&sql);
        for value in &values {
            query = value.bind_to_query(query);
        }

        let row = query.fetch_one(&self.pool).await?;
        let count: i64 = row.try_get(0)?;
        Ok(count.max(0) as u64)
    }

    async fn update(
        &self,
        collection: &str,
        id: ObjectId,
        patch: &DocumentPatch,
    ) -> StoreResult<bool> {
        let table = table_name(collection)?;

        if patch.is_empty() {
            return Ok(self.find_by_id(collection, id).await?.is_some());
        }

        // json_patch removes keys whose patch value is null
        let mut merge = patch.set.clone();
        for key in &patch.unset {
            merge.insert(key.clone(), serde_json::Value::Null);
        }
        let merge = serde_json::to_string(&merge)?;

        let sql = format!("UPDATE {table} SET body = json_patch(body, ?) WHERE id = ?");
        let result = sqlx::query(&sql)
            .bind(merge)
            .bind(id_to_str(id))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, collection: &str, id: ObjectId) -> StoreResult<bool> {
        let table = table_name(collection)?;
        let sql = format!("DELETE FROM {table} WHERE id = ?");
        let result = sqlx::query(&sql)
            .bind(id_to_str(id))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
