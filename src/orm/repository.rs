//! Repository facade
//!
//! Uniform create / get / list / update / delete over every entity type,
//! composing the mapper, the query specs and a [`DocumentStore`]. Every
//! storage call is bounded by the configured timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use super::error::{RepositoryError, Result};
use super::filters::{FilterSpec, PageSpec, SortSpec};
use super::mapper::{self, Document, Record};
use super::object_id::ObjectId;
use super::relations::RelationshipResolver;
use super::schema::EntityType;
use crate::db::{DocumentStore, StoreResult};

/// Handle over one storage engine. Cheap to clone.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl Repository {
    pub fn new(store: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn resolver(&self) -> RelationshipResolver<'_> {
        RelationshipResolver::new(self)
    }

    /// Run one storage call under the timeout.
    async fn guarded<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!(operation, error = %e, "Storage call failed");
                Err(e.into())
            }
            Err(_) => {
                warn!(operation, timeout_ms = self.timeout.as_millis() as u64, "Storage call timed out");
                Err(RepositoryError::StorageTimeout {
                    operation,
                    timeout: self.timeout,
                })
            }
        }
    }

    fn not_found(entity: EntityType, id: ObjectId) -> RepositoryError {
        RepositoryError::NotFound {
            entity: entity.collection(),
            id: id.to_hex(),
        }
    }

    // ========================================================================
    // Record-level access
    // ========================================================================

    /// Fetch one record; `None` when absent.
    pub async fn find_record(&self, entity: EntityType, id: ObjectId) -> Result<Option<Record>> {
        let stored = self
            .guarded("find_by_id", self.store.find_by_id(entity.collection(), id))
            .await?;
        stored
            .map(|doc| mapper::from_storage(entity, &doc).map_err(RepositoryError::from))
            .transpose()
    }

    /// Fetch one record or fail with `NotFound`.
    pub async fn get_record(&self, entity: EntityType, id: ObjectId) -> Result<Record> {
        self.find_record(entity, id)
            .await?
            .ok_or_else(|| Self::not_found(entity, id))
    }

    /// All records matching a filter.
    pub async fn find_records(
        &self,
        entity: EntityType,
        filter: &FilterSpec,
        sort: &SortSpec,
        page: Option<PageSpec>,
    ) -> Result<Vec<Record>> {
        let docs = self
            .guarded(
                "find",
                self.store.find(entity.collection(), filter, sort, page),
            )
            .await?;
        docs.iter()
            .map(|doc| mapper::from_storage(entity, doc).map_err(RepositoryError::from))
            .collect()
    }

    pub async fn count(&self, entity: EntityType, filter: &FilterSpec) -> Result<u64> {
        self.guarded("count", self.store.count(entity.collection(), filter))
            .await
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Validate and store a new record; returns its transport form.
    pub async fn create(&self, entity: EntityType, payload: &Document) -> Result<Document> {
        let record = mapper::to_record(entity, payload)?;

        self.guarded(
            "insert",
            self.store
                .insert(entity.collection(), record.to_stored_document()),
        )
        .await?;

        debug!(entity = %entity, id = %record.id, "Created record");
        Ok(record.to_transport())
    }

    pub async fn get(&self, entity: EntityType, id: &str) -> Result<Document> {
        let id = ObjectId::parse_str(id)?;
        let record = self.get_record(entity, id).await?;
        Ok(record.to_transport())
    }

    /// Count matching records, then fetch one page of them. The total ignores
    /// paging.
    pub async fn list(
        &self,
        entity: EntityType,
        filter: &FilterSpec,
        sort: &SortSpec,
        page: PageSpec,
    ) -> Result<(u64, Vec<Document>)> {
        let total = self.count(entity, filter).await?;
        let records = self.find_records(entity, filter, sort, Some(page)).await?;

        debug!(
            entity = %entity,
            total,
            returned = records.len(),
            skip = page.skip,
            limit = page.limit,
            "Listed records"
        );
        Ok((total, records.iter().map(Record::to_transport).collect()))
    }

    /// Merge the supplied fields into an existing record and return the
    /// re-fetched result. Nothing is written unless every supplied field
    /// validates.
    pub async fn update(&self, entity: EntityType, id: &str, payload: &Document) -> Result<Document> {
        let id = ObjectId::parse_str(id)?;
        self.get_record(entity, id).await?;

        let patch = mapper::to_patch(entity, payload)?;
        if !patch.is_empty() {
            let matched = self
                .guarded(
                    "update",
                    self.store
                        .update(entity.collection(), id, &patch.to_document_patch()),
                )
                .await?;
            if !matched {
                return Err(Self::not_found(entity, id));
            }
        }

        let record = self.get_record(entity, id).await?;
        debug!(
            entity = %entity,
            id = %id,
            set = patch.set.len(),
            unset = patch.unset.len(),
            "Updated record"
        );
        Ok(record.to_transport())
    }

    /// Hard delete. A second delete of the same id is `NotFound`.
    pub async fn delete(&self, entity: EntityType, id: &str) -> Result<()> {
        let id = ObjectId::parse_str(id)?;
        let deleted = self
            .guarded("delete", self.store.delete(entity.collection(), id))
            .await?;
        if !deleted {
            return Err(Self::not_found(entity, id));
        }

        debug!(entity = %entity, id = %id, "Deleted record");
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        self.guarded("ping", self.store.ping()).await
    }
}
