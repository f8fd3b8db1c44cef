//! In-process document store
//!
//! Documents are kept per collection in insertion order behind a
//! `tokio::sync::RwLock`; filters and sorts are evaluated directly against
//! the stored JSON bodies.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::matching::matches_filter;
use super::{DocumentPatch, DocumentStore, StoreError, StoreResult, StoredDocument};
use crate::orm::filters::{FilterSpec, PageSpec, SortDirection, SortSpec};
use crate::orm::object_id::{OID_KEY, ObjectId};

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<StoredDocument>>>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_open(&self) -> StoreResult<()> {
        if self.closed.load(AtomicOrdering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ensure_collection(&self, collection: &str) -> StoreResult<bool> {
        self.check_open()?;
        let mut collections = self.collections.write().await;
        if collections.contains_key(collection) {
            return Ok(false);
        }
        collections.insert(collection.to_string(), Vec::new());
        Ok(true)
    }

    async fn insert(&self, collection: &str, document: StoredDocument) -> StoreResult<()> {
        self.check_open()?;
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| d.id == document.id) {
            return Err(StoreError::DuplicateId {
                collection: collection.to_string(),
                id: document.id.to_hex(),
            });
        }
        docs.push(document);
        Ok(())
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: ObjectId,
    ) -> StoreResult<Option<StoredDocument>> {
        self.check_open()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn find(
        &self,
        collection: &str,
        filter: &FilterSpec,
        sort: &SortSpec,
        page: Option<PageSpec>,
    ) -> StoreResult<Vec<StoredDocument>> {
        self.check_open()?;
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<StoredDocument> = docs
            .iter()
            .filter(|d| matches_filter(filter, d))
            .cloned()
            .collect();
        drop(collections);

        if let Some(key) = sort.key {
            // stable: ties keep insertion order
            matched.sort_by(|a, b| {
                let ord = compare_values(a.body.get(key.field), b.body.get(key.field));
                match key.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }

        Ok(match page {
            Some(page) => matched
                .into_iter()
                .skip(page.skip as usize)
                .take(page.limit as usize)
                .collect(),
            None => matched,
        })
    }

    async fn count(&self, collection: &str, filter: &FilterSpec) -> StoreResult<u64> {
        self.check_open()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matches_filter(filter, d)).count() as u64)
            .unwrap_or(0))
    }

    async fn update(
        &self,
        collection: &str,
        id: ObjectId,
        patch: &DocumentPatch,
    ) -> StoreResult<bool> {
        self.check_open()?;
        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
        else {
            return Ok(false);
        };
        patch.apply(&mut doc.body);
        Ok(true)
    }

    async fn delete(&self, collection: &str, id: ObjectId) -> StoreResult<bool> {
        self.check_open()?;
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| d.id != id);
        Ok(docs.len() != before)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check_open()
    }

    async fn close(&self) {
        self.closed.store(true, AtomicOrdering::Release);
    }
}

// ============================================================================
// Sorting
// ============================================================================

/// Rank of a JSON value's type in sort order: missing and null first.
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Object(_)) => 4,
        Some(Value::Array(_)) => 5,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .zip(y.as_f64())
            .and_then(|(x, y)| x.partial_cmp(&y))
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Object(x)), Some(Value::Object(y))) => {
            let x = x.get(OID_KEY).and_then(Value::as_str);
            let y = y.get(OID_KEY).and_then(Value::as_str);
            x.cmp(&y)
        }
        _ => Ordering::Equal,
    }
}
