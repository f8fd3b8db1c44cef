//! Collection synchronization from the entity registry
//!
//! Creates a collection for every registered entity type that does not have
//! one yet. Existing collections and their documents are left alone; there
//! is no migration of stored documents.

use tracing::{debug, warn};

use super::DocumentStore;
use crate::orm::schema;

/// Result of a sync run.
#[derive(Debug, Default)]
pub struct SchemaSyncResult {
    pub collections_created: Vec<String>,
    pub errors: Vec<String>,
}

/// Ensure every registered collection exists.
pub async fn sync_collections(store: &dyn DocumentStore) -> SchemaSyncResult {
    let mut result = SchemaSyncResult::default();

    for schema in schema::all() {
        match store.ensure_collection(schema.collection).await {
            Ok(true) => {
                debug!(collection = schema.collection, "Created collection");
                result.collections_created.push(schema.collection.to_string());
            }
            Ok(false) => {}
            Err(e) => {
                warn!(collection = schema.collection, error = %e, "Failed to create collection");
                result
                    .errors
                    .push(format!("{}: {}", schema.collection, e));
            }
        }
    }

    result
}
