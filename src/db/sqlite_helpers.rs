//! SQLite helper utilities for document queries
//!
//! Documents are stored as JSON text, so every filter and sort is expressed
//! with the JSON1 functions (`json_extract`, `json_each`). This module turns
//! the storage-agnostic [`FilterSpec`] / [`SortSpec`] into SQL fragments plus
//! the values to bind, in placeholder order.

use sqlx::Sqlite;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;

use super::{StoreError, StoreResult};
use crate::orm::filters::{FilterSpec, Predicate, Scalar, SortSpec};
use crate::orm::object_id::{OID_KEY, ObjectId};

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Real(f64),
    Int(i64),
}

impl SqlValue {
    /// Bind this value to a sqlx query.
    pub fn bind_to_query<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match self {
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Real(f) => query.bind(*f),
            SqlValue::Int(i) => query.bind(*i),
        }
    }
}

impl From<&Scalar> for SqlValue {
    fn from(scalar: &Scalar) -> Self {
        match scalar {
            Scalar::Number(n) => SqlValue::Real(*n),
            Scalar::DateTime(_) => match scalar.to_storage() {
                serde_json::Value::String(s) => SqlValue::Text(s),
                other => SqlValue::Text(other.to_string()),
            },
        }
    }
}

// ============================================================================
// Naming
// ============================================================================

/// Quote a collection name for use as a table name. Only lowercase ASCII,
/// digits and underscores are accepted.
pub fn table_name(collection: &str) -> StoreResult<String> {
    let valid = !collection.is_empty()
        && collection
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
    if !valid {
        return Err(StoreError::InvalidCollection(collection.to_string()));
    }
    Ok(format!("\"{collection}\""))
}

/// JSON path selecting a top-level field: `$."field"`.
pub fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', "\\\""))
}

/// JSON path selecting the hex string inside a stored identifier.
pub fn json_oid_path(field: &str) -> String {
    format!("{}.\"{}\"", json_path(field), OID_KEY)
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

// ============================================================================
// Query Building
// ============================================================================

/// WHERE / ORDER BY fragments and their bind values.
#[derive(Debug, Default)]
pub struct DocumentQuery {
    where_clauses: Vec<String>,
    values: Vec<SqlValue>,
    order_by: Option<(String, SqlValue)>,
    limit: Option<(u64, u64)>,
}

impl DocumentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: &FilterSpec) -> Self {
        for predicate in &filter.predicates {
            let clause = predicate_sql(predicate, &mut self.values);
            self.where_clauses.push(clause);
        }
        self
    }

    /// Sort on a field; ties and unsorted queries use insertion order.
    pub fn order(mut self, sort: &SortSpec) -> Self {
        if let Some(key) = sort.key {
            self.order_by = Some((
                format!("json_extract(body, ?) {}, rowid ASC", key.direction.to_sql()),
                SqlValue::Text(json_path(key.field)),
            ));
        }
        self
    }

    pub fn page(mut self, skip: u64, limit: u64) -> Self {
        self.limit = Some((skip, limit));
        self
    }

    fn where_sql(&self) -> String {
        if self.where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.where_clauses.join(" AND "))
        }
    }

    /// `SELECT id, body` statement and its values.
    pub fn select_sql(&self, table: &str) -> (String, Vec<SqlValue>) {
        let mut sql = format!("SELECT id, body FROM {table}{}", self.where_sql());
        let mut values = self.values.clone();

        sql.push_str(" ORDER BY ");
        match &self.order_by {
            Some((clause, path)) => {
                sql.push_str(clause);
                values.push(path.clone());
            }
            None => sql.push_str("rowid ASC"),
        }

        if let Some((skip, limit)) = self.limit {
            sql.push_str(" LIMIT ? OFFSET ?");
            values.push(SqlValue::Int(limit as i64));
            values.push(SqlValue::Int(skip as i64));
        }
        (sql, values)
    }

    /// `SELECT COUNT(*)` statement and its values. Sorting and paging are
    /// ignored.
    pub fn count_sql(&self, table: &str) -> (String, Vec<SqlValue>) {
        let sql = format!("SELECT COUNT(*) FROM {table}{}", self.where_sql());
        (sql, self.values.clone())
    }
}

/// Translate one predicate, pushing its bind values in placeholder order.
///
/// Text matches only require the field to hold text: SQLite's `lower()`
/// folds ASCII alone, so callers re-check them with Unicode case folding.
pub fn predicate_sql(predicate: &Predicate, values: &mut Vec<SqlValue>) -> String {
    match predicate {
        Predicate::TextContains { field, .. } => {
            values.push(SqlValue::Text(json_path(field)));
            "json_type(body, ?) = 'text'".to_string()
        }

        Predicate::Range {
            field,
            lower,
            upper,
        } => {
            let mut parts = Vec::new();
            if let Some(bound) = lower {
                values.push(SqlValue::Text(json_path(field)));
                values.push(bound.into());
                parts.push("json_extract(body, ?) >= ?");
            }
            if let Some(bound) = upper {
                values.push(SqlValue::Text(json_path(field)));
                values.push(bound.into());
                parts.push("json_extract(body, ?) <= ?");
            }
            if parts.is_empty() {
                values.push(SqlValue::Text(json_path(field)));
                parts.push("json_extract(body, ?) IS NOT NULL");
            }
            format!("({})", parts.join(" AND "))
        }

        Predicate::Refers {
            field,
            targets,
            many,
        } => {
            if targets.is_empty() {
                return "1=0".to_string();
            }
            let clause = if *many {
                values.push(SqlValue::Text(json_path(field)));
                format!(
                    "EXISTS (SELECT 1 FROM json_each(body, ?) WHERE json_extract(value, '$.\"{}\"') IN ({}))",
                    OID_KEY,
                    placeholders(targets.len())
                )
            } else {
                values.push(SqlValue::Text(json_oid_path(field)));
                format!("json_extract(body, ?) IN ({})", placeholders(targets.len()))
            };
            values.extend(targets.iter().map(|id| SqlValue::Text(id.to_hex())));
            clause
        }

        Predicate::IdIn(ids) => {
            if ids.is_empty() {
                return "1=0".to_string();
            }
            values.extend(ids.iter().map(|id| SqlValue::Text(id.to_hex())));
            format!("id IN ({})", placeholders(ids.len()))
        }

        Predicate::Any(options) => {
            if options.is_empty() {
                return "1=0".to_string();
            }
            let parts: Vec<String> = options.iter().map(|p| predicate_sql(p, values)).collect();
            format!("({})", parts.join(" OR "))
        }
    }
}

/// Render a document id for the `id` column.
#[inline]
pub fn id_to_str(id: ObjectId) -> String {
    id.to_hex()
}

/// Parse the `id` column back into an identifier.
pub fn str_to_id(collection: &str, raw: &str) -> StoreResult<ObjectId> {
    ObjectId::parse_str(raw).map_err(|e| StoreError::Corrupt {
        collection: collection.to_string(),
        id: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Parse the `body` column into a JSON object.
pub fn str_to_body(collection: &str, id: &str, raw: &str) -> StoreResult<super::Body> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::Corrupt {
            collection: collection.to_string(),
            id: id.to_string(),
            reason: "body is not a JSON object".to_string(),
        }),
        Err(e) => Err(StoreError::Corrupt {
            collection: collection.to_string(),
            id: id.to_string(),
            reason: e.to_string(),
        }),
    }
}
