//! Relationship routes: follow a named relation of one record, or find
//! parents through a text match on their related children.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde_json::{Map, Value};

use super::error::ApiError;
use super::params::{query_map, resolve_entity};
use crate::AppState;
use crate::orm::{ObjectId, Record, RepositoryError};

/// Query parameter naming the child text field.
pub const FIELD_PARAM: &str = "campo";
/// Query parameter carrying the substring to look for.
pub const VALUE_PARAM: &str = "valor";

fn records_body(key: &str, records: &[Record]) -> Value {
    let mut body = Map::new();
    body.insert("count".to_string(), records.len().into());
    body.insert(
        key.to_string(),
        Value::Array(
            records
                .iter()
                .map(|r| Value::Object(r.to_transport()))
                .collect(),
        ),
    );
    Value::Object(body)
}

async fn related_records(
    State(state): State<AppState>,
    Path((collection, id, relation)): Path<(String, String, String)>,
) -> Result<Json<Value>, ApiError> {
    let owner = resolve_entity(&collection)?;
    let id = ObjectId::parse_str(&id).map_err(RepositoryError::from)?;

    // a missing owner is a 404; a dangling relation is just empty
    state.repository.get_record(owner, id).await?;

    let (_, records) = state
        .repository
        .resolver()
        .resolve(owner, &relation, id)
        .await?;
    Ok(Json(records_body(&relation, &records)))
}

async fn reverse_lookup(
    State(state): State<AppState>,
    Path((collection, path)): Path<(String, String)>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Value>, ApiError> {
    let parent = resolve_entity(&collection)?;
    let params = query_map(params);

    let field = params
        .get(FIELD_PARAM)
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::MissingParameter(FIELD_PARAM))?;
    let value = params
        .get(VALUE_PARAM)
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::MissingParameter(VALUE_PARAM))?;

    let records = state
        .repository
        .resolver()
        .reverse_by_nested_text(parent, &path, field, value)
        .await?;
    Ok(Json(records_body(parent.schema().list_key, &records)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{collection}/consulta/{path}", get(reverse_lookup))
        .route("/{collection}/{id}/{relation}", get(related_records))
}
