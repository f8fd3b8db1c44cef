//! Generic CRUD routes, one set shared by every collection

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use serde::Serialize;
use serde_json::{Map, Value};

use super::error::ApiError;
use super::params::{body_object, query_map, resolve_entity};
use crate::AppState;
use crate::orm::{Document, build_list_query};

#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub data: Document,
}

#[derive(Debug, Serialize)]
pub struct MessageDataResponse {
    pub message: String,
    pub data: Document,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// `{"total", "count", "<list_key>": [...]}`
pub fn list_body(total: u64, list_key: &str, records: Vec<Document>) -> Value {
    let mut body = Map::new();
    body.insert("total".to_string(), total.into());
    body.insert("count".to_string(), records.len().into());
    body.insert(
        list_key.to_string(),
        Value::Array(records.into_iter().map(Value::Object).collect()),
    );
    Value::Object(body)
}

async fn create_record(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageDataResponse>), ApiError> {
    let entity = resolve_entity(&collection)?;
    let payload = body_object(body)?;

    let data = state.repository.create(entity, &payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageDataResponse {
            message: entity.schema().created_message(),
            data,
        }),
    ))
}

async fn list_records(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Value>, ApiError> {
    let entity = resolve_entity(&collection)?;
    let query = build_list_query(entity, &query_map(params))?;

    let (total, records) = state
        .repository
        .list(entity, &query.filter, &query.sort, query.page)
        .await?;
    Ok(Json(list_body(total, entity.schema().list_key, records)))
}

async fn get_record(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<DataResponse>, ApiError> {
    let entity = resolve_entity(&collection)?;
    let data = state.repository.get(entity, &id).await?;
    Ok(Json(DataResponse { data }))
}

async fn update_record(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<MessageDataResponse>, ApiError> {
    let entity = resolve_entity(&collection)?;
    let payload = body_object(body)?;

    let data = state.repository.update(entity, &id, &payload).await?;
    Ok(Json(MessageDataResponse {
        message: entity.schema().updated_message(),
        data,
    }))
}

async fn delete_record(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let entity = resolve_entity(&collection)?;
    state.repository.delete(entity, &id).await?;
    Ok(Json(MessageResponse {
        message: entity.schema().deleted_message(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{collection}", get(list_records).post(create_record))
        .route(
            "/{collection}/{id}",
            get(get_record).put(update_record).delete(delete_record),
        )
}
