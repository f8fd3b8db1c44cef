//! Request extraction helpers shared by the entity and relation routes.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use serde_json::Value;

use super::error::ApiError;
use crate::orm::{Document, EntityType};

/// Fold repeated query parameters into a map; the last value wins.
pub fn query_map(pairs: Vec<(String, String)>) -> BTreeMap<String, String> {
    pairs.into_iter().collect()
}

/// Map a route collection name onto its entity type.
pub fn resolve_entity(collection: &str) -> Result<EntityType, ApiError> {
    EntityType::from_collection(collection)
        .ok_or_else(|| ApiError::UnknownEntity(collection.to_string()))
}

/// Accept only a well-formed JSON object as a request body.
pub fn body_object(body: Result<Json<Value>, JsonRejection>) -> Result<Document, ApiError> {
    match body {
        Ok(Json(Value::Object(map))) => Ok(map),
        Ok(Json(other)) => Err(ApiError::InvalidPayload(format!(
            "expected a JSON object, got {}",
            json_type(&other)
        ))),
        Err(rejection) => Err(ApiError::InvalidPayload(rejection.body_text())),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
