//! Document mapper
//!
//! Converts untyped JSON payloads into typed [`Record`]s (coercing dates and
//! identifiers, enforcing required fields) and typed records back into the
//! storage-native and transport-safe JSON forms.
//!
//! Three JSON shapes exist for the same record:
//! - **payload**: whatever the client sent; identifiers are hex strings
//! - **storage**: identifiers as `{"$oid": "..."}`, dates as ISO-8601 text
//! - **transport**: storage form with every identifier rendered as a string

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use super::error::MapperError;
use super::object_id::{OID_KEY, ObjectId};
use super::schema::{EntityType, FieldDef, FieldKind};
use crate::db::{DocumentPatch, StoreError, StoredDocument};

/// A JSON object.
pub type Document = serde_json::Map<String, Value>;

/// Name of the identifier key in stored and transported documents.
pub const ID_KEY: &str = "_id";

/// Rendering used for datetimes in storage and transport.
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
    Reference(ObjectId),
    ReferenceList(Vec<ObjectId>),
}

impl FieldValue {
    /// Storage-native JSON for this value.
    pub fn to_storage(&self) -> Value {
        match self {
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::DateTime(dt) => Value::String(format_datetime(dt)),
            FieldValue::Reference(id) => id.to_extended_json(),
            FieldValue::ReferenceList(ids) => {
                Value::Array(ids.iter().map(ObjectId::to_extended_json).collect())
            }
        }
    }
}

/// One stored document of an entity type, typed against its schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub entity: EntityType,
    pub id: ObjectId,
    /// Present fields only; absent optional fields are not stored.
    pub fields: BTreeMap<&'static str, FieldValue>,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Storage body (without `_id`).
    pub fn to_storage(&self) -> Document {
        self.fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_storage()))
            .collect()
    }

    pub fn to_stored_document(&self) -> StoredDocument {
        StoredDocument {
            id: self.id,
            body: self.to_storage(),
        }
    }

    /// Transport-safe mapping, `_id` included.
    pub fn to_transport(&self) -> Document {
        to_transport(self)
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: &RecordPatch) {
        for (name, value) in &patch.set {
            self.fields.insert(name, value.clone());
        }
        for name in &patch.unset {
            self.fields.remove(name);
        }
    }
}

/// Supplied fields of a partial update. `unset` lists fields sent as null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub set: BTreeMap<&'static str, FieldValue>,
    pub unset: Vec<&'static str>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }

    pub fn to_document_patch(&self) -> DocumentPatch {
        DocumentPatch {
            set: self
                .set
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_storage()))
                .collect(),
            unset: self.unset.iter().map(|name| name.to_string()).collect(),
        }
    }
}

/// Build a new record from a create payload. A fresh identifier is
/// assigned; unknown fields and any client-supplied `_id` are ignored.
pub fn to_record(entity: EntityType, payload: &Document) -> Result<Record, MapperError> {
    let schema = entity.schema();
    let mut fields = BTreeMap::new();

    for def in schema.fields {
        match payload.get(def.name) {
            None | Some(Value::Null) => {
                if def.required {
                    return Err(MapperError::MissingRequiredField {
                        field: def.name.to_string(),
                    });
                }
            }
            Some(raw) => {
                fields.insert(def.name, coerce_field(def, raw)?);
            }
        }
    }

    Ok(Record {
        entity,
        id: ObjectId::new(),
        fields,
    })
}

/// Build a partial update from a payload. Only supplied fields are
/// validated; a null on an optional field unsets it.
pub fn to_patch(entity: EntityType, payload: &Document) -> Result<RecordPatch, MapperError> {
    let schema = entity.schema();
    let mut patch = RecordPatch::default();

    for def in schema.fields {
        match payload.get(def.name) {
            None => {}
            Some(Value::Null) if def.required => {
                return Err(MapperError::MissingRequiredField {
                    field: def.name.to_string(),
                });
            }
            Some(Value::Null) => patch.unset.push(def.name),
            Some(raw) => {
                patch.set.insert(def.name, coerce_field(def, raw)?);
            }
        }
    }

    Ok(patch)
}

fn coerce_field(def: &FieldDef, raw: &Value) -> Result<FieldValue, MapperError> {
    match def.kind {
        FieldKind::Text => match raw {
            Value::String(s) => Ok(FieldValue::Text(s.clone())),
            _ => Err(type_error(def)),
        },
        FieldKind::Number => match raw {
            Value::Number(n) => n.as_f64().map(FieldValue::Number).ok_or_else(|| type_error(def)),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(FieldValue::Number)
                .ok_or_else(|| type_error(def)),
            _ => Err(type_error(def)),
        },
        FieldKind::DateTime => match raw {
            Value::String(s) => {
                parse_datetime(s)
                    .map(FieldValue::DateTime)
                    .ok_or_else(|| MapperError::InvalidDateFormat {
                        field: def.name.to_string(),
                        value: s.clone(),
                    })
            }
            _ => Err(type_error(def)),
        },
        FieldKind::Reference(_) => coerce_reference(def, raw).map(FieldValue::Reference),
        FieldKind::ReferenceList(_) => match raw {
            Value::Array(items) => items
                .iter()
                .map(|item| coerce_reference(def, item))
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValue::ReferenceList),
            _ => Err(type_error(def)),
        },
    }
}

fn coerce_reference(def: &FieldDef, raw: &Value) -> Result<ObjectId, MapperError> {
    ObjectId::from_json(raw).ok_or_else(|| MapperError::InvalidReference {
        field: def.name.to_string(),
        value: match raw {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    })
}

fn type_error(def: &FieldDef) -> MapperError {
    MapperError::InvalidFieldType {
        field: def.name.to_string(),
        expected: def.kind.name(),
    }
}

/// Decode a stored document against the entity schema.
pub fn from_storage(entity: EntityType, doc: &StoredDocument) -> Result<Record, StoreError> {
    let schema = entity.schema();
    let mut fields = BTreeMap::new();

    for def in schema.fields {
        let Some(raw) = doc.body.get(def.name) else {
            continue;
        };
        if raw.is_null() {
            continue;
        }

        let value = match def.kind {
            FieldKind::Text => raw.as_str().map(|s| FieldValue::Text(s.to_string())),
            FieldKind::Number => raw.as_f64().map(FieldValue::Number),
            FieldKind::DateTime => raw
                .as_str()
                .and_then(parse_datetime)
                .map(FieldValue::DateTime),
            FieldKind::Reference(_) => ObjectId::from_json(raw).map(FieldValue::Reference),
            FieldKind::ReferenceList(_) => raw.as_array().and_then(|items| {
                items
                    .iter()
                    .map(ObjectId::from_json)
                    .collect::<Option<Vec<_>>>()
                    .map(FieldValue::ReferenceList)
            }),
        };

        let value = value.ok_or_else(|| StoreError::Corrupt {
            collection: schema.collection.to_string(),
            id: doc.id.to_hex(),
            reason: format!("field '{}' is not a valid {}", def.name, def.kind.name()),
        })?;
        fields.insert(def.name, value);
    }

    Ok(Record {
        entity,
        id: doc.id,
        fields,
    })
}

/// Transport-safe mapping of a record: `_id` plus every stored field, with
/// all identifiers rendered as strings.
pub fn to_transport(record: &Record) -> Document {
    let mut doc = Document::new();
    doc.insert(ID_KEY.to_string(), record.id.to_extended_json());
    doc.extend(record.to_storage());

    match stringify_identifiers(Value::Object(doc)) {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// Recursively replace every `{"$oid": "<hex>"}` with `"<hex>"`. Strings and
/// other values pass through untouched, so applying it twice is a no-op.
pub fn stringify_identifiers(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            if map.len() == 1
                && let Some(Value::String(hex)) = map.get(OID_KEY)
            {
                return Value::String(hex.clone());
            }
            Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, stringify_identifiers(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(stringify_identifiers).collect()),
        other => other,
    }
}

/// Parse the ISO-8601 variants clients send: date only, date and time with
/// `T` or a space, optional seconds and fraction, or RFC 3339 with an offset
/// (normalised to UTC).
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}
