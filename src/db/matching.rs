//! Predicate evaluation against stored JSON bodies
//!
//! Used directly by the in-process store, and by the SQLite store to apply
//! text matches that SQLite's ASCII-only `lower()` cannot fold.

use std::cmp::Ordering;

use serde_json::Value;

use super::StoredDocument;
use crate::orm::filters::{FilterSpec, Predicate, Scalar};
use crate::orm::mapper::parse_datetime;
use crate::orm::object_id::ObjectId;

pub(crate) fn matches_filter(filter: &FilterSpec, doc: &StoredDocument) -> bool {
    filter.predicates.iter().all(|p| matches_predicate(p, doc))
}

fn matches_predicate(predicate: &Predicate, doc: &StoredDocument) -> bool {
    match predicate {
        Predicate::TextContains { field, needle } => doc
            .body
            .get(*field)
            .and_then(Value::as_str)
            .is_some_and(|text| text.to_lowercase().contains(&needle.to_lowercase())),

        Predicate::Range {
            field,
            lower,
            upper,
        } => {
            let Some(value) = doc.body.get(*field).filter(|v| !v.is_null()) else {
                return false;
            };
            let above = lower
                .as_ref()
                .is_none_or(|bound| compare_scalar(value, bound).is_some_and(Ordering::is_ge));
            let below = upper
                .as_ref()
                .is_none_or(|bound| compare_scalar(value, bound).is_some_and(Ordering::is_le));
            above && below
        }

        Predicate::Refers {
            field,
            targets,
            many,
        } => {
            let Some(value) = doc.body.get(*field) else {
                return false;
            };
            if *many {
                value.as_array().is_some_and(|items| {
                    items
                        .iter()
                        .filter_map(ObjectId::from_json)
                        .any(|id| targets.contains(&id))
                })
            } else {
                ObjectId::from_json(value).is_some_and(|id| targets.contains(&id))
            }
        }

        Predicate::IdIn(ids) => ids.contains(&doc.id),

        Predicate::Any(options) => options.iter().any(|p| matches_predicate(p, doc)),
    }
}

/// Compare a stored value against a bound. `None` when the value is not of
/// the bound's type.
fn compare_scalar(value: &Value, bound: &Scalar) -> Option<Ordering> {
    match bound {
        Scalar::Number(n) => value.as_f64().and_then(|v| v.partial_cmp(n)),
        Scalar::DateTime(dt) => value
            .as_str()
            .and_then(parse_datetime)
            .map(|v| v.cmp(dt)),
    }
}
