//! Query builder
//!
//! Turns raw query-string parameters into [`FilterSpec`], [`SortSpec`] and
//! [`PageSpec`] values, validated against the entity schema. Parameters are
//! matched against declared fields only; anything else is rejected so a
//! typo never silently returns an unfiltered result.
//!
//! Supported parameter forms:
//! - `<text>=v`: case-insensitive substring
//! - `<number|datetime>=v`: exact value
//! - `<number|datetime>_min` / `_max` (or `_inicio` / `_fim`): inclusive bounds
//! - `<reference>=<id>`: equality
//! - `<reference_list>=<id>`: membership

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::error::QueryError;
use super::filters::{
    DEFAULT_LIMIT, FilterSpec, MAX_LIMIT, PageSpec, Predicate, Scalar, SortDirection, SortSpec,
};
use super::mapper::parse_datetime;
use super::object_id::ObjectId;
use super::schema::{EntityType, FieldDef, FieldKind};

/// Query parameter carrying the sort field.
pub const SORT_PARAM: &str = "ordenacao";
/// Query parameter carrying the sort direction (`true` = ascending).
pub const ASCENDING_PARAM: &str = "ordem_ascendente";
pub const SKIP_PARAM: &str = "skip";
pub const LIMIT_PARAM: &str = "limit";

/// List parameters that are not filters.
pub const RESERVED_PARAMS: &[&str] = &[SKIP_PARAM, LIMIT_PARAM, SORT_PARAM, ASCENDING_PARAM];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Lower,
    Upper,
}

const BOUND_SUFFIXES: &[(&str, Bound)] = &[
    ("_min", Bound::Lower),
    ("_max", Bound::Upper),
    ("_inicio", Bound::Lower),
    ("_fim", Bound::Upper),
];

/// Everything a list call needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filter: FilterSpec,
    pub sort: SortSpec,
    pub page: PageSpec,
}

/// Build a full list query from request parameters: reserved parameters
/// drive sorting and paging, everything else is a filter.
pub fn build_list_query(
    entity: EntityType,
    params: &BTreeMap<String, String>,
) -> Result<ListQuery, QueryError> {
    let filters: BTreeMap<String, String> = params
        .iter()
        .filter(|(key, _)| !RESERVED_PARAMS.contains(&key.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let filter = build_filter(entity, &filters)?;

    let ascending = parse_ascending(params.get(ASCENDING_PARAM).map(String::as_str))?;
    let sort = build_sort(entity, params.get(SORT_PARAM).map(String::as_str), ascending)?;

    let page = parse_page(
        params.get(SKIP_PARAM).map(String::as_str),
        params.get(LIMIT_PARAM).map(String::as_str),
    )?;

    Ok(ListQuery { filter, sort, page })
}

// ============================================================================
// Filters
// ============================================================================

/// Build a conjunctive filter from `field -> value` parameters. Empty values
/// are treated as omitted.
pub fn build_filter(
    entity: EntityType,
    params: &BTreeMap<String, String>,
) -> Result<FilterSpec, QueryError> {
    let schema = entity.schema();
    let mut spec = FilterSpec::all();
    let mut ranges: BTreeMap<&'static str, (Option<Scalar>, Option<Scalar>)> = BTreeMap::new();

    for (key, raw) in params {
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }

        if let Some(def) = schema.field(key) {
            spec.push(exact_predicate(def, value)?);
            continue;
        }

        let Some((def, bound)) = split_bound(entity, key) else {
            return Err(QueryError::UnknownFilterField { field: key.clone() });
        };

        let scalar = parse_scalar(def, key, value, bound)?;
        let entry = ranges.entry(def.name).or_default();
        let slot = match bound {
            Bound::Lower => &mut entry.0,
            Bound::Upper => &mut entry.1,
        };
        // `_min` and `_inicio` (or `_max` and `_fim`) together: both must hold
        *slot = Some(match slot.take() {
            Some(current) => tighter(bound, current, scalar),
            None => scalar,
        });
    }

    for (field, (lower, upper)) in ranges {
        spec.push(Predicate::Range {
            field,
            lower,
            upper,
        });
    }

    Ok(spec)
}

fn exact_predicate(def: &'static FieldDef, value: &str) -> Result<Predicate, QueryError> {
    match def.kind {
        FieldKind::Text => Ok(Predicate::text_contains(def.name, value)),
        FieldKind::Number | FieldKind::DateTime => Ok(Predicate::Range {
            field: def.name,
            lower: Some(parse_scalar(def, def.name, value, Bound::Lower)?),
            upper: Some(parse_scalar(def, def.name, value, Bound::Upper)?),
        }),
        FieldKind::Reference(_) | FieldKind::ReferenceList(_) => {
            let target =
                ObjectId::parse_str(value).map_err(|_| QueryError::InvalidReference {
                    field: def.name.to_string(),
                    value: value.to_string(),
                })?;
            Ok(Predicate::Refers {
                field: def.name,
                targets: vec![target],
                many: matches!(def.kind, FieldKind::ReferenceList(_)),
            })
        }
    }
}

/// The stricter of two bounds on the same field: the larger lower bound or
/// the smaller upper bound.
fn tighter(bound: Bound, current: Scalar, other: Scalar) -> Scalar {
    let ordering = match (&current, &other) {
        (Scalar::Number(a), Scalar::Number(b)) => a.partial_cmp(b),
        (Scalar::DateTime(a), Scalar::DateTime(b)) => Some(a.cmp(b)),
        _ => None,
    };
    let keep_current = match (bound, ordering) {
        (Bound::Lower, Some(ord)) => ord.is_ge(),
        (Bound::Upper, Some(ord)) => ord.is_le(),
        (_, None) => false,
    };
    if keep_current { current } else { other }
}

/// Split `<field><suffix>` into an ordered scalar field and its bound.
fn split_bound(entity: EntityType, key: &str) -> Option<(&'static FieldDef, Bound)> {
    let schema = entity.schema();
    BOUND_SUFFIXES.iter().find_map(|(suffix, bound)| {
        key.strip_suffix(*suffix)
            .and_then(|name| schema.field(name))
            .filter(|def| def.kind.is_ordered_scalar())
            .map(|def| (def, *bound))
    })
}

/// Parse a bound. A date-only upper bound covers the whole day.
fn parse_scalar(
    def: &FieldDef,
    param: &str,
    value: &str,
    bound: Bound,
) -> Result<Scalar, QueryError> {
    match def.kind {
        FieldKind::Number => value
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Scalar::Number)
            .ok_or_else(|| QueryError::InvalidFilterValue {
                field: param.to_string(),
                value: value.to_string(),
            }),
        _ => {
            let parsed = match (bound, NaiveDate::parse_from_str(value, "%Y-%m-%d")) {
                (Bound::Upper, Ok(day)) => day.and_hms_nano_opt(23, 59, 59, 999_999_999),
                _ => parse_datetime(value),
            };
            parsed
                .map(Scalar::DateTime)
                .ok_or_else(|| QueryError::InvalidDateFormat {
                    field: param.to_string(),
                    value: value.to_string(),
                })
        }
    }
}

// ============================================================================
// Sorting
// ============================================================================

/// Sort by a declared, non-list field. `None` or an empty name keeps
/// natural storage order.
pub fn build_sort(
    entity: EntityType,
    field: Option<&str>,
    ascending: bool,
) -> Result<SortSpec, QueryError> {
    let Some(name) = field.map(str::trim).filter(|f| !f.is_empty()) else {
        return Ok(SortSpec::natural());
    };

    let def = entity
        .schema()
        .field(name)
        .filter(|def| !matches!(def.kind, FieldKind::ReferenceList(_)))
        .ok_or_else(|| QueryError::InvalidSortField {
            field: name.to_string(),
        })?;

    let direction = if ascending {
        SortDirection::Ascending
    } else {
        SortDirection::Descending
    };
    Ok(SortSpec::by(def.name, direction))
}

/// Parse the ascending flag; absent means ascending.
pub fn parse_ascending(raw: Option<&str>) -> Result<bool, QueryError> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(true);
    };
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "sim" => Ok(true),
        "false" | "0" | "no" | "nao" | "não" => Ok(false),
        _ => Err(QueryError::InvalidFilterValue {
            field: ASCENDING_PARAM.to_string(),
            value: raw.to_string(),
        }),
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// Validate a skip / limit pair.
pub fn paginate(skip: i64, limit: i64) -> Result<PageSpec, QueryError> {
    if skip < 0 {
        return Err(QueryError::InvalidSkip(skip.to_string()));
    }
    if limit < 1 || limit > MAX_LIMIT as i64 {
        return Err(QueryError::InvalidPageSize(limit.to_string()));
    }
    Ok(PageSpec {
        skip: skip as u64,
        limit: limit as u64,
    })
}

/// Parse raw skip / limit parameters, applying defaults when absent.
pub fn parse_page(skip: Option<&str>, limit: Option<&str>) -> Result<PageSpec, QueryError> {
    let skip = match skip.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| QueryError::InvalidSkip(raw.to_string()))?,
        None => 0,
    };
    let limit = match limit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| QueryError::InvalidPageSize(raw.to_string()))?,
        None => DEFAULT_LIMIT as i64,
    };
    paginate(skip, limit)
}
