//! Storage-agnostic filter, sort and page specifications
//!
//! The query builder produces these from request parameters; each
//! [`DocumentStore`](crate::db::DocumentStore) engine translates them into
//! its own query form.

use chrono::NaiveDateTime;
use serde_json::Value;

use super::mapper::format_datetime;
use super::object_id::ObjectId;

/// Default number of records per page.
pub const DEFAULT_LIMIT: u64 = 10;
/// Largest page a client may request.
pub const MAX_LIMIT: u64 = 100;

/// A comparable scalar used as a range bound.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(f64),
    DateTime(NaiveDateTime),
}

impl Scalar {
    /// Storage-native JSON for this bound.
    pub fn to_storage(&self) -> Value {
        match self {
            Scalar::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Scalar::DateTime(dt) => Value::String(format_datetime(dt)),
        }
    }
}

/// One condition over a stored document.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Case-insensitive substring match on a text field.
    TextContains { field: &'static str, needle: String },

    /// Inclusive bounds on a number or datetime field. A missing bound is
    /// unbounded on that side.
    Range {
        field: &'static str,
        lower: Option<Scalar>,
        upper: Option<Scalar>,
    },

    /// Reference field equal to one of `targets`, or (when `many`) a
    /// reference list containing at least one of them.
    Refers {
        field: &'static str,
        targets: Vec<ObjectId>,
        many: bool,
    },

    /// Document identifier is one of the given ids.
    IdIn(Vec<ObjectId>),

    /// Disjunction. Empty matches nothing.
    Any(Vec<Predicate>),
}

impl Predicate {
    pub fn text_contains(field: &'static str, needle: impl Into<String>) -> Self {
        Predicate::TextContains {
            field,
            needle: needle.into(),
        }
    }

    pub fn refers(field: &'static str, target: ObjectId) -> Self {
        Predicate::Refers {
            field,
            targets: vec![target],
            many: false,
        }
    }

    pub fn contains(field: &'static str, target: ObjectId) -> Self {
        Predicate::Refers {
            field,
            targets: vec![target],
            many: true,
        }
    }

    /// True when this predicate (or any disjunct) is a text match.
    pub fn has_text_match(&self) -> bool {
        match self {
            Predicate::TextContains { .. } => true,
            Predicate::Any(options) => options.iter().any(Predicate::has_text_match),
            _ => false,
        }
    }
}

/// Conjunction of predicates. Empty matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub predicates: Vec<Predicate>,
}

impl FilterSpec {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn has_text_match(&self) -> bool {
        self.predicates.iter().any(Predicate::has_text_match)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: &'static str,
    pub direction: SortDirection,
}

/// Ordering of a result set. Without a key, records come back in insertion
/// order; with one, ties fall back to insertion order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortSpec {
    pub key: Option<SortKey>,
}

impl SortSpec {
    pub fn natural() -> Self {
        Self::default()
    }

    pub fn by(field: &'static str, direction: SortDirection) -> Self {
        Self {
            key: Some(SortKey { field, direction }),
        }
    }
}

/// Offset pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    pub skip: u64,
    pub limit: u64,
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}
