//! Entity layer
//!
//! Schema registry, document mapping, query specs, relationship resolution
//! and the repository facade that composes them.

pub mod builder;
pub mod entities;
pub mod error;
pub mod filters;
pub mod mapper;
pub mod object_id;
pub mod relations;
pub mod repository;
pub mod schema;

pub use builder::{ListQuery, build_filter, build_list_query, build_sort, paginate};
pub use error::{MapperError, QueryError, RepositoryError};
pub use filters::{FilterSpec, PageSpec, Predicate, Scalar, SortDirection, SortKey, SortSpec};
pub use mapper::{Document, FieldValue, Record, RecordPatch};
pub use object_id::{ObjectId, ObjectIdError};
pub use relations::RelationshipResolver;
pub use repository::Repository;
pub use schema::{EntitySchema, EntityType, FieldDef, FieldKind, RelationDef, RelationKind};
