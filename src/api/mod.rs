//! API route definitions
//!
//! Every collection shares one set of REST routes; the collection segment
//! is resolved against the schema registry at request time.

pub mod entities;
pub mod error;
pub mod health;
pub mod params;
pub mod relations;

use axum::Router;

use crate::AppState;

pub use error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(relations::router())
        .merge(entities::router())
}
