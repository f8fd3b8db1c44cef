//! Astro Catalog - REST catalog of astronomical entities
//!
//! Astronomers, stars, planets, exoplanets, celestial phenomena,
//! observations and telescopes, stored as JSON documents and served over
//! a uniform REST surface.

pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod db;
pub mod orm;
pub mod storage_mode;

pub use app::{AppState, build_app};
pub use config::Config;
