//! Application configuration management

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use crate::cli::CliOptions;
use crate::db::StoreConfig;
use crate::storage_mode::StorageMode;

const DEFAULT_DATABASE_URL: &str = "sqlite://./data/astro_catalog.db";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// SQLite URL; DATABASE_PATH or DATABASE_URL, bare paths get `sqlite://`
    pub database_url: String,

    /// Pool size (forced to 1 for in-memory databases)
    pub max_connections: u32,

    /// Bound applied to every storage call
    pub storage_timeout: Duration,

    pub storage: StorageMode,

    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 10,
            storage_timeout: Duration::from_millis(5000),
            storage: if cfg!(feature = "sqlite") {
                StorageMode::Sqlite
            } else {
                StorageMode::Memory
            },
            log_format: LogFormat::Json,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_PATH")
            .or_else(|| get("DATABASE_URL"))
            .map(|raw| normalize_database_url(&raw))
            .unwrap_or(defaults.database_url);

        let storage = match get("STORAGE") {
            Some(raw) => StorageMode::from_arg(&raw)
                .ok_or_else(|| anyhow!("Invalid STORAGE '{raw}' (expected sqlite or memory)"))?,
            None => defaults.storage,
        };

        let log_format = match get("LOG_FORMAT").as_deref().map(str::trim) {
            Some("pretty") => LogFormat::Pretty,
            Some("json") | None => LogFormat::Json,
            Some(other) => return Err(anyhow!("Invalid LOG_FORMAT '{other}'")),
        };

        let storage_timeout = match get("STORAGE_TIMEOUT_MS") {
            Some(raw) => {
                let millis: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid STORAGE_TIMEOUT_MS '{raw}'"))?;
                if millis == 0 {
                    return Err(anyhow!("Invalid STORAGE_TIMEOUT_MS '{raw}' (must be positive)"));
                }
                Duration::from_millis(millis)
            }
            None => defaults.storage_timeout,
        };

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),

            port: match get("PORT") {
                Some(raw) => raw.trim().parse().context("Invalid PORT")?,
                None => defaults.port,
            },

            database_url,

            max_connections: get("DATABASE_MAX_CONNECTIONS")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.max_connections),

            storage_timeout,
            storage,
            log_format,
        })
    }

    /// Apply command-line overrides.
    pub fn with_cli(mut self, options: &CliOptions) -> Self {
        if let Some(storage) = options.storage_override {
            self.storage = storage;
        }
        if let Some(port) = options.port_override {
            self.port = port;
        }
        self
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            mode: self.storage,
            database_url: self.database_url.clone(),
            max_connections: self.max_connections,
            timeout: self.storage_timeout,
        }
    }
}

/// `./data/x.db` becomes `sqlite://./data/x.db`; `:memory:` becomes
/// `sqlite::memory:`; URLs with a scheme pass through.
pub fn normalize_database_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("sqlite:") {
        raw.to_string()
    } else if raw == ":memory:" {
        "sqlite::memory:".to_string()
    } else {
        format!("sqlite://{raw}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.storage_timeout, Duration::from_secs(5));
        #[cfg(feature = "sqlite")]
        assert_eq!(config.storage, StorageMode::Sqlite);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("PORT", "9000"),
            ("DATABASE_PATH", "/tmp/astro.db"),
            ("DATABASE_URL", "sqlite://ignored.db"),
            ("STORAGE", "memory"),
            ("STORAGE_TIMEOUT_MS", "250"),
            ("LOG_FORMAT", "pretty"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.database_url, "sqlite:///tmp/astro.db");
        assert_eq!(config.storage, StorageMode::Memory);
        assert_eq!(config.storage_timeout, Duration::from_millis(250));
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.max_connections, 4);
    }

    #[test]
    fn test_invalid_values() {
        assert!(load(&[("PORT", "eighty")]).is_err());
        assert!(load(&[("STORAGE", "mongo")]).is_err());
        assert!(load(&[("STORAGE_TIMEOUT_MS", "-1")]).is_err());
        assert!(load(&[("LOG_FORMAT", "xml")]).is_err());
    }

    #[test]
    fn test_zero_storage_timeout_is_rejected() {
        let err = load(&[("STORAGE_TIMEOUT_MS", "0")]).unwrap_err();
        assert!(err.to_string().contains("must be positive"), "{err}");
        assert_eq!(
            load(&[("STORAGE_TIMEOUT_MS", "1")]).unwrap().storage_timeout,
            Duration::from_millis(1)
        );
    }

    #[test]
    fn test_cli_overrides_env() {
        let config = load(&[("STORAGE", "sqlite")]).unwrap().with_cli(&CliOptions {
            storage_override: Some(StorageMode::Memory),
            port_override: Some(1234),
        });
        assert_eq!(config.storage, StorageMode::Memory);
        assert_eq!(config.port, 1234);
        assert_eq!(config.bind_addr().unwrap().port(), 1234);
    }

    #[test]
    fn test_normalize_database_url() {
        assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(normalize_database_url(":memory:"), "sqlite::memory:");
        assert_eq!(normalize_database_url("./data/a.db"), "sqlite://./data/a.db");
    }
}
