//! Minimal CLI parsing for storage and port overrides.

use std::env;

use crate::storage_mode::StorageMode;

#[derive(Debug, Default, PartialEq)]
pub struct CliOptions {
    pub storage_override: Option<StorageMode>,
    pub port_override: Option<u16>,
}

impl CliOptions {
    pub fn from_args() -> Self {
        Self::parse(env::args().skip(1))
    }

    /// Parse flags; unknown arguments are ignored.
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Self {
        let mut options = CliOptions::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--memory" => options.storage_override = Some(StorageMode::Memory),
                "--sqlite" => options.storage_override = Some(StorageMode::Sqlite),
                "--storage" => {
                    if let Some(value) = args.next() {
                        options.storage_override = StorageMode::from_arg(&value);
                    }
                }
                "--port" => {
                    if let Some(value) = args.next() {
                        options.port_override = value.parse().ok();
                    }
                }
                _ if arg.starts_with("--storage=") => {
                    if let Some(value) = arg.split_once('=').map(|(_, v)| v) {
                        options.storage_override = StorageMode::from_arg(value);
                    }
                }
                _ if arg.starts_with("--port=") => {
                    if let Some(value) = arg.split_once('=').map(|(_, v)| v) {
                        options.port_override = value.parse().ok();
                    }
                }
                _ => {}
            }
        }
        options
    }
}
