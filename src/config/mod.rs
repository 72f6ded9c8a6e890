//! Configuration module for txn-query
//!
//! Handles loading settings from YAML files and environment variables.
//! Settings are read once at startup and passed explicitly to the
//! components that need them.

mod settings;

pub use settings::*;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit settings file
pub const CONFIG_ENV: &str = "TXN_QUERY_CONFIG";

/// Pick the settings file: an explicit path, the environment, or the
/// first default location that exists
pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    default_paths().into_iter().find(|path| path.exists())
}

/// Load settings from `path`, or defaults when there is none.
/// Environment overrides apply either way.
pub fn load(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => load_file(path),
        None => {
            let mut settings = Settings::default();
            settings.merge_env();
            Ok(settings)
        }
    }
}

fn load_file(path: &Path) -> Result<Settings> {
    let mut settings = Settings::from_file(path)?;
    settings.merge_env();
    Ok(settings)
}

/// Candidate settings files, in lookup order
pub fn default_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("config.yaml"),
        PathBuf::from("config/config.yaml"),
        PathBuf::from("/etc/txn-query/config.yaml"),
    ];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("txn-query/config.yaml"));
    }
    paths
}
