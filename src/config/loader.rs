//! Configuration file loading and parsing.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::Error;

/// Configuration loaded from TOML. Absent keys keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub database_path: Option<PathBuf>,
    pub embedding_model: Option<String>,
    pub model_cache: Option<PathBuf>,
    pub anki_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub embed_back: Option<bool>,
    pub add_threshold: Option<f64>,
    pub import_threshold: Option<f64>,
    pub top_k: Option<usize>,
    pub sync_workers: Option<usize>,
    pub sync_batch_size: Option<usize>,
    pub import_separator: Option<String>,
}

/// Parse TOML config content. `origin` names the source in error messages.
pub fn parse(content: &str, origin: &Path) -> Result<ConfigFile, Error> {
    toml::from_str(content).map_err(|e| {
        Error::Config(format!(
            "Failed to parse config file {}: {e}",
            origin.display()
        ))
    })
}

/// Load the config file at `path`, if it exists.
pub fn load_from_file(path: &Path) -> Result<Option<ConfigFile>, Error> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read config file {}: {e}",
            path.display()
        ))
    })?;
    parse(&content, path).map(Some)
}
