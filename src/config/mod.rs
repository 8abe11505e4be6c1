//! Configuration for ankivec.
//!
//! Priority: defaults < `~/.config/ankivec/config.toml` < `ANKIVEC_*`
//! environment variables. Values are validated after merging.

mod env_parser;
mod loader;
mod overrides;
mod paths;
mod validation;

#[cfg(test)]
mod tests_utils;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::Error;
use crate::import::DEFAULT_SEPARATOR;
use crate::resolver::{DEFAULT_ADD_THRESHOLD, DEFAULT_IMPORT_THRESHOLD, DEFAULT_TOP_K};
use crate::sync::{DEFAULT_BATCH_SIZE, DEFAULT_WORKERS};

pub use loader::ConfigFile;
pub use validation::{MAX_TOP_K, validate_threshold};

pub const DEFAULT_MODEL: &str = "BAAI/bge-small-en-v1.5";
pub const DEFAULT_ANKI_URL: &str = "http://localhost:8765";
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite index.
    pub database_path: PathBuf,

    /// HuggingFace embedding model identifier.
    pub embedding_model: String,

    /// Directory for caching ONNX models.
    pub model_cache: PathBuf,

    /// AnkiConnect endpoint.
    pub anki_url: String,

    /// HTTP timeout for AnkiConnect calls.
    pub request_timeout_secs: u64,

    /// Embed the back of a card together with the front.
    pub embed_back: bool,

    /// Duplicate threshold when adding a single card.
    pub add_threshold: f64,

    /// Duplicate threshold during bulk import.
    pub import_threshold: f64,

    /// Candidates fetched per duplicate check.
    pub top_k: usize,

    /// Upsert threads during sync.
    pub sync_workers: usize,

    /// Cards fetched from Anki per request during sync.
    pub sync_batch_size: usize,

    /// Record separator line in import files.
    pub import_separator: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = paths::data_dir();
        Self {
            database_path: data_dir.join("cards.db"),
            embedding_model: DEFAULT_MODEL.to_string(),
            model_cache: data_dir.join("models"),
            anki_url: DEFAULT_ANKI_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            embed_back: true,
            add_threshold: DEFAULT_ADD_THRESHOLD,
            import_threshold: DEFAULT_IMPORT_THRESHOLD,
            top_k: DEFAULT_TOP_K,
            sync_workers: DEFAULT_WORKERS,
            sync_batch_size: DEFAULT_BATCH_SIZE,
            import_separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default file location and the environment.
    pub fn load() -> Result<Self, Error> {
        Self::load_from(&paths::config_file())
    }

    /// Load configuration using `config_path` as the TOML file.
    pub fn load_from(config_path: &Path) -> Result<Self, Error> {
        let mut config = Config::default();
        if let Some(file) = loader::load_from_file(config_path)? {
            tracing::debug!(path = %config_path.display(), "loaded config file");
            config.merge_from_file(file);
        }
        overrides::apply_env_overrides(&mut config)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Merge configuration from a file into this config.
    fn merge_from_file(&mut self, file: ConfigFile) {
        if let Some(mut path) = file.database_path {
            paths::expand_tilde(&mut path);
            self.database_path = path;
        }
        if let Some(mut path) = file.model_cache {
            paths::expand_tilde(&mut path);
            self.model_cache = path;
        }
        if let Some(model) = file.embedding_model {
            self.embedding_model = model;
        }
        if let Some(url) = file.anki_url {
            self.anki_url = url;
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
        if let Some(embed_back) = file.embed_back {
            self.embed_back = embed_back;
        }
        if let Some(t) = file.add_threshold {
            self.add_threshold = t;
        }
        if let Some(t) = file.import_threshold {
            self.import_threshold = t;
        }
        if let Some(k) = file.top_k {
            self.top_k = k;
        }
        if let Some(n) = file.sync_workers {
            self.sync_workers = n;
        }
        if let Some(n) = file.sync_batch_size {
            self.sync_batch_size = n;
        }
        if let Some(sep) = file.import_separator {
            self.import_separator = sep;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Ensure parent directories for database and cache paths exist.
    pub fn ensure_directories(&self) -> Result<(), Error> {
        if let Some(parent) = self.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Config(format!(
                        "Failed to create database directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        std::fs::create_dir_all(&self.model_cache).map_err(|e| {
            Error::Config(format!(
                "Failed to create model cache directory {}: {e}",
                self.model_cache.display()
            ))
        })?;

        Ok(())
    }
}
