//! Configuration validation logic.

use std::path::{Component, Path};

use crate::errors::Error;

use super::Config;

/// Largest accepted `top_k`.
pub const MAX_TOP_K: usize = 100;

/// Validate all configuration values for correctness and constraints.
///
/// Checks that:
/// - both thresholds are finite and between 0.0 and 1.0
/// - `top_k` is between 1 and `MAX_TOP_K`
/// - worker count, batch size and request timeout are positive
/// - the AnkiConnect URL parses
/// - paths, model and separator are not empty, and the database path has no `..`
///
/// # Errors
///
/// Returns `Error::Config` if any validation check fails.
pub fn validate(config: &Config) -> Result<(), Error> {
    validate_threshold("add_threshold", config.add_threshold)?;
    validate_threshold("import_threshold", config.import_threshold)?;
    validate_top_k(config.top_k)?;
    validate_positive("sync_workers", config.sync_workers)?;
    validate_positive("sync_batch_size", config.sync_batch_size)?;
    if config.request_timeout_secs == 0 {
        return Err(Error::Config("request_timeout_secs must be at least 1".to_string()));
    }
    validate_url(&config.anki_url)?;
    validate_database_path(&config.database_path)?;

    if config.embedding_model.trim().is_empty() {
        return Err(Error::Config("Embedding model cannot be empty".to_string()));
    }
    if config.model_cache.as_os_str().is_empty() {
        return Err(Error::Config("Model cache path cannot be empty".to_string()));
    }
    if config.import_separator.trim().is_empty() {
        return Err(Error::Config("Import separator cannot be empty".to_string()));
    }
    Ok(())
}

/// Check a similarity threshold. Also used for `--threshold` flags.
pub fn validate_threshold(name: &str, value: f64) -> Result<(), Error> {
    if value.is_nan() || value.is_infinite() {
        return Err(Error::Config(format!(
            "Invalid {name}: NaN and infinity are not allowed"
        )));
    }
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::Config(format!(
            "Invalid {name}: {value} (must be between 0.0 and 1.0)"
        )));
    }
    Ok(())
}

fn validate_top_k(top_k: usize) -> Result<(), Error> {
    if !(1..=MAX_TOP_K).contains(&top_k) {
        return Err(Error::Config(format!(
            "Invalid top_k: {top_k} (must be between 1 and {MAX_TOP_K})"
        )));
    }
    Ok(())
}

fn validate_positive(name: &str, value: usize) -> Result<(), Error> {
    if value == 0 {
        return Err(Error::Config(format!("{name} must be at least 1")));
    }
    Ok(())
}

fn validate_url(url: &str) -> Result<(), Error> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| Error::Config(format!("Invalid anki_url {url}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "Invalid anki_url {url}: scheme must be http or https"
        )));
    }
    Ok(())
}

fn validate_database_path(path: &Path) -> Result<(), Error> {
    if path.as_os_str().is_empty() {
        return Err(Error::Config("Database path cannot be empty".to_string()));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(Error::Config(format!(
            "Invalid database path {}: contains '..'",
            path.display()
        )));
    }
    Ok(())
}
