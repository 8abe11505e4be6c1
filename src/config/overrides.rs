//! Environment variable overrides for configuration.

use crate::errors::Error;

use super::Config;
use super::env_parser::{
    apply_override, parse_env_bool, parse_env_path, parse_env_string, parse_env_value,
};

/// Apply `ANKIVEC_*` environment variables on top of `config`.
pub fn apply_env_overrides(config: &mut Config) -> Result<(), Error> {
    apply_override("ANKIVEC_DATABASE_PATH", &mut config.database_path, parse_env_path)?;
    apply_override("ANKIVEC_EMBEDDING_MODEL", &mut config.embedding_model, parse_env_string)?;
    apply_override("ANKIVEC_MODEL_CACHE", &mut config.model_cache, parse_env_path)?;
    apply_override("ANKIVEC_ANKI_URL", &mut config.anki_url, parse_env_string)?;
    apply_override(
        "ANKIVEC_REQUEST_TIMEOUT_SECS",
        &mut config.request_timeout_secs,
        parse_env_value,
    )?;
    apply_override("ANKIVEC_EMBED_BACK", &mut config.embed_back, parse_env_bool)?;
    apply_override("ANKIVEC_ADD_THRESHOLD", &mut config.add_threshold, parse_env_value)?;
    apply_override("ANKIVEC_IMPORT_THRESHOLD", &mut config.import_threshold, parse_env_value)?;
    apply_override("ANKIVEC_TOP_K", &mut config.top_k, parse_env_value)?;
    apply_override("ANKIVEC_SYNC_WORKERS", &mut config.sync_workers, parse_env_value)?;
    apply_override("ANKIVEC_SYNC_BATCH_SIZE", &mut config.sync_batch_size, parse_env_value)?;
    apply_override("ANKIVEC_IMPORT_SEPARATOR", &mut config.import_separator, parse_env_string)?;
    Ok(())
}
