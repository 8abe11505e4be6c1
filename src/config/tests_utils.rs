//! Shared test utilities for config module tests.

use std::sync::Mutex;

/// Serializes tests that touch process environment variables.
pub static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Every variable the loader reads.
pub const ALL_VARS: &[&str] = &[
    "ANKIVEC_DATABASE_PATH",
    "ANKIVEC_EMBEDDING_MODEL",
    "ANKIVEC_MODEL_CACHE",
    "ANKIVEC_ANKI_URL",
    "ANKIVEC_REQUEST_TIMEOUT_SECS",
    "ANKIVEC_EMBED_BACK",
    "ANKIVEC_ADD_THRESHOLD",
    "ANKIVEC_IMPORT_THRESHOLD",
    "ANKIVEC_TOP_K",
    "ANKIVEC_SYNC_WORKERS",
    "ANKIVEC_SYNC_BATCH_SIZE",
    "ANKIVEC_IMPORT_SEPARATOR",
];

/// Remove every ankivec variable. Callers must hold `ENV_MUTEX`.
pub fn cleanup_env_vars() {
    for var in ALL_VARS {
        // SAFETY: env tests are serialized by ENV_MUTEX
        unsafe { std::env::remove_var(var) };
    }
}

/// Set one variable. Callers must hold `ENV_MUTEX`.
pub fn set_env(name: &str, value: &str) {
    // SAFETY: env tests are serialized by ENV_MUTEX
    unsafe { std::env::set_var(name, value) };
}
