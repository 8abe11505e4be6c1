//! Path expansion utilities for tilde (`~`) substitution.

use std::path::{Path, PathBuf};

/// Expand `~` to the home directory in place.
pub fn expand_tilde(path: &mut PathBuf) {
    *path = expand_tilde_path(path);
}

/// Expand `~` to the home directory, returning a new path.
pub fn expand_tilde_path(path: &Path) -> PathBuf {
    if path.starts_with("~") {
        if let Some(home) = dirs::home_dir() {
            let rest = path.strip_prefix("~").unwrap_or(Path::new(""));
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

/// Base directory for data files: `~/.ankivec`, or `./.ankivec` without a home.
pub fn data_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
    });
    home.join(".ankivec")
}

/// Location of the optional TOML config file.
pub fn config_file() -> PathBuf {
    let config_dir = dirs::config_dir().unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
    });
    config_dir.join("ankivec").join("config.toml")
}
