use crate::core::error::ClearCaseError;
use std::path::PathBuf;

const APP_DIR: &str = "clearcase-navigator";

pub fn get_config_directory() -> Result<PathBuf, ClearCaseError> {
    let base = match std::env::consts::OS {
        "linux" | "freebsd" | "netbsd" | "openbsd" => std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::home_dir().unwrap_or_default().join(".config")),
        "macos" => dirs::home_dir()
            .unwrap_or_default()
            .join("Library/Application Support"),
        _ => dirs::config_dir().unwrap_or_default(),
    };

    Ok(base.join(APP_DIR))
}

pub fn get_cache_directory() -> Result<PathBuf, ClearCaseError> {
    let base = match std::env::consts::OS {
        "linux" | "freebsd" | "netbsd" | "openbsd" => std::env::var("XDG_CACHE_HOME")
            .map(PathBuf::from)
            .or_else(|_| dirs::cache_dir().ok_or(ClearCaseError::CacheDirectoryNotFound))?,
        "macos" => dirs::home_dir()
            .ok_or(ClearCaseError::CacheDirectoryNotFound)?
            .join("Library/Caches"),
        _ => dirs::cache_dir().ok_or(ClearCaseError::CacheDirectoryNotFound)?,
    };

    Ok(base.join(APP_DIR))
}

/// Where historical versions are fetched to when no `temp_dir` is configured
pub fn get_default_temp_directory() -> PathBuf {
    std::env::temp_dir().join(APP_DIR)
}
