//! Cache path utilities - uses ~/.cache/revsleuth/

use std::path::PathBuf;

/// Get the revsleuth cache directory.
/// Uses ~/.cache/revsleuth/ on Unix, %LOCALAPPDATA%/revsleuth/ on Windows.
pub fn get_cache_dir() -> PathBuf {
    let base = if cfg!(windows) {
        std::env::var("LOCALAPPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".")))
    } else {
        dirs::cache_dir().unwrap_or_else(|| {
            // Fallback to ~/.cache
            dirs::home_dir()
                .map(|h| h.join(".cache"))
                .unwrap_or_else(|| PathBuf::from("."))
        })
    };

    base.join("revsleuth")
}

/// Default location of the flagged-accounts file.
pub fn get_flagged_accounts_path() -> PathBuf {
    get_cache_dir().join("flagged_accounts.json")
}
