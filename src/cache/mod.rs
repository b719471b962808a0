//! Flagged-account persistence
//!
//! Accounts implicated in outlier edit sets are kept as a small JSON map
//! from username to the edit-set keys (`"Title yyyy-mm"` or `"Title"`)
//! where they triggered a metric:
//!
//! ```json
//! {
//!   "ExampleUser": ["Joe Biden 2021-10", "Ron Klain 2021-11"]
//! }
//! ```
//!
//! The file can be merged across runs and read back as input for account
//! profiling.

pub mod paths;

pub use paths::{get_cache_dir, get_flagged_accounts_path};

use crate::models::SetKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid flagged-accounts file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Username -> edit-set keys, both sorted and deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlaggedAccounts {
    accounts: BTreeMap<String, BTreeSet<String>>,
}

impl FlaggedAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, username: impl Into<String>, set: &SetKey) {
        self.accounts
            .entry(username.into())
            .or_default()
            .insert(set.to_string());
    }

    /// Add every entry of `other`.
    pub fn merge(&mut self, other: FlaggedAccounts) {
        for (user, sets) in other.accounts {
            self.accounts.entry(user).or_default().extend(sets);
        }
    }

    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.accounts.keys().map(String::as_str)
    }

    pub fn sets_for(&self, username: &str) -> Option<&BTreeSet<String>> {
        self.accounts.get(username)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.accounts.iter()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn load(path: &Path) -> CacheResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let flagged: FlaggedAccounts =
            serde_json::from_str(&content).map_err(|source| CacheError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("Loaded {} flagged accounts from {}", flagged.len(), path.display());
        Ok(flagged)
    }

    /// Load `path`, or start empty when it does not exist yet.
    pub fn load_or_default(path: &Path) -> CacheResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> CacheResult<()> {
        let io_err = |source: std::io::Error| CacheError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| CacheError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(io_err)?;
        debug!("Saved {} flagged accounts to {}", self.len(), path.display());
        Ok(())
    }

    /// Load `path`, merge `self` into it and write the result back.
    pub fn merge_into_file(&self, path: &Path) -> CacheResult<FlaggedAccounts> {
        let mut merged = Self::load_or_default(path)?;
        merged.merge(self.clone());
        merged.save(path)?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::YearMonth;
    use tempfile::TempDir;

    fn month(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    #[test]
    fn test_insert_dedupes_and_sorts() {
        let mut flagged = FlaggedAccounts::new();
        flagged.insert("Bob", &SetKey::page_month("Zeta", month("2021-10")));
        flagged.insert("Bob", &SetKey::page_month("Alpha", month("2021-10")));
        flagged.insert("Bob", &SetKey::page_month("Zeta", month("2021-10")));
        let sets: Vec<&String> = flagged.sets_for("Bob").unwrap().iter().collect();
        assert_eq!(sets, vec!["Alpha 2021-10", "Zeta 2021-10"]);
    }

    #[test]
    fn test_json_shape() {
        let mut flagged = FlaggedAccounts::new();
        flagged.insert("Bob", &SetKey::page("Page"));
        let json = serde_json::to_string(&flagged).unwrap();
        assert_eq!(json, r#"{"Bob":["Page"]}"#);
    }

    #[test]
    fn test_merge_into_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("flagged.json");

        let mut first = FlaggedAccounts::new();
        first.insert("Bob", &SetKey::page("A"));
        first.merge_into_file(&path).unwrap();

        let mut second = FlaggedAccounts::new();
        second.insert("Bob", &SetKey::page("B"));
        second.insert("Carol", &SetKey::page("A"));
        let merged = second.merge_into_file(&path).unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged.sets_for("Bob").unwrap().len(), 2);
        assert_eq!(FlaggedAccounts::load(&path).unwrap(), merged);
    }

    #[test]
    fn test_load_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(
            FlaggedAccounts::load(&path),
            Err(CacheError::Json { .. })
        ));
    }
}
