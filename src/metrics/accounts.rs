//! Memoised account lookups
//!
//! Account-based metrics need one external lookup per distinct username.
//! [`AccountCache`] is created per analysis run and handed to the metrics
//! that need it; entries never change once stored.

use crate::models::Edit;
use crate::wiki::{WikiApi, WikiError, WikiResult};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// An account lookup that failed for a reason other than "not found".
#[derive(Error, Debug)]
#[error("Account lookup for '{username}' failed: {source}")]
pub struct AccountLookupError {
    pub username: String,
    #[source]
    pub source: WikiError,
}

/// Facts about an account that metrics may consult.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFacts {
    /// `None` for accounts predating registration logging
    pub registration: Option<DateTime<Utc>>,
    pub edit_count: u64,
}

/// Source of account facts.
pub trait AccountLookup: Send + Sync {
    /// Facts for `username`, or `None` when the account does not exist.
    fn lookup(&self, username: &str) -> WikiResult<Option<AccountFacts>>;
}

/// Account lookups answered by a wiki's user query.
pub struct WikiAccounts {
    api: Arc<dyn WikiApi>,
}

impl WikiAccounts {
    pub fn new(api: Arc<dyn WikiApi>) -> Self {
        Self { api }
    }
}

impl AccountLookup for WikiAccounts {
    fn lookup(&self, username: &str) -> WikiResult<Option<AccountFacts>> {
        Ok(self.api.user(username)?.map(|info| AccountFacts {
            registration: info.registration,
            edit_count: info.edit_count,
        }))
    }
}

/// Per-run memo of account facts keyed by username.
///
/// Safe to share across threads. Two threads missing the same username at
/// once may both perform the lookup; the stored value is the same either way.
pub struct AccountCache {
    lookup: Arc<dyn AccountLookup>,
    entries: DashMap<String, Option<AccountFacts>>,
    lookups: AtomicUsize,
}

impl AccountCache {
    pub fn new(lookup: Arc<dyn AccountLookup>) -> Self {
        Self {
            lookup,
            entries: DashMap::new(),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn from_api(api: Arc<dyn WikiApi>) -> Self {
        Self::new(Arc::new(WikiAccounts::new(api)))
    }

    /// Look up every account behind `edits` that is not cached yet.
    ///
    /// Anonymous edits and empty usernames are skipped. The first failed
    /// lookup aborts with the account's name; accounts that do not exist
    /// are cached as unknown.
    pub fn prefetch<'a, I>(&self, edits: I) -> Result<usize, AccountLookupError>
    where
        I: IntoIterator<Item = &'a Edit>,
    {
        let pending: BTreeSet<&str> = edits
            .into_iter()
            .filter(|edit| !edit.is_anonymous() && !edit.user.is_empty())
            .map(|edit| edit.user.as_str())
            .filter(|user| !self.entries.contains_key(*user))
            .collect();

        for username in &pending {
            self.try_facts(username)
                .map_err(|source| AccountLookupError {
                    username: username.to_string(),
                    source,
                })?;
        }
        if !pending.is_empty() {
            info!("Looked up {} account(s)", pending.len());
        }
        Ok(pending.len())
    }

    /// Facts for `username`, looked up at most once per run.
    ///
    /// Failures are not cached.
    pub fn try_facts(&self, username: &str) -> WikiResult<Option<AccountFacts>> {
        if let Some(entry) = self.entries.get(username) {
            return Ok(entry.value().clone());
        }

        self.lookups.fetch_add(1, Ordering::Relaxed);
        let facts = self.lookup.lookup(username)?;
        debug!(
            "Account '{}': {}",
            username,
            if facts.is_some() { "found" } else { "not found" }
        );
        self.entries.insert(username.to_string(), facts.clone());
        Ok(facts)
    }

    /// Like [`AccountCache::try_facts`], reporting a failed lookup as unknown.
    ///
    /// Analysis runs call [`AccountCache::prefetch`] first, so metrics only
    /// reach the fallback when used outside an [`crate::pipeline::Analyzer`].
    pub fn facts(&self, username: &str) -> Option<AccountFacts> {
        self.try_facts(username).unwrap_or_else(|e| {
            warn!("Account lookup for '{}' failed: {}", username, e);
            None
        })
    }

    /// Number of external lookups performed so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
