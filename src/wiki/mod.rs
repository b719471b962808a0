//! Wiki API access
//!
//! The analysis core only talks to a wiki through the [`WikiApi`] trait:
//! revision listing, revision comparison, user lookup, search, page views
//! and user contributions. Two implementations ship with the crate:
//!
//! - [`WikiClient`] - MediaWiki Action API over sync HTTP (ureq)
//! - [`MemoryWiki`] - fixture-backed, used by tests and offline replays
//!
//! # Example
//!
//! ```rust,ignore
//! use revsleuth::wiki::{WikiApi, WikiClient, WikiConfig};
//!
//! let client = WikiClient::new(WikiConfig::default());
//! let titles = client.search("\"chief of staff\" incategory:living_people", 10)?;
//! ```

mod client;
mod memory;
mod types;

pub use client::WikiClient;
pub use memory::{CallCounts, MemoryWiki};
pub use types::{
    CompareResponse, Continuation, Contribution, RevisionPage, RevisionQuery, RevisionRecord,
    UserInfo, WikiConfig,
};

use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur while talking to a wiki
#[derive(Error, Debug)]
pub enum WikiError {
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    #[error("API error {code}: {info}")]
    Api { code: String, info: String },

    #[error("Failed to decode API response: {0}")]
    Decode(String),

    #[error("Revision {0} not found")]
    MissingRevision(u64),
}

impl WikiError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            WikiError::Transport { .. } => true,
            WikiError::Http { status, .. } => *status == 429 || *status >= 500,
            WikiError::Api { code, .. } => matches!(code.as_str(), "maxlag" | "ratelimited"),
            WikiError::Decode(_) | WikiError::MissingRevision(_) => false,
        }
    }
}

pub type WikiResult<T> = Result<T, WikiError>;

/// Operations the analysis core needs from a wiki.
///
/// Implementations must be shareable across the diff worker pool.
pub trait WikiApi: Send + Sync {
    /// One page of a page's revision list, newest first.
    fn revisions(&self, query: &RevisionQuery) -> WikiResult<RevisionPage>;

    /// Diff of a revision against its predecessor.
    fn compare(&self, rev_id: u64) -> WikiResult<CompareResponse>;

    /// Account details, or `None` for missing/invalid accounts (e.g. IPs).
    fn user(&self, username: &str) -> WikiResult<Option<UserInfo>>;

    /// Up to `limit` article titles ranked by relevance.
    fn search(&self, term: &str, limit: usize) -> WikiResult<Vec<String>>;

    /// Recent daily page views summed per title. Every requested title has
    /// an entry; pages without data count 0.
    fn pageviews(&self, titles: &[String]) -> WikiResult<BTreeMap<String, u64>>;

    /// Up to `limit` most recent contributions of an account.
    fn user_contributions(&self, username: &str, limit: usize) -> WikiResult<Vec<Contribution>>;
}

/// Relevance results searched per title kept by [`search_by_views`]
pub const VIEW_RANK_POOL_FACTOR: usize = 3;

/// Search, then keep the `limit` most viewed of the top
/// `limit * VIEW_RANK_POOL_FACTOR` relevance hits.
pub fn search_by_views(
    api: &dyn WikiApi,
    term: &str,
    limit: usize,
) -> WikiResult<Vec<(String, u64)>> {
    let pool = api.search(term, limit.saturating_mul(VIEW_RANK_POOL_FACTOR))?;
    let mut ranked = rank_by_views(api, pool)?;
    ranked.truncate(limit);
    Ok(ranked)
}

/// Order `titles` by page views, most viewed first.
///
/// Titles with equal views keep their relative order, so relevance ranking
/// breaks ties.
pub fn rank_by_views(api: &dyn WikiApi, titles: Vec<String>) -> WikiResult<Vec<(String, u64)>> {
    if titles.is_empty() {
        return Ok(Vec::new());
    }
    let views = api.pageviews(&titles)?;
    let mut ranked: Vec<(String, u64)> = titles
        .into_iter()
        .map(|title| {
            let count = views.get(&title).copied().unwrap_or(0);
            (title, count)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(ranked)
}
