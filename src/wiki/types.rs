//! Wire types for the MediaWiki Action API (`formatversion=2`)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Continuation parameters echoed back verbatim on the next request.
pub type Continuation = BTreeMap<String, String>;

/// Connection settings for [`super::WikiClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiConfig {
    /// Action API endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// User-Agent sent with every request (Wikimedia requires a contact)
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries after the first attempt for retryable failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay, doubled on every retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_api_url() -> String {
    "https://en.wikipedia.org/w/api.php".to_string()
}

fn default_user_agent() -> String {
    format!(
        "revsleuth/{} (https://github.com/revsleuth/revsleuth)",
        env!("CARGO_PKG_VERSION")
    )
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

/// Parameters for one revision-list request.
#[derive(Debug, Clone, Default)]
pub struct RevisionQuery {
    pub title: String,
    /// Newest timestamp to include (`rvstart`, inclusive)
    pub newest: Option<DateTime<Utc>>,
    /// Oldest timestamp to include (`rvend`, inclusive)
    pub oldest: Option<DateTime<Utc>>,
    /// Page size; `None` requests the server maximum
    pub limit: Option<usize>,
    pub continuation: Option<Continuation>,
}

impl RevisionQuery {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// One revision as listed by `prop=revisions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionRecord {
    pub revid: u64,
    /// 0 when the revision created the page
    #[serde(default)]
    pub parentid: u64,
    /// Absent when the username is hidden
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub userid: Option<i64>,
    pub timestamp: DateTime<Utc>,
    /// Absent when the comment is hidden
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub minor: bool,
}

/// A page of revisions plus the token for the next page, if any.
#[derive(Debug, Clone, Default)]
pub struct RevisionPage {
    pub revisions: Vec<RevisionRecord>,
    pub continuation: Option<Continuation>,
}

/// Result of `action=compare` with `prop=diff|size`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareResponse {
    /// Size before the revision; absent for page creations
    #[serde(default)]
    pub fromsize: Option<i64>,
    #[serde(default)]
    pub tosize: i64,
    /// Rendered diff table rows
    #[serde(default, alias = "*")]
    pub body: String,
}

/// Account details from `list=users`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    #[serde(default, rename = "userid")]
    pub user_id: i64,
    #[serde(default, rename = "editcount")]
    pub edit_count: u64,
    /// `None` for accounts older than registration logging
    #[serde(default)]
    pub registration: Option<DateTime<Utc>>,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// One entry of `list=usercontribs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub title: String,
    #[serde(flatten)]
    pub revision: RevisionRecord,
}

// Raw response envelopes

#[derive(Deserialize)]
pub(crate) struct QueryEnvelope<Q> {
    #[serde(default, rename = "continue")]
    pub continuation: Option<BTreeMap<String, serde_json::Value>>,
    pub query: Option<Q>,
}

#[derive(Deserialize)]
pub(crate) struct PagesQuery {
    #[serde(default)]
    pub pages: Vec<PageEntry>,
}

#[derive(Deserialize)]
pub(crate) struct PageEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub revisions: Vec<RevisionRecord>,
}

#[derive(Deserialize)]
pub(crate) struct CompareEnvelope {
    pub compare: CompareResponse,
}

#[derive(Deserialize)]
pub(crate) struct UsersQuery {
    #[serde(default)]
    pub users: Vec<RawUser>,
}

#[derive(Deserialize)]
pub(crate) struct RawUser {
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub invalid: bool,
    #[serde(flatten)]
    pub info: Option<UserInfo>,
}

#[derive(Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    pub search: Vec<SearchHit>,
}

#[derive(Deserialize)]
pub(crate) struct SearchHit {
    pub title: String,
}

#[derive(Deserialize)]
pub(crate) struct PageviewsQuery {
    #[serde(default)]
    pub normalized: Vec<NormalizedTitle>,
    #[serde(default)]
    pub pages: Vec<PageviewsEntry>,
}

#[derive(Deserialize)]
pub(crate) struct NormalizedTitle {
    pub from: String,
    pub to: String,
}

#[derive(Deserialize)]
pub(crate) struct PageviewsEntry {
    pub title: String,
    /// Views per day; `null` where no data was recorded. Absent on
    /// continuation pages that already reported this title.
    #[serde(default)]
    pub pageviews: BTreeMap<String, Option<u64>>,
}

impl PageviewsEntry {
    pub fn total(&self) -> u64 {
        self.pageviews.values().flatten().sum()
    }
}

#[derive(Deserialize)]
pub(crate) struct ContribsQuery {
    #[serde(default)]
    pub usercontribs: Vec<Contribution>,
}

/// Flatten a `continue` object into string parameters.
pub(crate) fn continuation_params(
    raw: Option<BTreeMap<String, serde_json::Value>>,
) -> Option<Continuation> {
    let raw = raw?;
    let params: Continuation = raw
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect();
    (!params.is_empty()).then_some(params)
}
