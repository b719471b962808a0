//! MediaWiki Action API client
//!
//! Uses ureq (sync HTTP) - no async runtime needed. Retryable failures
//! (transport errors, 429/5xx, `maxlag`) are retried with exponential backoff
//! before surfacing as a [`WikiError`].

use super::types::{
    continuation_params, CompareEnvelope, ContribsQuery, PagesQuery, PageviewsQuery,
    QueryEnvelope, SearchQuery, UsersQuery,
};
use super::{
    CompareResponse, Contribution, RevisionPage, RevisionQuery, UserInfo, WikiApi, WikiConfig,
    WikiError, WikiResult,
};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, warn};

/// Revision properties requested for every listed revision
const REVISION_PROPS: &str = "ids|timestamp|user|userid|comment|tags|size|flags";

/// Largest page the API serves to unprivileged clients
const MAX_PAGE_SIZE: usize = 500;

/// Titles per `prop=pageviews` request
const MAX_TITLES_PER_QUERY: usize = 50;

/// Days of page views summed per title (the API maximum)
const PAGEVIEW_DAYS: u32 = 60;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Sync MediaWiki client
pub struct WikiClient {
    config: WikiConfig,
    agent: ureq::Agent,
}

fn make_agent(timeout_secs: u64) -> ureq::Agent {
    ureq::config::Config::builder()
        .http_status_as_error(false) // Status codes are mapped to WikiError below
        .timeout_global(Some(Duration::from_secs(timeout_secs)))
        .build()
        .new_agent()
}

impl WikiClient {
    pub fn new(config: WikiConfig) -> Self {
        let agent = make_agent(config.timeout_secs);
        Self { config, agent }
    }

    pub fn config(&self) -> &WikiConfig {
        &self.config
    }

    /// GET the API with retries, returning the decoded JSON body.
    fn get(&self, params: &[(String, String)]) -> WikiResult<serde_json::Value> {
        let mut attempt = 0u32;
        loop {
            match self.get_once(params) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.retry_backoff_ms.saturating_mul(1 << attempt.min(16));
                    warn!(
                        "Wiki request failed (attempt {}/{}): {}; retrying in {}ms",
                        attempt + 1,
                        self.config.max_retries + 1,
                        e,
                        delay
                    );
                    std::thread::sleep(Duration::from_millis(delay));
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn get_once(&self, params: &[(String, String)]) -> WikiResult<serde_json::Value> {
        let mut req = self
            .agent
            .get(self.config.api_url.as_str())
            .header("User-Agent", self.config.user_agent.as_str())
            .query("format", "json")
            .query("formatversion", "2");
        for (key, value) in params {
            req = req.query(key, value);
        }

        let response = req.call().map_err(|e| WikiError::Transport {
            url: self.config.api_url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status().as_u16();
        if status >= 400 {
            let error_text = response.into_body().read_to_string().unwrap_or_default();
            return Err(WikiError::Http {
                status,
                message: error_text,
            });
        }

        let value: serde_json::Value = response
            .into_body()
            .read_json()
            .map_err(|e| WikiError::Decode(e.to_string()))?;

        match api_error(&value) {
            Some(err) => Err(err),
            None => Ok(value),
        }
    }

    fn get_typed<T: DeserializeOwned>(&self, params: &[(String, String)]) -> WikiResult<T> {
        let value = self.get(params)?;
        serde_json::from_value(value).map_err(|e| WikiError::Decode(e.to_string()))
    }
}

/// The `error` object of an API response, if present.
fn api_error(value: &serde_json::Value) -> Option<WikiError> {
    let err = value.get("error")?;
    let field = |name: &str| {
        err.get(name)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };
    Some(WikiError::Api {
        code: field("code"),
        info: field("info"),
    })
}

fn param(key: &str, value: impl Into<String>) -> (String, String) {
    (key.to_string(), value.into())
}

impl WikiApi for WikiClient {
    fn revisions(&self, query: &RevisionQuery) -> WikiResult<RevisionPage> {
        let limit = match query.limit {
            Some(n) if n < MAX_PAGE_SIZE => n.max(1).to_string(),
            _ => "max".to_string(),
        };
        let mut params = vec![
            param("action", "query"),
            param("prop", "revisions"),
            param("titles", query.title.as_str()),
            param("rvprop", REVISION_PROPS),
            param("rvlimit", limit),
            param("rvdir", "older"),
        ];
        if let Some(newest) = query.newest {
            params.push(param("rvstart", newest.format(TIMESTAMP_FORMAT).to_string()));
        }
        if let Some(oldest) = query.oldest {
            params.push(param("rvend", oldest.format(TIMESTAMP_FORMAT).to_string()));
        }
        if let Some(cont) = &query.continuation {
            params.extend(cont_iter(cont));
        }

        let envelope: QueryEnvelope<PagesQuery> = self.get_typed(&params)?;
        let mut revisions = Vec::new();
        for page in envelope.query.map(|q| q.pages).unwrap_or_default() {
            if page.missing {
                warn!("Page '{}' does not exist", page.title);
                continue;
            }
            revisions.extend(page.revisions);
        }

        debug!(
            "Listed {} revisions of '{}'",
            revisions.len(),
            query.title
        );

        Ok(RevisionPage {
            revisions,
            continuation: continuation_params(envelope.continuation),
        })
    }

    fn compare(&self, rev_id: u64) -> WikiResult<CompareResponse> {
        let params = [
            param("action", "compare"),
            param("fromrev", rev_id.to_string()),
            param("torelative", "prev"),
            param("prop", "diff|size"),
        ];
        let envelope: CompareEnvelope = self.get_typed(&params)?;
        Ok(envelope.compare)
    }

    fn user(&self, username: &str) -> WikiResult<Option<UserInfo>> {
        let params = [
            param("action", "query"),
            param("list", "users"),
            param("ususers", username),
            param("usprop", "registration|editcount|groups"),
        ];
        let envelope: QueryEnvelope<UsersQuery> = self.get_typed(&params)?;
        let user = envelope
            .query
            .and_then(|q| q.users.into_iter().next())
            .filter(|u| !u.missing && !u.invalid)
            .and_then(|u| u.info);
        Ok(user)
    }

    fn search(&self, term: &str, limit: usize) -> WikiResult<Vec<String>> {
        let mut titles = Vec::new();
        let mut continuation = None;

        while titles.len() < limit {
            let batch = (limit - titles.len()).min(MAX_PAGE_SIZE);
            let mut params = vec![
                param("action", "query"),
                param("list", "search"),
                param("srsearch", term),
                param("srnamespace", "0"),
                param("srprop", ""),
                param("srlimit", batch.to_string()),
            ];
            if let Some(cont) = &continuation {
                params.extend(cont_iter(cont));
            }

            let envelope: QueryEnvelope<SearchQuery> = self.get_typed(&params)?;
            let hits = envelope.query.map(|q| q.search).unwrap_or_default();
            if hits.is_empty() {
                break;
            }
            titles.extend(hits.into_iter().map(|h| h.title));

            continuation = continuation_params(envelope.continuation);
            if continuation.is_none() {
                break;
            }
        }

        titles.truncate(limit);
        Ok(titles)
    }

    fn pageviews(&self, titles: &[String]) -> WikiResult<BTreeMap<String, u64>> {
        let mut views: BTreeMap<String, u64> = titles.iter().map(|t| (t.clone(), 0)).collect();

        for chunk in titles.chunks(MAX_TITLES_PER_QUERY) {
            let mut continuation = None;
            loop {
                let mut params = vec![
                    param("action", "query"),
                    param("prop", "pageviews"),
                    param("pvipdays", PAGEVIEW_DAYS.to_string()),
                    param("titles", chunk.join("|")),
                ];
                if let Some(cont) = &continuation {
                    params.extend(cont_iter(cont));
                }

                let envelope: QueryEnvelope<PageviewsQuery> = self.get_typed(&params)?;
                if let Some(query) = envelope.query {
                    // Report under the title the caller asked for
                    let requested: HashMap<String, String> = query
                        .normalized
                        .into_iter()
                        .map(|n| (n.to, n.from))
                        .collect();
                    for page in query.pages {
                        let total = page.total();
                        let title = requested.get(&page.title).cloned().unwrap_or(page.title);
                        *views.entry(title).or_insert(0) += total;
                    }
                }

                continuation = continuation_params(envelope.continuation);
                if continuation.is_none() {
                    break;
                }
            }
        }

        debug!("Fetched page views for {} title(s)", titles.len());
        Ok(views)
    }

    fn user_contributions(&self, username: &str, limit: usize) -> WikiResult<Vec<Contribution>> {
        let mut contribs = Vec::new();
        let mut continuation = None;

        while contribs.len() < limit {
            let batch = (limit - contribs.len()).min(MAX_PAGE_SIZE);
            let mut params = vec![
                param("action", "query"),
                param("list", "usercontribs"),
                param("ucuser", username),
                param("ucprop", "ids|title|timestamp|comment|size|flags|tags"),
                param("uclimit", batch.to_string()),
            ];
            if let Some(cont) = &continuation {
                params.extend(cont_iter(cont));
            }

            let envelope: QueryEnvelope<ContribsQuery> = self.get_typed(&params)?;
            let page = envelope.query.map(|q| q.usercontribs).unwrap_or_default();
            if page.is_empty() {
                break;
            }
            contribs.extend(page);

            continuation = continuation_params(envelope.continuation);
            if continuation.is_none() {
                break;
            }
        }

        contribs.truncate(limit);
        Ok(contribs)
    }
}

fn cont_iter(cont: &super::Continuation) -> impl Iterator<Item = (String, String)> + '_ {
    cont.iter().map(|(k, v)| (k.clone(), v.clone()))
}
