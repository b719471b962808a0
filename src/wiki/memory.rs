//! Fixture-backed wiki
//!
//! Serves revisions, diffs and accounts from memory with the same paging
//! and windowing rules as the Action API. Every operation is counted so
//! callers can assert how many round-trips an analysis needed.

use super::{
    CompareResponse, Contribution, RevisionPage, RevisionQuery, RevisionRecord, UserInfo, WikiApi,
    WikiError, WikiResult,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

const DEFAULT_PAGE_SIZE: usize = 50;

/// Per-operation call counters.
#[derive(Debug, Default)]
pub struct CallCounts {
    pub revisions: AtomicUsize,
    pub compare: AtomicUsize,
    pub user: AtomicUsize,
    pub search: AtomicUsize,
    pub pageviews: AtomicUsize,
    pub contributions: AtomicUsize,
}

impl CallCounts {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// In-memory [`WikiApi`] implementation
#[derive(Debug, Default)]
pub struct MemoryWiki {
    pages: BTreeMap<String, Vec<RevisionRecord>>,
    diffs: HashMap<u64, CompareResponse>,
    users: HashMap<String, UserInfo>,
    views: HashMap<String, u64>,
    failing: HashSet<u64>,
    page_size: Option<usize>,
    calls: CallCounts,
}

impl MemoryWiki {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page with its revisions (any order).
    pub fn with_page(mut self, title: impl Into<String>, revisions: Vec<RevisionRecord>) -> Self {
        self.pages.entry(title.into()).or_default().extend(revisions);
        self
    }

    /// Register the compare result for a revision.
    pub fn with_diff(mut self, rev_id: u64, diff: CompareResponse) -> Self {
        self.diffs.insert(rev_id, diff);
        self
    }

    pub fn with_user(mut self, info: UserInfo) -> Self {
        self.users.insert(info.name.clone(), info);
        self
    }

    /// Recent page views reported for `title`.
    pub fn with_pageviews(mut self, title: impl Into<String>, views: u64) -> Self {
        self.views.insert(title.into(), views);
        self
    }

    /// Maximum revisions returned per `revisions` call.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }

    /// Make `compare` for this revision fail with a transport error.
    pub fn failing_compare(mut self, rev_id: u64) -> Self {
        self.failing.insert(rev_id);
        self
    }

    pub fn calls(&self) -> &CallCounts {
        &self.calls
    }

    /// Revisions of a page, newest first.
    fn history(&self, title: &str) -> Vec<&RevisionRecord> {
        let mut revs: Vec<&RevisionRecord> = self
            .pages
            .get(title)
            .map(|r| r.iter().collect())
            .unwrap_or_default();
        revs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.revid.cmp(&a.revid)));
        revs
    }
}

impl WikiApi for MemoryWiki {
    fn revisions(&self, query: &RevisionQuery) -> WikiResult<RevisionPage> {
        self.calls.revisions.fetch_add(1, Ordering::SeqCst);

        let offset = match query
            .continuation
            .as_ref()
            .and_then(|c| c.get("rvcontinue"))
        {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| WikiError::Api {
                    code: "badcontinue".to_string(),
                    info: format!("Invalid continue param: {}", token),
                })?,
            None => 0,
        };

        let matching: Vec<&RevisionRecord> = self
            .history(&query.title)
            .into_iter()
            .filter(|r| query.newest.map_or(true, |t| r.timestamp <= t))
            .filter(|r| query.oldest.map_or(true, |t| r.timestamp >= t))
            .collect();

        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        let limit = query.limit.map_or(page_size, |l| l.min(page_size)).max(1);
        let end = (offset + limit).min(matching.len());
        let revisions: Vec<RevisionRecord> = matching
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|r| (*r).clone())
            .collect();

        let continuation = (end < matching.len()).then(|| {
            let mut cont = BTreeMap::new();
            cont.insert("rvcontinue".to_string(), end.to_string());
            cont.insert("continue".to_string(), "||".to_string());
            cont
        });

        Ok(RevisionPage {
            revisions,
            continuation,
        })
    }

    fn compare(&self, rev_id: u64) -> WikiResult<CompareResponse> {
        self.calls.compare.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&rev_id) {
            return Err(WikiError::Transport {
                url: "memory://compare".to_string(),
                message: format!("simulated failure for revision {}", rev_id),
            });
        }
        self.diffs
            .get(&rev_id)
            .cloned()
            .ok_or(WikiError::MissingRevision(rev_id))
    }

    fn user(&self, username: &str) -> WikiResult<Option<UserInfo>> {
        self.calls.user.fetch_add(1, Ordering::SeqCst);
        Ok(self.users.get(username).cloned())
    }

    fn search(&self, term: &str, limit: usize) -> WikiResult<Vec<String>> {
        self.calls.search.fetch_add(1, Ordering::SeqCst);
        let needle = term.to_lowercase();
        Ok(self
            .pages
            .keys()
            .filter(|title| title.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    fn pageviews(&self, titles: &[String]) -> WikiResult<BTreeMap<String, u64>> {
        self.calls.pageviews.fetch_add(1, Ordering::SeqCst);
        Ok(titles
            .iter()
            .map(|title| (title.clone(), self.views.get(title).copied().unwrap_or(0)))
            .collect())
    }

    fn user_contributions(&self, username: &str, limit: usize) -> WikiResult<Vec<Contribution>> {
        self.calls.contributions.fetch_add(1, Ordering::SeqCst);
        let mut contribs: Vec<Contribution> = self
            .pages
            .iter()
            .flat_map(|(title, revs)| {
                revs.iter()
                    .filter(|r| r.user.as_deref() == Some(username))
                    .map(|r| Contribution {
                        title: title.clone(),
                        revision: r.clone(),
                    })
            })
            .collect();
        contribs.sort_by(|a, b| b.revision.timestamp.cmp(&a.revision.timestamp));
        contribs.truncate(limit);
        Ok(contribs)
    }
}
