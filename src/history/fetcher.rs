//! Revision history fetching
//!
//! Lists a page's revisions newest first, one API page at a time, and
//! completes every revision with its diff before it is returned. Diff
//! lookups of a batch run on a bounded rayon pool; the result is re-sorted
//! afterwards so completion order never leaks into the edit order.

use super::TimeWindow;
use crate::diff::{extract_diff, DiffExtract};
use crate::models::{Edit, ANONYMOUS_USER_ID};
use crate::wiki::{RevisionQuery, RevisionRecord, WikiApi, WikiResult};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};

/// Default number of concurrent diff lookups
pub const DEFAULT_WORKERS: usize = 5;

/// Upper bound on diff workers, from the command line or a config file.
pub const MAX_WORKERS: usize = 64;

/// Callback invoked with (page title, edits fetched so far)
pub type ProgressCallback = Box<dyn Fn(&str, usize) + Send + Sync>;

/// What to fetch for a page.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    pub window: TimeWindow,
    /// Keep at most this many of the most recent edits
    pub max_edits: Option<usize>,
}

impl FetchOptions {
    pub fn window(window: TimeWindow) -> Self {
        Self {
            window,
            max_edits: None,
        }
    }

    pub fn with_max_edits(mut self, max_edits: Option<usize>) -> Self {
        self.max_edits = max_edits;
        self
    }
}

/// Fetches edit histories through a [`WikiApi`].
pub struct EditFetcher {
    api: Arc<dyn WikiApi>,
    pool: rayon::ThreadPool,
    workers: usize,
    progress_callback: Option<ProgressCallback>,
}

impl EditFetcher {
    /// Create a fetcher running at most `workers` diff lookups at once.
    pub fn new(api: Arc<dyn WikiApi>, workers: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("revsleuth-diff-{}", i))
            .build()?;
        Ok(Self {
            api,
            pool,
            workers,
            progress_callback: None,
        })
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn api(&self) -> &Arc<dyn WikiApi> {
        &self.api
    }

    /// Fetch the edits of `title` inside the window, newest first.
    ///
    /// Pagination follows the API's continuation token only. Once
    /// `max_edits` is reached no further page is requested. Any failed
    /// listing or diff lookup fails the whole fetch; no edit is ever
    /// returned without its diff fields.
    pub fn fetch_edits(&self, title: &str, options: &FetchOptions) -> WikiResult<Vec<Edit>> {
        let mut edits: Vec<Edit> = Vec::new();
        let mut continuation = None;
        let mut pages = 0usize;

        loop {
            let remaining = options.max_edits.map(|max| max.saturating_sub(edits.len()));
            if remaining == Some(0) {
                debug!("Reached {} edits for '{}', stopping", edits.len(), title);
                break;
            }

            let query = RevisionQuery {
                title: title.to_string(),
                newest: options.window.end,
                oldest: options.window.start,
                limit: remaining,
                continuation: continuation.take(),
            };
            let page = self.api.revisions(&query)?;
            pages += 1;

            // API bounds are inclusive on both ends; drop the exclusive end
            let mut batch: Vec<RevisionRecord> = page
                .revisions
                .into_iter()
                .filter(|r| options.window.contains(r.timestamp))
                .collect();
            if let Some(remaining) = remaining {
                batch.truncate(remaining);
            }

            debug!(
                "Page {} of '{}': {} revisions, fetching diffs",
                pages,
                title,
                batch.len()
            );
            edits.extend(self.complete_batch(batch)?);

            if let Some(ref callback) = self.progress_callback {
                callback(title, edits.len());
            }

            match page.continuation {
                Some(next) => continuation = Some(next),
                None => break,
            }
        }

        sort_newest_first(&mut edits);
        if let Some(max) = options.max_edits {
            edits.truncate(max);
        }

        info!(
            "Fetched {} edits of '{}' in {} page(s)",
            edits.len(),
            title,
            pages
        );
        Ok(edits)
    }

    /// Complete a single revision record with its diff.
    pub fn edit_for_record(&self, record: RevisionRecord) -> WikiResult<Edit> {
        let diff = self.diff_for(&record)?;
        Ok(edit_from_record(record, diff))
    }

    /// Complete many records on the worker pool, newest first.
    pub fn edits_for_records(&self, records: Vec<RevisionRecord>) -> WikiResult<Vec<Edit>> {
        let mut edits = self.complete_batch(records)?;
        sort_newest_first(&mut edits);
        Ok(edits)
    }

    fn complete_batch(&self, batch: Vec<RevisionRecord>) -> WikiResult<Vec<Edit>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        self.pool.install(|| {
            batch
                .into_par_iter()
                .map(|record| self.edit_for_record(record))
                .collect()
        })
    }

    fn diff_for(&self, record: &RevisionRecord) -> WikiResult<DiffExtract> {
        if record.parentid == 0 {
            return Ok(DiffExtract::creation(record.size));
        }
        let response = self.api.compare(record.revid)?;
        extract_diff(&response)
    }
}

/// Build an [`Edit`] from listed metadata and its diff.
///
/// Hidden or empty usernames are attributed to [`ANONYMOUS_USER_ID`];
/// hidden comments and absent tags default to empty.
pub fn edit_from_record(record: RevisionRecord, diff: DiffExtract) -> Edit {
    let user = record.user.unwrap_or_default();
    let user_id = if user.is_empty() {
        ANONYMOUS_USER_ID
    } else {
        record.userid.unwrap_or(ANONYMOUS_USER_ID)
    };

    Edit {
        rev_id: record.revid,
        user,
        user_id,
        comment: record.comment.unwrap_or_default(),
        timestamp: record.timestamp,
        tags: record.tags.unwrap_or_default(),
        minor: record.minor,
        added: diff.added,
        removed: diff.removed,
        new_size: diff.new_size,
        size_delta: diff.size_delta,
    }
}

fn sort_newest_first(edits: &mut [Edit]) {
    edits.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.rev_id.cmp(&a.rev_id))
    });
}
