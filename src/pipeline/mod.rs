//! Analysis pipeline
//!
//! Orchestrates a full run:
//! 1. Fetch one edit set per page (or per page and month)
//! 2. Score every set under every metric
//! 3. Flag outlier sets
//! 4. Resolve the users behind the flagged sets
//!
//! Step 1 fetches revisions. Before step 2 the metrics load what they need
//! (account facts), and a failed lookup aborts the run instead of scoring
//! the edit as harmless. Steps 2-4 are otherwise pure functions of the
//! fetched edit sets and can be rerun on saved sets via [`Analyzer::analyze`].

use crate::cache::FlaggedAccounts;
use crate::history::{EditFetcher, FetchOptions, TimeWindow};
use crate::metrics::{AccountLookupError, MetricError, MetricRegistry};
use crate::models::{EditSets, SetKey, YearMonth};
use crate::scoring::{
    detect_outliers, score_suspiciousness, OutlierRecord, SuspicionTable, DEFAULT_MARKER,
};
use crate::suspects::{
    all_suspicious_users, flagged_accounts, resolve_suspicious_users, SuspiciousUsers,
};
use crate::wiki::{search_by_views, WikiError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to fetch edits for '{set}': {source}")]
    Fetch {
        set: SetKey,
        #[source]
        source: WikiError,
    },

    #[error("Search for '{term}' failed: {source}")]
    Search {
        term: String,
        #[source]
        source: WikiError,
    },

    #[error(transparent)]
    Metric(#[from] MetricError),

    #[error(transparent)]
    AccountLookup(#[from] AccountLookupError),

    #[error("Failed to start diff worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Callback invoked with (set just fetched, sets done, sets total)
pub type SetProgressCallback = Box<dyn Fn(&SetKey, usize, usize) + Send + Sync>;

/// Name and description of a metric used in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricInfo {
    pub name: String,
    pub description: String,
}

/// Everything one analysis run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub marker: f64,
    pub metrics: Vec<MetricInfo>,
    /// Edit count per analysed set
    pub sets: BTreeMap<SetKey, usize>,
    pub table: SuspicionTable,
    pub outliers: OutlierRecord,
    pub suspicious_users: SuspiciousUsers,
    pub all_users: BTreeSet<String>,
    pub flagged_accounts: FlaggedAccounts,
}

impl AnalysisReport {
    pub fn outlier_count(&self) -> usize {
        self.outliers.values().map(|sets| sets.len()).sum()
    }

    pub fn total_edits(&self) -> usize {
        self.sets.values().sum()
    }
}

/// Full analysis pipeline.
pub struct Analyzer {
    fetcher: EditFetcher,
    metrics: MetricRegistry,
    marker: f64,
    min_edits: usize,
    max_edits: Option<usize>,
    /// Window applied to whole-page sets
    window: TimeWindow,
    progress_callback: Option<SetProgressCallback>,
}

impl Analyzer {
    pub fn new(fetcher: EditFetcher, metrics: MetricRegistry) -> Self {
        Self {
            fetcher,
            metrics,
            marker: DEFAULT_MARKER,
            min_edits: 0,
            max_edits: None,
            window: TimeWindow::unbounded(),
            progress_callback: None,
        }
    }

    pub fn with_marker(mut self, marker: f64) -> Self {
        self.marker = marker;
        self
    }

    /// Leave out sets with fewer than `min_edits` edits.
    pub fn with_min_edits(mut self, min_edits: usize) -> Self {
        self.min_edits = min_edits;
        self
    }

    pub fn with_max_edits(mut self, max_edits: Option<usize>) -> Self {
        self.max_edits = max_edits;
        self
    }

    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_progress(mut self, callback: SetProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn metrics(&self) -> &MetricRegistry {
        &self.metrics
    }

    pub fn fetcher(&self) -> &EditFetcher {
        &self.fetcher
    }

    /// Search the wiki for page titles to analyse.
    pub fn search_titles(&self, term: &str, limit: usize) -> AnalysisResult<Vec<String>> {
        self.fetcher
            .api()
            .search(term, limit)
            .map_err(|source| AnalysisError::Search {
                term: term.to_string(),
                source,
            })
    }

    /// Like [`Analyzer::search_titles`], most viewed pages first.
    pub fn search_titles_by_views(
        &self,
        term: &str,
        limit: usize,
    ) -> AnalysisResult<Vec<(String, u64)>> {
        search_by_views(self.fetcher.api().as_ref(), term, limit).map_err(|source| {
            AnalysisError::Search {
                term: term.to_string(),
                source,
            }
        })
    }

    /// Fetch one edit set per page, or per page and month when `months` is
    /// given.
    ///
    /// The first failing set aborts collection.
    pub fn collect_edit_sets(
        &self,
        titles: &[String],
        months: Option<&[YearMonth]>,
    ) -> AnalysisResult<EditSets> {
        let plan: Vec<(SetKey, TimeWindow)> = match months {
            Some(months) => titles
                .iter()
                .flat_map(|title| {
                    months
                        .iter()
                        .map(move |m| (SetKey::page_month(title.clone(), *m), TimeWindow::month(*m)))
                })
                .collect(),
            None => titles
                .iter()
                .map(|title| (SetKey::page(title.clone()), self.window))
                .collect(),
        };

        let total = plan.len();
        let mut sets = EditSets::new();
        for (done, (key, window)) in plan.into_iter().enumerate() {
            let options = FetchOptions::window(window).with_max_edits(self.max_edits);
            let edits = self
                .fetcher
                .fetch_edits(&key.title, &options)
                .map_err(|source| AnalysisError::Fetch {
                    set: key.clone(),
                    source,
                })?;

            if let Some(ref callback) = self.progress_callback {
                callback(&key, done + 1, total);
            }

            if edits.len() < self.min_edits {
                debug!(
                    "Skipping '{}': {} edits, fewer than {}",
                    key,
                    edits.len(),
                    self.min_edits
                );
                continue;
            }
            sets.insert(key, edits);
        }

        info!("Collected {} of {} edit set(s)", sets.len(), total);
        Ok(sets)
    }

    /// Score, flag and attribute an already fetched batch.
    pub fn analyze(&self, sets: &EditSets) -> AnalysisResult<AnalysisReport> {
        self.metrics.prepare(sets)?;
        let scores = score_suspiciousness(sets, &self.metrics);
        let outliers = detect_outliers(&scores.table, &self.metrics, self.marker);
        let suspicious_users = resolve_suspicious_users(&scores.triggering, &outliers, &self.metrics);
        let all_users = all_suspicious_users(&suspicious_users);
        let flagged = flagged_accounts(&scores.triggering, &outliers, &self.metrics);

        let report = AnalysisReport {
            generated_at: Utc::now(),
            marker: self.marker,
            metrics: self
                .metrics
                .iter()
                .map(|m| MetricInfo {
                    name: m.name().to_string(),
                    description: m.description().to_string(),
                })
                .collect(),
            sets: sets.iter().map(|(k, v)| (k.clone(), v.len())).collect(),
            table: scores.table,
            outliers,
            suspicious_users,
            all_users,
            flagged_accounts: flagged,
        };

        info!(
            "Analysed {} set(s): {} outlier(s), {} suspicious user(s)",
            report.sets.len(),
            report.outlier_count(),
            report.all_users.len()
        );
        Ok(report)
    }

    /// Fetch and analyse in one go.
    pub fn run(
        &self,
        titles: &[String],
        months: Option<&[YearMonth]>,
    ) -> AnalysisResult<AnalysisReport> {
        let sets = self.collect_edit_sets(titles, months)?;
        self.analyze(&sets)
    }
}
