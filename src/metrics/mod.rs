//! Suspiciousness metrics
//!
//! A metric classifies a single edit as suspicious or not. The
//! [`MetricRegistry`] is explicit configuration handed to scoring; new
//! metrics plug in by implementing [`Metric`] or registering a closure.
//!
//! # Example
//!
//! ```ignore
//! let mut registry = MetricRegistry::new();
//! registry.register(AnonMetric)?;
//! registry.register_fn("minor", "marked as minor", |edit| edit.minor)?;
//! ```

mod accounts;
mod builtin;

pub use accounts::{AccountCache, AccountFacts, AccountLookup, AccountLookupError, WikiAccounts};
#[cfg(test)]
pub(crate) use accounts::tests::StubLookup;
pub use builtin::{
    AnonMetric, FewPostsMetric, NoCommentMetric, YoungAccountMetric, ANON, BUILTIN_METRICS,
    FEW_POSTS, NO_COMMENT, YOUNG,
};

use crate::config::MetricsConfig;
use crate::models::{Edit, EditSets};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricError {
    #[error("Metric '{0}' is already registered")]
    Duplicate(String),

    #[error("Unknown metric '{name}' (available: {available})")]
    Unknown { name: String, available: String },
}

pub type MetricResult<T> = Result<T, MetricError>;

/// A named predicate over single edits.
pub trait Metric: Send + Sync {
    /// Unique name, used as the column key in score tables
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Load whatever the metric needs for `sets` before any edit is
    /// classified. Called once per batch.
    fn prepare(&self, _sets: &EditSets) -> Result<(), AccountLookupError> {
        Ok(())
    }

    fn is_suspicious(&self, edit: &Edit) -> bool;
}

struct FnMetric<F> {
    name: String,
    description: String,
    predicate: F,
}

impl<F> Metric for FnMetric<F>
where
    F: Fn(&Edit) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn is_suspicious(&self, edit: &Edit) -> bool {
        (self.predicate)(edit)
    }
}

/// Ordered set of metrics with unique names.
#[derive(Clone, Default)]
pub struct MetricRegistry {
    metrics: Vec<Arc<dyn Metric>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four built-in metrics, configured from `config`.
    pub fn builtin(config: &MetricsConfig, cache: Arc<AccountCache>, now: DateTime<Utc>) -> Self {
        let metrics: Vec<Arc<dyn Metric>> = vec![
            Arc::new(AnonMetric),
            Arc::new(NoCommentMetric {
                min_delta: config.no_comment_min_delta,
            }),
            Arc::new(YoungAccountMetric::new(
                cache.clone(),
                config.young_max_age_days,
                now,
            )),
            Arc::new(FewPostsMetric {
                cache,
                max_edits: config.few_posts_max_edits,
            }),
        ];
        Self { metrics }
    }

    /// Built-ins restricted to the metrics `config` enables.
    pub fn from_config(
        config: &MetricsConfig,
        cache: Arc<AccountCache>,
        now: DateTime<Utc>,
    ) -> MetricResult<Self> {
        Self::builtin(config, cache, now).select(&config.enabled)
    }

    pub fn register<M: Metric + 'static>(&mut self, metric: M) -> MetricResult<()> {
        self.register_arc(Arc::new(metric))
    }

    pub fn register_arc(&mut self, metric: Arc<dyn Metric>) -> MetricResult<()> {
        if self.get(metric.name()).is_some() {
            return Err(MetricError::Duplicate(metric.name().to_string()));
        }
        self.metrics.push(metric);
        Ok(())
    }

    /// Register a closure as a metric.
    pub fn register_fn<F>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        predicate: F,
    ) -> MetricResult<()>
    where
        F: Fn(&Edit) -> bool + Send + Sync + 'static,
    {
        self.register(FnMetric {
            name: name.into(),
            description: description.into(),
            predicate,
        })
    }

    /// A registry holding only `names`, in the order given.
    ///
    /// An empty selection keeps every metric.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> MetricResult<Self> {
        if names.is_empty() {
            return Ok(self.clone());
        }
        let mut selected = Self::new();
        for name in names {
            let name = name.as_ref();
            let metric = self.get(name).ok_or_else(|| MetricError::Unknown {
                name: name.to_string(),
                available: self.names().join(", "),
            })?;
            // Repeated names in a selection collapse to one entry
            if selected.get(name).is_none() {
                selected.metrics.push(metric.clone());
            }
        }
        Ok(selected)
    }

    /// Prepare every metric for `sets`, stopping at the first failure.
    pub fn prepare(&self, sets: &EditSets) -> Result<(), AccountLookupError> {
        self.metrics.iter().try_for_each(|metric| metric.prepare(sets))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Metric>> {
        self.metrics.iter().find(|m| m.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.metrics.iter().map(|m| m.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Metric>> {
        self.metrics.iter()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
