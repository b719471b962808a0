//! revsleuth - revision-history analysis for wikis
//!
//! Given a batch of pages, revsleuth fetches each page's edits, measures
//! for every edit set the fraction of edits a metric finds suspicious,
//! standardises those fractions across the batch and flags the sets whose
//! z-score exceeds a marker. The accounts behind flagged sets can then be
//! profiled.
//!
//! ```rust,ignore
//! use revsleuth::history::EditFetcher;
//! use revsleuth::metrics::{AnonMetric, MetricRegistry};
//! use revsleuth::pipeline::Analyzer;
//! use revsleuth::wiki::{WikiClient, WikiConfig};
//! use std::sync::Arc;
//!
//! let fetcher = EditFetcher::new(Arc::new(WikiClient::new(WikiConfig::default())), 5)?;
//! let mut metrics = MetricRegistry::new();
//! metrics.register(AnonMetric)?;
//! let report = Analyzer::new(fetcher, metrics).run(&["Ron Klain".to_string()], None)?;
//! ```

pub mod cache;
pub mod config;
pub mod diff;
pub mod history;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod profile;
pub mod reporters;
pub mod scoring;
pub mod suspects;
pub mod wiki;
