//! Suspiciousness scoring
//!
//! Every metric is applied to every edit of a batch of edit sets. Each set
//! gets the fraction of its edits the metric flags, and each fraction is
//! turned into a z-score against the whole batch:
//!
//! ```text
//! fraction(set)  = flagged edits / edits          (0 for an empty set)
//! mean, sd       = over all fractions of the batch (sample sd)
//! z(set)         = (fraction(set) - mean) / sd
//! ```
//!
//! When all fractions are equal the standard deviation is taken as 1, so
//! the whole batch scores 0 instead of failing. Scores are relative to the
//! batch they were computed in and are not comparable across batches.
//!
//! A set is an outlier for a metric when |z| is strictly greater than the
//! marker (default 2.0).

mod aggregate;
mod outliers;

pub use aggregate::{summarize, suspicious_statistics, MetricSummary, SuspicionStats};
pub use outliers::{detect_outliers, OutlierRecord, DEFAULT_MARKER};

use crate::metrics::MetricRegistry;
use crate::models::{Edit, EditSets, SetKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Per metric, per set, the edits for which the metric fired.
pub type TriggeringEdits = BTreeMap<String, BTreeMap<SetKey, Vec<Edit>>>;

/// z-scores of one batch of edit sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuspicionTable {
    /// set -> metric -> z-score
    pub rows: BTreeMap<SetKey, BTreeMap<String, f64>>,
    /// set -> metric -> suspicious fraction
    #[serde(default)]
    pub fractions: BTreeMap<SetKey, BTreeMap<String, f64>>,
    /// metric -> batch mean and standard deviation
    pub summaries: BTreeMap<String, MetricSummary>,
}

impl SuspicionTable {
    pub fn z_score(&self, set: &SetKey, metric: &str) -> Option<f64> {
        self.rows.get(set)?.get(metric).copied()
    }

    pub fn fraction(&self, set: &SetKey, metric: &str) -> Option<f64> {
        self.fractions.get(set)?.get(metric).copied()
    }
}

/// Scores plus the edits behind them.
#[derive(Debug, Clone, Default)]
pub struct ScoreResult {
    pub table: SuspicionTable,
    pub triggering: TriggeringEdits,
}

/// Score every set of the batch under every registered metric.
pub fn score_suspiciousness(sets: &EditSets, metrics: &MetricRegistry) -> ScoreResult {
    let mut result = ScoreResult::default();

    for metric in metrics.iter() {
        let name = metric.name().to_string();
        let stats = suspicious_statistics(sets, metric.as_ref());

        debug!(
            "Metric '{}': mean {:.4}, sd {:.4} over {} set(s)",
            name,
            stats.summary.mean,
            stats.summary.std_dev,
            stats.fractions.len()
        );

        for (key, fraction) in &stats.fractions {
            let z = stats.summary.z_score(*fraction);
            result
                .table
                .rows
                .entry(key.clone())
                .or_default()
                .insert(name.clone(), z);
            result
                .table
                .fractions
                .entry(key.clone())
                .or_default()
                .insert(name.clone(), *fraction);
        }
        result.table.summaries.insert(name.clone(), stats.summary);
        result.triggering.insert(name, stats.triggering);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{AnonMetric, NoCommentMetric};
    use crate::models::tests::edit;

    fn anon_set(anon: usize, total: usize) -> Vec<Edit> {
        (0..total)
            .map(|i| {
                let mut e = if i < anon {
                    edit(i as u64, &format!("192.0.2.{}", i), 0)
                } else {
                    edit(i as u64, "Alice", 9)
                };
                e.comment = "c".into();
                e
            })
            .collect()
    }

    fn registry() -> MetricRegistry {
        let mut reg = MetricRegistry::new();
        reg.register(AnonMetric).unwrap();
        reg.register(NoCommentMetric { min_delta: 10 }).unwrap();
        reg
    }

    #[test]
    fn test_three_set_scenario_has_no_outliers() {
        let mut sets = EditSets::new();
        sets.insert(SetKey::page("A"), anon_set(8, 10));
        sets.insert(SetKey::page("B"), anon_set(1, 10));
        sets.insert(SetKey::page("C"), anon_set(1, 10));

        let reg = registry();
        let result = score_suspiciousness(&sets, &reg);
        let za = result.table.z_score(&SetKey::page("A"), "anon").unwrap();
        let zb = result.table.z_score(&SetKey::page("B"), "anon").unwrap();
        let zc = result.table.z_score(&SetKey::page("C"), "anon").unwrap();
        assert!((za - 1.1547).abs() < 1e-3);
        assert!((zb + 0.5774).abs() < 1e-3);
        assert_eq!(zb, zc);

        let summary = result.table.summaries["anon"];
        assert!((summary.mean - 0.3333).abs() < 1e-3);
        assert!((summary.std_dev - 0.4041).abs() < 1e-3);

        let outliers = detect_outliers(&result.table, &reg, DEFAULT_MARKER);
        assert!(outliers["anon"].is_empty());
        assert_eq!(result.triggering["anon"][&SetKey::page("A")].len(), 8);
    }

    #[test]
    fn test_degenerate_metric_scores_zero() {
        let mut sets = EditSets::new();
        sets.insert(SetKey::page("A"), anon_set(2, 4));
        sets.insert(SetKey::page("B"), anon_set(1, 5));

        let result = score_suspiciousness(&sets, &registry());
        // Every edit carries a comment, so no_comment is 0 everywhere
        for scores in result.table.rows.values() {
            assert_eq!(scores["no_comment"], 0.0);
        }
        assert_eq!(result.table.summaries["no_comment"].std_dev, 1.0);
    }

    #[test]
    fn test_single_set_batch() {
        let mut sets = EditSets::new();
        sets.insert(SetKey::page("Only"), anon_set(3, 4));
        let result = score_suspiciousness(&sets, &registry());
        assert_eq!(result.table.z_score(&SetKey::page("Only"), "anon"), Some(0.0));
        assert_eq!(result.table.fraction(&SetKey::page("Only"), "anon"), Some(0.75));
    }

    #[test]
    fn test_empty_batch() {
        let result = score_suspiciousness(&EditSets::new(), &registry());
        assert!(result.table.rows.is_empty());
        assert!(result.triggering["anon"].is_empty());
    }

    #[test]
    fn test_clear_outlier_is_flagged() {
        let mut sets = EditSets::new();
        sets.insert(SetKey::page("Hot"), anon_set(10, 10));
        for i in 0..9 {
            sets.insert(SetKey::page(format!("Calm {}", i)), anon_set(0, 10));
        }
        let reg = registry();
        let result = score_suspiciousness(&sets, &reg);
        let outliers = detect_outliers(&result.table, &reg, DEFAULT_MARKER);
        assert_eq!(outliers["anon"].len(), 1);
        assert!(outliers["anon"].contains_key(&SetKey::page("Hot")));
    }
}
