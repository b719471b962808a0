//! Per-set suspicious fractions and batch statistics

use crate::metrics::Metric;
use crate::models::{Edit, EditSets, SetKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mean and spread of one metric's fractions across a batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub mean: f64,
    /// Sample standard deviation, or 1.0 for degenerate batches
    pub std_dev: f64,
}

impl MetricSummary {
    pub fn z_score(&self, fraction: f64) -> f64 {
        (fraction - self.mean) / self.std_dev
    }
}

/// One metric applied to every set of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SuspicionStats {
    /// Suspicious edits / total edits, per set (0 for empty sets)
    pub fractions: BTreeMap<SetKey, f64>,
    pub summary: MetricSummary,
    /// Edits for which the metric fired, per set, in set order
    pub triggering: BTreeMap<SetKey, Vec<Edit>>,
}

/// Apply `metric` to every edit of every set.
pub fn suspicious_statistics(sets: &EditSets, metric: &dyn Metric) -> SuspicionStats {
    let mut fractions = BTreeMap::new();
    let mut triggering = BTreeMap::new();

    for (key, edits) in sets {
        let hits: Vec<Edit> = edits
            .iter()
            .filter(|e| metric.is_suspicious(e))
            .cloned()
            .collect();
        let fraction = if edits.is_empty() {
            0.0
        } else {
            hits.len() as f64 / edits.len() as f64
        };
        fractions.insert(key.clone(), fraction);
        triggering.insert(key.clone(), hits);
    }

    let values: Vec<f64> = fractions.values().copied().collect();
    SuspicionStats {
        fractions,
        summary: summarize(&values),
        triggering,
    }
}

/// Mean and sample standard deviation of `values`.
///
/// When every value is equal (including batches of zero or one value) the
/// standard deviation is reported as 1.0 and the mean as the shared value,
/// so every z-score in the batch is exactly 0.
pub fn summarize(values: &[f64]) -> MetricSummary {
    let Some(&first) = values.first() else {
        return MetricSummary {
            mean: 0.0,
            std_dev: 1.0,
        };
    };
    if values.iter().all(|v| *v == first) {
        return MetricSummary {
            mean: first,
            std_dev: 1.0,
        };
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();

    MetricSummary {
        mean,
        std_dev: if std_dev.is_finite() && std_dev > 0.0 {
            std_dev
        } else {
            1.0
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::AnonMetric;
    use crate::models::tests::edit;

    /// A set of `total` edits of which the first `anon` are anonymous.
    fn set(anon: usize, total: usize) -> Vec<Edit> {
        (0..total)
            .map(|i| {
                if i < anon {
                    edit(i as u64, "192.0.2.1", 0)
                } else {
                    edit(i as u64, "Alice", 9)
                }
            })
            .collect()
    }

    #[test]
    fn test_fractions_and_triggering() {
        let mut sets = EditSets::new();
        sets.insert(SetKey::page("A"), set(8, 10));
        sets.insert(SetKey::page("B"), set(1, 10));
        sets.insert(SetKey::page("Empty"), Vec::new());

        let stats = suspicious_statistics(&sets, &AnonMetric);
        assert_eq!(stats.fractions[&SetKey::page("A")], 0.8);
        assert_eq!(stats.fractions[&SetKey::page("B")], 0.1);
        assert_eq!(stats.fractions[&SetKey::page("Empty")], 0.0);
        assert_eq!(stats.triggering[&SetKey::page("A")].len(), 8);
        assert!(stats.triggering[&SetKey::page("Empty")].is_empty());
        for fraction in stats.fractions.values() {
            assert!((0.0..=1.0).contains(fraction));
        }
    }

    #[test]
    fn test_summarize_sample_std_dev() {
        let summary = summarize(&[0.8, 0.1, 0.1]);
        assert!((summary.mean - 0.3333).abs() < 1e-3);
        assert!((summary.std_dev - 0.4041).abs() < 1e-3);
    }

    #[test]
    fn test_summarize_degenerate() {
        let equal = summarize(&[0.1, 0.1, 0.1]);
        assert_eq!(equal.std_dev, 1.0);
        assert_eq!(equal.z_score(0.1), 0.0);

        let single = summarize(&[0.4]);
        assert_eq!(single.std_dev, 1.0);
        assert_eq!(single.z_score(0.4), 0.0);

        let empty = summarize(&[]);
        assert_eq!(empty.std_dev, 1.0);
    }
}
