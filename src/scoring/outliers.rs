//! Outlier detection over a suspicion table

use super::SuspicionTable;
use crate::metrics::MetricRegistry;
use crate::models::SetKey;
use std::collections::BTreeMap;
use tracing::debug;

/// Default |z-score| a set must exceed to be flagged
pub const DEFAULT_MARKER: f64 = 2.0;

/// Per metric, the outlier sets and their z-scores.
pub type OutlierRecord = BTreeMap<String, BTreeMap<SetKey, f64>>;

/// Flag sets whose |z-score| is strictly greater than `marker`.
///
/// Every metric of the registry gets an entry, possibly empty.
pub fn detect_outliers(
    table: &SuspicionTable,
    metrics: &MetricRegistry,
    marker: f64,
) -> OutlierRecord {
    let mut record = OutlierRecord::new();

    for name in metrics.names() {
        let flagged: BTreeMap<SetKey, f64> = table
            .rows
            .iter()
            .filter_map(|(key, scores)| {
                let z = *scores.get(name)?;
                (z.abs() > marker).then(|| (key.clone(), z))
            })
            .collect();

        debug!(
            "Metric '{}': {} outlier set(s) beyond {}",
            name,
            flagged.len(),
            marker
        );
        record.insert(name.to_string(), flagged);
    }

    record
}
