//! Suspicious user resolution
//!
//! Cross-references outlier sets with the edits that triggered each metric
//! there, yielding the accounts behind the anomalies.

use crate::cache::FlaggedAccounts;
use crate::metrics::MetricRegistry;
use crate::scoring::{OutlierRecord, TriggeringEdits};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Metric name -> usernames implicated through that metric.
pub type SuspiciousUsers = BTreeMap<String, BTreeSet<String>>;

/// Walk `(metric, outlier set, triggering edit)` for every registered metric.
fn for_each_implicated<F>(
    triggering: &TriggeringEdits,
    outliers: &OutlierRecord,
    metrics: &MetricRegistry,
    mut visit: F,
) where
    F: FnMut(&str, &crate::models::SetKey, &str),
{
    for metric in metrics.names() {
        let (Some(flagged), Some(edits_by_set)) = (outliers.get(metric), triggering.get(metric))
        else {
            continue;
        };
        for set in flagged.keys() {
            let Some(edits) = edits_by_set.get(set) else {
                continue;
            };
            // Hidden usernames cannot be attributed to anyone
            for edit in edits.iter().filter(|e| !e.user.is_empty()) {
                visit(metric, set, &edit.user);
            }
        }
    }
}

/// Usernames behind outlier-triggering edits, per metric.
///
/// Every registered metric gets an entry, possibly empty.
pub fn resolve_suspicious_users(
    triggering: &TriggeringEdits,
    outliers: &OutlierRecord,
    metrics: &MetricRegistry,
) -> SuspiciousUsers {
    let mut users: SuspiciousUsers = metrics
        .names()
        .into_iter()
        .map(|m| (m.to_string(), BTreeSet::new()))
        .collect();

    for_each_implicated(triggering, outliers, metrics, |metric, _, user| {
        if let Some(set) = users.get_mut(metric) {
            set.insert(user.to_string());
        }
    });

    for (metric, names) in &users {
        debug!("Metric '{}': {} suspicious user(s)", metric, names.len());
    }
    users
}

/// Union of all users across metrics.
pub fn all_suspicious_users(users: &SuspiciousUsers) -> BTreeSet<String> {
    users.values().flatten().cloned().collect()
}

/// Username -> outlier sets where the user triggered any metric.
pub fn flagged_accounts(
    triggering: &TriggeringEdits,
    outliers: &OutlierRecord,
    metrics: &MetricRegistry,
) -> FlaggedAccounts {
    let mut flagged = FlaggedAccounts::new();
    for_each_implicated(triggering, outliers, metrics, |_, set, user| {
        flagged.insert(user, set);
    });
    flagged
}
