//! Output reporters for revsleuth results
//!
//! Supports two output formats:
//! - `text` - Terminal output with colors
//! - `json` - Machine-readable JSON

mod json;
mod text;

use crate::models::Edit;
use crate::pipeline::AnalysisReport;
use crate::profile::AccountProfile;
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("Unknown format '{}'. Valid formats: text, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Render an analysis report in the specified format
pub fn report(report: &AnalysisReport, format: &str) -> Result<String> {
    let fmt = OutputFormat::from_str(format)?;
    report_with_format(report, fmt)
}

/// Render an analysis report using an OutputFormat enum
pub fn report_with_format(report: &AnalysisReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render(report),
        OutputFormat::Json => json::render(report),
    }
}

/// Render one page's edit list
pub fn edits_with_format(title: &str, edits: &[Edit], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::render_edits(title, edits)),
        OutputFormat::Json => json::render(&edits),
    }
}

/// Render account profiles
pub fn profiles_with_format(profiles: &[AccountProfile], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::render_profiles(profiles)),
        OutputFormat::Json => json::render(&profiles),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cache::FlaggedAccounts;
    use crate::models::SetKey;
    use crate::pipeline::MetricInfo;
    use crate::scoring::{MetricSummary, SuspicionTable};
    use chrono::{TimeZone, Utc};
    use std::collections::{BTreeMap, BTreeSet};

    /// Create a minimal AnalysisReport with one outlier for testing
    pub(crate) fn test_report() -> AnalysisReport {
        let hot = SetKey::page("Hot page");
        let calm = SetKey::page("Calm page");

        let mut table = SuspicionTable::default();
        for (key, z, fraction) in [(&hot, 2.5, 0.9), (&calm, -0.3, 0.1)] {
            table
                .rows
                .insert(key.clone(), BTreeMap::from([("anon".to_string(), z)]));
            table
                .fractions
                .insert(key.clone(), BTreeMap::from([("anon".to_string(), fraction)]));
        }
        table.summaries.insert(
            "anon".to_string(),
            MetricSummary {
                mean: 0.2,
                std_dev: 0.28,
            },
        );

        let mut flagged_accounts = FlaggedAccounts::new();
        flagged_accounts.insert("192.0.2.1", &hot);

        AnalysisReport {
            generated_at: Utc.with_ymd_and_hms(2021, 11, 1, 0, 0, 0).unwrap(),
            marker: 2.0,
            metrics: vec![MetricInfo {
                name: "anon".into(),
                description: "edit has no attributable account".into(),
            }],
            sets: BTreeMap::from([(hot.clone(), 10), (calm.clone(), 20)]),
            table,
            outliers: BTreeMap::from([(
                "anon".to_string(),
                BTreeMap::from([(hot.clone(), 2.5)]),
            )]),
            suspicious_users: BTreeMap::from([(
                "anon".to_string(),
                BTreeSet::from(["192.0.2.1".to_string()]),
            )]),
            all_users: BTreeSet::from(["192.0.2.1".to_string()]),
            flagged_accounts,
        }
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(OutputFormat::from_str("text").unwrap(), OutputFormat::Text);
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert!(OutputFormat::from_str("sarif").is_err());
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_report_dispatch() {
        let rendered = report(&test_report(), "json").unwrap();
        assert!(rendered.trim_start().starts_with('{'));
        assert!(report(&test_report(), "pdf").is_err());
    }
}
