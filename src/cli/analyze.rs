//! Analyze command - score pages and flag outlier edit sets

use super::{bar_style, edit_fetcher};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use console::style;
use indicatif::ProgressBar;
use revsleuth::cache::get_flagged_accounts_path;
use revsleuth::config::AnalysisConfig;
use revsleuth::history::months_between;
use revsleuth::metrics::{AccountCache, MetricRegistry};
use revsleuth::models::{SetKey, YearMonth};
use revsleuth::pipeline::Analyzer;
use revsleuth::reporters::{self, OutputFormat};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Arguments of `revsleuth analyze`
#[derive(Debug)]
pub struct AnalyzeArgs {
    pub titles: Vec<String>,
    pub search: Option<String>,
    pub limit: usize,
    /// Rank search results by page views
    pub by_views: bool,
    pub start_month: Option<String>,
    pub end_month: Option<String>,
    pub marker: Option<f64>,
    pub min_edits: Option<usize>,
    pub metrics: Vec<String>,
    pub max_edits: Option<usize>,
    pub format: String,
    pub output: Option<PathBuf>,
    pub flagged_out: Option<PathBuf>,
}

pub fn run(config: &AnalysisConfig, workers: Option<usize>, args: AnalyzeArgs) -> Result<()> {
    let format = OutputFormat::from_str(&args.format)?;
    let months = month_range(args.start_month.as_deref(), args.end_month.as_deref())?;

    let fetcher = edit_fetcher(config, workers)?;
    let cache = Arc::new(AccountCache::from_api(fetcher.api().clone()));
    let mut metrics = MetricRegistry::from_config(&config.metrics, cache, Utc::now())?;
    if !args.metrics.is_empty() {
        metrics = metrics.select(&args.metrics)?;
    }

    let bar = ProgressBar::new(0);
    bar.set_style(bar_style());
    let progress = bar.clone();

    let analyzer = Analyzer::new(fetcher, metrics)
        .with_marker(args.marker.unwrap_or(config.analysis.marker))
        .with_min_edits(args.min_edits.unwrap_or(config.analysis.min_edits))
        .with_max_edits(args.max_edits.or(config.fetch.max_edits))
        .with_progress(Box::new(move |key: &SetKey, done: usize, total: usize| {
            progress.set_length(total as u64);
            progress.set_position(done as u64);
            progress.set_message(key.to_string());
        }));

    let mut titles = args.titles;
    if let Some(ref term) = args.search {
        let found = if args.by_views {
            analyzer
                .search_titles_by_views(term, args.limit)?
                .into_iter()
                .map(|(title, _)| title)
                .collect()
        } else {
            analyzer.search_titles(term, args.limit)?
        };
        info!("Search '{}' returned {} title(s)", term, found.len());
        for title in found {
            if !titles.contains(&title) {
                titles.push(title);
            }
        }
    }
    if titles.is_empty() {
        bail!("No pages to analyse. Pass page titles or --search TERM.");
    }

    let result = analyzer.run(&titles, months.as_deref());
    bar.finish_and_clear();
    let report = result?;

    let output = reporters::report_with_format(&report, format)?;
    match args.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            eprintln!(
                "{} Report written to {}",
                style("✓").green(),
                style(path.display()).cyan()
            );
        }
        None => println!("{}", output),
    }

    if !report.flagged_accounts.is_empty() {
        let path = args.flagged_out.unwrap_or_else(get_flagged_accounts_path);
        let merged = report.flagged_accounts.merge_into_file(&path)?;
        eprintln!(
            "{} {} flagged account(s) saved to {}",
            style("✓").green(),
            merged.len(),
            style(path.display()).cyan()
        );
    }

    Ok(())
}

/// Inclusive month range, or `None` for whole-page sets.
fn month_range(start: Option<&str>, end: Option<&str>) -> Result<Option<Vec<YearMonth>>> {
    let (start, end) = match (start, end) {
        (Some(start), Some(end)) => (start, end),
        (None, None) => return Ok(None),
        _ => bail!("--start-month and --end-month must be given together"),
    };
    let start = YearMonth::from_str(start).map_err(anyhow::Error::msg)?;
    let end = YearMonth::from_str(end).map_err(anyhow::Error::msg)?;
    if end < start {
        bail!("--end-month {} is before --start-month {}", end, start);
    }
    Ok(Some(months_between(start, end)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_range() {
        let months = month_range(Some("2021-11"), Some("2022-01")).unwrap().unwrap();
        let labels: Vec<String> = months.iter().map(|m| m.to_string()).collect();
        assert_eq!(labels, vec!["2021-11", "2021-12", "2022-01"]);
        assert!(month_range(None, None).unwrap().is_none());
    }

    #[test]
    fn test_month_range_rejects_bad_input() {
        assert!(month_range(Some("2021-13"), Some("2022-01")).is_err());
        assert!(month_range(Some("2022-02"), Some("2022-01")).is_err());
        assert!(month_range(Some("2022-02"), None).is_err());
    }

    #[test]
    fn test_month_range_rejects_out_of_range_years() {
        let err = month_range(Some("300000-01"), Some("300000-02")).unwrap_err();
        assert!(err.to_string().contains("300000-01"));
        assert!(month_range(Some("2021-01"), Some("300000-01")).is_err());

        let months = month_range(Some("9999-12"), Some("9999-12")).unwrap().unwrap();
        assert_eq!(months.len(), 1);
    }
}
