//! Edits command - list the edits of one page

use super::{edit_fetcher, spinner_style};
use anyhow::Result;
use chrono::Utc;
use indicatif::ProgressBar;
use revsleuth::config::AnalysisConfig;
use revsleuth::history::{FetchOptions, TimeWindow};
use revsleuth::reporters::{self, OutputFormat};
use std::str::FromStr;
use std::time::Duration;

pub fn run(
    config: &AnalysisConfig,
    workers: Option<usize>,
    title: &str,
    days: Option<u32>,
    max_edits: Option<usize>,
    format: &str,
) -> Result<()> {
    let format = OutputFormat::from_str(format)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(spinner_style());
    spinner.set_message(format!("Fetching edits of {}...", title));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let progress = spinner.clone();

    let fetcher = edit_fetcher(config, workers)?.with_progress(Box::new(move |title: &str, fetched: usize| {
        progress.set_message(format!("Fetching edits of {}... {} so far", title, fetched));
    }));

    let window = match days {
        Some(days) => TimeWindow::past_days(days, Utc::now()),
        None => TimeWindow::unbounded(),
    };
    let options = FetchOptions::window(window).with_max_edits(max_edits.or(config.fetch.max_edits));
    let result = fetcher.fetch_edits(title, &options);
    spinner.finish_and_clear();
    let edits = result?;

    println!("{}", reporters::edits_with_format(title, &edits, format)?);
    Ok(())
}
