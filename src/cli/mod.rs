//! CLI command definitions and handlers

mod analyze;
mod edits;
mod init;
mod profile;
mod search;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::ProgressStyle;
use revsleuth::config::{load_config, load_config_file, AnalysisConfig};
use revsleuth::history::{EditFetcher, MAX_WORKERS};
use revsleuth::wiki::{WikiApi, WikiClient};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Parse and validate worker count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        return Err("workers must be at least 1".to_string());
    }
    if n > MAX_WORKERS {
        return Err(format!("workers cannot exceed {}", MAX_WORKERS));
    }
    Ok(n)
}

/// Revision-history analysis for wiki pages
#[derive(Parser, Debug)]
#[command(name = "revsleuth")]
#[command(
    version,
    about = "Flag wiki pages with unusual editing patterns and the accounts behind them"
)]
#[command(
    long_about = "revsleuth fetches the revision history of wiki pages, scores each page \
(or page-month) under a set of edit metrics, and flags the sets whose z-score \
stands out from the rest of the batch.\n\n\
Built-in metrics: anon, no_comment, young, few_posts."
)]
#[command(after_help = "\
Examples:
  revsleuth analyze \"Ron Klain\" \"Jen Psaki\"          Analyse two pages
  revsleuth analyze --search \"chief of staff\"        Analyse pages found by search
  revsleuth analyze P --start-month 2021-01 --end-month 2021-06
  revsleuth profile --flagged flagged.json          Profile flagged accounts
  revsleuth init                                     Write a revsleuth.toml")]
pub struct Cli {
    /// Config file (default: revsleuth.toml or .revsleuthrc.json in the current directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Number of parallel diff workers (1-64)
    #[arg(long, global = true, value_parser = parse_workers)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score pages and flag outlier edit sets
    #[command(after_help = "\
Examples:
  revsleuth analyze \"Ron Klain\" \"Jen Psaki\"
  revsleuth analyze --search \"chief of staff\" --limit 20 --by-views
  revsleuth analyze P Q --start-month 2021-01 --end-month 2021-03 --metric anon
  revsleuth analyze P Q -f json -o report.json")]
    Analyze {
        /// Page titles to analyse
        titles: Vec<String>,

        /// Add pages found by a full-text search
        #[arg(long)]
        search: Option<String>,

        /// Maximum number of search results
        #[arg(long, default_value = "10")]
        limit: usize,

        /// Keep the most viewed search results instead of the most relevant
        #[arg(long, requires = "search")]
        by_views: bool,

        /// First month (YYYY-MM); splits each page into monthly sets
        #[arg(long, requires = "end_month")]
        start_month: Option<String>,

        /// Last month, inclusive (YYYY-MM)
        #[arg(long, requires = "start_month")]
        end_month: Option<String>,

        /// z-score magnitude above which a set is an outlier
        #[arg(long)]
        marker: Option<f64>,

        /// Leave out sets with fewer edits
        #[arg(long)]
        min_edits: Option<usize>,

        /// Only use these metrics (repeatable; default: all enabled)
        #[arg(long = "metric")]
        metrics: Vec<String>,

        /// Cap on edits fetched per set (most recent kept)
        #[arg(long)]
        max_edits: Option<usize>,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text")]
        format: String,

        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Flagged-accounts file to merge into (default: cache directory)
        #[arg(long)]
        flagged_out: Option<PathBuf>,
    },

    /// List the edits of one page, newest first
    Edits {
        /// Page title
        title: String,

        /// Only edits from the past N days
        #[arg(long)]
        days: Option<u32>,

        /// Cap on edits fetched (most recent kept)
        #[arg(long)]
        max_edits: Option<usize>,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text")]
        format: String,
    },

    /// Search the wiki for page titles
    Search {
        /// Search term (CirrusSearch syntax)
        term: String,

        /// Maximum number of results
        #[arg(long, default_value = "10")]
        limit: usize,

        /// Rank results by recent page views, most viewed first
        #[arg(long)]
        by_views: bool,
    },

    /// Profile an account, or every account in a flagged-accounts file
    #[command(after_help = "\
Examples:
  revsleuth profile SomeUser
  revsleuth profile --flagged flagged.json -f json")]
    Profile {
        /// Account to profile
        #[arg(conflicts_with = "flagged")]
        username: Option<String>,

        /// Flagged-accounts file (default: the one `analyze` writes)
        #[arg(long)]
        flagged: Option<PathBuf>,

        /// Recent contributions to examine per account
        #[arg(long, default_value = "20")]
        contribs: usize,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text")]
        format: String,
    },

    /// Write a revsleuth.toml with default settings
    Init,

    /// Show version info
    Version,
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            init::run(&cwd)
        }

        Commands::Version => {
            println!("revsleuth {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }

        Commands::Analyze {
            titles,
            search,
            limit,
            by_views,
            start_month,
            end_month,
            marker,
            min_edits,
            metrics,
            max_edits,
            format,
            output,
            flagged_out,
        } => {
            let config = resolve_config(cli.config.as_deref())?;
            analyze::run(
                &config,
                cli.workers,
                analyze::AnalyzeArgs {
                    titles,
                    search,
                    limit,
                    by_views,
                    start_month,
                    end_month,
                    marker,
                    min_edits,
                    metrics,
                    max_edits,
                    format,
                    output,
                    flagged_out,
                },
            )
        }

        Commands::Edits {
            title,
            days,
            max_edits,
            format,
        } => {
            let config = resolve_config(cli.config.as_deref())?;
            edits::run(&config, cli.workers, &title, days, max_edits, &format)
        }

        Commands::Search {
            term,
            limit,
            by_views,
        } => {
            let config = resolve_config(cli.config.as_deref())?;
            search::run(&config, &term, limit, by_views)
        }

        Commands::Profile {
            username,
            flagged,
            contribs,
            format,
        } => {
            let config = resolve_config(cli.config.as_deref())?;
            profile::run(
                &config,
                cli.workers,
                username.as_deref(),
                flagged.as_deref(),
                contribs,
                &format,
            )
        }
    }
}

/// Explicit `--config` file, else discovery in the current directory, then
/// environment overrides.
fn resolve_config(explicit: Option<&Path>) -> Result<AnalysisConfig> {
    let mut config = match explicit {
        Some(path) => load_config_file(path)?,
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            load_config(&cwd)
        }
    };
    config.apply_env_overrides();
    Ok(config)
}

fn wiki_api(config: &AnalysisConfig) -> Arc<dyn WikiApi> {
    Arc::new(WikiClient::new(config.wiki.clone()))
}

/// Diff fetcher sized by `--workers`, falling back to the config.
fn edit_fetcher(config: &AnalysisConfig, workers: Option<usize>) -> Result<EditFetcher> {
    let workers = workers.unwrap_or(config.fetch.workers);
    EditFetcher::new(wiki_api(config), workers).context("Failed to start diff worker pool")
}

/// Spinner style for page-level progress
fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
}

/// Bar style for counted progress
fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░  ")
}
