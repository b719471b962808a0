//! Profile command - contribution profiles of accounts

use super::{edit_fetcher, spinner_style};
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use revsleuth::cache::{get_flagged_accounts_path, FlaggedAccounts};
use revsleuth::config::AnalysisConfig;
use revsleuth::profile::ProfileBuilder;
use revsleuth::reporters::{self, OutputFormat};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub fn run(
    config: &AnalysisConfig,
    workers: Option<usize>,
    username: Option<&str>,
    flagged: Option<&Path>,
    contribs: usize,
    format: &str,
) -> Result<()> {
    let format = OutputFormat::from_str(format)?;
    let fetcher = edit_fetcher(config, workers)?;
    let builder = ProfileBuilder::new(&fetcher).with_contributions(contribs);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(spinner_style());
    spinner.enable_steady_tick(Duration::from_millis(100));

    let profiles = match username {
        Some(username) => {
            spinner.set_message(format!("Profiling {}...", username));
            let result = builder
                .build(username, Vec::new())
                .with_context(|| format!("Failed to profile '{}'", username));
            spinner.finish_and_clear();
            vec![result?]
        }
        None => {
            let path = flagged
                .map(Path::to_path_buf)
                .unwrap_or_else(get_flagged_accounts_path);
            let accounts = FlaggedAccounts::load(&path)?;
            spinner.set_message(format!("Profiling {} flagged account(s)...", accounts.len()));
            let profiles = builder.build_flagged(&accounts);
            spinner.finish_and_clear();
            profiles
        }
    };

    println!("{}", reporters::profiles_with_format(&profiles, format)?);
    Ok(())
}
