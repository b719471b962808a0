//! Search command - find page titles to analyse

use super::wiki_api;
use anyhow::{Context, Result};
use console::style;
use revsleuth::config::AnalysisConfig;
use revsleuth::wiki::{search_by_views, WikiApi};

pub fn run(config: &AnalysisConfig, term: &str, limit: usize, by_views: bool) -> Result<()> {
    let api = wiki_api(config);
    let results: Vec<(String, Option<u64>)> = if by_views {
        search_by_views(api.as_ref(), term, limit)
            .with_context(|| format!("Search for '{}' failed", term))?
            .into_iter()
            .map(|(title, views)| (title, Some(views)))
            .collect()
    } else {
        api.search(term, limit)
            .with_context(|| format!("Search for '{}' failed", term))?
            .into_iter()
            .map(|title| (title, None))
            .collect()
    };

    if results.is_empty() {
        eprintln!("{} No pages match '{}'", style("!").yellow(), term);
        return Ok(());
    }
    for (title, views) in &results {
        match views {
            Some(views) => println!("{:>10}  {}", views, title),
            None => println!("{}", title),
        }
    }

    let flag = if by_views { " --by-views" } else { "" };
    eprintln!(
        "\n{} {} page(s). Pass them to {}",
        style("✓").green(),
        results.len(),
        style(format!("revsleuth analyze --search \"{}\"{}", term, flag)).cyan()
    );
    Ok(())
}
