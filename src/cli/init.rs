//! Init command - write a default revsleuth.toml

use anyhow::{bail, Context, Result};
use console::style;
use revsleuth::config::{CONFIG_TEMPLATE, TOML_CONFIG_FILE};
use std::path::Path;

/// Run the init command
pub fn run(dir: &Path) -> Result<()> {
    let config_path = dir.join(TOML_CONFIG_FILE);
    if config_path.exists() {
        bail!(
            "{} already exists; remove it first to regenerate",
            config_path.display()
        );
    }

    std::fs::write(&config_path, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );

    println!("\n{}", style("Next steps:").bold());
    println!("  1. Point [wiki] api_url at your wiki if it is not English Wikipedia");
    println!("  2. Set a descriptive user_agent with contact details");
    println!(
        "  3. Run {}",
        style("revsleuth analyze \"Page title\"").cyan()
    );
    Ok(())
}
