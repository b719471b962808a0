//! revsleuth configuration
//!
//! Supports `revsleuth.toml` (preferred) or `.revsleuthrc.json`:
//!
//! ```toml
//! [wiki]
//! api_url = "https://en.wikipedia.org/w/api.php"
//!
//! [fetch]
//! workers = 5
//!
//! [analysis]
//! marker = 2.0
//! min_edits = 0
//!
//! [metrics]
//! enabled = ["anon", "no_comment", "young", "few_posts"]
//! young_max_age_days = 100
//! few_posts_max_edits = 10
//! no_comment_min_delta = 10
//! ```

use crate::history::{DEFAULT_WORKERS, MAX_WORKERS};
use crate::metrics::BUILTIN_METRICS;
use crate::wiki::WikiConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const TOML_CONFIG_FILE: &str = "revsleuth.toml";
pub const JSON_CONFIG_FILE: &str = ".revsleuthrc.json";

pub const ENV_API_URL: &str = "REVSLEUTH_API_URL";
pub const ENV_USER_AGENT: &str = "REVSLEUTH_USER_AGENT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Full configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub wiki: WikiConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub analysis: ScoringConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Revision fetching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Concurrent diff lookups
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Most recent edits kept per edit set (unlimited if unset)
    #[serde(default)]
    pub max_edits: Option<usize>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_edits: None,
        }
    }
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

/// Outlier scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// |z-score| a set must strictly exceed to be an outlier
    #[serde(default = "default_marker")]
    pub marker: f64,

    /// Edit sets with fewer edits are left out of the batch
    #[serde(default)]
    pub min_edits: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            marker: default_marker(),
            min_edits: 0,
        }
    }
}

fn default_marker() -> f64 {
    2.0
}

/// Metric selection and thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_enabled")]
    pub enabled: Vec<String>,

    #[serde(default = "default_young_max_age_days")]
    pub young_max_age_days: u32,

    #[serde(default = "default_few_posts_max_edits")]
    pub few_posts_max_edits: u64,

    #[serde(default = "default_no_comment_min_delta")]
    pub no_comment_min_delta: i64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            young_max_age_days: default_young_max_age_days(),
            few_posts_max_edits: default_few_posts_max_edits(),
            no_comment_min_delta: default_no_comment_min_delta(),
        }
    }
}

fn default_enabled() -> Vec<String> {
    BUILTIN_METRICS.iter().map(|m| m.to_string()).collect()
}

fn default_young_max_age_days() -> u32 {
    100
}

fn default_few_posts_max_edits() -> u64 {
    10
}

fn default_no_comment_min_delta() -> i64 {
    10
}

impl AnalysisConfig {
    /// Apply environment overrides using `var` to read variables.
    pub fn apply_env_with<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            debug!("{} overrides wiki.api_url", ENV_API_URL);
            self.wiki.api_url = url;
        }
        if let Some(agent) = var(ENV_USER_AGENT).filter(|v| !v.trim().is_empty()) {
            debug!("{} overrides wiki.user_agent", ENV_USER_AGENT);
            self.wiki.user_agent = agent;
        }
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    /// Pull loaded values back into their supported ranges.
    fn clamp(mut self, path: &Path) -> Self {
        let workers = self.fetch.workers.clamp(1, MAX_WORKERS);
        if workers != self.fetch.workers {
            warn!(
                "{}: fetch.workers = {} is outside 1-{}, using {}",
                path.display(),
                self.fetch.workers,
                MAX_WORKERS,
                workers
            );
            self.fetch.workers = workers;
        }
        self
    }
}

/// Load configuration from a directory.
///
/// Searches for configuration files in this order:
/// 1. `revsleuth.toml`
/// 2. `.revsleuthrc.json`
///
/// Unreadable files are logged and skipped; defaults are returned when no
/// file loads.
pub fn load_config(dir: &Path) -> AnalysisConfig {
    for name in [TOML_CONFIG_FILE, JSON_CONFIG_FILE] {
        let path = dir.join(name);
        if !path.exists() {
            continue;
        }
        match load_config_file(&path) {
            Ok(config) => {
                debug!("Loaded config from {}", path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", path.display(), e);
            }
        }
    }

    debug!("No config found, using defaults");
    AnalysisConfig::default()
}

/// Load an explicit config file; `.json` files are parsed as JSON, anything
/// else as TOML.
pub fn load_config_file(path: &Path) -> ConfigResult<AnalysisConfig> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let config: AnalysisConfig = if is_json {
        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?
    };
    Ok(config.clamp(path))
}

/// Example config written by `revsleuth init`.
pub const CONFIG_TEMPLATE: &str = r#"# revsleuth configuration

[wiki]
# Action API endpoint of the wiki to analyse
api_url = "https://en.wikipedia.org/w/api.php"
# Wikimedia asks for a contact address in the User-Agent
# user_agent = "revsleuth/0.1 (you@example.org)"
timeout_secs = 60
max_retries = 3
retry_backoff_ms = 500

[fetch]
# Concurrent diff lookups per page (1-64)
workers = 5
# Keep only the most recent N edits of each edit set
# max_edits = 500

[analysis]
# A set is an outlier when |z-score| is strictly greater than this
marker = 2.0
# Leave out edit sets with fewer edits than this
min_edits = 0

[metrics]
enabled = ["anon", "no_comment", "young", "few_posts"]
young_max_age_days = 100
few_posts_max_edits = 10
no_comment_min_delta = 10
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.fetch.workers, 5);
        assert_eq!(config.analysis.marker, 2.0);
        assert_eq!(config.metrics.enabled.len(), 4);
        assert_eq!(config.metrics.young_max_age_days, 100);
        assert_eq!(config.metrics.few_posts_max_edits, 10);
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let config: AnalysisConfig = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.analysis.marker, 2.0);
        assert_eq!(config.fetch.workers, 5);
        assert_eq!(config.metrics.enabled, default_enabled());
    }

    #[test]
    fn test_partial_toml() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(TOML_CONFIG_FILE),
            "[analysis]\nmarker = 1.5\n\n[metrics]\nenabled = [\"anon\"]\n",
        )
        .unwrap();
        let config = load_config(dir.path());
        assert_eq!(config.analysis.marker, 1.5);
        assert_eq!(config.metrics.enabled, vec!["anon".to_string()]);
        assert_eq!(config.fetch.workers, 5);
    }

    #[test]
    fn test_json_fallback() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(JSON_CONFIG_FILE),
            r#"{"fetch": {"workers": 2, "max_edits": 50}}"#,
        )
        .unwrap();
        let config = load_config(dir.path());
        assert_eq!(config.fetch.workers, 2);
        assert_eq!(config.fetch.max_edits, Some(50));
    }

    #[test]
    fn test_workers_clamped_to_supported_range() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(TOML_CONFIG_FILE);
        std::fs::write(&path, "[fetch]\nworkers = 100000\n").unwrap();
        assert_eq!(load_config_file(&path).unwrap().fetch.workers, MAX_WORKERS);

        std::fs::write(&path, "[fetch]\nworkers = 0\n").unwrap();
        assert_eq!(load_config_file(&path).unwrap().fetch.workers, 1);

        let json_dir = TempDir::new().unwrap();
        std::fs::write(
            json_dir.path().join(JSON_CONFIG_FILE),
            r#"{"fetch": {"workers": 65}}"#,
        )
        .unwrap();
        assert_eq!(load_config(json_dir.path()).fetch.workers, MAX_WORKERS);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(TOML_CONFIG_FILE), "[analysis\nmarker=").unwrap();
        let config = load_config(dir.path());
        assert_eq!(config.analysis.marker, 2.0);

        let err = load_config_file(&dir.path().join(TOML_CONFIG_FILE)).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AnalysisConfig::default();
        config.apply_env_with(|name| match name {
            ENV_API_URL => Some("https://de.wikipedia.org/w/api.php".to_string()),
            ENV_USER_AGENT => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.wiki.api_url, "https://de.wikipedia.org/w/api.php");
        assert!(config.wiki.user_agent.starts_with("revsleuth/"));
    }
}
