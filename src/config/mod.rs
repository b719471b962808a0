//! Configuration module for revsleuth
//!
//! This module handles:
//! - Config file discovery (`revsleuth.toml`, `.revsleuthrc.json`)
//! - Wiki connection, fetch, scoring and metric settings
//! - Environment overrides for the wiki endpoint

mod settings;

pub use settings::{
    load_config, load_config_file, AnalysisConfig, ConfigError, ConfigResult, FetchConfig,
    MetricsConfig, ScoringConfig, CONFIG_TEMPLATE, ENV_API_URL, ENV_USER_AGENT, JSON_CONFIG_FILE,
    TOML_CONFIG_FILE,
};
