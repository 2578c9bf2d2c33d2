//! Runtime configuration.
//!
//! Sources, highest priority first:
//! - command line flags (applied by the CLI)
//! - environment variables (`COMMITLENS_*`)
//! - config file (`--config`, or `<config_dir>/commitlens/config.toml`)
//! - built-in defaults

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_DB: &str = "COMMITLENS_DB";
pub const ENV_BIND: &str = "COMMITLENS_BIND";
pub const ENV_REPOS_DIR: &str = "COMMITLENS_REPOS_DIR";
pub const ENV_METRICS_DIR: &str = "COMMITLENS_METRICS_DIR";
pub const ENV_SUMMARIES_DIR: &str = "COMMITLENS_SUMMARIES_DIR";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database holding the commit collection
    pub database: PathBuf,
    /// Listen address for `serve`
    pub bind: String,
    /// Directory holding cloned repositories, one per subdirectory
    pub repos_dir: PathBuf,
    /// Directory for per-repository JSON artifacts
    pub metrics_dir: PathBuf,
    /// Directory for per-repository author summaries
    pub summaries_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("commitlens.db"),
            bind: "127.0.0.1:3000".to_string(),
            repos_dir: PathBuf::from("cloned_repos"),
            metrics_dir: PathBuf::from("metrics"),
            summaries_dir: PathBuf::from("summaries"),
        }
    }
}

impl Config {
    /// Load from an explicit file, or the user config file when it exists,
    /// then apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::user_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("commitlens").join("config.toml"))
    }

    fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if let Some(db) = lookup(ENV_DB) {
            self.database = PathBuf::from(db);
        }
        if let Some(bind) = lookup(ENV_BIND) {
            self.bind = bind;
        }
        if let Some(dir) = lookup(ENV_REPOS_DIR) {
            self.repos_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(ENV_METRICS_DIR) {
            self.metrics_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(ENV_SUMMARIES_DIR) {
            self.summaries_dir = PathBuf::from(dir);
        }
    }
}
