use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::core::error::HarvestError;

pub const DEFAULT_CONFIG_PATH: &str = "config/ioc_harvester.toml";
pub const DEFAULT_FEED_URL: &str = "https://threatfox.abuse.ch/export/csv/recent/";

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_url")]
    pub url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_scratch_file")]
    pub scratch_file: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    #[serde(default)]
    pub manifest: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_remote")]
    pub remote: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_repo_dir")]
    pub repo_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupeStrategy {
    /// Rewrite the target file after every appended row.
    #[default]
    PerRow,
    /// Append everything, then rewrite each touched file once.
    PerRun,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub dedupe: DedupeStrategy,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub scratch_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub publish: bool,
}

pub fn load_config(path: Option<&Path>) -> Result<AppConfig, HarvestError> {
    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    let explicit = path.is_some();
    let path = path.unwrap_or(default_path);

    if !path.exists() {
        if explicit {
            return Err(HarvestError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        return Ok(AppConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| HarvestError::Config(e.to_string()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<AppConfig, HarvestError> {
    let cfg: AppConfig =
        toml::from_str(content).map_err(|e| HarvestError::Config(e.to_string()))?;
    if cfg.feed.url.trim().is_empty() {
        return Err(HarvestError::Config("feed.url must not be empty".into()));
    }
    Ok(cfg)
}

pub fn apply_overrides(cfg: AppConfig, overrides: &Overrides) -> AppConfig {
    let mut cfg = cfg;
    if let Some(url) = &overrides.url {
        cfg.feed.url = url.clone();
    }
    if let Some(dir) = &overrides.output_dir {
        cfg.paths.output_dir = dir.clone();
    }
    if let Some(path) = &overrides.scratch_file {
        cfg.paths.scratch_file = path.clone();
    }
    if let Some(path) = &overrides.log_file {
        cfg.paths.log_file = path.clone();
    }
    if let Some(path) = &overrides.manifest {
        cfg.paths.manifest = Some(path.clone());
    }
    if overrides.publish {
        cfg.publish.enabled = true;
    }
    cfg
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            scratch_file: default_scratch_file(),
            output_dir: default_output_dir(),
            log_file: default_log_file(),
            manifest: None,
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            remote: default_remote(),
            branch: default_branch(),
            repo_dir: default_repo_dir(),
        }
    }
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_user_agent() -> String {
    format!("ioc-harvester/{}", env!("CARGO_PKG_VERSION"))
}

fn default_scratch_file() -> PathBuf {
    PathBuf::from("recent_threats_temp.csv")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("logs/ioc_harvester.log")
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_repo_dir() -> PathBuf {
    PathBuf::from(".")
}
