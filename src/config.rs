//! TOML configuration.
//!
//! Every key has a default, so an empty file (or no file at all) yields a
//! working configuration:
//!
//! ```toml
//! [drive]
//! api_base = "https://www.googleapis.com/drive/v3"
//! token_env = "GOOGLE_DRIVE_ACCESS_TOKEN"
//! page_size = 100
//! query = "trashed = false"
//! include_globs = ["**"]
//! exclude_globs = []
//! timeout_secs = 60
//!
//! [output]
//! dir = "./saved-outputs"
//!
//! [extraction]
//! concurrency = 4
//! max_bytes = 52428800
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DriveConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Name of the environment variable holding the OAuth access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Drive search expression passed as `q=` when listing.
    #[serde(default = "default_query")]
    pub query: Option<String>,
    /// Globs matched against file names.
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            token_env: default_token_env(),
            page_size: default_page_size(),
            query: default_query(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_base() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}
fn default_token_env() -> String {
    "GOOGLE_DRIVE_ACCESS_TOKEN".to_string()
}
fn default_page_size() -> u32 {
    100
}
fn default_query() -> Option<String> {
    Some("trashed = false".to_string())
}
fn default_include_globs() -> Vec<String> {
    vec!["**".to_string()]
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./saved-outputs")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    /// Files processed at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Largest response body accepted per file.
    #[serde(default)]
    pub max_bytes: Option<u64>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_bytes: None,
        }
    }
}

fn default_concurrency() -> usize {
    4
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if !(1..=1000).contains(&config.drive.page_size) {
        anyhow::bail!("drive.page_size must be in [1, 1000]");
    }

    if config.drive.timeout_secs == 0 {
        anyhow::bail!("drive.timeout_secs must be > 0");
    }

    if !config.drive.api_base.starts_with("http://") && !config.drive.api_base.starts_with("https://")
    {
        anyhow::bail!(
            "drive.api_base must be an http(s) URL, got '{}'",
            config.drive.api_base
        );
    }

    if config.drive.token_env.trim().is_empty() {
        anyhow::bail!("drive.token_env must not be empty");
    }

    if config.extraction.concurrency == 0 {
        anyhow::bail!("extraction.concurrency must be >= 1");
    }

    if config.extraction.max_bytes == Some(0) {
        anyhow::bail!("extraction.max_bytes must be > 0 when set");
    }

    if config.output.dir.as_os_str().is_empty() {
        anyhow::bail!("output.dir must not be empty");
    }

    Ok(())
}
