//! Application configuration for PatentInsight.
//!
//! User config lives at `~/.patentinsight/patentinsight.toml`.
//! CLI flags override config file values, which override defaults.
//! Unknown fields are rejected at load time rather than silently ignored.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PatentInsightError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "patentinsight.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".patentinsight";

/// Upper bound for the fetch worker pool.
pub const MAX_FETCH_CONCURRENCY: u32 = 5;

// ---------------------------------------------------------------------------
// Config structs (matching patentinsight.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Abstract-fetch settings.
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Failure policy.
    #[serde(default)]
    pub error_handling: ErrorHandlingConfig,

    /// Output artifact settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[fetcher]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetcherConfig {
    /// Delay between consecutive requests in sequential mode (throttle).
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Retries after the initial attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff delay; doubles on each retry.
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    /// Per-attempt network timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Concurrent fetches; 1 means strictly sequential.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay_ms(),
            max_retries: default_max_retries(),
            base_backoff_ms: default_base_backoff_ms(),
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_request_delay_ms() -> u64 {
    2000
}
fn default_max_retries() -> u32 {
    3
}
fn default_base_backoff_ms() -> u64 {
    2000
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_concurrency() -> u32 {
    1
}

/// `[error_handling]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorHandlingConfig {
    /// When true (default), per-record errors are logged and the run
    /// proceeds with whatever succeeded. When false, the first per-record
    /// error halts the run at the current stage.
    #[serde(default = "default_true")]
    pub continue_on_error: bool,
}

impl Default for ErrorHandlingConfig {
    fn default() -> Self {
        Self {
            continue_on_error: default_true(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory for all output artifacts.
    #[serde(default = "default_output_dir")]
    pub base_dir: String,

    /// chrono format string for timestamped artifact filenames.
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: default_output_dir(),
            timestamp_format: default_timestamp_format(),
        }
    }
}

fn default_output_dir() -> String {
    "data/processed".into()
}
fn default_timestamp_format() -> String {
    "%Y%m%d_%H%M%S".into()
}

// ---------------------------------------------------------------------------
// Fetch config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime fetch configuration handed to the fetcher crate.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Inter-request throttle in sequential mode.
    pub request_delay: Duration,
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Base backoff delay; doubles on each retry.
    pub base_backoff: Duration,
    /// Per-attempt network timeout.
    pub timeout: Duration,
    /// Worker-pool size; 1 means sequential.
    pub concurrency: usize,
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        let concurrency = config
            .fetcher
            .concurrency
            .clamp(1, MAX_FETCH_CONCURRENCY);
        if concurrency != config.fetcher.concurrency {
            tracing::warn!(
                requested = config.fetcher.concurrency,
                effective = concurrency,
                "fetch concurrency clamped"
            );
        }
        Self {
            request_delay: Duration::from_millis(config.fetcher.request_delay_ms),
            max_retries: config.fetcher.max_retries,
            base_backoff: Duration::from_millis(config.fetcher.base_backoff_ms),
            timeout: Duration::from_secs(config.fetcher.timeout_secs),
            concurrency: concurrency as usize,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.patentinsight/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PatentInsightError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.patentinsight/patentinsight.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PatentInsightError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        PatentInsightError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PatentInsightError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PatentInsightError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PatentInsightError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
