//! Configuration loader
//!
//! Loads [`RetrySettings`] from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `REATTEMPT_MAX_ATTEMPTS` is absent, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `REATTEMPT_MAX_ATTEMPTS`: Re-executions after the first call (required)
//! - `REATTEMPT_BASE_DELAY_MS`: Base delay in milliseconds
//! - `REATTEMPT_MAX_DELAY_MS`: Delay cap in milliseconds
//! - `REATTEMPT_RESPECT_RETRY_AFTER`: Whether server hints are honored
//!   (true/false)
//! - `REATTEMPT_BACKOFF`: `fixed` or `exponential`
//! - `REATTEMPT_BACKOFF_MULTIPLIER`: Growth factor for exponential backoff
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./reattempt.toml` or `./reattempt.json` (current working directory)
//! 2. `../reattempt.toml` or `../reattempt.json` (parent directory)
//! 3. `../../reattempt.toml` or `../../reattempt.json` (grandparent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::time::Duration;

use reattempt_common::error::{CommonError, CommonResult};

use super::settings::{BackoffKind, RetrySettings};

const FILE_STEM: &str = "reattempt";
const MAX_ATTEMPTS_VAR: &str = "REATTEMPT_MAX_ATTEMPTS";

/// Supported settings file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Detect the format from a file extension
    ///
    /// # Errors
    /// Returns `CommonError::Config` for missing or unknown extensions.
    pub fn from_path(path: &Path) -> CommonResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            Some(other) => {
                Err(CommonError::config(format!("Unsupported config format: {}", other)))
            }
            None => Err(CommonError::config(format!(
                "Cannot detect config format without extension: {}",
                path.display()
            ))),
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }
}

/// Load settings with automatic fallback strategy
///
/// First attempts to load from environment variables. If they are not set,
/// falls back to a config file.
///
/// # Errors
/// Returns `CommonError::Config` if:
/// - Environment values are present but invalid
/// - No config file is found, or the file is invalid
/// - The resulting settings fail validation
pub fn load() -> CommonResult<RetrySettings> {
    match load_from_env() {
        Ok(settings) => {
            tracing::info!("Retry settings loaded from environment variables");
            Ok(settings)
        }
        Err(e) if std::env::var_os(MAX_ATTEMPTS_VAR).is_some() => Err(e),
        Err(e) => {
            tracing::debug!(error = %e, "Retry settings not in environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load settings from environment variables
///
/// `REATTEMPT_MAX_ATTEMPTS` must be present; the other variables fall back to
/// defaults.
///
/// # Errors
/// Returns `CommonError::Config` if the required variable is missing or any
/// value is invalid.
pub fn load_from_env() -> CommonResult<RetrySettings> {
    let defaults = RetrySettings::default();

    let max_attempts =
        env_var(MAX_ATTEMPTS_VAR).and_then(|s| parse_number::<u32>(MAX_ATTEMPTS_VAR, &s))?;
    let base_delay = env_millis("REATTEMPT_BASE_DELAY_MS")?.unwrap_or(defaults.base_delay);
    let max_delay = env_millis("REATTEMPT_MAX_DELAY_MS")?.unwrap_or(defaults.max_delay);
    let respect_retry_after =
        env_bool("REATTEMPT_RESPECT_RETRY_AFTER", defaults.respect_retry_after);
    let backoff = match std::env::var("REATTEMPT_BACKOFF") {
        Ok(raw) => raw.parse::<BackoffKind>()?,
        Err(_) => defaults.backoff,
    };
    let multiplier = match std::env::var("REATTEMPT_BACKOFF_MULTIPLIER") {
        Ok(raw) => parse_number::<f64>("REATTEMPT_BACKOFF_MULTIPLIER", &raw)?,
        Err(_) => defaults.multiplier,
    };

    let settings = RetrySettings {
        max_attempts,
        base_delay,
        max_delay,
        respect_retry_after,
        backoff,
        multiplier,
    };
    settings.validate()?;
    Ok(settings)
}

/// Load settings from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `CommonError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - The settings fail validation
pub fn load_from_file(path: Option<PathBuf>) -> CommonResult<RetrySettings> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CommonError::config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CommonError::config("No reattempt config file found in any of the standard locations")
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading retry settings from file");

    let format = ConfigFormat::from_path(&config_path)?;
    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CommonError::config(format!("Failed to read config file: {}", e)))?;

    load_from_str(&contents, format)
}

/// Parse and validate settings from string content
///
/// # Errors
/// Returns `CommonError::Config` if parsing or validation fails.
pub fn load_from_str(contents: &str, format: ConfigFormat) -> CommonResult<RetrySettings> {
    let settings: RetrySettings = match format {
        ConfigFormat::Toml => toml::from_str(contents)
            .map_err(|e| CommonError::config(format!("Invalid TOML format: {}", e)))?,
        ConfigFormat::Json => serde_json::from_str(contents)
            .map_err(|e| CommonError::config(format!("Invalid JSON format: {}", e)))?,
    };
    settings.validate()?;
    Ok(settings)
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory, its two parents, and the
/// executable's directory, preferring TOML over JSON in each.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend(cwd.ancestors().take(3).map(Path::to_path_buf));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| {
            [ConfigFormat::Toml, ConfigFormat::Json]
                .into_iter()
                .map(move |format| root.join(format!("{FILE_STEM}.{}", format.extension())))
        })
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `CommonError::Config` if the variable is not set.
fn env_var(key: &str) -> CommonResult<String> {
    std::env::var(key).map_err(|_| {
        CommonError::config_field(key, format!("Missing required environment variable: {}", key))
    })
}

fn parse_number<T>(key: &str, raw: &str) -> CommonResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| CommonError::config_field(key, format!("Invalid value '{}': {}", raw, e)))
}

fn env_millis(key: &str) -> CommonResult<Option<Duration>> {
    match std::env::var(key) {
        Ok(raw) => parse_number::<u64>(key, &raw).map(|ms| Some(Duration::from_millis(ms))),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
