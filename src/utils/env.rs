//! Environment variable management
//!
//! Handles loading of `.env` files and turns the environment into an explicit
//! [`AppConfig`]. Only `main` and the seeding binary read the environment;
//! everything else receives configuration by value.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::classifier::ClassifierConfig;

/// Default stale threshold for checks stuck in `processing` (10 minutes)
pub const DEFAULT_STALE_AFTER_SECS: u64 = 600;

/// Load environment variables from .env file
///
/// Does not fail if .env file doesn't exist (optional configuration).
pub fn load_env() -> Result<()> {
    dotenv::dotenv().ok();
    Ok(())
}

/// Read a variable, falling back to `default` when unset or blank
pub fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

/// Read and parse a variable, falling back to `default` when unset
///
/// # Errors
/// Returns error if the variable is set but cannot be parsed
pub fn env_parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {:?}", key, value)),
        _ => Ok(default),
    }
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Runtime configuration for the server and the seeding CLI
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the SQLite database
    pub data_dir: PathBuf,
    /// Root directory evidence files are stored under
    pub media_root: PathBuf,
    pub port: u16,
    pub classifier: ClassifierConfig,
    /// How long a check may sit in `processing` before retry may reclaim it
    pub stale_after: Duration,
}

impl AppConfig {
    /// Build configuration from the process environment
    ///
    /// # Errors
    /// Returns error if a numeric variable is set to something unparseable
    pub fn from_env() -> Result<Self> {
        let data_dir = PathBuf::from(env_or("COMPLIANCE_DATA_DIR", "./data"));
        let media_root = env_optional("COMPLIANCE_MEDIA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("media"));

        let port = env_parse_or("PORT", 8000u16)?;
        let timeout_secs = env_parse_or("AI_TIMEOUT_SECS", ClassifierConfig::MIN_TIMEOUT_SECS)?;
        let stale_secs = env_parse_or("CHECK_STALE_AFTER_SECS", DEFAULT_STALE_AFTER_SECS)?;

        let classifier = ClassifierConfig::new(
            env_optional("AI_API_URL"),
            env_optional("AI_API_KEY"),
            env_or("AI_MODEL", ClassifierConfig::DEFAULT_MODEL),
            Duration::from_secs(timeout_secs),
        );

        Ok(Self {
            data_dir,
            media_root,
            port,
            classifier,
            stale_after: Duration::from_secs(stale_secs),
        })
    }

    /// Path of the SQLite database file
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("compliance.db")
    }
}
