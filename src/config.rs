//! User settings persistence
//!
//! Stored as pretty JSON in `<config dir>/tunegrab/settings.json`. The access
//! token is kept in the OS keyring instead (see `cli::auth`).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::remote::client::DEFAULT_API_URL;
use crate::sync::RetryPolicy;

/// Persistent settings, all optional on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the download service
    pub api_base_url: String,
    /// Where downloads go when `--output` is not given
    pub output_dir: PathBuf,
    /// The reference used by the last download
    pub last_url: Option<String>,
    /// Program (and arguments) that prints a fresh access token
    pub token_command: Vec<String>,
    /// Retries per track after the first attempt
    pub max_retries: u32,
    /// Backoff step between attempts
    pub backoff_ms: u64,
    /// Timeout for each HTTP request and for the token helper
    pub request_timeout_secs: u64,
    pub last_run: Option<DateTime<Utc>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            output_dir: default_output_dir(),
            last_url: None,
            token_command: Vec::new(),
            max_retries: 3,
            backoff_ms: 500,
            request_timeout_secs: 30,
            last_run: None,
        }
    }
}

fn default_output_dir() -> PathBuf {
    dirs::audio_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Music")))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Settings {
    /// Load settings from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings at {:?}", path))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write settings to {:?}", path))?;

        debug!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Get the settings file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("tunegrab").join("settings.json"))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_step: Duration::from_millis(self.backoff_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.json")).unwrap();

        assert_eq!(settings.api_base_url, DEFAULT_API_URL);
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.retry_policy().max_attempts(), 4);
        assert_eq!(settings.retry_policy().backoff_step, Duration::from_millis(500));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = Settings {
            output_dir: PathBuf::from("/music"),
            last_url: Some("https://open.spotify.com/album/XYZ".to_string()),
            token_command: vec!["fetch-token".to_string(), "--quiet".to_string()],
            last_run: Some(Utc::now()),
            ..Default::default()
        };
        settings.save_to(&path).unwrap();

        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"max_retries": 5, "output_dir": "/tmp/out"}"#).unwrap();

        let settings = Settings::load_from(&path).unwrap();

        assert_eq!(settings.max_retries, 5);
        assert_eq!(settings.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(settings.backoff_ms, 500);
        assert!(settings.token_command.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }
}
