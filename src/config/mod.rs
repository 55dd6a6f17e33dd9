//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::models::Region;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Remote stats service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the stats service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Minimum gap between requests
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,

    /// JSON file holding the bearer/refresh token pair
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("player-sync/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_delay() -> u64 {
    250
}

fn default_token_file() -> PathBuf {
    PathBuf::from("./data/tokens.json")
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
            request_delay_ms: default_request_delay(),
            token_file: default_token_file(),
        }
    }
}

/// Leaderboard job configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Stop paging a region past this rank
    #[serde(default = "default_max_rank")]
    pub max_rank: u32,

    /// Pause between players
    #[serde(default = "default_item_delay")]
    pub item_delay_ms: u64,

    #[serde(default = "default_regions")]
    pub regions: Vec<Region>,
}

fn default_page_size() -> u32 {
    25
}

fn default_max_rank() -> u32 {
    9999
}

fn default_item_delay() -> u64 {
    1000
}

fn default_regions() -> Vec<Region> {
    Region::PROBE_ORDER.to_vec()
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_rank: default_max_rank(),
            item_delay_ms: default_item_delay(),
            regions: default_regions(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub jobs: JobConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            remote: RemoteConfig::default(),
            jobs: JobConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remote.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Remote timeout must be greater than 0".to_string(),
            ));
        }

        if url::Url::parse(&self.remote.base_url).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "Remote base URL is not a valid URL: {}",
                self.remote.base_url
            )));
        }

        if self.jobs.page_size == 0 {
            return Err(ConfigError::ValidationError(
                "Leaderboard page size must be greater than 0".to_string(),
            ));
        }

        if self.jobs.regions.is_empty() {
            return Err(ConfigError::ValidationError(
                "At least one leaderboard region is required".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.jobs.page_size, 25);
        assert_eq!(config.jobs.max_rank, 9999);
        assert_eq!(config.jobs.regions.len(), 7);
    }

    #[test]
    fn test_config_validation_ok() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_timeout() {
        let mut config = AppConfig::default();
        config.remote.timeout_seconds = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_url() {
        let mut config = AppConfig::default();
        config.remote.base_url = "stats service".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_no_regions() {
        let mut config = AppConfig::default();
        config.jobs.regions.clear();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
            log_level = "debug"

            [remote]
            base_url = "http://localhost:9000"

            [jobs]
            regions = ["Europe", "Asia"]
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.remote.base_url, "http://localhost:9000");
        assert_eq!(config.remote.timeout_seconds, 30);
        assert_eq!(config.jobs.regions, vec![Region::Europe, Region::Asia]);
        assert_eq!(config.jobs.page_size, 25);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.data_dir, parsed.data_dir);
        assert_eq!(config.jobs.regions, parsed.jobs.regions);
    }
}
