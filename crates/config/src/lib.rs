#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for relsync
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/relsync/config.toml)
//! - Environment variables
//! - CLI flags

pub mod constants;
pub mod overrides;

pub use constants as fixed_paths;
pub use overrides::ClusterBizOverrides;

use relsync_errors::{ConfigError, Error};
use relsync_types::OutputFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub space_api: SpaceApiConfig,

    #[serde(default)]
    pub cluster: ClusterConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
}

/// Metadata store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout: u64, // seconds
}

/// Space API configuration
///
/// Without a `base_url` the container space business ids are resolved from
/// the local `spaces` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceApiConfig {
    pub base_url: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds
    pub token: Option<String>,
}

/// Cluster relation reconciler configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClusterConfig {
    /// Table form of the cluster → business overrides
    #[serde(default)]
    pub biz_overrides: BTreeMap<String, String>,
    /// Flat `clusterId:bizId,...` form, layered on top of the table
    pub biz_overrides_raw: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: OutputFormat::Plain,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 5,
            busy_timeout: 30,
        }
    }
}

impl Default for SpaceApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: 10,
            token: None,
        }
    }
}

// Default value functions for serde
fn default_output_format() -> OutputFormat {
    OutputFormat::Plain
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    30
}

fn default_timeout() -> u64 {
    10
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir
            .join("relsync")
            .join(fixed_paths::CONFIG_FILE_NAME))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this structure.
    pub fn from_toml(contents: &str) -> Result<Self, Error> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // RELSYNC_OUTPUT
        if let Ok(output) = std::env::var("RELSYNC_OUTPUT") {
            self.general.default_output = match output.as_str() {
                "plain" => OutputFormat::Plain,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "RELSYNC_OUTPUT".to_string(),
                        value: output,
                    }
                    .into())
                }
            };
        }

        // RELSYNC_DB_PATH
        if let Ok(path) = std::env::var("RELSYNC_DB_PATH") {
            if path.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "RELSYNC_DB_PATH".to_string(),
                    value: path,
                }
                .into());
            }
            self.database.path = Some(PathBuf::from(path));
        }

        // RELSYNC_SPACE_API_URL
        if let Ok(url) = std::env::var("RELSYNC_SPACE_API_URL") {
            self.space_api.base_url = Some(url).filter(|u| !u.is_empty());
        }

        // RELSYNC_SPACE_API_TIMEOUT
        if let Ok(timeout) = std::env::var("RELSYNC_SPACE_API_TIMEOUT") {
            self.space_api.timeout = timeout.parse().map_err(|_| ConfigError::InvalidValue {
                field: "RELSYNC_SPACE_API_TIMEOUT".to_string(),
                value: timeout,
            })?;
        }

        // RELSYNC_CLUSTER_BIZ_OVERRIDES
        if let Ok(raw) = std::env::var("RELSYNC_CLUSTER_BIZ_OVERRIDES") {
            self.cluster.biz_overrides_raw = Some(raw);
        }

        Ok(())
    }

    /// Check values that serde cannot reject on its own
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid field.
    pub fn validate(&self) -> Result<(), Error> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "database.max_connections".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if let Some(url) = &self.space_api.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    field: "space_api.base_url".to_string(),
                    value: url.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Get the database path (with default)
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(fixed_paths::DB_PATH))
    }

    /// Space API request timeout
    #[must_use]
    pub fn space_api_timeout(&self) -> Duration {
        Duration::from_secs(self.space_api.timeout)
    }

    /// Build the immutable cluster → business override table
    ///
    /// The flat string form is layered over the table form.
    #[must_use]
    pub fn cluster_biz_overrides(&self) -> ClusterBizOverrides {
        let table: ClusterBizOverrides = self
            .cluster
            .biz_overrides
            .iter()
            .map(|(cluster, biz)| (cluster.trim().to_string(), biz.trim().to_string()))
            .filter(|(cluster, biz)| !cluster.is_empty() && !biz.is_empty())
            .collect();
        match &self.cluster.biz_overrides_raw {
            Some(raw) => table.merged_with(ClusterBizOverrides::parse(raw)),
            None => table,
        }
    }
}
