//! Application configuration, read from a TOML file with per-field defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::elevation::MAX_BATCH_SIZE;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connect: ConnectConfig,
    #[serde(default)]
    pub elevation: ElevationConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectConfig {
    /// Base URL of the tracker API
    #[serde(default = "default_connect_url")]
    pub base_url: String,

    /// File holding the OAuth access token; `GARMINTOKENS` overrides it
    #[serde(default)]
    pub token_file: Option<PathBuf>,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElevationConfig {
    /// Base URL of the OpenTopoData-compatible provider
    #[serde(default = "default_elevation_url")]
    pub base_url: String,

    /// Elevation model to query
    #[serde(default = "default_dataset")]
    pub dataset: String,

    /// Locations per request; the provider caps this at 100
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between successive provider requests
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,

    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory rendered maps are written to
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Retrieval command used by processing commands before any retrieval ran
    #[serde(default = "default_retrieval")]
    pub default_retrieval: String,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            base_url: default_connect_url(),
            token_file: None,
            http_timeout_secs: default_http_timeout(),
        }
    }
}

impl Default for ElevationConfig {
    fn default() -> Self {
        Self {
            base_url: default_elevation_url(),
            dataset: default_dataset(),
            batch_size: default_batch_size(),
            request_delay_ms: default_request_delay(),
            cache_path: default_cache_path(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_retrieval: default_retrieval(),
        }
    }
}

fn default_connect_url() -> String {
    "https://connectapi.garmin.com".to_string()
}

fn default_elevation_url() -> String {
    "https://api.opentopodata.org/v1".to_string()
}

fn default_dataset() -> String {
    "srtm90m".to_string()
}

fn default_batch_size() -> usize {
    MAX_BATCH_SIZE
}

fn default_request_delay() -> u64 {
    1000
}

fn default_http_timeout() -> u64 {
    30
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_retrieval() -> String {
    "5".to_string()
}

fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("garmin-trail")
        .join("elevation_cache.db")
}

/// `<config_dir>/garmin-trail/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("garmin-trail").join("config.toml"))
}

impl Config {
    /// Load from `path`, or from the default location when `None`. A missing
    /// default file yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match default_config_path() {
                Some(p) => (p, false),
                None => return Ok(Config::default()),
            },
        };
        if !required && !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse { path, source },
            other => other,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.elevation.batch_size == 0 {
            return Err(ConfigError::Invalid("elevation.batch_size must be at least 1".into()));
        }
        if self.elevation.dataset.trim().is_empty() {
            return Err(ConfigError::Invalid("elevation.dataset must not be empty".into()));
        }
        if self.session.default_retrieval.trim().is_empty() {
            return Err(ConfigError::Invalid("session.default_retrieval must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.elevation.dataset, "srtm90m");
        assert_eq!(config.elevation.batch_size, 100);
        assert_eq!(config.elevation.request_delay_ms, 1000);
        assert_eq!(config.session.default_retrieval, "5");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml(
            r#"
            [elevation]
            dataset = "aster30m"
            batch_size = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.elevation.dataset, "aster30m");
        assert_eq!(config.elevation.batch_size, 50);
        assert_eq!(config.elevation.http_timeout_secs, 30);
        assert_eq!(config.connect.base_url, "https://connectapi.garmin.com");
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let err = Config::from_toml("[elevation]\nbatch_size = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn explicit_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[session]\ndefault_retrieval = \"R\"\n[output]\ndir = \"maps\"\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.session.default_retrieval, "R");
        assert_eq!(config.output.dir, PathBuf::from("maps"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
