//! Configuration file handling

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct Config {
    /// Service under test
    #[serde(default)]
    pub target: TargetConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Built-in suite settings
    #[serde(default)]
    pub suites: SuitesConfig,
}

/// Service under test
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TargetConfig {
    /// Base URL every suite path is joined onto
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

/// HTTP client settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    /// Timeout for a whole request, in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Timeout for establishing a connection, in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Log every request and response at debug level
    #[serde(default)]
    pub trace: bool,

    /// Headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            trace: false,
            headers: BTreeMap::new(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_connect_timeout() -> u64 {
    10
}

/// Built-in suite settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SuitesConfig {
    /// Version the `/version` endpoint is expected to report
    #[serde(default = "default_expected_version")]
    pub expected_version: String,
}

impl Default for SuitesConfig {
    fn default() -> Self {
        Self {
            expected_version: default_expected_version(),
        }
    }
}

fn default_expected_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }

    /// Render the configuration back to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| super::Error::Internal(e.to_string()))
    }
}
