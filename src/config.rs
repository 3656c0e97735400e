use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::monitor::types::{Dependency, MonitoringOverride, MonitoringRules};

// =============================================================================
// Time-related constants
// =============================================================================

/// Timeout for each HTTP request in seconds
pub const FETCH_TIMEOUT_SECS: u64 = 30;

/// Delay between starting each check to avoid rate limiting (10ms)
pub const FETCH_STAGGER_DELAY_MS: u64 = 10;

/// User-Agent sent with every request
pub const USER_AGENT: &str = "depwatch";

/// Errors reading configuration or manifest files
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Unsupported file format: {0} (expected .json, .yaml or .yml)")]
    UnsupportedFormat(PathBuf),
}

/// Monitor configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct MonitorConfig {
    pub monitoring: MonitoringConfig,
    pub fetch: FetchConfig,
}

/// Monitoring rules: defaults plus per-URL overrides
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct MonitoringConfig {
    pub defaults: MonitoringRules,
    pub overrides: HashMap<String, MonitoringOverride>,
}

/// Fetch scheduling configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FetchConfig {
    /// Delay between starting each check in milliseconds
    pub stagger_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            stagger_delay_ms: FETCH_STAGGER_DELAY_MS,
        }
    }
}

impl MonitorConfig {
    /// Read configuration from a `.json`, `.yaml` or `.yml` file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        read_structured(path)
    }

    /// Configuration-level override for `url`, if any
    pub fn override_for(&self, url: &str) -> Option<&MonitoringOverride> {
        self.monitoring.overrides.get(url)
    }
}

/// Deserialize a JSON or YAML file, choosing the format by extension
pub fn read_structured<T>(path: &Path) -> Result<T, ConfigError>
where
    T: serde::de::DeserializeOwned,
{
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let read = || {
        std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    };

    match extension.as_deref() {
        Some("json") => serde_json::from_str(&read()?).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        }),
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&read()?).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })
        }
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Dependency manifest: a bare list or `{ dependencies: [...] }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Manifest {
    List(Vec<Dependency>),
    Wrapped { dependencies: Vec<Dependency> },
}

/// Read the dependency manifest from a `.json`, `.yaml` or `.yml` file
pub fn load_manifest(path: &Path) -> Result<Vec<Dependency>, ConfigError> {
    Ok(match read_structured::<Manifest>(path)? {
        Manifest::List(dependencies) => dependencies,
        Manifest::Wrapped { dependencies } => dependencies,
    })
}

/// Returns the path to the data directory for depwatch.
/// Uses $XDG_DATA_HOME/depwatch if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/depwatch,
/// or ./depwatch if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("depwatch.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("depwatch")
}
