use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = "sweetest";
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Environment variable overriding [`Config::store_url`]
pub const STORE_URL_ENV: &str = "SWEETEST_STORE_URL";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Base URL of the run-configuration store
    pub store_url: String,

    /// Buffer size of the event and notice channels
    pub event_capacity: usize,

    /// Console lines kept per run
    pub log_capacity: usize,

    /// Return run-configuration failures instead of empty results
    pub surface_config_errors: bool,

    /// Width of the console timeline bar, in characters
    pub bar_width: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_url: "http://localhost:8080".to_string(),
            event_capacity: 100,
            log_capacity: 500,
            surface_config_errors: false,
            bar_width: 40,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MonitorError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// `~/.config/sweetest/config.yaml` on Linux, the platform equivalent elsewhere.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from an explicit file, else the default location if present, else defaults.
    /// Environment overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(STORE_URL_ENV).filter(|url| !url.trim().is_empty()) {
            self.store_url = url;
        }
        self
    }
}
