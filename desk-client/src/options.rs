// Client options and configuration.

use std::path::PathBuf;
use std::time::Duration;

use desk_core::DeskConfigSnapshot;
use serde::{Deserialize, Serialize};

pub const BASE_URL_KEY: &str = "api.base_url";
pub const TIMEOUT_KEY: &str = "api.timeout";
pub const STORE_PATH_KEY: &str = "store.path";

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Gateway client configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientOptions {
    /// Root of the REST API; endpoint paths are appended to it
    pub base_url: String,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Where the session file lives. `None` keeps the session in memory.
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            store_path: None,
        }
    }
}

impl ClientOptions {
    /// Read options from a config snapshot, falling back to defaults per key.
    pub fn from_config(config: &DeskConfigSnapshot) -> Self {
        let defaults = Self::default();
        Self {
            base_url: config
                .get_string(BASE_URL_KEY)
                .unwrap_or(defaults.base_url),
            timeout: config.get_duration(TIMEOUT_KEY).unwrap_or(defaults.timeout),
            store_path: config.get(STORE_PATH_KEY).map(PathBuf::from),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err("`api.base_url` must not be empty".to_string());
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(format!("`api.base_url` must be an http(s) URL, got '{url}'"));
        }
        if self.timeout.is_zero() {
            return Err("`api.timeout` must be greater than zero".to_string());
        }
        Ok(())
    }
}
