//! # Desk configuration
//!
//! A minimal string key/value store. Applications layer values however
//! they like: defaults first, then environment overrides via
//! [`DeskConfig::load_env`].
//!
//! ```rust
//! use desk_core::DeskConfig;
//! let mut config = DeskConfig::new();
//!
//! config.set("api.base_url", "http://localhost:5000/api");
//! config.set("api.timeout", "15s");
//!
//! let snapshot = config.snapshot();
//! assert_eq!(snapshot.get("api.base_url"), Some("http://localhost:5000/api"));
//! assert_eq!(snapshot.get_duration("api.timeout"), Some(std::time::Duration::from_secs(15)));
//! ```
//!
//! Environment keys are mapped by stripping the prefix, lowercasing and
//! turning `__` into `.`:
//!
//! ```bash
//! export DESK__API__BASE_URL=https://erp.example.com/api   # api.base_url
//! ```

use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct DeskConfig {
    values: HashMap<String, String>,
}

impl DeskConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Set a key only if nothing has set it yet.
    pub fn set_default<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.entry(key.into()).or_insert_with(|| value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Apply every `PREFIX...` pair from an iterator of (key, value).
    ///
    /// `DESK__API__BASE_URL` with prefix `DESK__` becomes `api.base_url`.
    /// Returns how many keys were applied.
    pub fn load_vars<I>(&mut self, prefix: &str, vars: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut applied = 0;
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                tracing::debug!(key = %normalized, "config override from environment");
                self.set(normalized, value);
                applied += 1;
            }
        }
        applied
    }

    /// Apply overrides from the process environment.
    pub fn load_env(&mut self, prefix: &str) -> usize {
        self.load_vars(prefix, std::env::vars())
    }

    pub fn snapshot(&self) -> DeskConfigSnapshot {
        DeskConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeskConfigSnapshot {
    map: HashMap<String, String>,
}

impl DeskConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse::<usize>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.parse::<bool>().ok())
    }

    /// Humantime durations: `30s`, `1m 30s`, `250ms`.
    pub fn get_duration(&self, key: &str) -> Option<Duration> {
        self.get(key)
            .and_then(|v| humantime::parse_duration(v.trim()).ok())
    }
}
