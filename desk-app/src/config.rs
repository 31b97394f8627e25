use anyhow::{anyhow, Result};
use desk_client::options::{BASE_URL_KEY, DEFAULT_BASE_URL, TIMEOUT_KEY};
use desk_client::ClientOptions;
use desk_core::{DeskConfig, DeskConfigSnapshot};

/// `DESK__API__BASE_URL=...` overrides `api.base_url`.
pub const ENV_PREFIX: &str = "DESK__";

/// Defaults, then environment overrides, then validation.
pub fn load() -> Result<DeskConfigSnapshot> {
    let mut config = DeskConfig::new();
    let overrides = config.load_env(ENV_PREFIX);
    defaults(&mut config);
    tracing::debug!(overrides, "configuration loaded");

    let snapshot = config.snapshot();
    validate(&snapshot)?;
    Ok(snapshot)
}

/// Fill in anything the environment left unset.
pub fn defaults(config: &mut DeskConfig) {
    config.set_default(BASE_URL_KEY, DEFAULT_BASE_URL);
    config.set_default(TIMEOUT_KEY, "30s");
}

pub fn validate(snapshot: &DeskConfigSnapshot) -> Result<()> {
    let base_url = snapshot.get(BASE_URL_KEY).unwrap_or_default();
    if base_url.trim().is_empty() {
        return Err(anyhow!("Missing {BASE_URL_KEY}"));
    }
    ClientOptions::from_config(snapshot)
        .validate()
        .map_err(|e| anyhow!(e))
}
