pub mod config;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use desk_auth::SessionController;
use desk_client::{ApiClient, ClientOptions, FileStore, MemoryStore, SessionStore};
use desk_core::{DeskConfigSnapshot, MemoryNavigator, LOGIN_ROUTE};

/// Everything a running client needs, wired once.
pub struct DeskApp {
    pub config: DeskConfigSnapshot,
    pub client: Arc<ApiClient>,
    pub store: Arc<dyn SessionStore>,
    pub navigator: Arc<MemoryNavigator>,
    pub session: Arc<SessionController>,
}

/// Load configuration from the environment and build the app.
pub fn build() -> Result<DeskApp> {
    let config = config::load()?;
    build_with(config)
}

/// Build from an explicit config snapshot. The session is bootstrapped from
/// the store before this returns.
pub fn build_with(config: DeskConfigSnapshot) -> Result<DeskApp> {
    let options = ClientOptions::from_config(&config);
    options.validate().map_err(|e| anyhow!(e))?;

    let store: Arc<dyn SessionStore> = match &options.store_path {
        Some(path) => Arc::new(FileStore::open(path.clone())),
        None => Arc::new(MemoryStore::new()),
    };
    let navigator = Arc::new(MemoryNavigator::new(LOGIN_ROUTE));

    let client = Arc::new(ApiClient::new(&options, store.clone(), navigator.clone())?);
    let session = Arc::new(SessionController::new(
        store.clone(),
        client.clone(),
        client.clone(),
        navigator.clone(),
    ));
    client.on_forced_logout(session.forced_logout_listener());

    session.bootstrap();
    tracing::info!(base_url = %client.base_url(), "desk client ready");

    Ok(DeskApp {
        config,
        client,
        store,
        navigator,
        session,
    })
}
