//! Session controller.
//!
//! Single source of truth for who is signed in and which company they are
//! working in. State lives behind one lock; the persistent store is written
//! in whole batches while that lock is held, so memory and storage move
//! together.
//!
//! Transitions:
//! - `bootstrap`: restore token, user and company from the store
//! - `login` / `register`: user-triggered, tracked by an attempt generation
//! - `select_tenant`: explicit choice (or clear) of the active company
//! - `on_directory_result`: auto-select when exactly one company exists
//! - `logout` / `reload`: wipe, or rebuild from the store
//!
//! Login and register never return an error to the caller. Failures land in
//! [`Session::error`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use desk_client::store::{SessionStore, StoreBatch, CURRENT_COMPANY_KEY, TOKEN_KEY, USER_KEY};
use desk_client::{AuthApi, Credentials, ForcedLogoutListener, Registration, TenantDirectory};
use desk_core::errors::{DeskError, DeskResult};
use desk_core::navigation::{
    is_tenant_select_path, landing_route, Navigator, DASHBOARD_ROUTE, LOGIN_ROUTE,
};
use desk_core::tenant::{directory_fingerprint, normalize_tenant, Tenant};
use desk_core::User;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::session::Session;

pub struct SessionController {
    state: RwLock<Session>,
    /// Bumped by every login/register attempt, logout and reload. A response
    /// is only applied while its attempt is still the current generation.
    generation: AtomicU64,
    /// Fingerprint of the directory result that last triggered auto-select.
    auto_selected: Mutex<Option<String>>,
    store: Arc<dyn SessionStore>,
    auth: Arc<dyn AuthApi>,
    directory: Arc<dyn TenantDirectory>,
    navigator: Arc<dyn Navigator>,
}

#[derive(Default)]
struct Restored {
    user: Option<User>,
    tenant: Option<Tenant>,
}

impl SessionController {
    pub fn new(
        store: Arc<dyn SessionStore>,
        auth: Arc<dyn AuthApi>,
        directory: Arc<dyn TenantDirectory>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            state: RwLock::new(Session::default()),
            generation: AtomicU64::new(0),
            auto_selected: Mutex::new(None),
            store,
            auth,
            directory,
            navigator,
        }
    }

    /// Current state snapshot.
    pub fn session(&self) -> Session {
        self.state.read().unwrap().clone()
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    /// Listener for the gateway's forced-logout event. Holds only a weak
    /// reference, so the client and the controller can own each other's
    /// collaborators without a cycle.
    pub fn forced_logout_listener(self: &Arc<Self>) -> ForcedLogoutListener {
        let weak = Arc::downgrade(self);
        Arc::new(move || {
            if let Some(controller) = weak.upgrade() {
                controller.reload();
            }
        })
    }

    // ──────────────────────────────────────────────────────────────
    // Bootstrap
    // ──────────────────────────────────────────────────────────────

    /// Restore the session from the store. Never fails: anything unreadable
    /// is logged, removed and treated as absent.
    pub fn bootstrap(&self) {
        let mut state = self.state.write().unwrap();
        let restored = self.restore();

        state.user = restored.user;
        state.active_tenant = restored.tenant;
        state.loading = false;
        state.initialized = true;
        state.error = None;

        match &state.user {
            Some(user) => info!(
                user = %user.id,
                role = %user.role,
                tenant = ?state.active_tenant.as_ref().map(|t| t.id.to_string()),
                "session restored"
            ),
            None => debug!("no session to restore"),
        }
    }

    /// Start over as if the page had been reloaded.
    pub fn reload(&self) {
        {
            let mut state = self.state.write().unwrap();
            self.generation.fetch_add(1, Ordering::SeqCst);
            *state = Session::default();
            *self.auto_selected.lock().unwrap() = None;
        }
        self.bootstrap();
    }

    fn restore(&self) -> Restored {
        let token = self.read_entry(TOKEN_KEY);
        let raw_user = self.read_entry(USER_KEY);

        let raw_user = match (token, raw_user) {
            (Some(_), Some(raw_user)) => raw_user,
            (None, None) => return Restored::default(),
            _ => {
                debug!("half a session in store; discarding");
                self.discard(StoreBatch::clear_session());
                return Restored::default();
            }
        };

        let user: User = match serde_json::from_str(&raw_user) {
            Ok(user) => user,
            Err(err) => {
                warn!(error = %err, "stored user is not valid JSON; discarding session");
                self.discard(StoreBatch::clear_session());
                return Restored::default();
            }
        };

        if user.is_admin() {
            if self.read_entry(CURRENT_COMPANY_KEY).is_some() {
                debug!("admin session had a stored company; removing it");
                self.discard(StoreBatch::new().remove(CURRENT_COMPANY_KEY));
            }
            return Restored {
                user: Some(user),
                tenant: None,
            };
        }

        Restored {
            tenant: self.restore_tenant(),
            user: Some(user),
        }
    }

    /// The persisted company, normalized. An unreadable entry is removed.
    fn restore_tenant(&self) -> Option<Tenant> {
        let raw = self.read_entry(CURRENT_COMPANY_KEY)?;
        let parsed = serde_json::from_str::<Value>(&raw)
            .map_err(anyhow::Error::from)
            .and_then(|v| normalize_tenant(&v));
        match parsed {
            Ok(tenant) => Some(tenant),
            Err(err) => {
                warn!(error = %err, "stored company is unreadable; discarding it");
                self.discard(StoreBatch::new().remove(CURRENT_COMPANY_KEY));
                None
            }
        }
    }

    fn read_entry(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(v) => v.filter(|s| !s.trim().is_empty()),
            Err(err) => {
                warn!(key, error = %err, "session store read failed");
                None
            }
        }
    }

    fn discard(&self, batch: StoreBatch) {
        if let Err(err) = self.store.apply(batch) {
            warn!(error = %err, "could not remove unreadable session entries");
        }
    }

    // ──────────────────────────────────────────────────────────────
    // Login / register
    // ──────────────────────────────────────────────────────────────

    /// Sign in. Returns the user on success; on failure the message is in
    /// `session().error` and the caller stays where it is.
    pub async fn login(&self, credentials: &Credentials) -> Option<User> {
        let attempt = self.begin_attempt();

        if let Err(err) = credentials.check() {
            self.fail_attempt(attempt, &err);
            return None;
        }

        let result = self.auth.login(credentials).await;
        let response = match result {
            Ok(response) => response,
            Err(err) => {
                self.fail_attempt(attempt, &err);
                return None;
            }
        };

        let committed = self.commit(attempt, |state| {
            let user_json = match serde_json::to_string(&response.user) {
                Ok(json) => json,
                Err(err) => {
                    state.loading = false;
                    state.error = Some(format!("Could not save session: {err}"));
                    return false;
                }
            };

            let is_admin = response.user.is_admin();
            let mut batch = StoreBatch::new()
                .set(TOKEN_KEY, response.token.as_str())
                .set(USER_KEY, user_json);
            if is_admin {
                batch = batch.remove(CURRENT_COMPANY_KEY);
            }
            if let Err(err) = self.store.apply(batch) {
                error!(error = %err, "could not persist session");
                state.loading = false;
                state.error = Some("Could not save session".to_string());
                return false;
            }

            // Admins never hold a company. Anyone else picks up the one left
            // in the store, e.g. by registration.
            state.user = Some(response.user.clone());
            state.active_tenant = if is_admin { None } else { self.restore_tenant() };
            state.loading = false;
            state.error = None;
            *self.auto_selected.lock().unwrap() = None;
            true
        });

        if committed != Some(true) {
            return None;
        }

        let user = response.user;
        info!(user = %user.id, role = %user.role, "logged in");
        self.navigator.navigate(landing_route(&user.role));
        Some(user)
    }

    /// Create an account. Does not sign in; on success the user is sent to
    /// the login screen. A company created alongside the account is
    /// persisted so it is already known when they come back.
    pub async fn register(&self, registration: &Registration) -> bool {
        let attempt = self.begin_attempt();

        if let Err(err) = registration.check() {
            self.fail_attempt(attempt, &err);
            return false;
        }

        let response = match self.auth.register(registration).await {
            Ok(response) => response,
            Err(err) => {
                self.fail_attempt(attempt, &err);
                return false;
            }
        };

        let committed = self.commit(attempt, |state| {
            if let Some(raw) = response.company.as_ref() {
                match normalize_tenant(raw) {
                    Ok(tenant) => self.persist_registered_tenant(&tenant),
                    Err(err) => warn!(error = %err, "registration returned an unusable company"),
                }
            }
            state.loading = false;
            state.error = None;
        });

        if committed.is_none() {
            return false;
        }

        info!(email = %registration.email, "registered");
        self.navigator.navigate(LOGIN_ROUTE);
        true
    }

    fn persist_registered_tenant(&self, tenant: &Tenant) {
        let result = serde_json::to_string(tenant)
            .map_err(anyhow::Error::from)
            .and_then(|json| {
                self.store
                    .set(CURRENT_COMPANY_KEY, &json)
                    .map_err(anyhow::Error::from)
            });
        match result {
            Ok(()) => debug!(tenant = %tenant.id, "stored company from registration"),
            Err(err) => warn!(error = %err, "could not store company from registration"),
        }
    }

    fn begin_attempt(&self) -> u64 {
        let mut state = self.state.write().unwrap();
        let attempt = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        state.loading = true;
        state.error = None;
        attempt
    }

    /// Run `apply` under the state lock if `attempt` is still current.
    fn commit<T>(&self, attempt: u64, apply: impl FnOnce(&mut Session) -> T) -> Option<T> {
        let mut state = self.state.write().unwrap();
        if self.generation.load(Ordering::SeqCst) != attempt {
            debug!(attempt, "discarding response for a superseded attempt");
            return None;
        }
        Some(apply(&mut state))
    }

    fn fail_attempt(&self, attempt: u64, err: &anyhow::Error) {
        let message = describe(err);
        let applied = self.commit(attempt, |state| {
            state.loading = false;
            state.error = Some(message.clone());
        });
        if applied.is_some() {
            info!(error = %message, "auth attempt failed");
        }
    }

    // ──────────────────────────────────────────────────────────────
    // Tenant selection
    // ──────────────────────────────────────────────────────────────

    /// Make `tenant` the active company, or clear it with `None`.
    ///
    /// The record is normalized first; the previous company is replaced
    /// wholesale. Admins never hold a company, and nobody holds one while
    /// signed out. Non-admins land on the dashboard either way.
    pub fn select_tenant(&self, tenant: Option<&Value>) -> DeskResult<Option<Tenant>> {
        let normalized = tenant.map(normalize_tenant).transpose()?;

        let navigate = {
            let mut state = self.state.write().unwrap();
            let Some(user) = state.user.as_ref() else {
                return Err(DeskError::not_authenticated("Sign in before choosing a company").into_anyhow());
            };
            let is_admin = user.is_admin();
            if is_admin && normalized.is_some() {
                return Err(DeskError::forbidden("Administrators do not work inside a company").into_anyhow());
            }

            let batch = match &normalized {
                Some(t) => StoreBatch::new().set(CURRENT_COMPANY_KEY, serde_json::to_string(t)?),
                None => StoreBatch::new().remove(CURRENT_COMPANY_KEY),
            };
            self.store.apply(batch)?;
            state.active_tenant = normalized.clone();

            !is_admin
        };

        match &normalized {
            Some(t) => info!(tenant = %t.id, name = %t.name, "company selected"),
            None => info!("company cleared"),
        }
        if navigate {
            self.navigator.navigate(DASHBOARD_ROUTE);
        }
        Ok(normalized)
    }

    /// Auto-select handler for a completed directory query.
    ///
    /// Selects the only company when: the session is initialized and idle, a
    /// non-admin is signed in, they are not on the selection screen, and no
    /// company is active. Fires at most once per distinct result.
    pub fn on_directory_result(&self, tenants: &[Tenant]) -> Option<Tenant> {
        let fingerprint = directory_fingerprint(tenants);
        let path = self.navigator.current_path();

        let selected = {
            let mut state = self.state.write().unwrap();

            if !state.initialized || state.loading {
                debug!("auto-select skipped: session not settled");
                return None;
            }
            match state.user.as_ref() {
                Some(user) if !user.is_admin() => {}
                _ => return None,
            }
            if is_tenant_select_path(&path) || state.active_tenant.is_some() {
                return None;
            }
            let [only] = tenants else {
                return None;
            };

            let mut last = self.auto_selected.lock().unwrap();
            if last.as_deref() == Some(fingerprint.as_str()) {
                debug!(%fingerprint, "auto-select already ran for this directory result");
                return None;
            }
            let tenant = match normalize_tenant(&only.to_value()) {
                Ok(t) => t,
                Err(err) => {
                    warn!(error = %err, "auto-select candidate is unusable");
                    return None;
                }
            };
            let json = match serde_json::to_string(&tenant) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "auto-select candidate could not be serialized");
                    return None;
                }
            };
            if let Err(err) = self.store.set(CURRENT_COMPANY_KEY, &json) {
                warn!(error = %err, "auto-select could not persist company");
                return None;
            }
            *last = Some(fingerprint);

            state.active_tenant = Some(tenant.clone());
            tenant
        };

        info!(tenant = %selected.id, "auto-selected the only company");
        self.navigator.navigate(DASHBOARD_ROUTE);
        Some(selected)
    }

    /// Fetch the directory and run auto-select on the result.
    pub async fn refresh_directory(&self) -> DeskResult<Vec<Tenant>> {
        if !self.session().is_authenticated() {
            return Err(DeskError::not_authenticated("Not signed in").into_anyhow());
        }
        let tenants = self.directory.list_tenants().await?;
        self.on_directory_result(&tenants);
        Ok(tenants)
    }

    // ──────────────────────────────────────────────────────────────
    // Logout
    // ──────────────────────────────────────────────────────────────

    /// Clear the session everywhere and go to the login screen. Any login
    /// still in flight is invalidated.
    pub fn logout(&self) {
        {
            let mut state = self.state.write().unwrap();
            self.generation.fetch_add(1, Ordering::SeqCst);

            if let Err(err) = self.store.clear_session() {
                error!(error = %err, "could not clear stored session");
            }

            if let Some(user) = state.user.take() {
                info!(user = %user.id, "logged out");
            }
            state.active_tenant = None;
            state.loading = false;
            state.error = None;
            state.initialized = true;
            *self.auto_selected.lock().unwrap() = None;
        }
        self.navigator.navigate(LOGIN_ROUTE);
    }
}

fn describe(err: &anyhow::Error) -> String {
    match DeskError::from_anyhow(err) {
        Some(desk) => desk.user_message(),
        None => err.to_string(),
    }
}
