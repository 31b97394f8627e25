//! Routes and the navigation seam.
//!
//! The session layer never talks to a browser directly. It asks a
//! [`Navigator`] where the user currently is and tells it where to go.

use std::sync::Mutex;

use crate::user::Role;

pub const LOGIN_ROUTE: &str = "/login";
pub const DASHBOARD_ROUTE: &str = "/dashboard";
pub const ADMIN_ROUTE: &str = "/admin";
pub const TENANT_SELECT_ROUTE: &str = "/company-select";

/// Where a freshly authenticated user lands.
pub fn landing_route(role: &Role) -> &'static str {
    if role.is_admin() {
        ADMIN_ROUTE
    } else {
        DASHBOARD_ROUTE
    }
}

/// True while the user is on the tenant-selection screen.
pub fn is_tenant_select_path(path: &str) -> bool {
    path.contains("company-select")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// In-app transition; state survives.
    Soft,
    /// Full reload; in-memory state is rebuilt from the store.
    Hard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    pub path: String,
    pub kind: NavigationKind,
}

pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;

    fn navigate(&self, path: &str);

    fn hard_redirect(&self, path: &str);
}

/// Headless navigator that records every visit.
#[derive(Debug)]
pub struct MemoryNavigator {
    history: Mutex<Vec<Visit>>,
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new(LOGIN_ROUTE)
    }
}

impl MemoryNavigator {
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            history: Mutex::new(vec![Visit {
                path: start.into(),
                kind: NavigationKind::Soft,
            }]),
        }
    }

    pub fn history(&self) -> Vec<Visit> {
        self.history.lock().unwrap().clone()
    }

    /// Visits after the starting location.
    pub fn visits(&self) -> Vec<Visit> {
        self.history().into_iter().skip(1).collect()
    }

    pub fn count_visits_to(&self, path: &str) -> usize {
        self.visits().iter().filter(|v| v.path == path).count()
    }

    fn push(&self, path: &str, kind: NavigationKind) {
        self.history.lock().unwrap().push(Visit {
            path: path.to_string(),
            kind,
        });
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.history
            .lock()
            .unwrap()
            .last()
            .map(|v| v.path.clone())
            .unwrap_or_default()
    }

    fn navigate(&self, path: &str) {
        tracing::debug!(path, "navigate");
        self.push(path, NavigationKind::Soft);
    }

    fn hard_redirect(&self, path: &str) {
        tracing::debug!(path, "hard redirect");
        self.push(path, NavigationKind::Hard);
    }
}
