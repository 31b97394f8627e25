// Session state.

use desk_core::{Role, Tenant, User};
use serde::Serialize;

/// Coarse phase derived from the session flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Bootstrapping,
    Anonymous,
    Authenticated(Role),
}

/// Snapshot of who is signed in and in which company.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: Option<User>,
    pub active_tenant: Option<Tenant>,
    pub initialized: bool,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            user: None,
            active_tenant: None,
            initialized: false,
            loading: true,
            error: None,
        }
    }
}

impl Session {
    pub fn phase(&self) -> SessionPhase {
        match &self.user {
            _ if !self.initialized => SessionPhase::Bootstrapping,
            Some(user) => SessionPhase::Authenticated(user.role.clone()),
            None => SessionPhase::Anonymous,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn role(&self) -> Option<&Role> {
        self.user.as_ref().map(|u| &u.role)
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(User::is_admin)
    }

    /// The two structural rules every reachable state obeys: no tenant
    /// without a user, and no tenant for an admin.
    pub fn is_consistent(&self) -> bool {
        match (&self.user, &self.active_tenant) {
            (None, Some(_)) => false,
            (Some(user), Some(tenant)) => !user.is_admin() && tenant.id == tenant.object_id,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_is_bootstrapping() {
        let s = Session::default();
        assert!(s.loading);
        assert_eq!(s.phase(), SessionPhase::Bootstrapping);
    }

    #[test]
    fn phase_follows_user() {
        let mut s = Session {
            initialized: true,
            loading: false,
            ..Session::default()
        };
        assert_eq!(s.phase(), SessionPhase::Anonymous);

        s.user = Some(User::new("u1", "Sana", "sana@example.com", "manager"));
        assert_eq!(s.phase(), SessionPhase::Authenticated(Role::Manager));
    }

    #[test]
    fn consistency_rejects_orphan_and_admin_tenants() {
        let tenant = Tenant::new("c1", "Acme");
        let orphan = Session {
            active_tenant: Some(tenant.clone()),
            ..Session::default()
        };
        assert!(!orphan.is_consistent());

        let admin = Session {
            user: Some(User::new("a1", "Root", "root@example.com", "admin")),
            active_tenant: Some(tenant),
            ..Session::default()
        };
        assert!(!admin.is_consistent());
    }
}
