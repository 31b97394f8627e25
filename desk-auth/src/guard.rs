// Route guards.

use desk_core::navigation::{Navigator, ADMIN_ROUTE, DASHBOARD_ROUTE, LOGIN_ROUTE};

use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still resolving; render a neutral placeholder.
    Loading,
    Allow,
    Redirect {
        to: &'static str,
        /// Path the user tried to open, kept so login can send them back.
        from: Option<String>,
    },
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteGuard {
    pub require_admin: bool,
    /// Guards the non-admin dashboard area; admins are sent to `/admin`.
    pub dashboard_only: bool,
}

impl RouteGuard {
    pub fn new(require_admin: bool, dashboard_only: bool) -> Self {
        Self {
            require_admin,
            dashboard_only,
        }
    }

    /// Any signed-in user.
    pub fn authenticated() -> Self {
        Self::default()
    }

    pub fn admin() -> Self {
        Self::new(true, false)
    }

    pub fn dashboard() -> Self {
        Self::new(false, true)
    }

    pub fn evaluate(&self, session: &Session, attempted: &str) -> GuardDecision {
        if session.loading {
            return GuardDecision::Loading;
        }

        let Some(user) = session.user.as_ref() else {
            return GuardDecision::Redirect {
                to: LOGIN_ROUTE,
                from: Some(attempted.to_string()),
            };
        };

        if self.require_admin && !user.is_admin() {
            return GuardDecision::Redirect {
                to: DASHBOARD_ROUTE,
                from: None,
            };
        }
        if self.dashboard_only && user.is_admin() {
            return GuardDecision::Redirect {
                to: ADMIN_ROUTE,
                from: None,
            };
        }

        GuardDecision::Allow
    }

    /// Evaluate and carry out any redirect.
    pub fn enforce(
        &self,
        session: &Session,
        attempted: &str,
        navigator: &dyn Navigator,
    ) -> GuardDecision {
        let decision = self.evaluate(session, attempted);
        if let GuardDecision::Redirect { to, .. } = &decision {
            tracing::debug!(attempted, to, "route guard redirect");
            navigator.navigate(to);
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use desk_core::{MemoryNavigator, User};

    fn settled(user: Option<User>) -> Session {
        Session {
            user,
            initialized: true,
            loading: false,
            ..Session::default()
        }
    }

    fn admin() -> User {
        User::new("a1", "Root", "root@example.com", "admin")
    }

    fn worker() -> User {
        User::new("w1", "Ravi", "ravi@example.com", "worker")
    }

    #[test]
    fn loading_defers_the_decision() {
        let decision = RouteGuard::admin().evaluate(&Session::default(), "/admin");
        assert_eq!(decision, GuardDecision::Loading);
    }

    #[test]
    fn anonymous_goes_to_login_with_attempted_path() {
        let decision = RouteGuard::authenticated().evaluate(&settled(None), "/dashboard/sales");
        assert_eq!(
            decision,
            GuardDecision::Redirect {
                to: LOGIN_ROUTE,
                from: Some("/dashboard/sales".into()),
            }
        );
    }

    #[test]
    fn admin_area_rejects_non_admins() {
        let decision = RouteGuard::admin().evaluate(&settled(Some(worker())), "/admin/users");
        assert_eq!(
            decision,
            GuardDecision::Redirect {
                to: DASHBOARD_ROUTE,
                from: None,
            }
        );
        assert!(RouteGuard::admin()
            .evaluate(&settled(Some(admin())), "/admin/users")
            .is_allowed());
    }

    #[test]
    fn dashboard_area_sends_admins_home() {
        let guard = RouteGuard::dashboard();
        assert_eq!(
            guard.evaluate(&settled(Some(admin())), "/dashboard"),
            GuardDecision::Redirect {
                to: ADMIN_ROUTE,
                from: None,
            }
        );
        assert!(guard.evaluate(&settled(Some(worker())), "/dashboard").is_allowed());
    }

    #[test]
    fn enforce_only_navigates_on_redirect() {
        let nav = MemoryNavigator::new("/dashboard");
        RouteGuard::dashboard().enforce(&settled(Some(worker())), "/dashboard", &nav);
        assert!(nav.visits().is_empty());

        RouteGuard::dashboard().enforce(&settled(None), "/dashboard", &nav);
        assert_eq!(nav.current_path(), LOGIN_ROUTE);
    }
}
