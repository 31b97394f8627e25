//! desk-core: transport-agnostic types for the Desk dashboard client.

pub mod config;
pub mod errors;
pub mod navigation;
pub mod tenant;
pub mod user;

pub use config::{DeskConfig, DeskConfigSnapshot};
pub use errors::{error_message, DeskError, DeskResult, ErrorKind};
pub use navigation::{
    is_tenant_select_path, landing_route, MemoryNavigator, NavigationKind, Navigator, Visit,
    ADMIN_ROUTE, DASHBOARD_ROUTE, LOGIN_ROUTE, TENANT_SELECT_ROUTE,
};
pub use tenant::{directory_fingerprint, normalize_tenant, parse_directory, Tenant, TenantId};
pub use user::{Role, User};
