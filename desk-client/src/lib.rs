//! desk-client: the HTTP boundary and the persistent session store.

pub mod auth;
pub mod directory;
pub mod gateway;
pub mod options;
pub mod store;

pub use auth::{AuthApi, Credentials, LoginResponse, RegisterResponse, Registration};
pub use directory::TenantDirectory;
pub use gateway::{ApiClient, ForcedLogoutListener};
pub use options::ClientOptions;
pub use store::{
    FileStore, MemoryStore, SessionStore, StoreBatch, StoreError, StoreOp, CURRENT_COMPANY_KEY,
    SESSION_KEYS, TOKEN_KEY, USER_KEY,
};
