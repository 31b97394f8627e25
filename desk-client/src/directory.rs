// Tenant directory query.

use async_trait::async_trait;
use desk_core::errors::DeskResult;
use desk_core::tenant::{parse_directory, Tenant};

use crate::gateway::ApiClient;

pub const COMPANIES_PATH: &str = "companies";

/// Companies the current user may operate within.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn list_tenants(&self) -> DeskResult<Vec<Tenant>>;
}

#[async_trait]
impl TenantDirectory for ApiClient {
    async fn list_tenants(&self) -> DeskResult<Vec<Tenant>> {
        let data = self.get(COMPANIES_PATH).await?;
        let tenants = parse_directory(&data)?;
        tracing::debug!(count = tenants.len(), "tenant directory loaded");
        Ok(tenants)
    }
}
