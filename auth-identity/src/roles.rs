use crate::error::Result;
use async_trait::async_trait;

/// Read access to the role catalog, implemented by the RBAC service.
///
/// Users reference roles by code only, so identity operations consult this
/// directory to validate role assignments and to resolve permission codes.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn role_exists(&self, code: &str) -> Result<bool>;

    /// Permission codes granted to `role_code`; an unknown role yields an empty list.
    async fn permission_codes(&self, role_code: &str) -> Result<Vec<String>>;
}
