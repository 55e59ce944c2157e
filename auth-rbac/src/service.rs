use crate::{
    error::*,
    models::*,
    policy::{AccessDecision, AccessPolicy},
    repository::{PermissionRepository, RoleRepository},
};
use async_trait::async_trait;
use auth_identity::{IdentityError, RoleDirectory};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Role and permission management.
///
/// Grants are read from the role repository on every check, so a committed
/// role change applies to the next request.
pub struct RbacService {
    permissions: Arc<dyn PermissionRepository>,
    roles: Arc<dyn RoleRepository>,
}

impl RbacService {
    pub fn new(permissions: Arc<dyn PermissionRepository>, roles: Arc<dyn RoleRepository>) -> Self {
        Self {
            permissions,
            roles,
        }
    }

    pub fn permission_store(&self) -> Arc<dyn PermissionRepository> {
        Arc::clone(&self.permissions)
    }

    pub async fn list_permissions(&self) -> Result<Vec<Permission>> {
        self.permissions.list().await
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>> {
        self.roles.list().await
    }

    pub async fn get_role(&self, id: i64) -> Result<Role> {
        self.roles.find_by_id(id).await?.ok_or(RbacError::RoleNotFound)
    }

    pub async fn find_role_by_code(&self, code: &str) -> Result<Option<Role>> {
        self.roles.find_by_code(code).await
    }

    pub async fn create_role(&self, request: CreateRole) -> Result<Role> {
        let kode = normalize_code(&request.kode);
        if self.roles.find_by_code(&kode).await?.is_some() {
            return Err(RbacError::RoleCodeTaken(kode));
        }

        let permission_ids = self
            .resolve_permission_ids(request.permission_kodes.as_deref().unwrap_or_default())
            .await?;

        let role = self
            .roles
            .create(RoleDraft {
                nama: request.nama.trim().to_string(),
                kode,
                deskripsi: request.deskripsi.unwrap_or_default().trim().to_string(),
                permission_ids,
            })
            .await?;
        info!(role_id = role.id, kode = %role.kode, "Role created");
        Ok(role)
    }

    /// Rename, re-code and optionally replace the permission set of a role.
    ///
    /// The permission set is only touched when `permission_kodes` is present;
    /// an unknown code rejects the whole update and leaves the role as it was.
    pub async fn update_role(&self, id: i64, request: UpdateRole) -> Result<Role> {
        let existing = self.get_role(id).await?;

        let kode = match request.kode.as_deref().map(normalize_code).filter(|k| !k.is_empty()) {
            Some(kode) => {
                if let Some(holder) = self.roles.find_by_code(&kode).await? {
                    if holder.id != existing.id {
                        return Err(RbacError::RoleCodeTaken(kode));
                    }
                }
                Some(kode)
            }
            None => None,
        };

        let permission_ids = match &request.permission_kodes {
            Some(codes) => Some(self.resolve_permission_ids(codes).await?),
            None => None,
        };

        let patch = RolePatch {
            nama: request.nama.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            kode,
            deskripsi: request.deskripsi.map(|d| d.trim().to_string()),
            permission_ids,
        };
        let role = self.roles.update(id, patch).await?;
        info!(role_id = role.id, kode = %role.kode, "Role updated");
        Ok(role)
    }

    pub async fn delete_role(&self, id: i64) -> Result<()> {
        self.roles.delete(id).await?;
        info!(role_id = id, "Role deleted");
        Ok(())
    }

    pub async fn permission_codes(&self, role_code: &str) -> Result<Vec<String>> {
        self.roles.permission_codes(role_code).await
    }

    /// Evaluate `policy` for a caller holding `role`.
    pub async fn authorize(&self, role: &str, policy: &AccessPolicy) -> Result<AccessDecision> {
        if !policy.allows_role(role) {
            return Ok(AccessDecision::DenyRole);
        }
        if policy.any_permission.is_empty() {
            return Ok(AccessDecision::Allow);
        }
        let granted = self.permission_codes(role).await?;
        Ok(policy.evaluate(role, &granted))
    }

    /// Resolve catalog codes to permission ids, all or nothing.
    pub async fn resolve_permission_ids(&self, codes: &[String]) -> Result<Vec<i64>> {
        let requested: BTreeSet<String> = codes
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if requested.is_empty() {
            return Ok(Vec::new());
        }

        let wanted: Vec<String> = requested.iter().cloned().collect();
        let found = self.permissions.find_by_codes(&wanted).await?;
        let known: BTreeSet<&str> = found.iter().map(|p| p.kode.as_str()).collect();
        let unknown: Vec<String> = requested
            .iter()
            .filter(|c| !known.contains(c.as_str()))
            .cloned()
            .collect();

        if !unknown.is_empty() {
            warn!(unknown = ?unknown, "Rejected unknown permission codes");
            return Err(RbacError::UnknownPermissionCodes(unknown));
        }
        Ok(found.into_iter().map(|p| p.id).collect())
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

#[async_trait]
impl RoleDirectory for RbacService {
    async fn role_exists(&self, code: &str) -> auth_identity::Result<bool> {
        self.roles
            .find_by_code(code)
            .await
            .map(|role| role.is_some_and(|r| r.kode == code))
            .map_err(|e| IdentityError::RoleLookup(e.to_string()))
    }

    async fn permission_codes(&self, role_code: &str) -> auth_identity::Result<Vec<String>> {
        RbacService::permission_codes(self, role_code)
            .await
            .map_err(|e| IdentityError::RoleLookup(e.to_string()))
    }
}
