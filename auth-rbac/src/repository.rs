use crate::{error::*, models::*};
use async_trait::async_trait;
use auth_identity::UserRepository;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

pub mod postgres;

pub use postgres::{PostgresPermissionRepository, PostgresRoleRepository};

/// Storage for the permission catalog.
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// Insert by code, or refresh name/description/group when they differ.
    async fn upsert(&self, definition: &PermissionDefinition) -> Result<UpsertOutcome>;

    /// All permissions ordered by group then name.
    async fn list(&self) -> Result<Vec<Permission>>;

    /// The permissions whose codes appear in `codes`; unknown codes are skipped.
    async fn find_by_codes(&self, codes: &[String]) -> Result<Vec<Permission>>;
}

/// Storage for roles and their permission sets.
///
/// Every multi-row write (`create`, `update`, `delete`) is atomic.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn create(&self, draft: RoleDraft) -> Result<Role>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Role>>;
    /// Case-insensitive code lookup.
    async fn find_by_code(&self, code: &str) -> Result<Option<Role>>;
    /// All roles ordered by name.
    async fn list(&self) -> Result<Vec<Role>>;
    async fn update(&self, id: i64, patch: RolePatch) -> Result<Role>;
    /// Fails with [`RbacError::RoleInUse`] while any live user holds the role's code.
    async fn delete(&self, id: i64) -> Result<()>;
    /// Permission codes of the role with exactly this code; empty when unknown.
    async fn permission_codes(&self, role_code: &str) -> Result<Vec<String>>;
}

/// In-memory permission catalog for testing and development
pub struct InMemoryPermissionRepository {
    permissions: Arc<DashMap<String, Permission>>,
    next_id: AtomicI64,
}

impl InMemoryPermissionRepository {
    pub fn new() -> Self {
        Self {
            permissions: Arc::new(DashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn summaries(&self, ids: &BTreeSet<i64>) -> Vec<PermissionSummary> {
        let mut summaries: Vec<PermissionSummary> = self
            .permissions
            .iter()
            .filter(|p| ids.contains(&p.id))
            .map(|p| p.summary())
            .collect();
        summaries.sort_by(by_group_then_name);
        summaries
    }
}

impl Default for InMemoryPermissionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermissionRepository for InMemoryPermissionRepository {
    async fn upsert(&self, definition: &PermissionDefinition) -> Result<UpsertOutcome> {
        match self.permissions.entry(definition.kode.to_string()) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                if existing.nama == definition.nama
                    && existing.deskripsi == definition.deskripsi
                    && existing.grup == definition.grup
                {
                    return Ok(UpsertOutcome::Unchanged);
                }
                existing.nama = definition.nama.to_string();
                existing.deskripsi = definition.deskripsi.to_string();
                existing.grup = definition.grup.to_string();
                existing.updated_at = Utc::now();
                Ok(UpsertOutcome::Updated)
            }
            Entry::Vacant(entry) => {
                let now = Utc::now();
                entry.insert(Permission {
                    id: self.next_id.fetch_add(1, Ordering::SeqCst),
                    nama: definition.nama.to_string(),
                    kode: definition.kode.to_string(),
                    deskripsi: definition.deskripsi.to_string(),
                    grup: definition.grup.to_string(),
                    created_at: now,
                    updated_at: now,
                });
                Ok(UpsertOutcome::Created)
            }
        }
    }

    async fn list(&self) -> Result<Vec<Permission>> {
        let mut all: Vec<Permission> = self.permissions.iter().map(|p| p.value().clone()).collect();
        all.sort_by(|a, b| a.grup.cmp(&b.grup).then_with(|| a.nama.cmp(&b.nama)));
        Ok(all)
    }

    async fn find_by_codes(&self, codes: &[String]) -> Result<Vec<Permission>> {
        Ok(codes
            .iter()
            .filter_map(|code| self.permissions.get(code).map(|p| p.value().clone()))
            .collect())
    }
}

struct StoredRole {
    record: RoleRecord,
    permission_ids: BTreeSet<i64>,
    deleted: bool,
}

/// In-memory role repository for testing and development.
///
/// Without a user repository attached, roles are never considered in use.
pub struct InMemoryRoleRepository {
    roles: RwLock<BTreeMap<i64, StoredRole>>,
    next_id: AtomicI64,
    permissions: Arc<InMemoryPermissionRepository>,
    users: Option<Arc<dyn UserRepository>>,
}

impl InMemoryRoleRepository {
    pub fn new(permissions: Arc<InMemoryPermissionRepository>) -> Self {
        Self {
            roles: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            permissions,
            users: None,
        }
    }

    pub fn with_users(mut self, users: Arc<dyn UserRepository>) -> Self {
        self.users = Some(users);
        self
    }

    fn hydrate(&self, stored: &StoredRole) -> Role {
        stored
            .record
            .clone()
            .with_permissions(self.permissions.summaries(&stored.permission_ids))
    }

    fn code_taken(roles: &BTreeMap<i64, StoredRole>, code: &str, except: Option<i64>) -> bool {
        roles
            .values()
            .any(|r| !r.deleted && Some(r.record.id) != except && r.record.kode.eq_ignore_ascii_case(code))
    }
}

#[async_trait]
impl RoleRepository for InMemoryRoleRepository {
    async fn create(&self, draft: RoleDraft) -> Result<Role> {
        let mut roles = self.roles.write();
        if Self::code_taken(&roles, &draft.kode, None) {
            return Err(RbacError::RoleCodeTaken(draft.kode));
        }

        let now = Utc::now();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = StoredRole {
            record: RoleRecord {
                id,
                nama: draft.nama,
                kode: draft.kode,
                deskripsi: draft.deskripsi,
                created_at: now,
                updated_at: now,
            },
            permission_ids: draft.permission_ids.into_iter().collect(),
            deleted: false,
        };
        let role = self.hydrate(&stored);
        roles.insert(id, stored);
        Ok(role)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Role>> {
        let roles = self.roles.read();
        Ok(roles.get(&id).filter(|r| !r.deleted).map(|r| self.hydrate(r)))
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Role>> {
        let roles = self.roles.read();
        Ok(roles
            .values()
            .find(|r| !r.deleted && r.record.kode.eq_ignore_ascii_case(code))
            .map(|r| self.hydrate(r)))
    }

    async fn list(&self) -> Result<Vec<Role>> {
        let roles = self.roles.read();
        let mut all: Vec<Role> = roles.values().filter(|r| !r.deleted).map(|r| self.hydrate(r)).collect();
        all.sort_by(|a, b| a.nama.cmp(&b.nama));
        Ok(all)
    }

    async fn update(&self, id: i64, patch: RolePatch) -> Result<Role> {
        let mut roles = self.roles.write();
        if let Some(kode) = &patch.kode {
            if Self::code_taken(&roles, kode, Some(id)) {
                return Err(RbacError::RoleCodeTaken(kode.clone()));
            }
        }

        let stored = roles
            .get_mut(&id)
            .filter(|r| !r.deleted)
            .ok_or(RbacError::RoleNotFound)?;
        if let Some(nama) = patch.nama {
            stored.record.nama = nama;
        }
        if let Some(kode) = patch.kode {
            stored.record.kode = kode;
        }
        if let Some(deskripsi) = patch.deskripsi {
            stored.record.deskripsi = deskripsi;
        }
        if let Some(ids) = patch.permission_ids {
            stored.permission_ids = ids.into_iter().collect();
        }
        stored.record.updated_at = Utc::now();

        let record = stored.record.clone();
        let ids = stored.permission_ids.clone();
        Ok(record.with_permissions(self.permissions.summaries(&ids)))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let code = {
            let roles = self.roles.read();
            roles
                .get(&id)
                .filter(|r| !r.deleted)
                .map(|r| r.record.kode.clone())
                .ok_or(RbacError::RoleNotFound)?
        };

        if let Some(users) = &self.users {
            let holders = users.count_by_role(&code).await?;
            if holders > 0 {
                return Err(RbacError::RoleInUse { code, users: holders });
            }
        }

        let mut roles = self.roles.write();
        let stored = roles
            .get_mut(&id)
            .filter(|r| !r.deleted)
            .ok_or(RbacError::RoleNotFound)?;
        stored.permission_ids.clear();
        stored.deleted = true;
        stored.record.updated_at = Utc::now();
        Ok(())
    }

    async fn permission_codes(&self, role_code: &str) -> Result<Vec<String>> {
        let roles = self.roles.read();
        Ok(roles
            .values()
            .find(|r| !r.deleted && r.record.kode == role_code)
            .map(|r| self.hydrate(r).permission_codes())
            .unwrap_or_default())
    }
}
