use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A capability code such as `patient:create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: i64,
    pub nama: String,
    pub kode: String,
    pub deskripsi: String,
    pub grup: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    pub fn summary(&self) -> PermissionSummary {
        PermissionSummary {
            id: self.id,
            kode: self.kode.clone(),
            nama: self.nama.clone(),
            grup: self.grup.clone(),
        }
    }
}

/// Compact permission view embedded in roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSummary {
    pub id: i64,
    pub kode: String,
    pub nama: String,
    pub grup: String,
}

/// Static catalog entry synchronized into storage at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionDefinition {
    pub nama: &'static str,
    pub kode: &'static str,
    pub grup: &'static str,
    pub deskripsi: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    Unchanged,
}

/// A role with its resolved permissions, ordered by group then name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: i64,
    pub nama: String,
    pub kode: String,
    pub deskripsi: String,
    pub permissions: Vec<PermissionSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn permission_codes(&self) -> Vec<String> {
        self.permissions.iter().map(|p| p.kode.clone()).collect()
    }
}

/// Role row without its permissions.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RoleRecord {
    pub id: i64,
    pub nama: String,
    pub kode: String,
    pub deskripsi: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoleRecord {
    pub fn with_permissions(self, permissions: Vec<PermissionSummary>) -> Role {
        Role {
            id: self.id,
            nama: self.nama,
            kode: self.kode,
            deskripsi: self.deskripsi,
            permissions,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// New role with already-resolved permission ids.
#[derive(Debug, Clone)]
pub struct RoleDraft {
    pub nama: String,
    pub kode: String,
    pub deskripsi: String,
    pub permission_ids: Vec<i64>,
}

/// Role update. `permission_ids: Some` replaces the whole set, `None` keeps it.
#[derive(Debug, Clone, Default)]
pub struct RolePatch {
    pub nama: Option<String>,
    pub kode: Option<String>,
    pub deskripsi: Option<String>,
    pub permission_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRole {
    pub nama: String,
    pub kode: String,
    #[serde(default)]
    pub deskripsi: Option<String>,
    #[serde(default)]
    pub permission_kodes: Option<Vec<String>>,
}

/// `permission_kodes` distinguishes an omitted field (keep the current set)
/// from an empty array (clear it).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRole {
    #[serde(default)]
    pub nama: Option<String>,
    #[serde(default)]
    pub kode: Option<String>,
    #[serde(default)]
    pub deskripsi: Option<String>,
    #[serde(default)]
    pub permission_kodes: Option<Vec<String>>,
}

/// Sort key shared by every permission listing.
pub(crate) fn by_group_then_name(a: &PermissionSummary, b: &PermissionSummary) -> std::cmp::Ordering {
    a.grup.cmp(&b.grup).then_with(|| a.nama.cmp(&b.nama))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_role_distinguishes_omitted_from_empty() {
        let omitted: UpdateRole = serde_json::from_str(r#"{"nama":"Perawat"}"#).unwrap();
        assert_eq!(omitted.permission_kodes, None);

        let empty: UpdateRole = serde_json::from_str(r#"{"permissionKodes":[]}"#).unwrap();
        assert_eq!(empty.permission_kodes, Some(vec![]));
    }
}
