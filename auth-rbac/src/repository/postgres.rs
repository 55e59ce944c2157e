//! PostgreSQL-backed permission and role repositories

use crate::{
    error::*,
    models::*,
    repository::{PermissionRepository, RoleRepository},
};
use async_trait::async_trait;
use database_layer::{DatabaseError, DatabasePool};
use sqlx::{Postgres, Transaction};
use std::collections::HashMap;
use tracing::{debug, info};

const PERMISSION_COLUMNS: &str = "id, nama, kode, deskripsi, grup, created_at, updated_at";
const ROLE_COLUMNS: &str = "id, nama, kode, deskripsi, created_at, updated_at";

pub struct PostgresPermissionRepository {
    pool: DatabasePool,
}

impl PostgresPermissionRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionRepository for PostgresPermissionRepository {
    async fn upsert(&self, definition: &PermissionDefinition) -> Result<UpsertOutcome> {
        // No row comes back when the stored values already match.
        let inserted: Option<(bool,)> = sqlx::query_as(
            r#"
            INSERT INTO permissions (nama, kode, deskripsi, grup)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (kode) DO UPDATE
               SET nama = EXCLUDED.nama,
                   deskripsi = EXCLUDED.deskripsi,
                   grup = EXCLUDED.grup,
                   updated_at = NOW(),
                   deleted_at = NULL
             WHERE (permissions.nama, permissions.deskripsi, permissions.grup, permissions.deleted_at)
                   IS DISTINCT FROM (EXCLUDED.nama, EXCLUDED.deskripsi, EXCLUDED.grup, NULL::timestamptz)
            RETURNING (xmax = 0)
            "#,
        )
        .bind(definition.nama)
        .bind(definition.kode)
        .bind(definition.deskripsi)
        .bind(definition.grup)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(match inserted {
            Some((true,)) => UpsertOutcome::Created,
            Some((false,)) => UpsertOutcome::Updated,
            None => UpsertOutcome::Unchanged,
        })
    }

    async fn list(&self) -> Result<Vec<Permission>> {
        let sql = format!(
            "SELECT {} FROM permissions WHERE deleted_at IS NULL ORDER BY grup, nama",
            PERMISSION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Permission>(&sql)
            .fetch_all(self.pool.pool())
            .await?)
    }

    async fn find_by_codes(&self, codes: &[String]) -> Result<Vec<Permission>> {
        let sql = format!(
            "SELECT {} FROM permissions WHERE kode = ANY($1) AND deleted_at IS NULL",
            PERMISSION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Permission>(&sql)
            .bind(codes)
            .fetch_all(self.pool.pool())
            .await?)
    }
}

#[derive(sqlx::FromRow)]
struct RolePermissionRow {
    role_id: i64,
    id: i64,
    kode: String,
    nama: String,
    grup: String,
}

pub struct PostgresRoleRepository {
    pool: DatabasePool,
}

impl PostgresRoleRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn hydrate(&self, records: Vec<RoleRecord>) -> Result<Vec<Role>> {
        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        let rows = sqlx::query_as::<_, RolePermissionRow>(
            r#"
            SELECT rp.role_id, p.id, p.kode, p.nama, p.grup
              FROM role_permissions rp
              JOIN permissions p ON p.id = rp.permission_id
             WHERE rp.role_id = ANY($1) AND p.deleted_at IS NULL
             ORDER BY p.grup, p.nama
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool.pool())
        .await?;

        let mut by_role: HashMap<i64, Vec<PermissionSummary>> = HashMap::new();
        for row in rows {
            by_role.entry(row.role_id).or_default().push(PermissionSummary {
                id: row.id,
                kode: row.kode,
                nama: row.nama,
                grup: row.grup,
            });
        }

        Ok(records
            .into_iter()
            .map(|record| {
                let permissions = by_role.remove(&record.id).unwrap_or_default();
                record.with_permissions(permissions)
            })
            .collect())
    }

    async fn hydrate_one(&self, record: Option<RoleRecord>) -> Result<Option<Role>> {
        match record {
            Some(record) => Ok(self.hydrate(vec![record]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    async fn reload(&self, id: i64) -> Result<Role> {
        self.find_by_id(id).await?.ok_or(RbacError::RoleNotFound)
    }

    async fn insert_permissions(tx: &mut Transaction<'static, Postgres>, role_id: i64, ids: &[i64]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            "INSERT INTO role_permissions (role_id, permission_id) \
             SELECT $1, UNNEST($2::bigint[]) ON CONFLICT DO NOTHING",
        )
        .bind(role_id)
        .bind(ids)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

fn map_role_write_error(err: sqlx::Error, kode: &str) -> RbacError {
    let err = DatabaseError::SqlxError(err);
    if err.is_unique_violation() {
        RbacError::RoleCodeTaken(kode.to_string())
    } else {
        RbacError::Database(err)
    }
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn create(&self, draft: RoleDraft) -> Result<Role> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO roles (nama, kode, deskripsi) VALUES ($1, $2, $3) RETURNING {}",
            ROLE_COLUMNS
        );
        let record = sqlx::query_as::<_, RoleRecord>(&sql)
            .bind(&draft.nama)
            .bind(&draft.kode)
            .bind(&draft.deskripsi)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_role_write_error(e, &draft.kode))?;

        Self::insert_permissions(&mut tx, record.id, &draft.permission_ids).await?;
        tx.commit().await?;

        info!(role_id = record.id, kode = %record.kode, permissions = draft.permission_ids.len(), "Role created");
        self.reload(record.id).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Role>> {
        let sql = format!("SELECT {} FROM roles WHERE id = $1 AND deleted_at IS NULL", ROLE_COLUMNS);
        let record = sqlx::query_as::<_, RoleRecord>(&sql)
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?;
        self.hydrate_one(record).await
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Role>> {
        let sql = format!(
            "SELECT {} FROM roles WHERE LOWER(kode) = LOWER($1) AND deleted_at IS NULL",
            ROLE_COLUMNS
        );
        let record = sqlx::query_as::<_, RoleRecord>(&sql)
            .bind(code)
            .fetch_optional(self.pool.pool())
            .await?;
        self.hydrate_one(record).await
    }

    async fn list(&self) -> Result<Vec<Role>> {
        let sql = format!("SELECT {} FROM roles WHERE deleted_at IS NULL ORDER BY nama", ROLE_COLUMNS);
        let records = sqlx::query_as::<_, RoleRecord>(&sql)
            .fetch_all(self.pool.pool())
            .await?;
        self.hydrate(records).await
    }

    async fn update(&self, id: i64, patch: RolePatch) -> Result<Role> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE roles SET nama = COALESCE($2, nama), kode = COALESCE($3, kode), \
             deskripsi = COALESCE($4, deskripsi), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {}",
            ROLE_COLUMNS
        );
        let kode = patch.kode.clone().unwrap_or_default();
        let record = sqlx::query_as::<_, RoleRecord>(&sql)
            .bind(id)
            .bind(&patch.nama)
            .bind(&patch.kode)
            .bind(&patch.deskripsi)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_role_write_error(e, &kode))?
            .ok_or(RbacError::RoleNotFound)?;

        if let Some(ids) = &patch.permission_ids {
            debug!(role_id = id, permissions = ids.len(), "Replacing role permission set");
            sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            Self::insert_permissions(&mut tx, id, ids).await?;
        }

        tx.commit().await?;
        info!(role_id = record.id, kode = %record.kode, "Role updated");
        self.reload(id).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let code: Option<(String,)> =
            sqlx::query_as("SELECT kode FROM roles WHERE id = $1 AND deleted_at IS NULL FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let (code,) = code.ok_or(RbacError::RoleNotFound)?;

        let (holders,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = $1 AND deleted_at IS NULL")
            .bind(&code)
            .fetch_one(&mut *tx)
            .await?;
        if holders > 0 {
            // Dropping the transaction rolls it back.
            return Err(RbacError::RoleInUse { code, users: holders });
        }

        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE roles SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(role_id = id, kode = %code, "Role deleted");
        Ok(())
    }

    async fn permission_codes(&self, role_code: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT p.kode
              FROM roles r
              JOIN role_permissions rp ON rp.role_id = r.id
              JOIN permissions p ON p.id = rp.permission_id
             WHERE r.kode = $1 AND r.deleted_at IS NULL AND p.deleted_at IS NULL
             ORDER BY p.grup, p.nama
            "#,
        )
        .bind(role_code)
        .fetch_all(self.pool.pool())
        .await?;
        Ok(rows.into_iter().map(|(kode,)| kode).collect())
    }
}
