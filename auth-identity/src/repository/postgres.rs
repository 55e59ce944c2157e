//! PostgreSQL-backed user repository

use crate::{error::*, models::*, repository::UserRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use database_layer::{like_pattern, DatabaseError, DatabasePool, Page, PageRequest};
use tracing::debug;

const USER_COLUMNS: &str = "id, nama_lengkap, username, email, password_hash, role, status, \
     last_login, phone_number, profile_pic_url, created_at, updated_at, deleted_at";

pub struct PostgresUserRepository {
    pool: DatabasePool,
}

impl PostgresUserRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn map_write_error(err: sqlx::Error) -> IdentityError {
    let err = DatabaseError::SqlxError(err);
    if err.is_unique_violation() {
        IdentityError::UserAlreadyExists
    } else {
        IdentityError::Database(err)
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: NewUser) -> Result<User> {
        debug!(username = %user.username, role = %user.role, "Inserting user");
        let sql = format!(
            "INSERT INTO users (nama_lengkap, username, email, password_hash, role, status, phone_number, profile_pic_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.nama_lengkap)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.role)
            .bind(user.status)
            .bind(&user.phone_number)
            .bind(&user.profile_pic_url)
            .fetch_one(self.pool.pool())
            .await
            .map_err(map_write_error)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1 AND deleted_at IS NULL", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE LOWER(username) = LOWER($1) AND deleted_at IS NULL",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(self.pool.pool())
            .await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1) AND deleted_at IS NULL",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(self.pool.pool())
            .await?)
    }

    async fn find_for_login(&self, username: &str, role: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE LOWER(username) = LOWER($1) AND role = $2 AND deleted_at IS NULL",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .bind(role)
            .fetch_optional(self.pool.pool())
            .await?)
    }

    async fn list(&self, search: Option<&str>, page: PageRequest) -> Result<Page<User>> {
        let pattern = search.map(like_pattern);
        let filter = "deleted_at IS NULL AND ($1::text IS NULL \
             OR nama_lengkap ILIKE $1 OR username ILIKE $1 OR email ILIKE $1)";

        let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM users WHERE {}", filter))
            .bind(&pattern)
            .fetch_one(self.pool.pool())
            .await?;

        let sql = format!(
            "SELECT {} FROM users WHERE {} ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
            USER_COLUMNS, filter
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(&pattern)
            .bind(page.limit_i64())
            .bind(page.offset())
            .fetch_all(self.pool.pool())
            .await?;

        Ok(Page::new(users, total, page))
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<User> {
        let sql = format!(
            "UPDATE users SET \
                nama_lengkap = COALESCE($2, nama_lengkap), \
                username = COALESCE($3, username), \
                email = COALESCE($4, email), \
                password_hash = COALESCE($5, password_hash), \
                role = COALESCE($6, role), \
                status = COALESCE($7, status), \
                phone_number = COALESCE($8, phone_number), \
                profile_pic_url = COALESCE($9, profile_pic_url), \
                updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(&changes.nama_lengkap)
            .bind(&changes.username)
            .bind(&changes.email)
            .bind(&changes.password_hash)
            .bind(&changes.role)
            .bind(changes.status)
            .bind(&changes.phone_number)
            .bind(&changes.profile_pic_url)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(map_write_error)?
            .ok_or(IdentityError::UserNotFound)
    }

    async fn soft_delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(self.pool.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(IdentityError::UserNotFound);
        }
        Ok(())
    }

    async fn update_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(self.pool.pool())
            .await?;
        Ok(())
    }

    async fn count_by_role(&self, role: &str) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = $1 AND deleted_at IS NULL")
                .bind(role)
                .fetch_one(self.pool.pool())
                .await?;
        Ok(count)
    }

    async fn distinct_roles(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT role FROM users WHERE deleted_at IS NULL ORDER BY role")
                .fetch_all(self.pool.pool())
                .await?;
        Ok(rows.into_iter().map(|(role,)| role).collect())
    }
}
