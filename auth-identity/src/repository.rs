use crate::{error::*, models::*};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use database_layer::{contains_ignore_case, Page, PageRequest};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

pub mod postgres;

pub use postgres::PostgresUserRepository;

/// Storage for clinic user accounts. Soft-deleted users are invisible to
/// every method.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;
    /// Case-insensitive username lookup.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    /// Case-insensitive email lookup.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Case-insensitive username and exact role code.
    async fn find_for_login(&self, username: &str, role: &str) -> Result<Option<User>>;
    /// Newest first, optional substring search over name, username and email.
    async fn list(&self, search: Option<&str>, page: PageRequest) -> Result<Page<User>>;
    async fn update(&self, id: i64, changes: UserChanges) -> Result<User>;
    async fn soft_delete(&self, id: i64) -> Result<()>;
    async fn update_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<()>;
    async fn count_by_role(&self, role: &str) -> Result<i64>;
    /// Every role code referenced by a live user.
    async fn distinct_roles(&self) -> Result<Vec<String>>;
}

/// In-memory user repository for testing and development
pub struct InMemoryUserRepository {
    users: RwLock<BTreeMap<i64, User>>,
    next_id: AtomicI64,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn live(users: &BTreeMap<i64, User>) -> impl Iterator<Item = &User> {
        users.values().filter(|u| u.deleted_at.is_none())
    }

    fn clashes(users: &BTreeMap<i64, User>, username: &str, email: &str, except: Option<i64>) -> bool {
        Self::live(users).any(|u| {
            Some(u.id) != except
                && (u.username.eq_ignore_ascii_case(username) || u.email.eq_ignore_ascii_case(email))
        })
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.write();
        if Self::clashes(&users, &user.username, &user.email, None) {
            return Err(IdentityError::UserAlreadyExists);
        }

        let now = Utc::now();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = User {
            id,
            nama_lengkap: user.nama_lengkap,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            status: user.status,
            last_login: None,
            phone_number: user.phone_number,
            profile_pic_url: user.profile_pic_url,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.users.read().get(&id).filter(|u| u.deleted_at.is_none()).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.read();
        let found = Self::live(&users).find(|u| u.username.eq_ignore_ascii_case(username)).cloned();
        Ok(found)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read();
        let found = Self::live(&users).find(|u| u.email.eq_ignore_ascii_case(email)).cloned();
        Ok(found)
    }

    async fn find_for_login(&self, username: &str, role: &str) -> Result<Option<User>> {
        let users = self.users.read();
        let found = Self::live(&users)
            .find(|u| u.username.eq_ignore_ascii_case(username) && u.role == role)
            .cloned();
        Ok(found)
    }

    async fn list(&self, search: Option<&str>, page: PageRequest) -> Result<Page<User>> {
        let users = self.users.read();
        let mut matching: Vec<User> = Self::live(&users)
            .filter(|u| match search {
                Some(term) => {
                    contains_ignore_case(&u.nama_lengkap, term)
                        || contains_ignore_case(&u.username, term)
                        || contains_ignore_case(&u.email, term)
                }
                None => true,
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = i64::try_from(matching.len()).unwrap_or(i64::MAX);
        Ok(Page::new(page.slice(&matching), total, page))
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<User> {
        let mut users = self.users.write();
        let current = users
            .get(&id)
            .filter(|u| u.deleted_at.is_none())
            .cloned()
            .ok_or(IdentityError::UserNotFound)?;

        let username = changes.username.clone().unwrap_or_else(|| current.username.clone());
        let email = changes.email.clone().unwrap_or_else(|| current.email.clone());
        if Self::clashes(&users, &username, &email, Some(id)) {
            return Err(IdentityError::UserAlreadyExists);
        }

        let mut updated = current;
        updated.username = username;
        updated.email = email;
        if let Some(nama) = changes.nama_lengkap {
            updated.nama_lengkap = nama;
        }
        if let Some(hash) = changes.password_hash {
            updated.password_hash = hash;
        }
        if let Some(role) = changes.role {
            updated.role = role;
        }
        if let Some(status) = changes.status {
            updated.status = status;
        }
        if let Some(phone) = changes.phone_number {
            updated.phone_number = Some(phone);
        }
        if let Some(url) = changes.profile_pic_url {
            updated.profile_pic_url = Some(url);
        }
        updated.updated_at = Utc::now();

        users.insert(id, updated.clone());
        Ok(updated)
    }

    async fn soft_delete(&self, id: i64) -> Result<()> {
        let mut users = self.users.write();
        match users.get_mut(&id).filter(|u| u.deleted_at.is_none()) {
            Some(user) => {
                user.deleted_at = Some(Utc::now());
                Ok(())
            }
            None => Err(IdentityError::UserNotFound),
        }
    }

    async fn update_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        if let Some(user) = self.users.write().get_mut(&id) {
            user.last_login = Some(at);
        }
        Ok(())
    }

    async fn count_by_role(&self, role: &str) -> Result<i64> {
        let users = self.users.read();
        let count = Self::live(&users).filter(|u| u.role == role).count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn distinct_roles(&self) -> Result<Vec<String>> {
        let users = self.users.read();
        let mut roles: Vec<String> = Self::live(&users).map(|u| u.role.clone()).collect();
        roles.sort();
        roles.dedup();
        Ok(roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str, role: &str) -> NewUser {
        NewUser {
            nama_lengkap: format!("User {}", username),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: role.to_string(),
            status: UserStatus::Aktif,
            phone_number: None,
            profile_pic_url: None,
        }
    }

    #[tokio::test]
    async fn test_username_and_email_are_unique_ignoring_case() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("Budi", "budi@klinik.test", "dokter")).await.unwrap();

        let dup_username = repo.create(new_user("budi", "other@klinik.test", "dokter")).await;
        assert!(matches!(dup_username, Err(IdentityError::UserAlreadyExists)));

        let dup_email = repo.create(new_user("other", "BUDI@klinik.test", "dokter")).await;
        assert!(matches!(dup_email, Err(IdentityError::UserAlreadyExists)));
    }

    #[tokio::test]
    async fn test_login_lookup_requires_exact_role() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("sari", "sari@klinik.test", "dokter")).await.unwrap();

        assert!(repo.find_for_login("SARI", "dokter").await.unwrap().is_some());
        assert!(repo.find_for_login("sari", "admin").await.unwrap().is_none());
        assert!(repo.find_for_login("sari", "Dokter").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_soft_deleted_users_disappear() {
        let repo = InMemoryUserRepository::new();
        let user = repo.create(new_user("tono", "tono@klinik.test", "resepsionis")).await.unwrap();

        repo.soft_delete(user.id).await.unwrap();

        assert!(repo.find_by_id(user.id).await.unwrap().is_none());
        assert_eq!(repo.count_by_role("resepsionis").await.unwrap(), 0);
        assert!(matches!(repo.soft_delete(user.id).await, Err(IdentityError::UserNotFound)));
        // The username is free again once the holder is deleted.
        repo.create(new_user("tono", "tono@klinik.test", "resepsionis")).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_searches_and_pages() {
        let repo = InMemoryUserRepository::new();
        for i in 0..12 {
            repo.create(new_user(&format!("staff{}", i), &format!("staff{}@klinik.test", i), "dokter"))
                .await
                .unwrap();
        }
        repo.create(new_user("admin", "admin@klinik.test", "admin")).await.unwrap();

        let first = repo.list(None, PageRequest::new(Some(1), Some(10))).await.unwrap();
        assert_eq!(first.total, 13);
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.total_pages(), 2);

        let found = repo.list(Some("STAFF1"), PageRequest::default()).await.unwrap();
        // staff1, staff10, staff11
        assert_eq!(found.total, 3);

        assert_eq!(repo.distinct_roles().await.unwrap(), vec!["admin".to_string(), "dokter".to_string()]);
    }
}
