use crate::{
    config::*, error::*, models::*, password::PasswordHasher, repository::*, roles::RoleDirectory,
    tokens::TokenService,
};
use chrono::Utc;
use database_layer::{Page, PageRequest};
use std::sync::Arc;
use tracing::{info, warn};

pub const ADMIN_ROLE: &str = "admin";

pub struct IdentityService {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleDirectory>,
    hasher: PasswordHasher,
    tokens: TokenService,
    config: IdentityConfig,
}

impl IdentityService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        roles: Arc<dyn RoleDirectory>,
        config: IdentityConfig,
    ) -> Result<Self> {
        let hasher = PasswordHasher::new(config.bcrypt_cost)?;
        let tokens = TokenService::new(&config.jwt_secret, config.jwt_expiry_hours);
        Ok(Self {
            users,
            roles,
            hasher,
            tokens,
            config,
        })
    }

    pub fn users(&self) -> Arc<dyn UserRepository> {
        Arc::clone(&self.users)
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Verify credentials for a username within a role and issue a token.
    ///
    /// Unknown user, wrong role and wrong password are indistinguishable to
    /// the caller. The account status is only revealed once the password
    /// has verified.
    pub async fn authenticate(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let username = request.username.trim();
        let role = request.role.trim();

        let Some(mut user) = self.users.find_for_login(username, role).await? else {
            warn!(username = %username, role = %role, "Login rejected: no matching user");
            return Err(IdentityError::InvalidCredentials);
        };

        if !self.hasher.verify(&request.password, &user.password_hash).await? {
            warn!(user_id = user.id, "Login rejected: password mismatch");
            return Err(IdentityError::InvalidCredentials);
        }

        if !user.is_active() {
            warn!(user_id = user.id, status = %user.status, "Login rejected: account inactive");
            return Err(IdentityError::AccountInactive);
        }

        let now = Utc::now();
        self.users.update_last_login(user.id, now).await?;
        user.last_login = Some(now);

        let issued = self.tokens.issue(&user)?;
        let permissions = self.permissions_or_empty(&user.role).await;

        info!(user_id = user.id, role = %user.role, "User authenticated");

        Ok(LoginResponse {
            token: issued.token,
            token_type: "Bearer".to_string(),
            expires_at: issued.expires_at,
            user: UserProfile::from(&user).with_permissions(permissions),
        })
    }

    pub fn verify_token(&self, token: &str) -> Result<TokenClaims> {
        self.tokens.verify(token)
    }

    /// Profile and permission codes of the authenticated caller.
    pub async fn current_user(&self, user_id: i64) -> Result<UserProfile> {
        let user = self.get_user(user_id).await?;
        let permissions = self.permissions_or_empty(&user.role).await;
        Ok(UserProfile::from(&user).with_permissions(permissions))
    }

    pub async fn register_user(&self, request: RegisterUser) -> Result<User> {
        self.check_password(&request.password)?;

        if self.users.find_by_username(request.username.trim()).await?.is_some() {
            return Err(IdentityError::UsernameAlreadyInUse);
        }
        if self.users.find_by_email(request.email.trim()).await?.is_some() {
            return Err(IdentityError::EmailAlreadyInUse);
        }
        let role = request.role.trim().to_string();
        self.ensure_role(&role).await?;

        let password_hash = self.hasher.hash(&request.password).await?;
        let user = self
            .users
            .create(NewUser {
                nama_lengkap: request.nama_lengkap.trim().to_string(),
                username: request.username.trim().to_string(),
                email: request.email.trim().to_string(),
                password_hash,
                role,
                status: request.status.unwrap_or_default(),
                phone_number: request.phone_number.filter(|p| !p.trim().is_empty()),
                profile_pic_url: request.profile_pic_url.filter(|p| !p.trim().is_empty()),
            })
            .await?;

        info!(user_id = user.id, role = %user.role, "User registered");
        Ok(user)
    }

    pub async fn list_users(&self, search: Option<&str>, page: PageRequest) -> Result<Page<User>> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        self.users.list(search, page).await
    }

    pub async fn get_user(&self, id: i64) -> Result<User> {
        self.users.find_by_id(id).await?.ok_or(IdentityError::UserNotFound)
    }

    pub async fn update_user(&self, id: i64, request: UpdateUser) -> Result<User> {
        let existing = self.get_user(id).await?;
        let mut changes = UserChanges {
            nama_lengkap: non_blank(request.nama_lengkap),
            status: request.status,
            phone_number: non_blank(request.phone_number),
            profile_pic_url: non_blank(request.profile_pic_url),
            ..UserChanges::default()
        };

        if let Some(username) = non_blank(request.username) {
            if let Some(holder) = self.users.find_by_username(&username).await? {
                if holder.id != existing.id {
                    return Err(IdentityError::UsernameAlreadyInUse);
                }
            }
            changes.username = Some(username);
        }

        if let Some(email) = non_blank(request.email) {
            if let Some(holder) = self.users.find_by_email(&email).await? {
                if holder.id != existing.id {
                    return Err(IdentityError::EmailAlreadyInUse);
                }
            }
            changes.email = Some(email);
        }

        if let Some(role) = non_blank(request.role) {
            self.ensure_role(&role).await?;
            changes.role = Some(role);
        }

        if let Some(password) = request.password.filter(|p| !p.is_empty()) {
            self.check_password(&password)?;
            changes.password_hash = Some(self.hasher.hash(&password).await?);
        }

        let user = self.users.update(id, changes).await?;
        info!(user_id = user.id, "User updated");
        Ok(user)
    }

    /// Soft-delete `target_id` on behalf of `actor_id`.
    pub async fn delete_user(&self, actor_id: i64, target_id: i64) -> Result<()> {
        if actor_id == target_id {
            return Err(IdentityError::CannotDeleteSelf);
        }
        self.get_user(target_id).await?;
        self.users.soft_delete(target_id).await?;
        info!(user_id = target_id, deleted_by = actor_id, "User deleted");
        Ok(())
    }

    /// Create the first administrator when no live admin account exists.
    pub async fn bootstrap_admin(&self, username: &str, password: &str) -> Result<Option<User>> {
        if self.users.count_by_role(ADMIN_ROLE).await? > 0 {
            return Ok(None);
        }

        let user = self
            .register_user(RegisterUser {
                nama_lengkap: "Administrator".to_string(),
                username: username.to_string(),
                email: format!("{}@dentacare.local", username.trim().to_lowercase()),
                password: password.to_string(),
                role: ADMIN_ROLE.to_string(),
                status: Some(UserStatus::Aktif),
                phone_number: None,
                profile_pic_url: None,
            })
            .await?;
        info!(user_id = user.id, username = %user.username, "Bootstrap administrator created");
        Ok(Some(user))
    }

    /// Role codes referenced by users that resolve to no role.
    pub async fn dangling_roles(&self) -> Result<Vec<String>> {
        let mut dangling = Vec::new();
        for role in self.users.distinct_roles().await? {
            if !self.roles.role_exists(&role).await? {
                dangling.push(role);
            }
        }
        Ok(dangling)
    }

    async fn permissions_or_empty(&self, role: &str) -> Vec<String> {
        match self.roles.permission_codes(role).await {
            Ok(codes) => codes,
            Err(e) => {
                warn!(role = %role, error = %e, "Could not resolve permissions for role");
                Vec::new()
            }
        }
    }

    async fn ensure_role(&self, role: &str) -> Result<()> {
        if self.roles.role_exists(role).await? {
            Ok(())
        } else {
            Err(IdentityError::UnknownRole(role.to_string()))
        }
    }

    fn check_password(&self, password: &str) -> Result<()> {
        if password.chars().count() < self.config.password_min_length {
            return Err(IdentityError::WeakPassword(self.config.password_min_length));
        }
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
