use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Aktif,
    Nonaktif,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Aktif => "aktif",
            UserStatus::Nonaktif => "nonaktif",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aktif" => Ok(UserStatus::Aktif),
            "nonaktif" => Ok(UserStatus::Nonaktif),
            other => Err(format!("unknown user status '{}'", other)),
        }
    }
}

database_layer::impl_text_enum!(UserStatus);

/// A clinic staff account.
///
/// `role` holds a role code rather than a foreign key; see
/// [`crate::IdentityService::dangling_roles`].
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub nama_lengkap: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: String,
    pub status: UserStatus,
    pub last_login: Option<DateTime<Utc>>,
    pub phone_number: Option<String>,
    pub profile_pic_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Aktif
    }
}

/// Public view of a user, optionally carrying the role's permission codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub nama_lengkap: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub status: UserStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_pic_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl UserProfile {
    pub fn with_permissions(mut self, permissions: Vec<String>) -> Self {
        self.permissions = Some(permissions);
        self
    }
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            nama_lengkap: user.nama_lengkap.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            status: user.status,
            phone_number: user.phone_number.clone(),
            profile_pic_url: user.profile_pic_url.clone(),
            last_login: user.last_login,
            created_at: user.created_at,
            updated_at: user.updated_at,
            permissions: None,
        }
    }
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        UserProfile::from(&user)
    }
}

/// Row to insert; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub nama_lengkap: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub status: UserStatus,
    pub phone_number: Option<String>,
    pub profile_pic_url: Option<String>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub nama_lengkap: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<String>,
    pub status: Option<UserStatus>,
    pub phone_number: Option<String>,
    pub profile_pic_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    #[serde(flatten)]
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUser {
    pub nama_lengkap: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    #[serde(default)]
    pub status: Option<UserStatus>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub profile_pic_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    #[serde(default)]
    pub nama_lengkap: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub status: Option<UserStatus>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub profile_pic_url: Option<String>,
}

/// Claims carried by every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_format() {
        assert_eq!(serde_json::to_string(&UserStatus::Nonaktif).unwrap(), "\"nonaktif\"");
        assert_eq!("aktif".parse::<UserStatus>(), Ok(UserStatus::Aktif));
        assert!("Aktif".parse::<UserStatus>().is_err());
    }

    #[test]
    fn test_user_serialization_hides_password_hash() {
        let now = Utc::now();
        let user = User {
            id: 7,
            nama_lengkap: "drg. Sari".to_string(),
            username: "sari".to_string(),
            email: "sari@klinik.test".to_string(),
            password_hash: "$2b$04$secret".to_string(),
            role: "dokter".to_string(),
            status: UserStatus::Aktif,
            last_login: None,
            phone_number: None,
            profile_pic_url: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["namaLengkap"], "drg. Sari");

        let profile = serde_json::to_value(UserProfile::from(&user).with_permissions(vec!["emr:view".into()])).unwrap();
        assert_eq!(profile["permissions"][0], "emr:view");
        assert!(profile.get("phoneNumber").is_none());
    }
}
