use serde::{Deserialize, Serialize};

/// bcrypt work factor of the hashes already stored by the clinic.
pub const DEFAULT_BCRYPT_COST: u32 = 14;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub bcrypt_cost: u32,
    pub password_min_length: usize,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dentacare-development-secret-change-me".to_string(),
            jwt_expiry_hours: 72,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            password_min_length: 6,
        }
    }
}
