use auth_identity::IdentityError;
use database_layer::DatabaseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RbacError {
    #[error("Role not found")]
    RoleNotFound,

    #[error("Role with code '{0}' already exists")]
    RoleCodeTaken(String),

    #[error("Role '{code}' is still assigned to {users} user(s)")]
    RoleInUse { code: String, users: i64 },

    #[error("Unknown permission codes: {}", .0.join(", "))]
    UnknownPermissionCodes(Vec<String>),

    #[error("Identity lookup failed: {0}")]
    Identity(#[from] IdentityError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<sqlx::Error> for RbacError {
    fn from(err: sqlx::Error) -> Self {
        RbacError::Database(DatabaseError::SqlxError(err))
    }
}

pub type Result<T> = std::result::Result<T, RbacError>;
