use database_layer::DatabaseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("User not found")]
    UserNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account inactive")]
    AccountInactive,

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("Email already in use")]
    EmailAlreadyInUse,

    #[error("Username already in use")]
    UsernameAlreadyInUse,

    #[error("Role '{0}' does not exist")]
    UnknownRole(String),

    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),

    #[error("Users cannot delete their own account")]
    CannotDeleteSelf,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Hashing error: {0}")]
    HashingError(String),

    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Role lookup failed: {0}")]
    RoleLookup(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<sqlx::Error> for IdentityError {
    fn from(err: sqlx::Error) -> Self {
        IdentityError::Database(DatabaseError::SqlxError(err))
    }
}

pub type Result<T> = std::result::Result<T, IdentityError>;
