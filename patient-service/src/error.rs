use crate::models::ReservationStatus;
use auth_identity::IdentityError;
use database_layer::DatabaseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatientError {
    #[error("Patient not found")]
    PatientNotFound,

    #[error("Reservation not found")]
    ReservationNotFound,

    #[error("Email already in use by another patient")]
    EmailAlreadyInUse,

    #[error("Medical record number '{0}' already exists")]
    RecordNumberTaken(String),

    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Reservation cannot move from {from} to {to}")]
    IllegalTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },

    #[error("Doctor lookup failed: {0}")]
    Identity(#[from] IdentityError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl PatientError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        PatientError::Validation {
            field,
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for PatientError {
    fn from(err: sqlx::Error) -> Self {
        PatientError::Database(DatabaseError::SqlxError(err))
    }
}

pub type Result<T> = std::result::Result<T, PatientError>;
