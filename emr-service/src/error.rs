use auth_identity::IdentityError;
use database_layer::DatabaseError;
use patient_service::PatientError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmrError {
    #[error("Medical record not found")]
    RecordNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Treatment catalog entry not found")]
    TreatmentNotFound,

    #[error("Medication catalog entry not found")]
    MedicationNotFound,

    #[error("Catalog code '{0}' already exists")]
    CatalogCodeTaken(String),

    #[error("Visit id '{0}' already exists")]
    VisitIdTaken(String),

    /// `field` is the JSON path of the offending value, e.g. `treatments[1].subTotal`.
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("Patient lookup failed: {0}")]
    Patient(#[from] PatientError),

    #[error("Doctor lookup failed: {0}")]
    Identity(#[from] IdentityError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl EmrError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EmrError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for EmrError {
    fn from(err: sqlx::Error) -> Self {
        EmrError::Database(DatabaseError::SqlxError(err))
    }
}

pub type Result<T> = std::result::Result<T, EmrError>;
