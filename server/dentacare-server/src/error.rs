use auth_identity::IdentityError;
use auth_rbac::RbacError;
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use database_layer::{DatabaseError, Page};
use emr_service::EmrError;
use patient_service::PatientError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

/// Field name to the messages raised against it.
pub type FieldErrors = HashMap<String, Vec<String>>;

/// Envelope shared by every response, successful or not.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub current_page: u32,
    pub total_pages: i64,
    pub total_records: i64,
    pub page_size: u32,
}

impl<T> From<&Page<T>> for PaginationInfo {
    fn from(page: &Page<T>) -> Self {
        Self {
            current_page: page.request.page,
            total_pages: page.total_pages(),
            total_records: page.total,
            page_size: page.request.limit,
        }
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Main API error enum
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        field_errors: Option<FieldErrors>,
    },

    #[error("{message}")]
    Authentication { message: String },

    #[error("{message}")]
    Authorization { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("{message}")]
    BadRequest { message: String },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ApiError {
    /// Create a validation error with field-specific errors
    pub fn validation_with_fields(message: impl Into<String>, field_errors: FieldErrors) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: Some(field_errors),
        }
    }

    /// Create a validation error against one field
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        let message = message.into();
        let mut field_errors = HashMap::new();
        field_errors.insert(field.clone(), vec![message.clone()]);
        Self::validation_with_fields(format!("{}: {}", field, message), field_errors)
    }

    /// Create a simple validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Authentication { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Authorization { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Database(_) | ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "validation_error",
            ApiError::Authentication { .. } => "authentication_error",
            ApiError::Authorization { .. } => "authorization_error",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Conflict { .. } => "conflict",
            ApiError::BadRequest { .. } => "bad_request",
            ApiError::Database(_) => "database_error",
            ApiError::Internal { .. } => "internal_error",
        }
    }

    /// Message safe to show to the caller. Server-side failures stay generic.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Database(_) | ApiError::Internal { .. } => {
                "An internal error occurred. Please try again later.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();

        if status_code.is_server_error() {
            error!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %self,
                "API error occurred"
            );
        } else {
            warn!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %self,
                "API request rejected"
            );
        }

        let message = self.public_message();
        let errors = match self {
            ApiError::Validation { field_errors, .. } => field_errors,
            _ => None,
        };

        let body = ApiResponse::<()> {
            success: false,
            message,
            data: None,
            errors,
            pagination: None,
        };

        (status_code, Json(body)).into_response()
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::UserNotFound => ApiError::not_found(err.to_string()),
            IdentityError::InvalidCredentials | IdentityError::InvalidToken | IdentityError::TokenExpired => {
                ApiError::authentication(err.to_string())
            }
            IdentityError::AccountInactive => ApiError::authorization(err.to_string()),
            IdentityError::UserAlreadyExists
            | IdentityError::EmailAlreadyInUse
            | IdentityError::UsernameAlreadyInUse => ApiError::conflict(err.to_string()),
            IdentityError::UnknownRole(_) => ApiError::field("role", err.to_string()),
            IdentityError::WeakPassword(_) => ApiError::field("password", err.to_string()),
            IdentityError::CannotDeleteSelf => ApiError::bad_request(err.to_string()),
            IdentityError::Database(db) => ApiError::Database(db),
            IdentityError::HashingError(_)
            | IdentityError::JwtError(_)
            | IdentityError::RoleLookup(_)
            | IdentityError::InternalError(_) => ApiError::internal(err.to_string()),
        }
    }
}

impl From<RbacError> for ApiError {
    fn from(err: RbacError) -> Self {
        match err {
            RbacError::RoleNotFound => ApiError::not_found(err.to_string()),
            RbacError::RoleCodeTaken(_) | RbacError::RoleInUse { .. } => ApiError::conflict(err.to_string()),
            RbacError::UnknownPermissionCodes(ref codes) => {
                let messages = codes.iter().map(|code| format!("unknown permission code '{}'", code)).collect();
                let mut field_errors = HashMap::new();
                field_errors.insert("permissionKodes".to_string(), messages);
                ApiError::validation_with_fields(err.to_string(), field_errors)
            }
            RbacError::Identity(inner) => inner.into(),
            RbacError::Database(db) => ApiError::Database(db),
            RbacError::InternalError(_) => ApiError::internal(err.to_string()),
        }
    }
}

impl From<PatientError> for ApiError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::PatientNotFound | PatientError::ReservationNotFound => ApiError::not_found(err.to_string()),
            PatientError::EmailAlreadyInUse
            | PatientError::RecordNumberTaken(_)
            | PatientError::IllegalTransition { .. } => ApiError::conflict(err.to_string()),
            PatientError::Validation { field, message } => ApiError::field(field, message),
            PatientError::Identity(inner) => inner.into(),
            PatientError::Database(db) => ApiError::Database(db),
            PatientError::InternalError(_) => ApiError::internal(err.to_string()),
        }
    }
}

impl From<EmrError> for ApiError {
    fn from(err: EmrError) -> Self {
        match err {
            EmrError::RecordNotFound
            | EmrError::PatientNotFound
            | EmrError::TreatmentNotFound
            | EmrError::MedicationNotFound => ApiError::not_found(err.to_string()),
            EmrError::CatalogCodeTaken(_) | EmrError::VisitIdTaken(_) => ApiError::conflict(err.to_string()),
            EmrError::Validation { field, message } => ApiError::field(field, message),
            EmrError::Patient(inner) => inner.into(),
            EmrError::Identity(inner) => inner.into(),
            EmrError::Database(db) => ApiError::Database(db),
            EmrError::InternalError(_) => ApiError::internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(format!("Invalid query parameters: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(format!("Invalid path parameter: {}", rejection.body_text()))
    }
}

/// Helper function to create successful API responses
pub fn api_success<T>(message: impl Into<String>, data: T) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        message: message.into(),
        data: Some(data),
        errors: None,
        pagination: None,
    }
}

/// Success without a payload, e.g. after a delete.
pub fn api_message(message: impl Into<String>) -> ApiResponse<()> {
    ApiResponse {
        success: true,
        message: message.into(),
        data: None,
        errors: None,
        pagination: None,
    }
}

/// Helper function to create paginated responses
pub fn api_paginated<T>(message: impl Into<String>, page: Page<T>) -> ApiResponse<Vec<T>> {
    let pagination = PaginationInfo::from(&page);
    ApiResponse {
        success: true,
        message: message.into(),
        data: Some(page.items),
        errors: None,
        pagination: Some(pagination),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database_layer::PageRequest;
    use patient_service::ReservationStatus;

    #[test]
    fn test_status_codes_follow_error_taxonomy() {
        assert_eq!(ApiError::from(IdentityError::InvalidCredentials).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(IdentityError::AccountInactive).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::from(IdentityError::EmailAlreadyInUse).status_code(), StatusCode::CONFLICT);
        assert_eq!(ApiError::from(RbacError::RoleNotFound).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(RbacError::RoleInUse {
                code: "dokter".into(),
                users: 2
            })
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(PatientError::IllegalTransition {
                from: ReservationStatus::Dibatalkan,
                to: ReservationStatus::Dikonfirmasi,
            })
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(EmrError::CatalogCodeTaken("T01".into())).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_validation_errors_carry_field_detail() {
        let err = ApiError::from(EmrError::validation("treatments[0].subTotal", "does not match 270000.00"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        match err {
            ApiError::Validation { field_errors, .. } => {
                let field_errors = field_errors.unwrap();
                assert_eq!(field_errors["treatments[0].subTotal"], vec!["does not match 270000.00"]);
            }
            other => panic!("unexpected error {:?}", other),
        }

        let err = ApiError::from(RbacError::UnknownPermissionCodes(vec!["emr:fly".into()]));
        match err {
            ApiError::Validation { field_errors, .. } => {
                assert_eq!(field_errors.unwrap()["permissionKodes"].len(), 1);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_nested_errors_keep_their_meaning() {
        let err = ApiError::from(EmrError::Patient(PatientError::PatientNotFound));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = ApiError::from(RbacError::Identity(IdentityError::UserNotFound));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_internal_detail_is_not_exposed() {
        let err = ApiError::from(IdentityError::HashingError("bcrypt exploded".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.public_message().contains("bcrypt"));
    }

    #[test]
    fn test_paginated_envelope() {
        let page = Page::new(vec![1, 2, 3], 23, PageRequest::new(Some(2), Some(10)));
        let response = api_paginated("ok", page);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"].as_array().unwrap().len(), 3);
        assert_eq!(json["pagination"]["currentPage"], 2);
        assert_eq!(json["pagination"]["totalPages"], 3);
        assert_eq!(json["pagination"]["totalRecords"], 23);
        assert_eq!(json["pagination"]["pageSize"], 10);
        assert!(json.get("errors").is_none());
    }
}
