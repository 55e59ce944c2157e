use crate::error::{api_success, ApiError, ApiResult};
use crate::middleware::{ApiJson, AuthContext};
use crate::server::ClinicServer;
use crate::validation::RequestValidation;
use crate::{validate_field, validate_required};
use auth_identity::{LoginRequest, LoginResponse, UserProfile};
use axum::{extract::State, Json};

impl RequestValidation for LoginRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.username, "username", "is required");
        // Passwords are compared verbatim, whitespace included.
        validate_field!("password", !self.password.is_empty(), "is required");
        validate_required!(self.role, "role", "is required");
        Ok(())
    }
}

/// Exchange username, password and role for an access token.
pub async fn login(
    State(server): State<ClinicServer>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    request.validate()?;
    let response = server.identity.authenticate(&request).await?;
    Ok(Json(api_success("Login successful", response)))
}

/// Profile and permission codes of the caller.
pub async fn me(State(server): State<ClinicServer>, auth: AuthContext) -> ApiResult<UserProfile> {
    let profile = server.identity.current_user(auth.user_id).await?;
    Ok(Json(api_success("Current user", profile)))
}
