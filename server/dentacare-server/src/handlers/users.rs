//! Admin-side user management

use crate::error::{api_message, api_paginated, api_success, ApiError, ApiResponse, ApiResult};
use crate::middleware::{ApiJson, ApiPath, ApiQuery, AuthContext};
use crate::policies;
use crate::server::ClinicServer;
use crate::types::PaginationParams;
use crate::validation::RequestValidation;
use crate::{validate_email, validate_length, validate_required};
use auth_identity::{RegisterUser, UpdateUser, UserProfile};
use axum::{extract::State, http::StatusCode, Json};

impl RequestValidation for RegisterUser {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.nama_lengkap, "namaLengkap", "is required");
        validate_length!(self.username, "username", 3, 50, "must be 3 to 50 characters");
        validate_email!(self.email, "email", "must be a valid email address");
        validate_required!(self.role, "role", "is required");
        Ok(())
    }
}

impl RequestValidation for UpdateUser {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(nama) = &self.nama_lengkap {
            validate_required!(nama, "namaLengkap", "must not be blank");
        }
        if let Some(username) = &self.username {
            validate_length!(username, "username", 3, 50, "must be 3 to 50 characters");
        }
        if let Some(email) = &self.email {
            validate_email!(email, "email", "must be a valid email address");
        }
        if let Some(role) = &self.role {
            validate_required!(role, "role", "must not be blank");
        }
        Ok(())
    }
}

pub async fn register_user(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiJson(request): ApiJson<RegisterUser>,
) -> Result<(StatusCode, Json<ApiResponse<UserProfile>>), ApiError> {
    auth.require(&server, &policies::MANAGE_USERS).await?;
    request.validate()?;

    let user = server.identity.register_user(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(api_success("User registered", UserProfile::from(user))),
    ))
}

pub async fn list_users(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiQuery(params): ApiQuery<PaginationParams>,
) -> ApiResult<Vec<UserProfile>> {
    auth.require(&server, &policies::VIEW_USERS).await?;

    let page = server
        .identity
        .list_users(params.search(), params.page_request())
        .await?;
    Ok(Json(api_paginated("Users retrieved", page.map(UserProfile::from))))
}

pub async fn get_user(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiPath(user_id): ApiPath<i64>,
) -> ApiResult<UserProfile> {
    auth.require(&server, &policies::VIEW_USERS).await?;

    let user = server.identity.get_user(user_id).await?;
    Ok(Json(api_success("User retrieved", UserProfile::from(user))))
}

pub async fn update_user(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiPath(user_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateUser>,
) -> ApiResult<UserProfile> {
    auth.require(&server, &policies::MANAGE_USERS).await?;
    request.validate()?;

    let user = server.identity.update_user(user_id, request).await?;
    Ok(Json(api_success("User updated", UserProfile::from(user))))
}

pub async fn delete_user(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiPath(user_id): ApiPath<i64>,
) -> ApiResult<()> {
    auth.require(&server, &policies::MANAGE_USERS).await?;

    server.identity.delete_user(auth.user_id, user_id).await?;
    Ok(Json(api_message("User deleted")))
}
