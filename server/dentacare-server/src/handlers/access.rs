//! Roles and the permission catalog

use crate::error::{api_message, api_success, ApiError, ApiResponse, ApiResult};
use crate::middleware::{ApiJson, ApiPath, AuthContext};
use crate::policies;
use crate::server::ClinicServer;
use crate::validation::RequestValidation;
use crate::validate_required;
use auth_rbac::{CreateRole, Permission, Role, UpdateRole};
use axum::{extract::State, http::StatusCode, Json};

impl RequestValidation for CreateRole {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.nama, "nama", "is required");
        validate_required!(self.kode, "kode", "is required");
        Ok(())
    }
}

impl RequestValidation for UpdateRole {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(nama) = &self.nama {
            validate_required!(nama, "nama", "must not be blank");
        }
        if let Some(kode) = &self.kode {
            validate_required!(kode, "kode", "must not be blank");
        }
        Ok(())
    }
}

pub async fn create_role(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiJson(request): ApiJson<CreateRole>,
) -> Result<(StatusCode, Json<ApiResponse<Role>>), ApiError> {
    auth.require(&server, &policies::MANAGE_ROLES).await?;
    request.validate()?;

    let role = server.rbac.create_role(request).await?;
    Ok((StatusCode::CREATED, Json(api_success("Role created", role))))
}

pub async fn list_roles(State(server): State<ClinicServer>, auth: AuthContext) -> ApiResult<Vec<Role>> {
    auth.require(&server, &policies::VIEW_ROLES).await?;

    let roles = server.rbac.list_roles().await?;
    Ok(Json(api_success("Roles retrieved", roles)))
}

pub async fn get_role(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiPath(role_id): ApiPath<i64>,
) -> ApiResult<Role> {
    auth.require(&server, &policies::VIEW_ROLES).await?;

    let role = server.rbac.get_role(role_id).await?;
    Ok(Json(api_success("Role retrieved", role)))
}

/// Omitting `permissionKodes` keeps the role's permissions; an empty array clears them.
pub async fn update_role(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiPath(role_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateRole>,
) -> ApiResult<Role> {
    auth.require(&server, &policies::MANAGE_ROLES).await?;
    request.validate()?;

    let role = server.rbac.update_role(role_id, request).await?;
    Ok(Json(api_success("Role updated", role)))
}

pub async fn delete_role(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiPath(role_id): ApiPath<i64>,
) -> ApiResult<()> {
    auth.require(&server, &policies::MANAGE_ROLES).await?;

    server.rbac.delete_role(role_id).await?;
    Ok(Json(api_message("Role deleted")))
}

pub async fn list_permissions(State(server): State<ClinicServer>, auth: AuthContext) -> ApiResult<Vec<Permission>> {
    auth.require(&server, &policies::VIEW_ROLES).await?;

    let permissions = server.rbac.list_permissions().await?;
    Ok(Json(api_success("Permissions retrieved", permissions)))
}
