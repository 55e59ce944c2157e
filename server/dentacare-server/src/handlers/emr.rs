//! Electronic medical record endpoints. Lines are priced by the EMR service;
//! handlers only gate access.

use crate::error::{api_success, ApiError, ApiResponse, ApiResult};
use crate::middleware::{ApiJson, ApiPath, AuthContext};
use crate::policies;
use crate::server::ClinicServer;
use axum::{extract::State, http::StatusCode, Json};
use emr_service::{CreateEmr, MedicalRecord, UpdateEmr};

pub async fn create_emr(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiJson(request): ApiJson<CreateEmr>,
) -> Result<(StatusCode, Json<ApiResponse<MedicalRecord>>), ApiError> {
    auth.require(&server, &policies::CREATE_EMR).await?;

    let record = server.emr.create(request).await?;
    Ok((StatusCode::CREATED, Json(api_success("Medical record created", record))))
}

/// Every visit of one patient; a patient without visits yields an empty list.
pub async fn list_patient_emr(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiPath(patient_id): ApiPath<i64>,
) -> ApiResult<Vec<MedicalRecord>> {
    auth.require(&server, &policies::VIEW_EMR).await?;

    let records = server.emr.list_by_patient(patient_id).await?;
    Ok(Json(api_success("Medical records retrieved", records)))
}

pub async fn get_emr(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiPath(key): ApiPath<String>,
) -> ApiResult<MedicalRecord> {
    auth.require(&server, &policies::VIEW_EMR).await?;

    let record = server.emr.find(&key).await?;
    Ok(Json(api_success("Medical record retrieved", record)))
}

pub async fn update_emr(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiPath(key): ApiPath<String>,
    ApiJson(request): ApiJson<UpdateEmr>,
) -> ApiResult<MedicalRecord> {
    auth.require(&server, &policies::UPDATE_EMR).await?;

    let record = server.emr.update(&key, request).await?;
    Ok(Json(api_success("Medical record updated", record)))
}
