//! Patient registry endpoints. Path keys are a numeric id or a `noRm`.

use crate::error::{api_message, api_paginated, api_success, ApiError, ApiResponse, ApiResult};
use crate::middleware::{ApiJson, ApiPath, ApiQuery, AuthContext};
use crate::policies;
use crate::server::ClinicServer;
use crate::types::PaginationParams;
use crate::validation::RequestValidation;
use crate::{validate_email, validate_length};
use axum::{extract::State, http::StatusCode, Json};
use patient_service::{CreatePatient, Patient, UpdatePatient};

const NAME_RULE: &str = "must be 3 to 255 characters";
const PHONE_RULE: &str = "must be 9 to 15 characters";

impl RequestValidation for CreatePatient {
    fn validate(&self) -> Result<(), ApiError> {
        validate_length!(self.nama_lengkap, "namaLengkap", 3, 255, NAME_RULE);
        validate_length!(self.nomor_telepon, "nomorTelepon", 9, 15, PHONE_RULE);
        if let Some(email) = self.email.as_deref().filter(|e| !e.trim().is_empty()) {
            validate_email!(email, "email", "must be a valid email address");
        }
        Ok(())
    }
}

impl RequestValidation for UpdatePatient {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(nama) = &self.nama_lengkap {
            validate_length!(nama, "namaLengkap", 3, 255, NAME_RULE);
        }
        if let Some(telepon) = &self.nomor_telepon {
            validate_length!(telepon, "nomorTelepon", 9, 15, PHONE_RULE);
        }
        if let Some(email) = self.email.as_deref().filter(|e| !e.trim().is_empty()) {
            validate_email!(email, "email", "must be a valid email address");
        }
        Ok(())
    }
}

pub async fn create_patient(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiJson(request): ApiJson<CreatePatient>,
) -> Result<(StatusCode, Json<ApiResponse<Patient>>), ApiError> {
    auth.require(&server, &policies::CREATE_PATIENT).await?;
    request.validate()?;

    let patient = server.patients.create(request).await?;
    Ok((StatusCode::CREATED, Json(api_success("Patient registered", patient))))
}

pub async fn list_patients(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiQuery(params): ApiQuery<PaginationParams>,
) -> ApiResult<Vec<Patient>> {
    auth.require(&server, &policies::VIEW_PATIENT).await?;

    let page = server.patients.list(params.search(), params.page_request()).await?;
    Ok(Json(api_paginated("Patients retrieved", page)))
}

pub async fn get_patient(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiPath(key): ApiPath<String>,
) -> ApiResult<Patient> {
    auth.require(&server, &policies::VIEW_PATIENT).await?;

    let patient = server.patients.find(&key).await?;
    Ok(Json(api_success("Patient retrieved", patient)))
}

pub async fn update_patient(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiPath(key): ApiPath<String>,
    ApiJson(request): ApiJson<UpdatePatient>,
) -> ApiResult<Patient> {
    auth.require(&server, &policies::UPDATE_PATIENT).await?;
    request.validate()?;

    let patient = server.patients.update(&key, request).await?;
    Ok(Json(api_success("Patient updated", patient)))
}

pub async fn delete_patient(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiPath(key): ApiPath<String>,
) -> ApiResult<()> {
    auth.require(&server, &policies::DELETE_PATIENT).await?;

    server.patients.delete(&key).await?;
    Ok(Json(api_message("Patient deleted")))
}
