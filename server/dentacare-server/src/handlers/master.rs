//! Treatment and medication catalogs.

use crate::error::{api_message, api_success, ApiError, ApiResponse, ApiResult};
use crate::middleware::{ApiJson, ApiPath, ApiQuery, AuthContext};
use crate::policies;
use crate::server::ClinicServer;
use axum::{extract::State, http::StatusCode, Json};
use emr_service::{
    CreateMedicationCatalog, CreateTreatmentCatalog, MedicationCatalog, TreatmentCatalog, UpdateMedicationCatalog,
    UpdateTreatmentCatalog,
};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    pub search: Option<String>,
}

impl CatalogQuery {
    fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

pub async fn list_treatments(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<CatalogQuery>,
) -> ApiResult<Vec<TreatmentCatalog>> {
    auth.require(&server, &policies::VIEW_TREATMENTS).await?;

    let treatments = server.catalogs.list_treatments(query.search()).await?;
    Ok(Json(api_success("Treatments retrieved", treatments)))
}

pub async fn get_treatment(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiPath(treatment_id): ApiPath<i64>,
) -> ApiResult<TreatmentCatalog> {
    auth.require(&server, &policies::VIEW_TREATMENTS).await?;

    let treatment = server.catalogs.get_treatment(treatment_id).await?;
    Ok(Json(api_success("Treatment retrieved", treatment)))
}

pub async fn create_treatment(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiJson(request): ApiJson<CreateTreatmentCatalog>,
) -> Result<(StatusCode, Json<ApiResponse<TreatmentCatalog>>), ApiError> {
    auth.require(&server, &policies::MANAGE_TREATMENTS).await?;

    let treatment = server.catalogs.create_treatment(request).await?;
    Ok((StatusCode::CREATED, Json(api_success("Treatment created", treatment))))
}

pub async fn update_treatment(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiPath(treatment_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateTreatmentCatalog>,
) -> ApiResult<TreatmentCatalog> {
    auth.require(&server, &policies::MANAGE_TREATMENTS).await?;

    let treatment = server.catalogs.update_treatment(treatment_id, request).await?;
    Ok(Json(api_success("Treatment updated", treatment)))
}

pub async fn delete_treatment(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiPath(treatment_id): ApiPath<i64>,
) -> ApiResult<()> {
    auth.require(&server, &policies::MANAGE_TREATMENTS).await?;

    server.catalogs.delete_treatment(treatment_id).await?;
    Ok(Json(api_message("Treatment deleted")))
}

pub async fn list_medications(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<CatalogQuery>,
) -> ApiResult<Vec<MedicationCatalog>> {
    auth.require(&server, &policies::VIEW_MEDICATIONS).await?;

    let medications = server.catalogs.list_medications(query.search()).await?;
    Ok(Json(api_success("Medications retrieved", medications)))
}

pub async fn get_medication(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiPath(medication_id): ApiPath<i64>,
) -> ApiResult<MedicationCatalog> {
    auth.require(&server, &policies::VIEW_MEDICATIONS).await?;

    let medication = server.catalogs.get_medication(medication_id).await?;
    Ok(Json(api_success("Medication retrieved", medication)))
}

pub async fn create_medication(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiJson(request): ApiJson<CreateMedicationCatalog>,
) -> Result<(StatusCode, Json<ApiResponse<MedicationCatalog>>), ApiError> {
    auth.require(&server, &policies::MANAGE_MEDICATIONS).await?;

    let medication = server.catalogs.create_medication(request).await?;
    Ok((StatusCode::CREATED, Json(api_success("Medication created", medication))))
}

pub async fn update_medication(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiPath(medication_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateMedicationCatalog>,
) -> ApiResult<MedicationCatalog> {
    auth.require(&server, &policies::MANAGE_MEDICATIONS).await?;

    let medication = server.catalogs.update_medication(medication_id, request).await?;
    Ok(Json(api_success("Medication updated", medication)))
}

pub async fn delete_medication(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiPath(medication_id): ApiPath<i64>,
) -> ApiResult<()> {
    auth.require(&server, &policies::MANAGE_MEDICATIONS).await?;

    server.catalogs.delete_medication(medication_id).await?;
    Ok(Json(api_message("Medication deleted")))
}
