//! Appointment reservations
//!
//! Callers holding `reservation:view_all` see every booking; callers with
//! only `reservation:view_doctor_specific` see their own.

use crate::error::{api_paginated, api_success, ApiError, ApiResponse, ApiResult};
use crate::middleware::{ApiJson, ApiPath, ApiQuery, AuthContext};
use crate::policies;
use crate::server::ClinicServer;
use auth_rbac::catalog::codes;
use axum::{extract::State, http::StatusCode, Json};
use database_layer::PageRequest;
use patient_service::{
    models::parse_date, CreateReservation, Reservation, ReservationFilter, ReservationScope, ReservationStatus,
    UpdateReservation,
};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    pub status: Option<String>,
    pub doctor_id: Option<i64>,
    pub patient_id: Option<i64>,
}

impl ReservationQuery {
    fn filter(&self) -> Result<ReservationFilter, ApiError> {
        let tanggal = match self.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(raw) => Some(parse_date(raw).ok_or_else(|| ApiError::field("date", "must be YYYY-MM-DD"))?),
            None => None,
        };
        let status = match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(raw.parse::<ReservationStatus>().map_err(|e| ApiError::field("status", e))?),
            None => None,
        };
        Ok(ReservationFilter {
            tanggal,
            status,
            doctor_id: self.doctor_id,
            patient_id: self.patient_id,
        })
    }

    fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

async fn scope_of(server: &ClinicServer, auth: &AuthContext) -> Result<ReservationScope, ApiError> {
    let granted = auth.permissions(server).await?;
    if granted.iter().any(|code| code == codes::RESERVATION_VIEW_ALL) {
        Ok(ReservationScope::All)
    } else {
        Ok(ReservationScope::Doctor(auth.user_id))
    }
}

pub async fn create_reservation(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiJson(request): ApiJson<CreateReservation>,
) -> Result<(StatusCode, Json<ApiResponse<Reservation>>), ApiError> {
    auth.require(&server, &policies::CREATE_RESERVATION).await?;

    let reservation = server.reservations.create(request).await?;
    Ok((StatusCode::CREATED, Json(api_success("Reservation created", reservation))))
}

pub async fn list_reservations(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<ReservationQuery>,
) -> ApiResult<Vec<Reservation>> {
    auth.require(&server, &policies::VIEW_RESERVATION).await?;
    let scope = scope_of(&server, &auth).await?;

    let page = server
        .reservations
        .list(query.filter()?, scope, query.page_request())
        .await?;
    Ok(Json(api_paginated("Reservations retrieved", page)))
}

pub async fn get_reservation(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiPath(reservation_id): ApiPath<i64>,
) -> ApiResult<Reservation> {
    auth.require(&server, &policies::VIEW_RESERVATION).await?;
    let scope = scope_of(&server, &auth).await?;

    let reservation = server.reservations.get(reservation_id, scope).await?;
    Ok(Json(api_success("Reservation retrieved", reservation)))
}

pub async fn update_reservation(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiPath(reservation_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateReservation>,
) -> ApiResult<Reservation> {
    auth.require(&server, &policies::UPDATE_RESERVATION).await?;

    let reservation = server.reservations.update(reservation_id, request).await?;
    Ok(Json(api_success("Reservation updated", reservation)))
}

pub async fn confirm_reservation(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiPath(reservation_id): ApiPath<i64>,
) -> ApiResult<Reservation> {
    auth.require(&server, &policies::CONFIRM_RESERVATION).await?;

    let reservation = server.reservations.confirm(reservation_id).await?;
    Ok(Json(api_success("Patient arrival confirmed", reservation)))
}

pub async fn cancel_reservation(
    State(server): State<ClinicServer>,
    auth: AuthContext,
    ApiPath(reservation_id): ApiPath<i64>,
) -> ApiResult<Reservation> {
    auth.require(&server, &policies::CANCEL_RESERVATION).await?;

    let reservation = server.reservations.cancel(reservation_id).await?;
    Ok(Json(api_success("Reservation cancelled", reservation)))
}
