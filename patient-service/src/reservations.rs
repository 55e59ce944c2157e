use crate::{
    error::*,
    models::*,
    repository::{PatientRepository, ReservationRepository},
};
use auth_identity::{User, UserRepository};
use database_layer::{Page, PageRequest};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Appointment bookings against registered patients and staff doctors.
pub struct ReservationRegistry {
    reservations: Arc<dyn ReservationRepository>,
    patients: Arc<dyn PatientRepository>,
    users: Arc<dyn UserRepository>,
}

impl ReservationRegistry {
    pub fn new(
        reservations: Arc<dyn ReservationRepository>,
        patients: Arc<dyn PatientRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            reservations,
            patients,
            users,
        }
    }

    pub async fn create(&self, request: CreateReservation) -> Result<Reservation> {
        let tanggal = require_date(&request.tanggal)?;
        let waktu = require_time(&request.waktu)?;
        if self.patients.find_by_id(request.patient_id).await?.is_none() {
            return Err(PatientError::PatientNotFound);
        }
        let doctor = self.doctor(request.doctor_id).await?;

        let reservation = self
            .reservations
            .create(NewReservation {
                patient_id: request.patient_id,
                doctor_id: doctor.id,
                doctor_name: snapshot_name(request.doctor_name, &doctor),
                tanggal,
                waktu,
                keluhan: request.keluhan.unwrap_or_default().trim().to_string(),
                catatan: request.catatan.unwrap_or_default().trim().to_string(),
                status: ReservationStatus::Dijadwalkan,
                jenis_kunjungan: request.jenis_kunjungan.unwrap_or_default().trim().to_string(),
            })
            .await?;
        info!(
            reservation_id = reservation.id,
            patient_id = reservation.patient_id,
            doctor_id = reservation.doctor_id,
            "Reservation created"
        );
        self.attach_patient(reservation).await
    }

    /// List reservations matching `filter`, narrowed to the caller's scope.
    pub async fn list(
        &self,
        mut filter: ReservationFilter,
        scope: ReservationScope,
        page: PageRequest,
    ) -> Result<Page<Reservation>> {
        if let ReservationScope::Doctor(doctor_id) = scope {
            filter.doctor_id = Some(doctor_id);
        }
        let page = self.reservations.list(&filter, page).await?;

        let mut ids: Vec<i64> = page.items.iter().map(|r| r.patient_id).collect();
        ids.sort_unstable();
        ids.dedup();
        let summaries: HashMap<i64, PatientSummary> = self
            .patients
            .summaries(&ids)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        Ok(page.map(|mut reservation| {
            reservation.patient = summaries.get(&reservation.patient_id).cloned();
            reservation
        }))
    }

    /// Reservations outside the caller's scope read as not found.
    pub async fn get(&self, id: i64, scope: ReservationScope) -> Result<Reservation> {
        let reservation = self
            .reservations
            .find_by_id(id)
            .await?
            .filter(|r| scope.permits(r))
            .ok_or(PatientError::ReservationNotFound)?;
        self.attach_patient(reservation).await
    }

    pub async fn update(&self, id: i64, request: UpdateReservation) -> Result<Reservation> {
        let existing = self.get(id, ReservationScope::All).await?;

        let mut changes = ReservationChanges {
            tanggal: request.tanggal.as_deref().map(require_date).transpose()?,
            waktu: request.waktu.as_deref().map(require_time).transpose()?,
            keluhan: request.keluhan.map(|k| k.trim().to_string()),
            catatan: request.catatan.map(|c| c.trim().to_string()),
            jenis_kunjungan: request.jenis_kunjungan.map(|j| j.trim().to_string()),
            ..ReservationChanges::default()
        };

        if let Some(raw) = request.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let next = raw.parse::<ReservationStatus>().map_err(|_| {
                PatientError::validation(
                    "status",
                    "must be one of: Dijadwalkan, Dikonfirmasi, Dibatalkan, Selesai",
                )
            })?;
            ensure_transition(existing.status, next)?;
            changes.status = Some(next);
        }

        match request.doctor_id {
            Some(doctor_id) if doctor_id != existing.doctor_id => {
                let doctor = self.doctor(doctor_id).await?;
                changes.doctor_id = Some(doctor.id);
                changes.doctor_name = Some(snapshot_name(request.doctor_name, &doctor));
            }
            _ => {
                changes.doctor_name = request
                    .doctor_name
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty());
            }
        }

        let reservation = self.reservations.update(id, changes).await?;
        info!(reservation_id = id, status = %reservation.status, "Reservation updated");
        self.attach_patient(reservation).await
    }

    /// Mark the patient as arrived.
    pub async fn confirm(&self, id: i64) -> Result<Reservation> {
        self.transition(id, ReservationStatus::Dikonfirmasi).await
    }

    pub async fn cancel(&self, id: i64) -> Result<Reservation> {
        self.transition(id, ReservationStatus::Dibatalkan).await
    }

    async fn transition(&self, id: i64, next: ReservationStatus) -> Result<Reservation> {
        let existing = self.get(id, ReservationScope::All).await?;
        ensure_transition(existing.status, next)?;

        let reservation = self
            .reservations
            .update(
                id,
                ReservationChanges {
                    status: Some(next),
                    ..ReservationChanges::default()
                },
            )
            .await?;
        info!(reservation_id = id, from = %existing.status, to = %next, "Reservation status changed");
        self.attach_patient(reservation).await
    }

    async fn doctor(&self, doctor_id: i64) -> Result<User> {
        self.users
            .find_by_id(doctor_id)
            .await?
            .ok_or_else(|| PatientError::validation("doctorId", format!("doctor {} does not exist", doctor_id)))
    }

    async fn attach_patient(&self, mut reservation: Reservation) -> Result<Reservation> {
        reservation.patient = self
            .patients
            .summaries(&[reservation.patient_id])
            .await?
            .into_iter()
            .next();
        Ok(reservation)
    }
}

fn ensure_transition(from: ReservationStatus, to: ReservationStatus) -> Result<()> {
    if from.can_become(to) {
        Ok(())
    } else {
        Err(PatientError::IllegalTransition { from, to })
    }
}

fn snapshot_name(requested: Option<String>, doctor: &User) -> String {
    requested
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| doctor.nama_lengkap.clone())
}

fn require_date(raw: &str) -> Result<chrono::NaiveDate> {
    parse_date(raw).ok_or_else(|| PatientError::validation("tanggal", "must be a date in YYYY-MM-DD format"))
}

fn require_time(raw: &str) -> Result<String> {
    parse_time(raw).ok_or_else(|| PatientError::validation("waktu", "must be a time in HH:MM format"))
}
