//! PostgreSQL-backed patient and reservation repositories

use crate::{
    error::*,
    models::*,
    repository::{PatientRepository, ReservationRepository},
};
use async_trait::async_trait;
use database_layer::{like_pattern, DatabaseError, DatabasePool, Page, PageRequest};
use tracing::debug;

const PATIENT_COLUMNS: &str = "id, no_rm, nama_lengkap, tanggal_lahir, jenis_kelamin, alamat, nomor_telepon, \
     email, alergi, riwayat_penyakit, created_at, updated_at, deleted_at";
const RESERVATION_COLUMNS: &str = "id, patient_id, doctor_id, doctor_name, tanggal, waktu, keluhan, catatan, \
     status, jenis_kunjungan, created_at, updated_at, deleted_at";

pub struct PostgresPatientRepository {
    pool: DatabasePool,
}

impl PostgresPatientRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn map_patient_write_error(err: sqlx::Error, no_rm: Option<&str>) -> PatientError {
    let constraint = err
        .as_database_error()
        .and_then(|db| db.constraint())
        .map(str::to_string);
    let err = DatabaseError::SqlxError(err);
    if !err.is_unique_violation() {
        return PatientError::Database(err);
    }
    match (constraint.as_deref(), no_rm) {
        (Some("patients_no_rm_key"), Some(no_rm)) => PatientError::RecordNumberTaken(no_rm.to_string()),
        _ => PatientError::EmailAlreadyInUse,
    }
}

#[async_trait]
impl PatientRepository for PostgresPatientRepository {
    async fn create(&self, patient: NewPatient) -> Result<Patient> {
        debug!(no_rm = %patient.no_rm, "Inserting patient");
        let sql = format!(
            "INSERT INTO patients (no_rm, nama_lengkap, tanggal_lahir, jenis_kelamin, alamat, nomor_telepon, \
             email, alergi, riwayat_penyakit) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            PATIENT_COLUMNS
        );
        sqlx::query_as::<_, Patient>(&sql)
            .bind(&patient.no_rm)
            .bind(&patient.nama_lengkap)
            .bind(patient.tanggal_lahir)
            .bind(patient.jenis_kelamin)
            .bind(&patient.alamat)
            .bind(&patient.nomor_telepon)
            .bind(&patient.email)
            .bind(&patient.alergi)
            .bind(&patient.riwayat_penyakit)
            .fetch_one(self.pool.pool())
            .await
            .map_err(|e| map_patient_write_error(e, Some(&patient.no_rm)))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Patient>> {
        let sql = format!("SELECT {} FROM patients WHERE id = $1 AND deleted_at IS NULL", PATIENT_COLUMNS);
        Ok(sqlx::query_as::<_, Patient>(&sql)
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?)
    }

    async fn find_by_no_rm(&self, no_rm: &str) -> Result<Option<Patient>> {
        let sql = format!("SELECT {} FROM patients WHERE no_rm = $1 AND deleted_at IS NULL", PATIENT_COLUMNS);
        Ok(sqlx::query_as::<_, Patient>(&sql)
            .bind(no_rm)
            .fetch_optional(self.pool.pool())
            .await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Patient>> {
        let sql = format!(
            "SELECT {} FROM patients WHERE LOWER(email) = LOWER($1) AND deleted_at IS NULL",
            PATIENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Patient>(&sql)
            .bind(email)
            .fetch_optional(self.pool.pool())
            .await?)
    }

    async fn summaries(&self, ids: &[i64]) -> Result<Vec<PatientSummary>> {
        Ok(sqlx::query_as::<_, PatientSummary>(
            "SELECT id, no_rm, nama_lengkap, tanggal_lahir, jenis_kelamin FROM patients \
             WHERE id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(ids)
        .fetch_all(self.pool.pool())
        .await?)
    }

    async fn list(&self, search: Option<&str>, page: PageRequest) -> Result<Page<Patient>> {
        let pattern = search.map(like_pattern);
        let filter = "deleted_at IS NULL AND ($1::text IS NULL OR nama_lengkap ILIKE $1 OR no_rm ILIKE $1)";

        let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM patients WHERE {}", filter))
            .bind(&pattern)
            .fetch_one(self.pool.pool())
            .await?;

        let sql = format!(
            "SELECT {} FROM patients WHERE {} ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
            PATIENT_COLUMNS, filter
        );
        let patients = sqlx::query_as::<_, Patient>(&sql)
            .bind(&pattern)
            .bind(page.limit_i64())
            .bind(page.offset())
            .fetch_all(self.pool.pool())
            .await?;

        Ok(Page::new(patients, total, page))
    }

    async fn update(&self, id: i64, changes: PatientChanges) -> Result<Patient> {
        let sql = format!(
            "UPDATE patients SET \
                nama_lengkap = COALESCE($2, nama_lengkap), \
                tanggal_lahir = COALESCE($3, tanggal_lahir), \
                jenis_kelamin = COALESCE($4, jenis_kelamin), \
                alamat = COALESCE($5, alamat), \
                nomor_telepon = COALESCE($6, nomor_telepon), \
                email = COALESCE($7, email), \
                alergi = COALESCE($8, alergi), \
                riwayat_penyakit = COALESCE($9, riwayat_penyakit), \
                updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {}",
            PATIENT_COLUMNS
        );
        sqlx::query_as::<_, Patient>(&sql)
            .bind(id)
            .bind(&changes.nama_lengkap)
            .bind(changes.tanggal_lahir)
            .bind(changes.jenis_kelamin)
            .bind(&changes.alamat)
            .bind(&changes.nomor_telepon)
            .bind(&changes.email)
            .bind(&changes.alergi)
            .bind(&changes.riwayat_penyakit)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| map_patient_write_error(e, None))?
            .ok_or(PatientError::PatientNotFound)
    }

    async fn soft_delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE patients SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(self.pool.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(PatientError::PatientNotFound);
        }
        Ok(())
    }

    async fn record_number_exists(&self, no_rm: &str) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM patients WHERE no_rm = $1)")
            .bind(no_rm)
            .fetch_one(self.pool.pool())
            .await?;
        Ok(exists)
    }
}

pub struct PostgresReservationRepository {
    pool: DatabasePool,
}

impl PostgresReservationRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationRepository for PostgresReservationRepository {
    async fn create(&self, reservation: NewReservation) -> Result<Reservation> {
        let sql = format!(
            "INSERT INTO reservations (patient_id, doctor_id, doctor_name, tanggal, waktu, keluhan, catatan, \
             status, jenis_kunjungan) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            RESERVATION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Reservation>(&sql)
            .bind(reservation.patient_id)
            .bind(reservation.doctor_id)
            .bind(&reservation.doctor_name)
            .bind(reservation.tanggal)
            .bind(&reservation.waktu)
            .bind(&reservation.keluhan)
            .bind(&reservation.catatan)
            .bind(reservation.status)
            .bind(&reservation.jenis_kunjungan)
            .fetch_one(self.pool.pool())
            .await?)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Reservation>> {
        let sql = format!(
            "SELECT {} FROM reservations WHERE id = $1 AND deleted_at IS NULL",
            RESERVATION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Reservation>(&sql)
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?)
    }

    async fn list(&self, filter: &ReservationFilter, page: PageRequest) -> Result<Page<Reservation>> {
        let clause = "deleted_at IS NULL \
             AND ($1::date IS NULL OR tanggal = $1) \
             AND ($2::text IS NULL OR status = $2) \
             AND ($3::bigint IS NULL OR doctor_id = $3) \
             AND ($4::bigint IS NULL OR patient_id = $4)";
        let status = filter.status.map(|s| s.as_str());

        let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM reservations WHERE {}", clause))
            .bind(filter.tanggal)
            .bind(status)
            .bind(filter.doctor_id)
            .bind(filter.patient_id)
            .fetch_one(self.pool.pool())
            .await?;

        let sql = format!(
            "SELECT {} FROM reservations WHERE {} ORDER BY tanggal, waktu, id LIMIT $5 OFFSET $6",
            RESERVATION_COLUMNS, clause
        );
        let reservations = sqlx::query_as::<_, Reservation>(&sql)
            .bind(filter.tanggal)
            .bind(status)
            .bind(filter.doctor_id)
            .bind(filter.patient_id)
            .bind(page.limit_i64())
            .bind(page.offset())
            .fetch_all(self.pool.pool())
            .await?;

        Ok(Page::new(reservations, total, page))
    }

    async fn update(&self, id: i64, changes: ReservationChanges) -> Result<Reservation> {
        let sql = format!(
            "UPDATE reservations SET \
                doctor_id = COALESCE($2, doctor_id), \
                doctor_name = COALESCE($3, doctor_name), \
                tanggal = COALESCE($4, tanggal), \
                waktu = COALESCE($5, waktu), \
                keluhan = COALESCE($6, keluhan), \
                catatan = COALESCE($7, catatan), \
                status = COALESCE($8, status), \
                jenis_kunjungan = COALESCE($9, jenis_kunjungan), \
                updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {}",
            RESERVATION_COLUMNS
        );
        sqlx::query_as::<_, Reservation>(&sql)
            .bind(id)
            .bind(changes.doctor_id)
            .bind(&changes.doctor_name)
            .bind(changes.tanggal)
            .bind(&changes.waktu)
            .bind(&changes.keluhan)
            .bind(&changes.catatan)
            .bind(changes.status.map(|s| s.as_str()))
            .bind(&changes.jenis_kunjungan)
            .fetch_optional(self.pool.pool())
            .await?
            .ok_or(PatientError::ReservationNotFound)
    }
}
