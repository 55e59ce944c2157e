use crate::{error::*, models::*};
use async_trait::async_trait;
use chrono::Utc;
use database_layer::{contains_ignore_case, Page, PageRequest};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

pub mod postgres;

pub use postgres::{PostgresPatientRepository, PostgresReservationRepository};

/// Storage for patients. Soft-deleted rows are invisible except to
/// [`PatientRepository::record_number_exists`].
#[async_trait]
pub trait PatientRepository: Send + Sync {
    /// Fails with `RecordNumberTaken` or `EmailAlreadyInUse` on a unique clash.
    async fn create(&self, patient: NewPatient) -> Result<Patient>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Patient>>;
    async fn find_by_no_rm(&self, no_rm: &str) -> Result<Option<Patient>>;
    /// Case-insensitive email lookup.
    async fn find_by_email(&self, email: &str) -> Result<Option<Patient>>;
    async fn summaries(&self, ids: &[i64]) -> Result<Vec<PatientSummary>>;
    /// Newest first, optional substring search over name and record number.
    async fn list(&self, search: Option<&str>, page: PageRequest) -> Result<Page<Patient>>;
    async fn update(&self, id: i64, changes: PatientChanges) -> Result<Patient>;
    async fn soft_delete(&self, id: i64) -> Result<()>;
    /// Record numbers stay reserved after a patient is deleted.
    async fn record_number_exists(&self, no_rm: &str) -> Result<bool>;
}

/// Storage for reservations.
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn create(&self, reservation: NewReservation) -> Result<Reservation>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Reservation>>;
    /// Ordered by date then time.
    async fn list(&self, filter: &ReservationFilter, page: PageRequest) -> Result<Page<Reservation>>;
    async fn update(&self, id: i64, changes: ReservationChanges) -> Result<Reservation>;
}

/// In-memory patient repository for testing and development
pub struct InMemoryPatientRepository {
    patients: RwLock<BTreeMap<i64, Patient>>,
    next_id: AtomicI64,
}

impl InMemoryPatientRepository {
    pub fn new() -> Self {
        Self {
            patients: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn live(patients: &BTreeMap<i64, Patient>) -> impl Iterator<Item = &Patient> {
        patients.values().filter(|p| p.deleted_at.is_none())
    }

    fn email_taken(patients: &BTreeMap<i64, Patient>, email: &str, except: Option<i64>) -> bool {
        Self::live(patients).any(|p| {
            Some(p.id) != except && p.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email))
        })
    }
}

impl Default for InMemoryPatientRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PatientRepository for InMemoryPatientRepository {
    async fn create(&self, patient: NewPatient) -> Result<Patient> {
        let mut patients = self.patients.write();
        if patients.values().any(|p| p.no_rm == patient.no_rm) {
            return Err(PatientError::RecordNumberTaken(patient.no_rm));
        }
        if let Some(email) = &patient.email {
            if Self::email_taken(&patients, email, None) {
                return Err(PatientError::EmailAlreadyInUse);
            }
        }

        let now = Utc::now();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = Patient {
            id,
            no_rm: patient.no_rm,
            nama_lengkap: patient.nama_lengkap,
            tanggal_lahir: patient.tanggal_lahir,
            jenis_kelamin: patient.jenis_kelamin,
            alamat: patient.alamat,
            nomor_telepon: patient.nomor_telepon,
            email: patient.email,
            alergi: patient.alergi,
            riwayat_penyakit: patient.riwayat_penyakit,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        patients.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Patient>> {
        Ok(self.patients.read().get(&id).filter(|p| p.deleted_at.is_none()).cloned())
    }

    async fn find_by_no_rm(&self, no_rm: &str) -> Result<Option<Patient>> {
        let patients = self.patients.read();
        let found = Self::live(&patients).find(|p| p.no_rm == no_rm).cloned();
        Ok(found)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Patient>> {
        let patients = self.patients.read();
        let found = Self::live(&patients)
            .find(|p| p.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email)))
            .cloned();
        Ok(found)
    }

    async fn summaries(&self, ids: &[i64]) -> Result<Vec<PatientSummary>> {
        let patients = self.patients.read();
        Ok(Self::live(&patients)
            .filter(|p| ids.contains(&p.id))
            .map(Patient::summary)
            .collect())
    }

    async fn list(&self, search: Option<&str>, page: PageRequest) -> Result<Page<Patient>> {
        let patients = self.patients.read();
        let mut matching: Vec<Patient> = Self::live(&patients)
            .filter(|p| match search {
                Some(term) => contains_ignore_case(&p.nama_lengkap, term) || contains_ignore_case(&p.no_rm, term),
                None => true,
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

        let total = i64::try_from(matching.len()).unwrap_or(i64::MAX);
        Ok(Page::new(page.slice(&matching), total, page))
    }

    async fn update(&self, id: i64, changes: PatientChanges) -> Result<Patient> {
        let mut patients = self.patients.write();
        if let Some(email) = &changes.email {
            if Self::email_taken(&patients, email, Some(id)) {
                return Err(PatientError::EmailAlreadyInUse);
            }
        }

        let patient = patients
            .get_mut(&id)
            .filter(|p| p.deleted_at.is_none())
            .ok_or(PatientError::PatientNotFound)?;
        if let Some(nama) = changes.nama_lengkap {
            patient.nama_lengkap = nama;
        }
        if let Some(tanggal) = changes.tanggal_lahir {
            patient.tanggal_lahir = Some(tanggal);
        }
        if let Some(gender) = changes.jenis_kelamin {
            patient.jenis_kelamin = Some(gender);
        }
        if let Some(alamat) = changes.alamat {
            patient.alamat = alamat;
        }
        if let Some(telepon) = changes.nomor_telepon {
            patient.nomor_telepon = telepon;
        }
        if let Some(email) = changes.email {
            patient.email = Some(email);
        }
        if let Some(alergi) = changes.alergi {
            patient.alergi = alergi;
        }
        if let Some(riwayat) = changes.riwayat_penyakit {
            patient.riwayat_penyakit = riwayat;
        }
        patient.updated_at = Utc::now();
        Ok(patient.clone())
    }

    async fn soft_delete(&self, id: i64) -> Result<()> {
        let mut patients = self.patients.write();
        let patient = patients
            .get_mut(&id)
            .filter(|p| p.deleted_at.is_none())
            .ok_or(PatientError::PatientNotFound)?;
        let now = Utc::now();
        patient.deleted_at = Some(now);
        patient.updated_at = now;
        Ok(())
    }

    async fn record_number_exists(&self, no_rm: &str) -> Result<bool> {
        Ok(self.patients.read().values().any(|p| p.no_rm == no_rm))
    }
}

/// In-memory reservation repository for testing and development
pub struct InMemoryReservationRepository {
    reservations: RwLock<BTreeMap<i64, Reservation>>,
    next_id: AtomicI64,
}

impl InMemoryReservationRepository {
    pub fn new() -> Self {
        Self {
            reservations: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryReservationRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_filter(reservation: &Reservation, filter: &ReservationFilter) -> bool {
    filter.tanggal.map_or(true, |d| reservation.tanggal == d)
        && filter.status.map_or(true, |s| reservation.status == s)
        && filter.doctor_id.map_or(true, |id| reservation.doctor_id == id)
        && filter.patient_id.map_or(true, |id| reservation.patient_id == id)
}

#[async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn create(&self, reservation: NewReservation) -> Result<Reservation> {
        let now = Utc::now();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = Reservation {
            id,
            patient_id: reservation.patient_id,
            patient: None,
            doctor_id: reservation.doctor_id,
            doctor_name: reservation.doctor_name,
            tanggal: reservation.tanggal,
            waktu: reservation.waktu,
            keluhan: reservation.keluhan,
            catatan: reservation.catatan,
            status: reservation.status,
            jenis_kunjungan: reservation.jenis_kunjungan,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.reservations.write().insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Reservation>> {
        Ok(self
            .reservations
            .read()
            .get(&id)
            .filter(|r| r.deleted_at.is_none())
            .cloned())
    }

    async fn list(&self, filter: &ReservationFilter, page: PageRequest) -> Result<Page<Reservation>> {
        let reservations = self.reservations.read();
        let mut matching: Vec<Reservation> = reservations
            .values()
            .filter(|r| r.deleted_at.is_none() && matches_filter(r, filter))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.tanggal
                .cmp(&b.tanggal)
                .then_with(|| a.waktu.cmp(&b.waktu))
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = i64::try_from(matching.len()).unwrap_or(i64::MAX);
        Ok(Page::new(page.slice(&matching), total, page))
    }

    async fn update(&self, id: i64, changes: ReservationChanges) -> Result<Reservation> {
        let mut reservations = self.reservations.write();
        let reservation = reservations
            .get_mut(&id)
            .filter(|r| r.deleted_at.is_none())
            .ok_or(PatientError::ReservationNotFound)?;
        if let Some(doctor_id) = changes.doctor_id {
            reservation.doctor_id = doctor_id;
        }
        if let Some(doctor_name) = changes.doctor_name {
            reservation.doctor_name = doctor_name;
        }
        if let Some(tanggal) = changes.tanggal {
            reservation.tanggal = tanggal;
        }
        if let Some(waktu) = changes.waktu {
            reservation.waktu = waktu;
        }
        if let Some(keluhan) = changes.keluhan {
            reservation.keluhan = keluhan;
        }
        if let Some(catatan) = changes.catatan {
            reservation.catatan = catatan;
        }
        if let Some(status) = changes.status {
            reservation.status = status;
        }
        if let Some(jenis) = changes.jenis_kunjungan {
            reservation.jenis_kunjungan = jenis;
        }
        reservation.updated_at = Utc::now();
        Ok(reservation.clone())
    }
}
