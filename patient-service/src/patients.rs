use crate::{error::*, models::*, repository::PatientRepository};
use chrono::{DateTime, Duration, Utc};
use database_layer::{Page, PageRequest, RecordKey};
use std::sync::Arc;
use tracing::{debug, info};

/// Attempts before giving up on a free record number.
const RECORD_NUMBER_ATTEMPTS: i64 = 120;

/// `RM-<unix seconds>`
pub fn record_number_at(at: DateTime<Utc>) -> String {
    format!("RM-{}", at.timestamp())
}

pub struct PatientRegistry {
    patients: Arc<dyn PatientRepository>,
}

impl PatientRegistry {
    pub fn new(patients: Arc<dyn PatientRepository>) -> Self {
        Self { patients }
    }

    pub fn store(&self) -> Arc<dyn PatientRepository> {
        Arc::clone(&self.patients)
    }

    pub async fn create(&self, request: CreatePatient) -> Result<Patient> {
        self.create_at(request, Utc::now()).await
    }

    /// Register a patient, deriving the record number from `now`.
    ///
    /// When the number for this second is taken the seconds value advances
    /// until a free one is found.
    pub async fn create_at(&self, request: CreatePatient, now: DateTime<Utc>) -> Result<Patient> {
        let email = non_blank(request.email);
        if let Some(email) = &email {
            if self.patients.find_by_email(email).await?.is_some() {
                return Err(PatientError::EmailAlreadyInUse);
            }
        }

        let mut draft = NewPatient {
            no_rm: String::new(),
            nama_lengkap: request.nama_lengkap.trim().to_string(),
            tanggal_lahir: parse_birth_date(request.tanggal_lahir.as_deref())?,
            jenis_kelamin: parse_gender(request.jenis_kelamin.as_deref())?,
            alamat: request.alamat.unwrap_or_default().trim().to_string(),
            nomor_telepon: request.nomor_telepon.trim().to_string(),
            email,
            alergi: request.alergi.unwrap_or_default().trim().to_string(),
            riwayat_penyakit: request.riwayat_penyakit.unwrap_or_default().trim().to_string(),
        };

        let mut offset = 0;
        loop {
            let candidate = record_number_at(now + Duration::seconds(offset));
            offset += 1;
            if self.patients.record_number_exists(&candidate).await? {
                debug!(no_rm = %candidate, "Record number taken, advancing");
            } else {
                draft.no_rm = candidate;
                match self.patients.create(draft.clone()).await {
                    Ok(patient) => {
                        info!(patient_id = patient.id, no_rm = %patient.no_rm, "Patient registered");
                        return Ok(patient);
                    }
                    // Lost a race with a concurrent registration.
                    Err(PatientError::RecordNumberTaken(no_rm)) => {
                        debug!(no_rm = %no_rm, "Record number claimed concurrently, advancing");
                    }
                    Err(e) => return Err(e),
                }
            }
            if offset >= RECORD_NUMBER_ATTEMPTS {
                return Err(PatientError::InternalError(anyhow::anyhow!(
                    "no free medical record number near {}",
                    record_number_at(now)
                )));
            }
        }
    }

    pub async fn list(&self, search: Option<&str>, page: PageRequest) -> Result<Page<Patient>> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        self.patients.list(search, page).await
    }

    /// Resolve a numeric id first, falling back to the record number.
    pub async fn find(&self, key: &str) -> Result<Patient> {
        let key = RecordKey::parse(key);
        if let RecordKey::Id(id) = key {
            if let Some(patient) = self.patients.find_by_id(id).await? {
                return Ok(patient);
            }
        }
        self.patients
            .find_by_no_rm(&key.as_secondary())
            .await?
            .ok_or(PatientError::PatientNotFound)
    }

    pub async fn get(&self, id: i64) -> Result<Patient> {
        self.patients.find_by_id(id).await?.ok_or(PatientError::PatientNotFound)
    }

    pub async fn update(&self, key: &str, request: UpdatePatient) -> Result<Patient> {
        let existing = self.find(key).await?;

        let email = non_blank(request.email);
        if let Some(email) = &email {
            if let Some(holder) = self.patients.find_by_email(email).await? {
                if holder.id != existing.id {
                    return Err(PatientError::EmailAlreadyInUse);
                }
            }
        }

        let changes = PatientChanges {
            nama_lengkap: non_blank(request.nama_lengkap),
            tanggal_lahir: parse_birth_date(request.tanggal_lahir.as_deref())?,
            jenis_kelamin: parse_gender(request.jenis_kelamin.as_deref())?,
            alamat: request.alamat.map(|a| a.trim().to_string()),
            nomor_telepon: non_blank(request.nomor_telepon),
            email,
            alergi: request.alergi.map(|a| a.trim().to_string()),
            riwayat_penyakit: request.riwayat_penyakit.map(|r| r.trim().to_string()),
        };

        let patient = self.patients.update(existing.id, changes).await?;
        info!(patient_id = patient.id, "Patient updated");
        Ok(patient)
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let existing = self.find(key).await?;
        self.patients.soft_delete(existing.id).await?;
        info!(patient_id = existing.id, no_rm = %existing.no_rm, "Patient deleted");
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_birth_date(raw: Option<&str>) -> Result<Option<chrono::NaiveDate>> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => parse_date(raw)
            .map(Some)
            .ok_or_else(|| PatientError::validation("tanggalLahir", "must be a date in YYYY-MM-DD format")),
        None => Ok(None),
    }
}

fn parse_gender(raw: Option<&str>) -> Result<Option<Gender>> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => raw
            .parse::<Gender>()
            .map(Some)
            .map_err(|_| PatientError::validation("jenisKelamin", "must be one of: Laki-laki, Perempuan")),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_number_uses_unix_seconds() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(record_number_at(at), "RM-1700000000");
    }

    #[test]
    fn test_blank_optional_fields_are_ignored() {
        assert_eq!(parse_gender(Some("  ")).unwrap(), None);
        assert_eq!(parse_birth_date(None).unwrap(), None);
        assert!(matches!(
            parse_birth_date(Some("17-08-1990")),
            Err(PatientError::Validation { field: "tanggalLahir", .. })
        ));
    }
}
