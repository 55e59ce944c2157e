use crate::{
    error::*,
    models::*,
    pricing,
    record::*,
    repository::{CatalogRepository, EmrRepository},
};
use auth_identity::{User, UserRepository};
use chrono::{DateTime, NaiveDate, Utc};
use database_layer::RecordKey;
use patient_service::{PatientRepository, DATE_FORMAT};
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// Suffixes tried after the bare visit id before giving up.
const VISIT_ID_ATTEMPTS: u32 = 50;

/// `VISIT-<patient id>-<YYYYMMDDHHMMSS>`
pub fn visit_id_at(patient_id: i64, at: DateTime<Utc>) -> String {
    format!("VISIT-{}-{}", patient_id, at.format("%Y%m%d%H%M%S"))
}

/// Creates, reads and replaces medical record aggregates.
pub struct EmrService {
    records: Arc<dyn EmrRepository>,
    catalogs: Arc<dyn CatalogRepository>,
    patients: Arc<dyn PatientRepository>,
    users: Arc<dyn UserRepository>,
}

impl EmrService {
    pub fn new(
        records: Arc<dyn EmrRepository>,
        catalogs: Arc<dyn CatalogRepository>,
        patients: Arc<dyn PatientRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            records,
            catalogs,
            patients,
            users,
        }
    }

    pub async fn create(&self, request: CreateEmr) -> Result<MedicalRecord> {
        self.create_at(request, Utc::now()).await
    }

    /// Record a visit examined at `now`.
    pub async fn create_at(&self, request: CreateEmr, now: DateTime<Utc>) -> Result<MedicalRecord> {
        let complaint = request.complaint.trim().to_string();
        if complaint.is_empty() {
            return Err(EmrError::validation("complaint", "is required"));
        }
        if request.patient_id <= 0 {
            return Err(EmrError::validation("patientId", "is required"));
        }
        if self.patients.find_by_id(request.patient_id).await?.is_none() {
            return Err(EmrError::PatientNotFound);
        }
        let doctor = self.doctor(request.doctor_id).await?;
        let doctor_name = snapshot_name(request.doctor_name, &doctor);

        let items = self
            .resolve_items(
                &request.treatments,
                &request.medications,
                &request.odontogram,
                &doctor_name,
            )
            .await?;

        let mut draft = EmrDraft {
            visit_id: String::new(),
            patient_id: request.patient_id,
            doctor_id: doctor.id,
            doctor_name,
            exam_date: now,
            visit_type: trimmed(request.visit_type),
            complaint,
            examination: trimmed(request.examination),
            diagnosis: trimmed(request.diagnosis),
            treatment_plan: trimmed(request.treatment_plan),
            notes: trimmed(request.notes),
            billing_status: BillingStatus::default(),
            items,
        };

        let base = visit_id_at(request.patient_id, now);
        for attempt in 1..=VISIT_ID_ATTEMPTS {
            let candidate = if attempt == 1 {
                base.clone()
            } else {
                format!("{}-{}", base, attempt)
            };
            if self.records.visit_id_exists(&candidate).await? {
                debug!(visit_id = %candidate, "Visit id taken, trying next suffix");
                continue;
            }
            draft.visit_id = candidate;
            match self.records.create(draft.clone()).await {
                Ok(record) => {
                    info!(
                        record_id = record.id,
                        visit_id = %record.visit_id,
                        patient_id = record.patient_id,
                        doctor_id = record.doctor_id,
                        "Medical record created"
                    );
                    return self.hydrate(record).await;
                }
                // Lost a race with a concurrent visit for the same patient.
                Err(EmrError::VisitIdTaken(visit_id)) => {
                    debug!(visit_id = %visit_id, "Visit id claimed concurrently, trying next suffix");
                }
                Err(e) => return Err(e),
            }
        }
        Err(EmrError::InternalError(anyhow::anyhow!("no free visit id near {}", base)))
    }

    /// Resolve a numeric id first, falling back to the visit id.
    pub async fn find(&self, key: &str) -> Result<MedicalRecord> {
        let record = self.locate(key).await?;
        self.hydrate(record).await
    }

    /// Every record of one patient, newest examination first.
    pub async fn list_by_patient(&self, patient_id: i64) -> Result<Vec<MedicalRecord>> {
        let records = self.records.list_by_patient(patient_id).await?;
        let mut hydrated = Vec::with_capacity(records.len());
        for record in records {
            hydrated.push(self.hydrate(record).await?);
        }
        Ok(hydrated)
    }

    /// Patch the header and replace all owned collections with the payload.
    pub async fn update(&self, key: &str, request: UpdateEmr) -> Result<MedicalRecord> {
        let existing = self.locate(key).await?;

        let mut header = EmrHeaderChanges {
            visit_type: request.visit_type.map(|v| v.trim().to_string()),
            complaint: non_blank(request.complaint),
            examination: request.examination.map(|e| e.trim().to_string()),
            diagnosis: request.diagnosis.map(|d| d.trim().to_string()),
            treatment_plan: request.treatment_plan.map(|t| t.trim().to_string()),
            notes: request.notes.map(|n| n.trim().to_string()),
            ..EmrHeaderChanges::default()
        };

        if let Some(raw) = request.billing_status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            header.billing_status = Some(
                raw.parse::<BillingStatus>()
                    .map_err(|_| EmrError::validation("billingStatus", "must be one of: Belum Lunas, Lunas"))?,
            );
        }

        match request.doctor_id {
            Some(doctor_id) if doctor_id != existing.doctor_id => {
                let doctor = self.doctor(doctor_id).await?;
                header.doctor_id = Some(doctor.id);
                header.doctor_name = Some(snapshot_name(request.doctor_name, &doctor));
            }
            _ => header.doctor_name = non_blank(request.doctor_name),
        }

        let history_doctor = header.doctor_name.clone().unwrap_or_else(|| existing.doctor_name.clone());
        let items = self
            .resolve_items(
                &request.treatments,
                &request.medications,
                &request.odontogram,
                &history_doctor,
            )
            .await?;

        let record = self.records.replace(existing.id, header, items).await?;
        info!(
            record_id = record.id,
            visit_id = %record.visit_id,
            treatments = record.treatments.len(),
            medications = record.medications.len(),
            teeth = record.odontogram.len(),
            "Medical record replaced"
        );
        self.hydrate(record).await
    }

    async fn locate(&self, key: &str) -> Result<MedicalRecord> {
        let key = RecordKey::parse(key);
        if let RecordKey::Id(id) = key {
            if let Some(record) = self.records.find_by_id(id).await? {
                return Ok(record);
            }
        }
        self.records
            .find_by_visit_id(&key.as_secondary())
            .await?
            .ok_or(EmrError::RecordNotFound)
    }

    async fn doctor(&self, doctor_id: i64) -> Result<User> {
        if doctor_id <= 0 {
            return Err(EmrError::validation("doctorId", "is required"));
        }
        self.users
            .find_by_id(doctor_id)
            .await?
            .ok_or_else(|| EmrError::validation("doctorId", format!("doctor {} does not exist", doctor_id)))
    }

    /// Validate and price every line of the payload against the live catalogs.
    async fn resolve_items(
        &self,
        treatments: &[TreatmentInput],
        medications: &[MedicationInput],
        odontogram: &[OdontogramInput],
        doctor_name: &str,
    ) -> Result<EmrItems> {
        let treatment_codes = distinct_codes(treatments.iter().map(|t| t.code.as_str()));
        let treatment_catalog: HashMap<String, TreatmentCatalog> = if treatment_codes.is_empty() {
            HashMap::new()
        } else {
            self.catalogs
                .treatments_by_codes(&treatment_codes)
                .await?
                .into_iter()
                .map(|t| (t.kode.clone(), t))
                .collect()
        };

        let medication_codes = distinct_codes(medications.iter().map(|m| m.code.as_str()));
        let medication_catalog: HashMap<String, MedicationCatalog> = if medication_codes.is_empty() {
            HashMap::new()
        } else {
            self.catalogs
                .medications_by_codes(&medication_codes)
                .await?
                .into_iter()
                .map(|m| (m.kode.clone(), m))
                .collect()
        };

        let mut items = EmrItems::default();

        for (i, input) in treatments.iter().enumerate() {
            let entry = treatment_catalog.get(input.code.trim()).ok_or_else(|| {
                EmrError::validation(
                    format!("treatments[{}].code", i),
                    format!("unknown treatment code '{}'", input.code.trim()),
                )
            })?;
            pricing::check_quantity(input.quantity, &format!("treatments[{}].quantity", i))?;
            let price = input.price_at_time.unwrap_or(entry.harga);
            pricing::check_price(price, &format!("treatments[{}].priceAtTime", i))?;
            let discount = input.discount_percent.unwrap_or(Decimal::ZERO);
            pricing::check_discount(discount, &format!("treatments[{}].discountPercent", i))?;
            let sub_total_field = format!("treatments[{}].subTotal", i);
            let computed = pricing::treatment_subtotal(input.quantity, price, discount, &sub_total_field)?;
            let sub_total = pricing::reconcile(input.sub_total, computed, &sub_total_field)?;

            items.treatments.push(NewTreatmentItem {
                treatment_catalog_id: entry.id,
                tooth_number: non_blank(input.tooth_number.clone()),
                quantity: input.quantity,
                price_at_time: price,
                discount_percent: discount,
                sub_total,
                notes: trimmed(input.notes.clone()),
            });
        }

        for (i, input) in medications.iter().enumerate() {
            let entry = medication_catalog.get(input.code.trim()).ok_or_else(|| {
                EmrError::validation(
                    format!("medications[{}].code", i),
                    format!("unknown medication code '{}'", input.code.trim()),
                )
            })?;
            pricing::check_quantity(input.quantity, &format!("medications[{}].quantity", i))?;
            let price = input.price_per_unit_at_time.unwrap_or(entry.harga_jual);
            pricing::check_price(price, &format!("medications[{}].pricePerUnitAtTime", i))?;
            let sub_total_field = format!("medications[{}].subTotal", i);
            let computed = pricing::medication_subtotal(input.quantity, price, &sub_total_field)?;
            let sub_total = pricing::reconcile(input.sub_total, computed, &sub_total_field)?;

            items.medications.push(NewMedicationItem {
                medication_catalog_id: entry.id,
                quantity: input.quantity,
                price_per_unit_at_time: price,
                sub_total,
                instruction: trimmed(input.instruction.clone()),
            });
        }

        for (i, input) in odontogram.iter().enumerate() {
            let tooth_number = input.tooth_number.trim();
            if tooth_number.is_empty() {
                return Err(EmrError::validation(format!("odontogram[{}].toothNumber", i), "is required"));
            }
            let condition = parse_condition(&input.condition, &format!("odontogram[{}].condition", i))?;

            let mut history = Vec::with_capacity(input.history.len());
            for (j, entry) in input.history.iter().enumerate() {
                let path = format!("odontogram[{}].history[{}]", i, j);
                history.push(NewOdontogramHistory {
                    date: parse_history_date(&entry.date, &format!("{}.date", path))?,
                    doctor_name: non_blank(entry.doctor_name.clone()).unwrap_or_else(|| doctor_name.to_string()),
                    from_condition: parse_condition(&entry.from_condition, &format!("{}.fromCondition", path))?,
                    to_condition: parse_condition(&entry.to_condition, &format!("{}.toCondition", path))?,
                    note: trimmed(entry.note.clone()),
                });
            }

            items.odontogram.push(NewOdontogramDetail {
                tooth_number: tooth_number.to_string(),
                condition,
                treatment_note: trimmed(input.treatment_note.clone()),
                history,
            });
        }

        Ok(items)
    }

    /// Attach the patient summary and the catalog summary of every line.
    async fn hydrate(&self, mut record: MedicalRecord) -> Result<MedicalRecord> {
        record.patient = self
            .patients
            .summaries(&[record.patient_id])
            .await?
            .into_iter()
            .next();

        if !record.treatments.is_empty() {
            let ids = distinct_ids(record.treatments.iter().map(|t| t.treatment_catalog_id));
            let summaries: HashMap<i64, TreatmentCatalogSummary> = self
                .catalogs
                .treatments_by_ids(&ids)
                .await?
                .iter()
                .map(|t| (t.id, t.summary()))
                .collect();
            for item in &mut record.treatments {
                item.treatment_catalog = summaries.get(&item.treatment_catalog_id).cloned();
            }
        }

        if !record.medications.is_empty() {
            let ids = distinct_ids(record.medications.iter().map(|m| m.medication_catalog_id));
            let summaries: HashMap<i64, MedicationCatalogSummary> = self
                .catalogs
                .medications_by_ids(&ids)
                .await?
                .iter()
                .map(|m| (m.id, m.summary()))
                .collect();
            for item in &mut record.medications {
                item.medication_catalog = summaries.get(&item.medication_catalog_id).cloned();
            }
        }

        Ok(record)
    }
}

fn distinct_codes<'a>(codes: impl Iterator<Item = &'a str>) -> Vec<String> {
    codes
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn distinct_ids(ids: impl Iterator<Item = i64>) -> Vec<i64> {
    ids.collect::<BTreeSet<_>>().into_iter().collect()
}

fn parse_condition(raw: &str, field: &str) -> Result<ToothCondition> {
    raw.trim().parse::<ToothCondition>().map_err(|_| {
        let allowed: Vec<&str> = ToothCondition::ALL.iter().map(|c| c.as_str()).collect();
        EmrError::validation(field, format!("must be one of: {}", allowed.join(", ")))
    })
}

fn parse_history_date(raw: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| EmrError::validation(field, "must be a date in YYYY-MM-DD format"))
}

fn snapshot_name(requested: Option<String>, doctor: &User) -> String {
    non_blank(requested).unwrap_or_else(|| doctor.nama_lengkap.clone())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn trimmed(value: Option<String>) -> String {
    value.unwrap_or_default().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_visit_id_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 8, 5, 7).unwrap();
        assert_eq!(visit_id_at(42, at), "VISIT-42-20240309080507");
    }

    #[test]
    fn test_distinct_codes_trims_and_dedupes() {
        let codes = distinct_codes([" T01", "T02", "T01 ", ""].into_iter());
        assert_eq!(codes, vec!["T01".to_string(), "T02".to_string()]);
    }

    #[test]
    fn test_parse_condition_reports_field() {
        assert_eq!(parse_condition(" root-canal ", "c").unwrap(), ToothCondition::RootCanal);
        let err = parse_condition("chipped", "odontogram[0].condition").unwrap_err();
        assert!(matches!(err, EmrError::Validation { ref field, .. } if field == "odontogram[0].condition"));
    }
}
