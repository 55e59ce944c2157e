use crate::{error::*, models::*, record::*};
use async_trait::async_trait;
use chrono::Utc;
use database_layer::contains_ignore_case;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

pub mod postgres;

pub use postgres::{PostgresCatalogRepository, PostgresEmrRepository};

#[derive(Debug, Clone)]
pub struct NewTreatmentCatalog {
    pub kode: String,
    pub nama: String,
    pub kategori: String,
    pub harga: Decimal,
    pub deskripsi: String,
}

#[derive(Debug, Clone, Default)]
pub struct TreatmentCatalogChanges {
    pub kode: Option<String>,
    pub nama: Option<String>,
    pub kategori: Option<String>,
    pub harga: Option<Decimal>,
    pub deskripsi: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMedicationCatalog {
    pub kode: String,
    pub nama: String,
    pub satuan: String,
    pub harga_beli: Decimal,
    pub harga_jual: Decimal,
    pub stok: i32,
    pub deskripsi: String,
}

#[derive(Debug, Clone, Default)]
pub struct MedicationCatalogChanges {
    pub kode: Option<String>,
    pub nama: Option<String>,
    pub satuan: Option<String>,
    pub harga_beli: Option<Decimal>,
    pub harga_jual: Option<Decimal>,
    pub stok: Option<i32>,
    pub deskripsi: Option<String>,
}

/// Storage for the treatment and medication catalogs.
///
/// Code lookups see live entries only; id lookups also return soft-deleted
/// entries so historical line items keep their catalog summary.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn create_treatment(&self, entry: NewTreatmentCatalog) -> Result<TreatmentCatalog>;
    async fn find_treatment(&self, id: i64) -> Result<Option<TreatmentCatalog>>;
    async fn treatments_by_codes(&self, codes: &[String]) -> Result<Vec<TreatmentCatalog>>;
    async fn treatments_by_ids(&self, ids: &[i64]) -> Result<Vec<TreatmentCatalog>>;
    /// Ordered by name, optional substring search over code and name.
    async fn list_treatments(&self, search: Option<&str>) -> Result<Vec<TreatmentCatalog>>;
    async fn update_treatment(&self, id: i64, changes: TreatmentCatalogChanges) -> Result<TreatmentCatalog>;
    async fn delete_treatment(&self, id: i64) -> Result<()>;

    async fn create_medication(&self, entry: NewMedicationCatalog) -> Result<MedicationCatalog>;
    async fn find_medication(&self, id: i64) -> Result<Option<MedicationCatalog>>;
    async fn medications_by_codes(&self, codes: &[String]) -> Result<Vec<MedicationCatalog>>;
    async fn medications_by_ids(&self, ids: &[i64]) -> Result<Vec<MedicationCatalog>>;
    async fn list_medications(&self, search: Option<&str>) -> Result<Vec<MedicationCatalog>>;
    async fn update_medication(&self, id: i64, changes: MedicationCatalogChanges) -> Result<MedicationCatalog>;
    async fn delete_medication(&self, id: i64) -> Result<()>;
}

/// Storage for medical record aggregates.
///
/// `create` and `replace` write the header and every owned row atomically.
/// Returned records carry their rows but not the patient or catalog
/// summaries.
#[async_trait]
pub trait EmrRepository: Send + Sync {
    /// Fails with `VisitIdTaken` when the visit id is already stored.
    async fn create(&self, draft: EmrDraft) -> Result<MedicalRecord>;
    async fn find_by_id(&self, id: i64) -> Result<Option<MedicalRecord>>;
    async fn find_by_visit_id(&self, visit_id: &str) -> Result<Option<MedicalRecord>>;
    /// Newest examination first.
    async fn list_by_patient(&self, patient_id: i64) -> Result<Vec<MedicalRecord>>;
    /// Patch the header and replace all three owned collections.
    async fn replace(&self, id: i64, header: EmrHeaderChanges, items: EmrItems) -> Result<MedicalRecord>;
    async fn visit_id_exists(&self, visit_id: &str) -> Result<bool>;
}

/// In-memory catalogs for testing and development
pub struct InMemoryCatalogRepository {
    treatments: RwLock<BTreeMap<i64, TreatmentCatalog>>,
    medications: RwLock<BTreeMap<i64, MedicationCatalog>>,
    next_id: AtomicI64,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self {
            treatments: RwLock::new(BTreeMap::new()),
            medications: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryCatalogRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_search(kode: &str, nama: &str, search: Option<&str>) -> bool {
    search.map_or(true, |term| contains_ignore_case(kode, term) || contains_ignore_case(nama, term))
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn create_treatment(&self, entry: NewTreatmentCatalog) -> Result<TreatmentCatalog> {
        let mut treatments = self.treatments.write();
        if treatments.values().any(|t| t.deleted_at.is_none() && t.kode == entry.kode) {
            return Err(EmrError::CatalogCodeTaken(entry.kode));
        }
        let now = Utc::now();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = TreatmentCatalog {
            id,
            kode: entry.kode,
            nama: entry.nama,
            kategori: entry.kategori,
            harga: entry.harga,
            deskripsi: entry.deskripsi,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        treatments.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_treatment(&self, id: i64) -> Result<Option<TreatmentCatalog>> {
        Ok(self.treatments.read().get(&id).filter(|t| t.deleted_at.is_none()).cloned())
    }

    async fn treatments_by_codes(&self, codes: &[String]) -> Result<Vec<TreatmentCatalog>> {
        Ok(self
            .treatments
            .read()
            .values()
            .filter(|t| t.deleted_at.is_none() && codes.contains(&t.kode))
            .cloned()
            .collect())
    }

    async fn treatments_by_ids(&self, ids: &[i64]) -> Result<Vec<TreatmentCatalog>> {
        let treatments = self.treatments.read();
        Ok(ids.iter().filter_map(|id| treatments.get(id).cloned()).collect())
    }

    async fn list_treatments(&self, search: Option<&str>) -> Result<Vec<TreatmentCatalog>> {
        let mut all: Vec<TreatmentCatalog> = self
            .treatments
            .read()
            .values()
            .filter(|t| t.deleted_at.is_none() && matches_search(&t.kode, &t.nama, search))
            .cloned()
            .collect();
        all.sort_by(|a, b| a.nama.cmp(&b.nama));
        Ok(all)
    }

    async fn update_treatment(&self, id: i64, changes: TreatmentCatalogChanges) -> Result<TreatmentCatalog> {
        let mut treatments = self.treatments.write();
        if let Some(kode) = &changes.kode {
            if treatments
                .values()
                .any(|t| t.deleted_at.is_none() && t.id != id && &t.kode == kode)
            {
                return Err(EmrError::CatalogCodeTaken(kode.clone()));
            }
        }
        let entry = treatments
            .get_mut(&id)
            .filter(|t| t.deleted_at.is_none())
            .ok_or(EmrError::TreatmentNotFound)?;
        if let Some(kode) = changes.kode {
            entry.kode = kode;
        }
        if let Some(nama) = changes.nama {
            entry.nama = nama;
        }
        if let Some(kategori) = changes.kategori {
            entry.kategori = kategori;
        }
        if let Some(harga) = changes.harga {
            entry.harga = harga;
        }
        if let Some(deskripsi) = changes.deskripsi {
            entry.deskripsi = deskripsi;
        }
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn delete_treatment(&self, id: i64) -> Result<()> {
        let mut treatments = self.treatments.write();
        let entry = treatments
            .get_mut(&id)
            .filter(|t| t.deleted_at.is_none())
            .ok_or(EmrError::TreatmentNotFound)?;
        entry.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn create_medication(&self, entry: NewMedicationCatalog) -> Result<MedicationCatalog> {
        let mut medications = self.medications.write();
        if medications.values().any(|m| m.deleted_at.is_none() && m.kode == entry.kode) {
            return Err(EmrError::CatalogCodeTaken(entry.kode));
        }
        let now = Utc::now();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = MedicationCatalog {
            id,
            kode: entry.kode,
            nama: entry.nama,
            satuan: entry.satuan,
            harga_beli: entry.harga_beli,
            harga_jual: entry.harga_jual,
            stok: entry.stok,
            deskripsi: entry.deskripsi,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        medications.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_medication(&self, id: i64) -> Result<Option<MedicationCatalog>> {
        Ok(self.medications.read().get(&id).filter(|m| m.deleted_at.is_none()).cloned())
    }

    async fn medications_by_codes(&self, codes: &[String]) -> Result<Vec<MedicationCatalog>> {
        Ok(self
            .medications
            .read()
            .values()
            .filter(|m| m.deleted_at.is_none() && codes.contains(&m.kode))
            .cloned()
            .collect())
    }

    async fn medications_by_ids(&self, ids: &[i64]) -> Result<Vec<MedicationCatalog>> {
        let medications = self.medications.read();
        Ok(ids.iter().filter_map(|id| medications.get(id).cloned()).collect())
    }

    async fn list_medications(&self, search: Option<&str>) -> Result<Vec<MedicationCatalog>> {
        let mut all: Vec<MedicationCatalog> = self
            .medications
            .read()
            .values()
            .filter(|m| m.deleted_at.is_none() && matches_search(&m.kode, &m.nama, search))
            .cloned()
            .collect();
        all.sort_by(|a, b| a.nama.cmp(&b.nama));
        Ok(all)
    }

    async fn update_medication(&self, id: i64, changes: MedicationCatalogChanges) -> Result<MedicationCatalog> {
        let mut medications = self.medications.write();
        if let Some(kode) = &changes.kode {
            if medications
                .values()
                .any(|m| m.deleted_at.is_none() && m.id != id && &m.kode == kode)
            {
                return Err(EmrError::CatalogCodeTaken(kode.clone()));
            }
        }
        let entry = medications
            .get_mut(&id)
            .filter(|m| m.deleted_at.is_none())
            .ok_or(EmrError::MedicationNotFound)?;
        if let Some(kode) = changes.kode {
            entry.kode = kode;
        }
        if let Some(nama) = changes.nama {
            entry.nama = nama;
        }
        if let Some(satuan) = changes.satuan {
            entry.satuan = satuan;
        }
        if let Some(harga_beli) = changes.harga_beli {
            entry.harga_beli = harga_beli;
        }
        if let Some(harga_jual) = changes.harga_jual {
            entry.harga_jual = harga_jual;
        }
        if let Some(stok) = changes.stok {
            entry.stok = stok;
        }
        if let Some(deskripsi) = changes.deskripsi {
            entry.deskripsi = deskripsi;
        }
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn delete_medication(&self, id: i64) -> Result<()> {
        let mut medications = self.medications.write();
        let entry = medications
            .get_mut(&id)
            .filter(|m| m.deleted_at.is_none())
            .ok_or(EmrError::MedicationNotFound)?;
        entry.deleted_at = Some(Utc::now());
        Ok(())
    }
}

/// In-memory medical records for testing and development.
///
/// A record and its rows are swapped under one write lock, which gives the
/// same all-or-nothing visibility as the transactional store.
pub struct InMemoryEmrRepository {
    records: RwLock<BTreeMap<i64, MedicalRecord>>,
    next_id: AtomicI64,
    next_row_id: AtomicI64,
}

impl InMemoryEmrRepository {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            next_row_id: AtomicI64::new(1),
        }
    }

    fn row_id(&self) -> i64 {
        self.next_row_id.fetch_add(1, Ordering::SeqCst)
    }

    fn materialize(&self, record: &mut MedicalRecord, items: EmrItems) {
        let record_id = record.id;
        record.treatments = items
            .treatments
            .into_iter()
            .map(|t| TreatmentItem {
                id: self.row_id(),
                medical_record_id: record_id,
                treatment_catalog_id: t.treatment_catalog_id,
                treatment_catalog: None,
                tooth_number: t.tooth_number,
                quantity: t.quantity,
                price_at_time: t.price_at_time,
                discount_percent: t.discount_percent,
                sub_total: t.sub_total,
                notes: t.notes,
            })
            .collect();
        record.medications = items
            .medications
            .into_iter()
            .map(|m| MedicationItem {
                id: self.row_id(),
                medical_record_id: record_id,
                medication_catalog_id: m.medication_catalog_id,
                medication_catalog: None,
                quantity: m.quantity,
                price_per_unit_at_time: m.price_per_unit_at_time,
                sub_total: m.sub_total,
                instruction: m.instruction,
            })
            .collect();
        record.odontogram = items
            .odontogram
            .into_iter()
            .map(|d| {
                let detail_id = self.row_id();
                OdontogramDetail {
                    id: detail_id,
                    medical_record_id: record_id,
                    tooth_number: d.tooth_number,
                    condition: d.condition,
                    treatment_note: d.treatment_note,
                    history: d
                        .history
                        .into_iter()
                        .map(|h| OdontogramHistory {
                            id: self.row_id(),
                            odontogram_detail_id: detail_id,
                            date: h.date,
                            doctor_name: h.doctor_name,
                            from_condition: h.from_condition,
                            to_condition: h.to_condition,
                            note: h.note,
                        })
                        .collect(),
                }
            })
            .collect();
    }
}

impl Default for InMemoryEmrRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmrRepository for InMemoryEmrRepository {
    async fn create(&self, draft: EmrDraft) -> Result<MedicalRecord> {
        let mut records = self.records.write();
        if records.values().any(|r| r.visit_id == draft.visit_id) {
            return Err(EmrError::VisitIdTaken(draft.visit_id));
        }

        let now = Utc::now();
        let mut record = MedicalRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            visit_id: draft.visit_id,
            patient_id: draft.patient_id,
            patient: None,
            doctor_id: draft.doctor_id,
            doctor_name: draft.doctor_name,
            exam_date: draft.exam_date,
            visit_type: draft.visit_type,
            complaint: draft.complaint,
            examination: draft.examination,
            diagnosis: draft.diagnosis,
            treatment_plan: draft.treatment_plan,
            notes: draft.notes,
            billing_status: draft.billing_status,
            treatments: Vec::new(),
            medications: Vec::new(),
            odontogram: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.materialize(&mut record, draft.items);
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<MedicalRecord>> {
        Ok(self.records.read().get(&id).cloned())
    }

    async fn find_by_visit_id(&self, visit_id: &str) -> Result<Option<MedicalRecord>> {
        Ok(self.records.read().values().find(|r| r.visit_id == visit_id).cloned())
    }

    async fn list_by_patient(&self, patient_id: i64) -> Result<Vec<MedicalRecord>> {
        let mut matching: Vec<MedicalRecord> = self
            .records
            .read()
            .values()
            .filter(|r| r.patient_id == patient_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.exam_date.cmp(&a.exam_date).then_with(|| b.id.cmp(&a.id)));
        Ok(matching)
    }

    async fn replace(&self, id: i64, header: EmrHeaderChanges, items: EmrItems) -> Result<MedicalRecord> {
        let mut records = self.records.write();
        let mut record = records.get(&id).cloned().ok_or(EmrError::RecordNotFound)?;

        if let Some(doctor_id) = header.doctor_id {
            record.doctor_id = doctor_id;
        }
        if let Some(doctor_name) = header.doctor_name {
            record.doctor_name = doctor_name;
        }
        if let Some(visit_type) = header.visit_type {
            record.visit_type = visit_type;
        }
        if let Some(complaint) = header.complaint {
            record.complaint = complaint;
        }
        if let Some(examination) = header.examination {
            record.examination = examination;
        }
        if let Some(diagnosis) = header.diagnosis {
            record.diagnosis = diagnosis;
        }
        if let Some(treatment_plan) = header.treatment_plan {
            record.treatment_plan = treatment_plan;
        }
        if let Some(notes) = header.notes {
            record.notes = notes;
        }
        if let Some(billing_status) = header.billing_status {
            record.billing_status = billing_status;
        }
        record.updated_at = Utc::now();
        self.materialize(&mut record, items);

        records.insert(id, record.clone());
        Ok(record)
    }

    async fn visit_id_exists(&self, visit_id: &str) -> Result<bool> {
        Ok(self.records.read().values().any(|r| r.visit_id == visit_id))
    }
}
