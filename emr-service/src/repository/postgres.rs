//! PostgreSQL-backed catalog and medical record repositories

use crate::{
    error::*,
    models::*,
    record::*,
    repository::{
        CatalogRepository, EmrRepository, MedicationCatalogChanges, NewMedicationCatalog, NewTreatmentCatalog,
        TreatmentCatalogChanges,
    },
};
use async_trait::async_trait;
use database_layer::{like_pattern, DatabaseError, DatabasePool};
use sqlx::{Postgres, Transaction};
use std::collections::HashMap;
use tracing::{debug, info};

const TREATMENT_COLUMNS: &str = "id, kode, nama, kategori, harga, deskripsi, created_at, updated_at, deleted_at";
const MEDICATION_COLUMNS: &str =
    "id, kode, nama, satuan, harga_beli, harga_jual, stok, deskripsi, created_at, updated_at, deleted_at";
const RECORD_COLUMNS: &str = "id, visit_id, patient_id, doctor_id, doctor_name, exam_date, visit_type, complaint, \
     examination, diagnosis, treatment_plan, notes, billing_status, created_at, updated_at";

fn map_catalog_write_error(err: sqlx::Error, kode: &str) -> EmrError {
    let err = DatabaseError::SqlxError(err);
    if err.is_unique_violation() {
        EmrError::CatalogCodeTaken(kode.to_string())
    } else {
        EmrError::Database(err)
    }
}

pub struct PostgresCatalogRepository {
    pool: DatabasePool,
}

impl PostgresCatalogRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    async fn create_treatment(&self, entry: NewTreatmentCatalog) -> Result<TreatmentCatalog> {
        let sql = format!(
            "INSERT INTO treatment_catalogs (kode, nama, kategori, harga, deskripsi) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            TREATMENT_COLUMNS
        );
        sqlx::query_as::<_, TreatmentCatalog>(&sql)
            .bind(&entry.kode)
            .bind(&entry.nama)
            .bind(&entry.kategori)
            .bind(entry.harga)
            .bind(&entry.deskripsi)
            .fetch_one(self.pool.pool())
            .await
            .map_err(|e| map_catalog_write_error(e, &entry.kode))
    }

    async fn find_treatment(&self, id: i64) -> Result<Option<TreatmentCatalog>> {
        let sql = format!(
            "SELECT {} FROM treatment_catalogs WHERE id = $1 AND deleted_at IS NULL",
            TREATMENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, TreatmentCatalog>(&sql)
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?)
    }

    async fn treatments_by_codes(&self, codes: &[String]) -> Result<Vec<TreatmentCatalog>> {
        let sql = format!(
            "SELECT {} FROM treatment_catalogs WHERE kode = ANY($1) AND deleted_at IS NULL",
            TREATMENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, TreatmentCatalog>(&sql)
            .bind(codes)
            .fetch_all(self.pool.pool())
            .await?)
    }

    async fn treatments_by_ids(&self, ids: &[i64]) -> Result<Vec<TreatmentCatalog>> {
        let sql = format!("SELECT {} FROM treatment_catalogs WHERE id = ANY($1)", TREATMENT_COLUMNS);
        Ok(sqlx::query_as::<_, TreatmentCatalog>(&sql)
            .bind(ids)
            .fetch_all(self.pool.pool())
            .await?)
    }

    async fn list_treatments(&self, search: Option<&str>) -> Result<Vec<TreatmentCatalog>> {
        let sql = format!(
            "SELECT {} FROM treatment_catalogs WHERE deleted_at IS NULL \
             AND ($1::text IS NULL OR kode ILIKE $1 OR nama ILIKE $1) ORDER BY nama",
            TREATMENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, TreatmentCatalog>(&sql)
            .bind(search.map(like_pattern))
            .fetch_all(self.pool.pool())
            .await?)
    }

    async fn update_treatment(&self, id: i64, changes: TreatmentCatalogChanges) -> Result<TreatmentCatalog> {
        let sql = format!(
            "UPDATE treatment_catalogs SET \
                kode = COALESCE($2, kode), \
                nama = COALESCE($3, nama), \
                kategori = COALESCE($4, kategori), \
                harga = COALESCE($5, harga), \
                deskripsi = COALESCE($6, deskripsi), \
                updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {}",
            TREATMENT_COLUMNS
        );
        let kode = changes.kode.clone().unwrap_or_default();
        sqlx::query_as::<_, TreatmentCatalog>(&sql)
            .bind(id)
            .bind(&changes.kode)
            .bind(&changes.nama)
            .bind(&changes.kategori)
            .bind(changes.harga)
            .bind(&changes.deskripsi)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| map_catalog_write_error(e, &kode))?
            .ok_or(EmrError::TreatmentNotFound)
    }

    async fn delete_treatment(&self, id: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE treatment_catalogs SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(self.pool.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(EmrError::TreatmentNotFound);
        }
        Ok(())
    }

    async fn create_medication(&self, entry: NewMedicationCatalog) -> Result<MedicationCatalog> {
        let sql = format!(
            "INSERT INTO medication_catalogs (kode, nama, satuan, harga_beli, harga_jual, stok, deskripsi) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            MEDICATION_COLUMNS
        );
        sqlx::query_as::<_, MedicationCatalog>(&sql)
            .bind(&entry.kode)
            .bind(&entry.nama)
            .bind(&entry.satuan)
            .bind(entry.harga_beli)
            .bind(entry.harga_jual)
            .bind(entry.stok)
            .bind(&entry.deskripsi)
            .fetch_one(self.pool.pool())
            .await
            .map_err(|e| map_catalog_write_error(e, &entry.kode))
    }

    async fn find_medication(&self, id: i64) -> Result<Option<MedicationCatalog>> {
        let sql = format!(
            "SELECT {} FROM medication_catalogs WHERE id = $1 AND deleted_at IS NULL",
            MEDICATION_COLUMNS
        );
        Ok(sqlx::query_as::<_, MedicationCatalog>(&sql)
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?)
    }

    async fn medications_by_codes(&self, codes: &[String]) -> Result<Vec<MedicationCatalog>> {
        let sql = format!(
            "SELECT {} FROM medication_catalogs WHERE kode = ANY($1) AND deleted_at IS NULL",
            MEDICATION_COLUMNS
        );
        Ok(sqlx::query_as::<_, MedicationCatalog>(&sql)
            .bind(codes)
            .fetch_all(self.pool.pool())
            .await?)
    }

    async fn medications_by_ids(&self, ids: &[i64]) -> Result<Vec<MedicationCatalog>> {
        let sql = format!("SELECT {} FROM medication_catalogs WHERE id = ANY($1)", MEDICATION_COLUMNS);
        Ok(sqlx::query_as::<_, MedicationCatalog>(&sql)
            .bind(ids)
            .fetch_all(self.pool.pool())
            .await?)
    }

    async fn list_medications(&self, search: Option<&str>) -> Result<Vec<MedicationCatalog>> {
        let sql = format!(
            "SELECT {} FROM medication_catalogs WHERE deleted_at IS NULL \
             AND ($1::text IS NULL OR kode ILIKE $1 OR nama ILIKE $1) ORDER BY nama",
            MEDICATION_COLUMNS
        );
        Ok(sqlx::query_as::<_, MedicationCatalog>(&sql)
            .bind(search.map(like_pattern))
            .fetch_all(self.pool.pool())
            .await?)
    }

    async fn update_medication(&self, id: i64, changes: MedicationCatalogChanges) -> Result<MedicationCatalog> {
        let sql = format!(
            "UPDATE medication_catalogs SET \
                kode = COALESCE($2, kode), \
                nama = COALESCE($3, nama), \
                satuan = COALESCE($4, satuan), \
                harga_beli = COALESCE($5, harga_beli), \
                harga_jual = COALESCE($6, harga_jual), \
                stok = COALESCE($7, stok), \
                deskripsi = COALESCE($8, deskripsi), \
                updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {}",
            MEDICATION_COLUMNS
        );
        let kode = changes.kode.clone().unwrap_or_default();
        sqlx::query_as::<_, MedicationCatalog>(&sql)
            .bind(id)
            .bind(&changes.kode)
            .bind(&changes.nama)
            .bind(&changes.satuan)
            .bind(changes.harga_beli)
            .bind(changes.harga_jual)
            .bind(changes.stok)
            .bind(&changes.deskripsi)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| map_catalog_write_error(e, &kode))?
            .ok_or(EmrError::MedicationNotFound)
    }

    async fn delete_medication(&self, id: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE medication_catalogs SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(self.pool.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(EmrError::MedicationNotFound);
        }
        Ok(())
    }
}

pub struct PostgresEmrRepository {
    pool: DatabasePool,
}

impl PostgresEmrRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Load the owned rows of every record in `records`.
    async fn hydrate(&self, mut records: Vec<MedicalRecord>) -> Result<Vec<MedicalRecord>> {
        if records.is_empty() {
            return Ok(records);
        }
        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();

        let treatments = sqlx::query_as::<_, TreatmentItem>(
            "SELECT id, medical_record_id, treatment_catalog_id, tooth_number, quantity, price_at_time, \
             discount_percent, sub_total, notes FROM medical_record_treatment_items \
             WHERE medical_record_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(self.pool.pool())
        .await?;

        let medications = sqlx::query_as::<_, MedicationItem>(
            "SELECT id, medical_record_id, medication_catalog_id, quantity, price_per_unit_at_time, sub_total, \
             instruction FROM medical_record_medication_items WHERE medical_record_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(self.pool.pool())
        .await?;

        let details = sqlx::query_as::<_, OdontogramDetail>(
            "SELECT id, medical_record_id, tooth_number, condition, treatment_note FROM odontogram_details \
             WHERE medical_record_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(self.pool.pool())
        .await?;

        let detail_ids: Vec<i64> = details.iter().map(|d| d.id).collect();
        let histories = sqlx::query_as::<_, OdontogramHistory>(
            "SELECT id, odontogram_detail_id, date, doctor_name, from_condition, to_condition, note \
             FROM odontogram_histories WHERE odontogram_detail_id = ANY($1) ORDER BY date, id",
        )
        .bind(&detail_ids)
        .fetch_all(self.pool.pool())
        .await?;

        let mut history_by_detail: HashMap<i64, Vec<OdontogramHistory>> = HashMap::new();
        for history in histories {
            history_by_detail.entry(history.odontogram_detail_id).or_default().push(history);
        }

        let mut treatments_by_record: HashMap<i64, Vec<TreatmentItem>> = HashMap::new();
        for item in treatments {
            treatments_by_record.entry(item.medical_record_id).or_default().push(item);
        }
        let mut medications_by_record: HashMap<i64, Vec<MedicationItem>> = HashMap::new();
        for item in medications {
            medications_by_record.entry(item.medical_record_id).or_default().push(item);
        }
        let mut details_by_record: HashMap<i64, Vec<OdontogramDetail>> = HashMap::new();
        for mut detail in details {
            detail.history = history_by_detail.remove(&detail.id).unwrap_or_default();
            details_by_record.entry(detail.medical_record_id).or_default().push(detail);
        }

        for record in &mut records {
            record.treatments = treatments_by_record.remove(&record.id).unwrap_or_default();
            record.medications = medications_by_record.remove(&record.id).unwrap_or_default();
            record.odontogram = details_by_record.remove(&record.id).unwrap_or_default();
        }
        Ok(records)
    }

    async fn hydrate_one(&self, record: Option<MedicalRecord>) -> Result<Option<MedicalRecord>> {
        match record {
            Some(record) => Ok(self.hydrate(vec![record]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    async fn reload(&self, id: i64) -> Result<MedicalRecord> {
        self.find_by_id(id).await?.ok_or(EmrError::RecordNotFound)
    }

    async fn insert_items(tx: &mut Transaction<'static, Postgres>, record_id: i64, items: &EmrItems) -> Result<()> {
        for item in &items.treatments {
            sqlx::query(
                "INSERT INTO medical_record_treatment_items (medical_record_id, treatment_catalog_id, tooth_number, \
                 quantity, price_at_time, discount_percent, sub_total, notes) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(record_id)
            .bind(item.treatment_catalog_id)
            .bind(&item.tooth_number)
            .bind(item.quantity)
            .bind(item.price_at_time)
            .bind(item.discount_percent)
            .bind(item.sub_total)
            .bind(&item.notes)
            .execute(&mut **tx)
            .await?;
        }

        for item in &items.medications {
            sqlx::query(
                "INSERT INTO medical_record_medication_items (medical_record_id, medication_catalog_id, quantity, \
                 price_per_unit_at_time, sub_total, instruction) VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(record_id)
            .bind(item.medication_catalog_id)
            .bind(item.quantity)
            .bind(item.price_per_unit_at_time)
            .bind(item.sub_total)
            .bind(&item.instruction)
            .execute(&mut **tx)
            .await?;
        }

        for detail in &items.odontogram {
            let (detail_id,): (i64,) = sqlx::query_as(
                "INSERT INTO odontogram_details (medical_record_id, tooth_number, condition, treatment_note) \
                 VALUES ($1, $2, $3, $4) RETURNING id",
            )
            .bind(record_id)
            .bind(&detail.tooth_number)
            .bind(detail.condition)
            .bind(&detail.treatment_note)
            .fetch_one(&mut **tx)
            .await?;

            for history in &detail.history {
                sqlx::query(
                    "INSERT INTO odontogram_histories (odontogram_detail_id, date, doctor_name, from_condition, \
                     to_condition, note) VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(detail_id)
                .bind(history.date)
                .bind(&history.doctor_name)
                .bind(history.from_condition)
                .bind(history.to_condition)
                .bind(&history.note)
                .execute(&mut **tx)
                .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EmrRepository for PostgresEmrRepository {
    async fn create(&self, draft: EmrDraft) -> Result<MedicalRecord> {
        let mut tx = self.pool.begin().await?;

        let inserted: std::result::Result<(i64,), sqlx::Error> = sqlx::query_as(
            "INSERT INTO medical_records (visit_id, patient_id, doctor_id, doctor_name, exam_date, visit_type, \
             complaint, examination, diagnosis, treatment_plan, notes, billing_status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING id",
        )
        .bind(&draft.visit_id)
        .bind(draft.patient_id)
        .bind(draft.doctor_id)
        .bind(&draft.doctor_name)
        .bind(draft.exam_date)
        .bind(&draft.visit_type)
        .bind(&draft.complaint)
        .bind(&draft.examination)
        .bind(&draft.diagnosis)
        .bind(&draft.treatment_plan)
        .bind(&draft.notes)
        .bind(draft.billing_status)
        .fetch_one(&mut *tx)
        .await;

        let (record_id,) = match inserted {
            Ok(row) => row,
            Err(err) => {
                let err = DatabaseError::SqlxError(err);
                return Err(if err.is_unique_violation() {
                    EmrError::VisitIdTaken(draft.visit_id)
                } else {
                    EmrError::Database(err)
                });
            }
        };

        Self::insert_items(&mut tx, record_id, &draft.items).await?;
        tx.commit().await?;

        info!(
            record_id,
            visit_id = %draft.visit_id,
            treatments = draft.items.treatments.len(),
            medications = draft.items.medications.len(),
            teeth = draft.items.odontogram.len(),
            "Medical record stored"
        );
        self.reload(record_id).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<MedicalRecord>> {
        let sql = format!(
            "SELECT {} FROM medical_records WHERE id = $1 AND deleted_at IS NULL",
            RECORD_COLUMNS
        );
        let record = sqlx::query_as::<_, MedicalRecord>(&sql)
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?;
        self.hydrate_one(record).await
    }

    async fn find_by_visit_id(&self, visit_id: &str) -> Result<Option<MedicalRecord>> {
        let sql = format!(
            "SELECT {} FROM medical_records WHERE visit_id = $1 AND deleted_at IS NULL",
            RECORD_COLUMNS
        );
        let record = sqlx::query_as::<_, MedicalRecord>(&sql)
            .bind(visit_id)
            .fetch_optional(self.pool.pool())
            .await?;
        self.hydrate_one(record).await
    }

    async fn list_by_patient(&self, patient_id: i64) -> Result<Vec<MedicalRecord>> {
        let sql = format!(
            "SELECT {} FROM medical_records WHERE patient_id = $1 AND deleted_at IS NULL \
             ORDER BY exam_date DESC, id DESC",
            RECORD_COLUMNS
        );
        let records = sqlx::query_as::<_, MedicalRecord>(&sql)
            .bind(patient_id)
            .fetch_all(self.pool.pool())
            .await?;
        self.hydrate(records).await
    }

    async fn replace(&self, id: i64, header: EmrHeaderChanges, items: EmrItems) -> Result<MedicalRecord> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE medical_records SET \
                doctor_id = COALESCE($2, doctor_id), \
                doctor_name = COALESCE($3, doctor_name), \
                visit_type = COALESCE($4, visit_type), \
                complaint = COALESCE($5, complaint), \
                examination = COALESCE($6, examination), \
                diagnosis = COALESCE($7, diagnosis), \
                treatment_plan = COALESCE($8, treatment_plan), \
                notes = COALESCE($9, notes), \
                billing_status = COALESCE($10, billing_status), \
                updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(header.doctor_id)
        .bind(&header.doctor_name)
        .bind(&header.visit_type)
        .bind(&header.complaint)
        .bind(&header.examination)
        .bind(&header.diagnosis)
        .bind(&header.treatment_plan)
        .bind(&header.notes)
        .bind(header.billing_status.map(|s| s.as_str()))
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(EmrError::RecordNotFound);
        }

        debug!(record_id = id, "Replacing owned rows of medical record");
        sqlx::query("DELETE FROM medical_record_treatment_items WHERE medical_record_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM medical_record_medication_items WHERE medical_record_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "DELETE FROM odontogram_histories WHERE odontogram_detail_id IN \
             (SELECT id FROM odontogram_details WHERE medical_record_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM odontogram_details WHERE medical_record_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        Self::insert_items(&mut tx, id, &items).await?;
        tx.commit().await?;

        info!(record_id = id, "Medical record updated");
        self.reload(id).await
    }

    async fn visit_id_exists(&self, visit_id: &str) -> Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM medical_records WHERE visit_id = $1)")
                .bind(visit_id)
                .fetch_one(self.pool.pool())
                .await?;
        Ok(exists)
    }
}
