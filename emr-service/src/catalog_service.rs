use crate::{
    error::*,
    models::*,
    repository::{
        CatalogRepository, MedicationCatalogChanges, NewMedicationCatalog, NewTreatmentCatalog,
        TreatmentCatalogChanges,
    },
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

/// Master data for billable treatments and dispensable medications.
pub struct CatalogService {
    catalogs: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    pub fn new(catalogs: Arc<dyn CatalogRepository>) -> Self {
        Self { catalogs }
    }

    pub fn store(&self) -> Arc<dyn CatalogRepository> {
        Arc::clone(&self.catalogs)
    }

    pub async fn list_treatments(&self, search: Option<&str>) -> Result<Vec<TreatmentCatalog>> {
        self.catalogs
            .list_treatments(search.map(str::trim).filter(|s| !s.is_empty()))
            .await
    }

    pub async fn get_treatment(&self, id: i64) -> Result<TreatmentCatalog> {
        self.catalogs.find_treatment(id).await?.ok_or(EmrError::TreatmentNotFound)
    }

    pub async fn create_treatment(&self, request: CreateTreatmentCatalog) -> Result<TreatmentCatalog> {
        let kode = required("kode", &request.kode)?;
        let nama = required("nama", &request.nama)?;
        non_negative("harga", request.harga)?;
        if !self.catalogs.treatments_by_codes(&[kode.clone()]).await?.is_empty() {
            return Err(EmrError::CatalogCodeTaken(kode));
        }

        let entry = self
            .catalogs
            .create_treatment(NewTreatmentCatalog {
                kode,
                nama,
                kategori: trimmed(request.kategori),
                harga: request.harga,
                deskripsi: trimmed(request.deskripsi),
            })
            .await?;
        info!(treatment_id = entry.id, kode = %entry.kode, "Treatment catalog entry created");
        Ok(entry)
    }

    pub async fn update_treatment(&self, id: i64, request: UpdateTreatmentCatalog) -> Result<TreatmentCatalog> {
        let existing = self.get_treatment(id).await?;
        let kode = optional_required("kode", request.kode)?;
        if let Some(kode) = kode.as_ref().filter(|k| **k != existing.kode) {
            if !self.catalogs.treatments_by_codes(&[kode.clone()]).await?.is_empty() {
                return Err(EmrError::CatalogCodeTaken(kode.clone()));
            }
        }
        if let Some(harga) = request.harga {
            non_negative("harga", harga)?;
        }

        let entry = self
            .catalogs
            .update_treatment(
                id,
                TreatmentCatalogChanges {
                    kode,
                    nama: optional_required("nama", request.nama)?,
                    kategori: request.kategori.map(|k| k.trim().to_string()),
                    harga: request.harga,
                    deskripsi: request.deskripsi.map(|d| d.trim().to_string()),
                },
            )
            .await?;
        info!(treatment_id = id, "Treatment catalog entry updated");
        Ok(entry)
    }

    pub async fn delete_treatment(&self, id: i64) -> Result<()> {
        self.catalogs.delete_treatment(id).await?;
        info!(treatment_id = id, "Treatment catalog entry deleted");
        Ok(())
    }

    pub async fn list_medications(&self, search: Option<&str>) -> Result<Vec<MedicationCatalog>> {
        self.catalogs
            .list_medications(search.map(str::trim).filter(|s| !s.is_empty()))
            .await
    }

    pub async fn get_medication(&self, id: i64) -> Result<MedicationCatalog> {
        self.catalogs.find_medication(id).await?.ok_or(EmrError::MedicationNotFound)
    }

    pub async fn create_medication(&self, request: CreateMedicationCatalog) -> Result<MedicationCatalog> {
        let kode = required("kode", &request.kode)?;
        let nama = required("nama", &request.nama)?;
        let harga_beli = request.harga_beli.unwrap_or(Decimal::ZERO);
        non_negative("hargaBeli", harga_beli)?;
        non_negative("hargaJual", request.harga_jual)?;
        let stok = request.stok.unwrap_or(0);
        if stok < 0 {
            return Err(EmrError::validation("stok", "must not be negative"));
        }
        if !self.catalogs.medications_by_codes(&[kode.clone()]).await?.is_empty() {
            return Err(EmrError::CatalogCodeTaken(kode));
        }

        let entry = self
            .catalogs
            .create_medication(NewMedicationCatalog {
                kode,
                nama,
                satuan: trimmed(request.satuan),
                harga_beli,
                harga_jual: request.harga_jual,
                stok,
                deskripsi: trimmed(request.deskripsi),
            })
            .await?;
        info!(medication_id = entry.id, kode = %entry.kode, "Medication catalog entry created");
        Ok(entry)
    }

    pub async fn update_medication(&self, id: i64, request: UpdateMedicationCatalog) -> Result<MedicationCatalog> {
        let existing = self.get_medication(id).await?;
        let kode = optional_required("kode", request.kode)?;
        if let Some(kode) = kode.as_ref().filter(|k| **k != existing.kode) {
            if !self.catalogs.medications_by_codes(&[kode.clone()]).await?.is_empty() {
                return Err(EmrError::CatalogCodeTaken(kode.clone()));
            }
        }
        if let Some(harga_beli) = request.harga_beli {
            non_negative("hargaBeli", harga_beli)?;
        }
        if let Some(harga_jual) = request.harga_jual {
            non_negative("hargaJual", harga_jual)?;
        }
        if request.stok.is_some_and(|s| s < 0) {
            return Err(EmrError::validation("stok", "must not be negative"));
        }

        let entry = self
            .catalogs
            .update_medication(
                id,
                MedicationCatalogChanges {
                    kode,
                    nama: optional_required("nama", request.nama)?,
                    satuan: request.satuan.map(|s| s.trim().to_string()),
                    harga_beli: request.harga_beli,
                    harga_jual: request.harga_jual,
                    stok: request.stok,
                    deskripsi: request.deskripsi.map(|d| d.trim().to_string()),
                },
            )
            .await?;
        info!(medication_id = id, "Medication catalog entry updated");
        Ok(entry)
    }

    pub async fn delete_medication(&self, id: i64) -> Result<()> {
        self.catalogs.delete_medication(id).await?;
        info!(medication_id = id, "Medication catalog entry deleted");
        Ok(())
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(EmrError::validation(field, "is required"));
    }
    Ok(value.to_string())
}

/// A present value must not be blank.
fn optional_required(field: &str, value: Option<String>) -> Result<Option<String>> {
    value.map(|v| required(field, &v)).transpose()
}

fn trimmed(value: Option<String>) -> String {
    value.unwrap_or_default().trim().to_string()
}

fn non_negative(field: &str, value: Decimal) -> Result<()> {
    crate::pricing::check_price(value, field)
}
