//! Treatment and medication master data

use emr_service::{
    CatalogService, CreateMedicationCatalog, CreateTreatmentCatalog, EmrError, InMemoryCatalogRepository,
    UpdateMedicationCatalog, UpdateTreatmentCatalog,
};
use rust_decimal::Decimal;
use std::sync::Arc;

fn service() -> CatalogService {
    CatalogService::new(Arc::new(InMemoryCatalogRepository::new()))
}

fn treatment(kode: &str, nama: &str, harga: i64) -> CreateTreatmentCatalog {
    CreateTreatmentCatalog {
        kode: kode.to_string(),
        nama: nama.to_string(),
        kategori: None,
        harga: Decimal::from(harga),
        deskripsi: None,
    }
}

fn medication(kode: &str, nama: &str) -> CreateMedicationCatalog {
    CreateMedicationCatalog {
        kode: kode.to_string(),
        nama: nama.to_string(),
        satuan: Some("tablet".to_string()),
        harga_beli: None,
        harga_jual: Decimal::from(2500),
        stok: None,
        deskripsi: None,
    }
}

#[tokio::test]
async fn test_treatments_list_by_name_and_search() {
    let catalogs = service();
    catalogs.create_treatment(treatment("T02", "Tambal Komposit", 250_000)).await.unwrap();
    catalogs.create_treatment(treatment("T01", "Scaling", 150_000)).await.unwrap();
    catalogs.create_treatment(treatment("T03", "Cabut Gigi", 200_000)).await.unwrap();

    let names: Vec<String> = catalogs
        .list_treatments(None)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.nama)
        .collect();
    assert_eq!(names, vec!["Cabut Gigi", "Scaling", "Tambal Komposit"]);

    let found = catalogs.list_treatments(Some(" scal ")).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].kode, "T01");

    let by_code = catalogs.list_treatments(Some("t03")).await.unwrap();
    assert_eq!(by_code[0].nama, "Cabut Gigi");
}

#[tokio::test]
async fn test_duplicate_codes_conflict() {
    let catalogs = service();
    catalogs.create_treatment(treatment("T01", "Scaling", 150_000)).await.unwrap();
    let other = catalogs.create_treatment(treatment("T02", "Bleaching", 900_000)).await.unwrap();

    let err = catalogs
        .create_treatment(treatment(" T01 ", "Scaling Ulang", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, EmrError::CatalogCodeTaken(ref kode) if kode == "T01"));

    let err = catalogs
        .update_treatment(
            other.id,
            UpdateTreatmentCatalog {
                kode: Some("T01".to_string()),
                ..UpdateTreatmentCatalog::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EmrError::CatalogCodeTaken(_)));

    // Keeping its own code is not a conflict.
    let kept = catalogs
        .update_treatment(
            other.id,
            UpdateTreatmentCatalog {
                kode: Some("T02".to_string()),
                harga: Some(Decimal::from(950_000)),
                ..UpdateTreatmentCatalog::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(kept.harga, Decimal::from(950_000));
}

#[tokio::test]
async fn test_invalid_values_are_rejected() {
    let catalogs = service();

    let err = catalogs.create_treatment(treatment("  ", "Scaling", 1)).await.unwrap_err();
    assert!(matches!(err, EmrError::Validation { ref field, .. } if field == "kode"));

    let err = catalogs.create_treatment(treatment("T01", "Scaling", -5)).await.unwrap_err();
    assert!(matches!(err, EmrError::Validation { ref field, .. } if field == "harga"));

    let err = catalogs
        .create_medication(CreateMedicationCatalog {
            stok: Some(-1),
            ..medication("M01", "Amoxicillin")
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EmrError::Validation { ref field, .. } if field == "stok"));
}

#[tokio::test]
async fn test_medication_defaults_update_and_delete() {
    let catalogs = service();
    let created = catalogs.create_medication(medication("M01", "Amoxicillin")).await.unwrap();
    assert_eq!(created.stok, 0);
    assert_eq!(created.harga_beli, Decimal::ZERO);

    let updated = catalogs
        .update_medication(
            created.id,
            UpdateMedicationCatalog {
                stok: Some(40),
                nama: Some("Amoxicillin 500mg".to_string()),
                ..UpdateMedicationCatalog::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.stok, 40);
    assert_eq!(updated.nama, "Amoxicillin 500mg");
    assert_eq!(updated.satuan, "tablet");

    catalogs.delete_medication(created.id).await.unwrap();
    assert!(matches!(
        catalogs.get_medication(created.id).await,
        Err(EmrError::MedicationNotFound)
    ));
    assert!(matches!(
        catalogs.delete_medication(created.id).await,
        Err(EmrError::MedicationNotFound)
    ));
    assert!(catalogs.list_medications(None).await.unwrap().is_empty());

    // The code is free again once the entry is gone.
    catalogs.create_medication(medication("M01", "Amoxicillin")).await.unwrap();
}
