//! Medical record aggregate over the in-memory repositories

use auth_identity::{InMemoryUserRepository, NewUser, UserRepository, UserStatus};
use chrono::{Duration, TimeZone, Utc};
use emr_service::{
    BillingStatus, CatalogService, CreateEmr, CreateMedicationCatalog, CreateTreatmentCatalog, EmrError, EmrService,
    HistoryInput, InMemoryCatalogRepository, InMemoryEmrRepository, MedicationInput, OdontogramInput,
    ToothCondition, TreatmentInput, UpdateEmr,
};
use patient_service::{CreatePatient, InMemoryPatientRepository, PatientRegistry};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

struct Fixture {
    emr: EmrService,
    catalogs: CatalogService,
    patient_id: i64,
    doctor_id: i64,
    users: Arc<InMemoryUserRepository>,
}

fn dec(raw: &str) -> Decimal {
    Decimal::from_str(raw).unwrap()
}

async fn add_doctor(users: &InMemoryUserRepository, username: &str, nama: &str) -> i64 {
    users
        .create(NewUser {
            nama_lengkap: nama.to_string(),
            username: username.to_string(),
            email: format!("{}@klinik.test", username),
            password_hash: "hash".to_string(),
            role: "dokter".to_string(),
            status: UserStatus::Aktif,
            phone_number: None,
            profile_pic_url: None,
        })
        .await
        .unwrap()
        .id
}

async fn fixture() -> Fixture {
    let users = Arc::new(InMemoryUserRepository::new());
    let patient_repo = Arc::new(InMemoryPatientRepository::new());
    let catalog_repo = Arc::new(InMemoryCatalogRepository::new());

    let patient = PatientRegistry::new(patient_repo.clone())
        .create(CreatePatient {
            nama_lengkap: "Siti Aminah".to_string(),
            nomor_telepon: "081234567890".to_string(),
            ..CreatePatient::default()
        })
        .await
        .unwrap();
    let doctor_id = add_doctor(&users, "drg.budi", "drg. Budi Santoso").await;

    let catalogs = CatalogService::new(catalog_repo.clone());
    for (kode, nama, harga) in [("T01", "Scaling", "150000"), ("T02", "Tambal Komposit", "250000")] {
        catalogs
            .create_treatment(CreateTreatmentCatalog {
                kode: kode.to_string(),
                nama: nama.to_string(),
                kategori: Some("Umum".to_string()),
                harga: dec(harga),
                deskripsi: None,
            })
            .await
            .unwrap();
    }
    catalogs
        .create_medication(CreateMedicationCatalog {
            kode: "M01".to_string(),
            nama: "Amoxicillin 500mg".to_string(),
            satuan: Some("tablet".to_string()),
            harga_beli: Some(dec("1500")),
            harga_jual: dec("2500"),
            stok: Some(100),
            deskripsi: None,
        })
        .await
        .unwrap();

    Fixture {
        emr: EmrService::new(
            Arc::new(InMemoryEmrRepository::new()),
            catalog_repo,
            patient_repo,
            users.clone(),
        ),
        catalogs,
        patient_id: patient.id,
        doctor_id,
        users,
    }
}

fn treatment(code: &str, quantity: i32) -> TreatmentInput {
    TreatmentInput {
        code: code.to_string(),
        quantity,
        ..TreatmentInput::default()
    }
}

fn full_visit(f: &Fixture) -> CreateEmr {
    CreateEmr {
        patient_id: f.patient_id,
        doctor_id: f.doctor_id,
        complaint: "Gigi geraham kanan bawah sakit".to_string(),
        diagnosis: Some("Karies media".to_string()),
        treatments: vec![
            TreatmentInput {
                tooth_number: Some("46".to_string()),
                discount_percent: Some(dec("10")),
                ..treatment("T01", 2)
            },
            treatment("T02", 1),
        ],
        medications: vec![MedicationInput {
            code: "M01".to_string(),
            quantity: 10,
            instruction: Some("3x1 sesudah makan".to_string()),
            ..MedicationInput::default()
        }],
        odontogram: vec![OdontogramInput {
            tooth_number: "46".to_string(),
            condition: "filling".to_string(),
            treatment_note: Some("Tambal komposit".to_string()),
            history: vec![
                HistoryInput {
                    date: "2024-01-10".to_string(),
                    from_condition: "normal".to_string(),
                    to_condition: "caries".to_string(),
                    ..HistoryInput::default()
                },
                HistoryInput {
                    date: "2024-03-09".to_string(),
                    doctor_name: Some("drg. Rina".to_string()),
                    from_condition: "caries".to_string(),
                    to_condition: "filling".to_string(),
                    note: Some("Restorasi".to_string()),
                },
            ],
        }],
        ..CreateEmr::default()
    }
}

#[tokio::test]
async fn test_create_persists_every_owned_row() {
    let f = fixture().await;
    let now = Utc.with_ymd_and_hms(2024, 3, 9, 8, 5, 7).unwrap();

    let record = f.emr.create_at(full_visit(&f), now).await.unwrap();

    assert_eq!(record.visit_id, format!("VISIT-{}-20240309080507", f.patient_id));
    assert_eq!(record.billing_status, BillingStatus::BelumLunas);
    assert_eq!(record.exam_date, now);
    assert_eq!(record.doctor_name, "drg. Budi Santoso");

    let reloaded = f.emr.find(&record.id.to_string()).await.unwrap();
    assert_eq!(reloaded.treatments.len(), 2);
    assert_eq!(reloaded.medications.len(), 1);
    assert_eq!(reloaded.odontogram.len(), 1);
    assert_eq!(reloaded.odontogram[0].condition, ToothCondition::Filling);
    assert_eq!(reloaded.odontogram[0].history.len(), 2);

    // History without a doctor name takes the record's doctor.
    assert_eq!(reloaded.odontogram[0].history[0].doctor_name, "drg. Budi Santoso");
    assert_eq!(reloaded.odontogram[0].history[1].doctor_name, "drg. Rina");

    assert_eq!(reloaded.patient.as_ref().map(|p| p.nama_lengkap.as_str()), Some("Siti Aminah"));
    let scaling = &reloaded.treatments[0];
    assert_eq!(scaling.treatment_catalog.as_ref().map(|c| c.kode.as_str()), Some("T01"));
    assert_eq!(scaling.sub_total, dec("270000.00"));
    assert_eq!(reloaded.medications[0].sub_total, dec("25000.00"));
    assert_eq!(
        reloaded.medications[0].medication_catalog.as_ref().map(|c| c.satuan.as_str()),
        Some("tablet")
    );
}

#[tokio::test]
async fn test_mismatched_subtotal_is_rejected_with_its_path() {
    let f = fixture().await;
    let mut request = full_visit(&f);
    request.treatments[0].sub_total = Some(dec("300000"));

    let err = f.emr.create(request).await.unwrap_err();
    assert!(matches!(err, EmrError::Validation { ref field, .. } if field == "treatments[0].subTotal"));

    let mut request = full_visit(&f);
    request.treatments[0].sub_total = Some(dec("270000.00"));
    let record = f.emr.create(request).await.unwrap();
    assert_eq!(record.treatments[0].sub_total, dec("270000.00"));
}

#[tokio::test]
async fn test_oversized_prices_are_validation_errors() {
    let f = fixture().await;
    let visit = |treatments: Vec<TreatmentInput>, medications: Vec<MedicationInput>| CreateEmr {
        patient_id: f.patient_id,
        doctor_id: f.doctor_id,
        complaint: "Kontrol".to_string(),
        treatments,
        medications,
        ..CreateEmr::default()
    };

    // Near the top of Decimal's range; multiplying it must not panic.
    let huge = TreatmentInput {
        price_at_time: Some(dec("70000000000000000000000000000")),
        ..treatment("T01", 1000)
    };
    let err = f.emr.create(visit(vec![huge], vec![])).await.unwrap_err();
    assert!(matches!(err, EmrError::Validation { ref field, .. } if field == "treatments[0].priceAtTime"));

    // Price fits a NUMERIC(14, 2) column, the line total does not.
    let wide = TreatmentInput {
        price_at_time: Some(dec("600000000000")),
        ..treatment("T01", 2)
    };
    let err = f.emr.create(visit(vec![wide], vec![])).await.unwrap_err();
    assert!(matches!(err, EmrError::Validation { ref field, .. } if field == "treatments[0].subTotal"));

    let bulk = MedicationInput {
        code: "M01".to_string(),
        quantity: i32::MAX,
        price_per_unit_at_time: Some(dec("999999999999")),
        ..MedicationInput::default()
    };
    let err = f.emr.create(visit(vec![], vec![bulk])).await.unwrap_err();
    assert!(matches!(err, EmrError::Validation { ref field, .. } if field == "medications[0].subTotal"));

    assert!(f.emr.list_by_patient(f.patient_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_catalog_code_is_a_validation_error() {
    let f = fixture().await;
    let mut request = full_visit(&f);
    request.medications[0].code = "M99".to_string();

    let err = f.emr.create(request).await.unwrap_err();
    assert!(matches!(err, EmrError::Validation { ref field, .. } if field == "medications[0].code"));
}

#[tokio::test]
async fn test_missing_patient_doctor_or_complaint() {
    let f = fixture().await;

    let mut request = full_visit(&f);
    request.patient_id = 9_999;
    assert!(matches!(f.emr.create(request).await, Err(EmrError::PatientNotFound)));

    let mut request = full_visit(&f);
    request.doctor_id = 9_999;
    assert!(matches!(
        f.emr.create(request).await,
        Err(EmrError::Validation { ref field, .. }) if field == "doctorId"
    ));

    let mut request = full_visit(&f);
    request.complaint = "   ".to_string();
    assert!(matches!(
        f.emr.create(request).await,
        Err(EmrError::Validation { ref field, .. }) if field == "complaint"
    ));
}

#[tokio::test]
async fn test_bad_history_date_and_condition_are_rejected() {
    let f = fixture().await;

    let mut request = full_visit(&f);
    request.odontogram[0].history[1].date = "09-03-2024".to_string();
    assert!(matches!(
        f.emr.create(request).await,
        Err(EmrError::Validation { ref field, .. }) if field == "odontogram[0].history[1].date"
    ));

    let mut request = full_visit(&f);
    request.odontogram[0].condition = "chipped".to_string();
    assert!(matches!(
        f.emr.create(request).await,
        Err(EmrError::Validation { ref field, .. }) if field == "odontogram[0].condition"
    ));
}

#[tokio::test]
async fn test_same_second_visits_get_numbered_suffixes() {
    let f = fixture().await;
    let now = Utc.with_ymd_and_hms(2024, 3, 9, 8, 5, 7).unwrap();

    let first = f.emr.create_at(full_visit(&f), now).await.unwrap();
    let second = f.emr.create_at(full_visit(&f), now).await.unwrap();
    let third = f.emr.create_at(full_visit(&f), now).await.unwrap();

    assert_eq!(second.visit_id, format!("{}-2", first.visit_id));
    assert_eq!(third.visit_id, format!("{}-3", first.visit_id));
}

#[tokio::test]
async fn test_lookup_falls_back_to_visit_id() {
    let f = fixture().await;
    let record = f.emr.create(full_visit(&f)).await.unwrap();

    let by_visit = f.emr.find(&record.visit_id).await.unwrap();
    assert_eq!(by_visit.id, record.id);

    assert!(matches!(f.emr.find("VISIT-0-0").await, Err(EmrError::RecordNotFound)));
    assert!(matches!(f.emr.find("4242").await, Err(EmrError::RecordNotFound)));
}

#[tokio::test]
async fn test_update_replaces_collections_and_patches_header() {
    let f = fixture().await;
    let record = f.emr.create(full_visit(&f)).await.unwrap();

    let updated = f
        .emr
        .update(
            &record.visit_id,
            UpdateEmr {
                diagnosis: Some("Karies profunda".to_string()),
                billing_status: Some("Lunas".to_string()),
                medications: vec![MedicationInput {
                    code: "M01".to_string(),
                    quantity: 5,
                    ..MedicationInput::default()
                }],
                ..UpdateEmr::default()
            },
        )
        .await
        .unwrap();

    assert!(updated.treatments.is_empty());
    assert!(updated.odontogram.is_empty());
    assert_eq!(updated.medications.len(), 1);
    assert_eq!(updated.medications[0].sub_total, dec("12500.00"));
    assert_eq!(updated.diagnosis, "Karies profunda");
    assert_eq!(updated.billing_status, BillingStatus::Lunas);
    // Untouched header fields survive.
    assert_eq!(updated.complaint, record.complaint);
    assert_eq!(updated.doctor_name, record.doctor_name);

    let reloaded = f.emr.find(&record.id.to_string()).await.unwrap();
    assert!(reloaded.treatments.is_empty());
}

#[tokio::test]
async fn test_failed_update_leaves_record_untouched() {
    let f = fixture().await;
    let record = f.emr.create(full_visit(&f)).await.unwrap();

    let err = f
        .emr
        .update(
            &record.id.to_string(),
            UpdateEmr {
                diagnosis: Some("Changed".to_string()),
                treatments: vec![treatment("T01", 1), treatment("NOPE", 1)],
                ..UpdateEmr::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EmrError::Validation { ref field, .. } if field == "treatments[1].code"));

    let reloaded = f.emr.find(&record.id.to_string()).await.unwrap();
    assert_eq!(reloaded.diagnosis, record.diagnosis);
    assert_eq!(reloaded.treatments.len(), 2);
}

#[tokio::test]
async fn test_changing_doctor_snapshots_new_name() {
    let f = fixture().await;
    let record = f.emr.create(full_visit(&f)).await.unwrap();
    let other = add_doctor(&f.users, "drg.rina", "drg. Rina Wulandari").await;

    let updated = f
        .emr
        .update(
            &record.id.to_string(),
            UpdateEmr {
                doctor_id: Some(other),
                ..UpdateEmr::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.doctor_id, other);
    assert_eq!(updated.doctor_name, "drg. Rina Wulandari");

    let err = f
        .emr
        .update(
            &record.id.to_string(),
            UpdateEmr {
                billing_status: Some("Sebagian".to_string()),
                ..UpdateEmr::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EmrError::Validation { ref field, .. } if field == "billingStatus"));
}

#[tokio::test]
async fn test_list_by_patient_is_newest_first() {
    let f = fixture().await;
    let earlier = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();

    let old = f.emr.create_at(full_visit(&f), earlier).await.unwrap();
    let new = f
        .emr
        .create_at(full_visit(&f), earlier + Duration::days(30))
        .await
        .unwrap();

    let listed = f.emr.list_by_patient(f.patient_id).await.unwrap();
    let ids: Vec<i64> = listed.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![new.id, old.id]);
    assert!(listed.iter().all(|r| r.treatments.len() == 2));

    assert!(f.emr.list_by_patient(9_999).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_deleted_catalog_entries_keep_their_summary_on_old_lines() {
    let f = fixture().await;
    let record = f.emr.create(full_visit(&f)).await.unwrap();
    let t01 = record.treatments[0].treatment_catalog_id;

    f.catalogs.delete_treatment(t01).await.unwrap();

    let reloaded = f.emr.find(&record.visit_id).await.unwrap();
    assert_eq!(
        reloaded.treatments[0].treatment_catalog.as_ref().map(|c| c.kode.as_str()),
        Some("T01")
    );

    // New lines can no longer reference it.
    let err = f.emr.create(full_visit(&f)).await.unwrap_err();
    assert!(matches!(err, EmrError::Validation { ref field, .. } if field == "treatments[0].code"));
}
