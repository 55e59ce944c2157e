//! The medical record aggregate: a visit header that owns treatment lines,
//! medication lines and an odontogram with per-tooth history.

use crate::models::{BillingStatus, MedicationCatalogSummary, ToothCondition, TreatmentCatalogSummary};
use chrono::{DateTime, NaiveDate, Utc};
use patient_service::PatientSummary;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecord {
    pub id: i64,
    pub visit_id: String,
    pub patient_id: i64,
    #[sqlx(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<PatientSummary>,
    pub doctor_id: i64,
    pub doctor_name: String,
    pub exam_date: DateTime<Utc>,
    pub visit_type: String,
    pub complaint: String,
    pub examination: String,
    pub diagnosis: String,
    pub treatment_plan: String,
    pub notes: String,
    pub billing_status: BillingStatus,
    #[sqlx(skip)]
    #[serde(default)]
    pub treatments: Vec<TreatmentItem>,
    #[sqlx(skip)]
    #[serde(default)]
    pub medications: Vec<MedicationItem>,
    #[sqlx(skip)]
    #[serde(default)]
    pub odontogram: Vec<OdontogramDetail>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentItem {
    pub id: i64,
    pub medical_record_id: i64,
    pub treatment_catalog_id: i64,
    #[sqlx(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment_catalog: Option<TreatmentCatalogSummary>,
    pub tooth_number: Option<String>,
    pub quantity: i32,
    pub price_at_time: Decimal,
    pub discount_percent: Decimal,
    pub sub_total: Decimal,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MedicationItem {
    pub id: i64,
    pub medical_record_id: i64,
    pub medication_catalog_id: i64,
    #[sqlx(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medication_catalog: Option<MedicationCatalogSummary>,
    pub quantity: i32,
    pub price_per_unit_at_time: Decimal,
    pub sub_total: Decimal,
    pub instruction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OdontogramDetail {
    pub id: i64,
    pub medical_record_id: i64,
    pub tooth_number: String,
    pub condition: ToothCondition,
    pub treatment_note: String,
    #[sqlx(skip)]
    #[serde(default)]
    pub history: Vec<OdontogramHistory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OdontogramHistory {
    pub id: i64,
    pub odontogram_detail_id: i64,
    pub date: NaiveDate,
    pub doctor_name: String,
    pub from_condition: ToothCondition,
    pub to_condition: ToothCondition,
    pub note: String,
}

// Request payloads. Catalog entries are referenced by code.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentInput {
    pub code: String,
    #[serde(default)]
    pub tooth_number: Option<String>,
    pub quantity: i32,
    /// Defaults to the catalog price.
    #[serde(default)]
    pub price_at_time: Option<Decimal>,
    #[serde(default)]
    pub discount_percent: Option<Decimal>,
    /// Checked against the computed value when present.
    #[serde(default)]
    pub sub_total: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationInput {
    pub code: String,
    pub quantity: i32,
    /// Defaults to the catalog selling price.
    #[serde(default)]
    pub price_per_unit_at_time: Option<Decimal>,
    #[serde(default)]
    pub sub_total: Option<Decimal>,
    #[serde(default)]
    pub instruction: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OdontogramInput {
    pub tooth_number: String,
    pub condition: String,
    #[serde(default)]
    pub treatment_note: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryInput {
    pub date: String,
    /// Defaults to the record's doctor.
    #[serde(default)]
    pub doctor_name: Option<String>,
    pub from_condition: String,
    pub to_condition: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmr {
    pub patient_id: i64,
    pub doctor_id: i64,
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub visit_type: Option<String>,
    pub complaint: String,
    #[serde(default)]
    pub examination: Option<String>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub treatment_plan: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub treatments: Vec<TreatmentInput>,
    #[serde(default)]
    pub medications: Vec<MedicationInput>,
    #[serde(default)]
    pub odontogram: Vec<OdontogramInput>,
}

/// Header fields are patched; the three collections are always replaced,
/// an omitted collection meaning empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmr {
    #[serde(default)]
    pub doctor_id: Option<i64>,
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub visit_type: Option<String>,
    #[serde(default)]
    pub complaint: Option<String>,
    #[serde(default)]
    pub examination: Option<String>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub treatment_plan: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub billing_status: Option<String>,
    #[serde(default)]
    pub treatments: Vec<TreatmentInput>,
    #[serde(default)]
    pub medications: Vec<MedicationInput>,
    #[serde(default)]
    pub odontogram: Vec<OdontogramInput>,
}

// Resolved write models handed to the repository.

#[derive(Debug, Clone, PartialEq)]
pub struct NewTreatmentItem {
    pub treatment_catalog_id: i64,
    pub tooth_number: Option<String>,
    pub quantity: i32,
    pub price_at_time: Decimal,
    pub discount_percent: Decimal,
    pub sub_total: Decimal,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMedicationItem {
    pub medication_catalog_id: i64,
    pub quantity: i32,
    pub price_per_unit_at_time: Decimal,
    pub sub_total: Decimal,
    pub instruction: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOdontogramDetail {
    pub tooth_number: String,
    pub condition: ToothCondition,
    pub treatment_note: String,
    pub history: Vec<NewOdontogramHistory>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOdontogramHistory {
    pub date: NaiveDate,
    pub doctor_name: String,
    pub from_condition: ToothCondition,
    pub to_condition: ToothCondition,
    pub note: String,
}

/// The owned collections of one record, written as a unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmrItems {
    pub treatments: Vec<NewTreatmentItem>,
    pub medications: Vec<NewMedicationItem>,
    pub odontogram: Vec<NewOdontogramDetail>,
}

#[derive(Debug, Clone)]
pub struct EmrDraft {
    pub visit_id: String,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub doctor_name: String,
    pub exam_date: DateTime<Utc>,
    pub visit_type: String,
    pub complaint: String,
    pub examination: String,
    pub diagnosis: String,
    pub treatment_plan: String,
    pub notes: String,
    pub billing_status: BillingStatus,
    pub items: EmrItems,
}

/// Header patch; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct EmrHeaderChanges {
    pub doctor_id: Option<i64>,
    pub doctor_name: Option<String>,
    pub visit_type: Option<String>,
    pub complaint: Option<String>,
    pub examination: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment_plan: Option<String>,
    pub notes: Option<String>,
    pub billing_status: Option<BillingStatus>,
}
