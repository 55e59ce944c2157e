use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Condition of one tooth on the odontogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToothCondition {
    Normal,
    Caries,
    Filling,
    Missing,
    Crown,
    RootCanal,
    Implant,
}

impl ToothCondition {
    pub const ALL: [ToothCondition; 7] = [
        ToothCondition::Normal,
        ToothCondition::Caries,
        ToothCondition::Filling,
        ToothCondition::Missing,
        ToothCondition::Crown,
        ToothCondition::RootCanal,
        ToothCondition::Implant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToothCondition::Normal => "normal",
            ToothCondition::Caries => "caries",
            ToothCondition::Filling => "filling",
            ToothCondition::Missing => "missing",
            ToothCondition::Crown => "crown",
            ToothCondition::RootCanal => "root-canal",
            ToothCondition::Implant => "implant",
        }
    }
}

impl fmt::Display for ToothCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToothCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToothCondition::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown tooth condition '{}'", s))
    }
}

database_layer::impl_text_enum!(ToothCondition);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BillingStatus {
    #[default]
    #[serde(rename = "Belum Lunas")]
    BelumLunas,
    #[serde(rename = "Lunas")]
    Lunas,
}

impl BillingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingStatus::BelumLunas => "Belum Lunas",
            BillingStatus::Lunas => "Lunas",
        }
    }
}

impl fmt::Display for BillingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Belum Lunas" => Ok(BillingStatus::BelumLunas),
            "Lunas" => Ok(BillingStatus::Lunas),
            other => Err(format!("unknown billing status '{}'", other)),
        }
    }
}

database_layer::impl_text_enum!(BillingStatus);

/// A billable procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentCatalog {
    pub id: i64,
    pub kode: String,
    pub nama: String,
    pub kategori: String,
    pub harga: Decimal,
    pub deskripsi: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TreatmentCatalog {
    pub fn summary(&self) -> TreatmentCatalogSummary {
        TreatmentCatalogSummary {
            id: self.id,
            kode: self.kode.clone(),
            nama: self.nama.clone(),
            kategori: self.kategori.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentCatalogSummary {
    pub id: i64,
    pub kode: String,
    pub nama: String,
    pub kategori: String,
}

/// A dispensable drug or material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MedicationCatalog {
    pub id: i64,
    pub kode: String,
    pub nama: String,
    pub satuan: String,
    pub harga_beli: Decimal,
    pub harga_jual: Decimal,
    pub stok: i32,
    pub deskripsi: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl MedicationCatalog {
    pub fn summary(&self) -> MedicationCatalogSummary {
        MedicationCatalogSummary {
            id: self.id,
            kode: self.kode.clone(),
            nama: self.nama.clone(),
            satuan: self.satuan.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationCatalogSummary {
    pub id: i64,
    pub kode: String,
    pub nama: String,
    pub satuan: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTreatmentCatalog {
    pub kode: String,
    pub nama: String,
    #[serde(default)]
    pub kategori: Option<String>,
    pub harga: Decimal,
    #[serde(default)]
    pub deskripsi: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTreatmentCatalog {
    #[serde(default)]
    pub kode: Option<String>,
    #[serde(default)]
    pub nama: Option<String>,
    #[serde(default)]
    pub kategori: Option<String>,
    #[serde(default)]
    pub harga: Option<Decimal>,
    #[serde(default)]
    pub deskripsi: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMedicationCatalog {
    pub kode: String,
    pub nama: String,
    #[serde(default)]
    pub satuan: Option<String>,
    #[serde(default)]
    pub harga_beli: Option<Decimal>,
    pub harga_jual: Decimal,
    #[serde(default)]
    pub stok: Option<i32>,
    #[serde(default)]
    pub deskripsi: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMedicationCatalog {
    #[serde(default)]
    pub kode: Option<String>,
    #[serde(default)]
    pub nama: Option<String>,
    #[serde(default)]
    pub satuan: Option<String>,
    #[serde(default)]
    pub harga_beli: Option<Decimal>,
    #[serde(default)]
    pub harga_jual: Option<Decimal>,
    #[serde(default)]
    pub stok: Option<i32>,
    #[serde(default)]
    pub deskripsi: Option<String>,
}
