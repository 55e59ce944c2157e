use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

/// Parse an `HH:MM` wall-clock time and return it normalized.
pub fn parse_time(raw: &str) -> Option<String> {
    NaiveTime::parse_from_str(raw.trim(), TIME_FORMAT)
        .ok()
        .map(|t| t.format(TIME_FORMAT).to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "Laki-laki")]
    LakiLaki,
    #[serde(rename = "Perempuan")]
    Perempuan,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::LakiLaki => "Laki-laki",
            Gender::Perempuan => "Perempuan",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Laki-laki" => Ok(Gender::LakiLaki),
            "Perempuan" => Ok(Gender::Perempuan),
            other => Err(format!("unknown gender '{}'", other)),
        }
    }
}

database_layer::impl_text_enum!(Gender);

/// A registered patient, addressed externally by `no_rm`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: i64,
    pub no_rm: String,
    pub nama_lengkap: String,
    pub tanggal_lahir: Option<NaiveDate>,
    pub jenis_kelamin: Option<Gender>,
    pub alamat: String,
    pub nomor_telepon: String,
    pub email: Option<String>,
    pub alergi: String,
    pub riwayat_penyakit: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Patient {
    pub fn summary(&self) -> PatientSummary {
        PatientSummary {
            id: self.id,
            no_rm: self.no_rm.clone(),
            nama_lengkap: self.nama_lengkap.clone(),
            tanggal_lahir: self.tanggal_lahir,
            jenis_kelamin: self.jenis_kelamin,
        }
    }
}

/// The patient fields embedded in reservations and medical records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub id: i64,
    pub no_rm: String,
    pub nama_lengkap: String,
    pub tanggal_lahir: Option<NaiveDate>,
    pub jenis_kelamin: Option<Gender>,
}

#[derive(Debug, Clone)]
pub struct NewPatient {
    pub no_rm: String,
    pub nama_lengkap: String,
    pub tanggal_lahir: Option<NaiveDate>,
    pub jenis_kelamin: Option<Gender>,
    pub alamat: String,
    pub nomor_telepon: String,
    pub email: Option<String>,
    pub alergi: String,
    pub riwayat_penyakit: String,
}

/// Partial patient update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct PatientChanges {
    pub nama_lengkap: Option<String>,
    pub tanggal_lahir: Option<NaiveDate>,
    pub jenis_kelamin: Option<Gender>,
    pub alamat: Option<String>,
    pub nomor_telepon: Option<String>,
    pub email: Option<String>,
    pub alergi: Option<String>,
    pub riwayat_penyakit: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatient {
    pub nama_lengkap: String,
    #[serde(default)]
    pub tanggal_lahir: Option<String>,
    #[serde(default)]
    pub jenis_kelamin: Option<String>,
    #[serde(default)]
    pub alamat: Option<String>,
    pub nomor_telepon: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub alergi: Option<String>,
    #[serde(default)]
    pub riwayat_penyakit: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePatient {
    #[serde(default)]
    pub nama_lengkap: Option<String>,
    #[serde(default)]
    pub tanggal_lahir: Option<String>,
    #[serde(default)]
    pub jenis_kelamin: Option<String>,
    #[serde(default)]
    pub alamat: Option<String>,
    #[serde(default)]
    pub nomor_telepon: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub alergi: Option<String>,
    #[serde(default)]
    pub riwayat_penyakit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReservationStatus {
    #[default]
    Dijadwalkan,
    Dikonfirmasi,
    Dibatalkan,
    Selesai,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Dijadwalkan => "Dijadwalkan",
            ReservationStatus::Dikonfirmasi => "Dikonfirmasi",
            ReservationStatus::Dibatalkan => "Dibatalkan",
            ReservationStatus::Selesai => "Selesai",
        }
    }

    /// Cancelled and completed reservations are closed.
    pub fn is_final(&self) -> bool {
        matches!(self, ReservationStatus::Dibatalkan | ReservationStatus::Selesai)
    }

    pub fn can_become(&self, next: ReservationStatus) -> bool {
        *self == next || !self.is_final()
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Dijadwalkan" => Ok(ReservationStatus::Dijadwalkan),
            "Dikonfirmasi" => Ok(ReservationStatus::Dikonfirmasi),
            "Dibatalkan" => Ok(ReservationStatus::Dibatalkan),
            "Selesai" => Ok(ReservationStatus::Selesai),
            other => Err(format!("unknown reservation status '{}'", other)),
        }
    }
}

database_layer::impl_text_enum!(ReservationStatus);

/// An appointment. `doctor_name` is a snapshot taken when the doctor is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: i64,
    pub patient_id: i64,
    #[sqlx(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<PatientSummary>,
    pub doctor_id: i64,
    pub doctor_name: String,
    pub tanggal: NaiveDate,
    pub waktu: String,
    pub keluhan: String,
    pub catatan: String,
    pub status: ReservationStatus,
    pub jenis_kunjungan: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewReservation {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub doctor_name: String,
    pub tanggal: NaiveDate,
    pub waktu: String,
    pub keluhan: String,
    pub catatan: String,
    pub status: ReservationStatus,
    pub jenis_kunjungan: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReservationChanges {
    pub doctor_id: Option<i64>,
    pub doctor_name: Option<String>,
    pub tanggal: Option<NaiveDate>,
    pub waktu: Option<String>,
    pub keluhan: Option<String>,
    pub catatan: Option<String>,
    pub status: Option<ReservationStatus>,
    pub jenis_kunjungan: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservation {
    pub patient_id: i64,
    pub doctor_id: i64,
    #[serde(default)]
    pub doctor_name: Option<String>,
    pub tanggal: String,
    pub waktu: String,
    #[serde(default)]
    pub keluhan: Option<String>,
    #[serde(default)]
    pub catatan: Option<String>,
    #[serde(default)]
    pub jenis_kunjungan: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReservation {
    #[serde(default)]
    pub doctor_id: Option<i64>,
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub tanggal: Option<String>,
    #[serde(default)]
    pub waktu: Option<String>,
    #[serde(default)]
    pub keluhan: Option<String>,
    #[serde(default)]
    pub catatan: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub jenis_kunjungan: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationFilter {
    pub tanggal: Option<NaiveDate>,
    pub status: Option<ReservationStatus>,
    pub doctor_id: Option<i64>,
    pub patient_id: Option<i64>,
}

/// Which reservations a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationScope {
    All,
    /// Only reservations assigned to this doctor.
    Doctor(i64),
}

impl ReservationScope {
    pub fn permits(&self, reservation: &Reservation) -> bool {
        match self {
            ReservationScope::All => true,
            ReservationScope::Doctor(id) => reservation.doctor_id == *id,
        }
    }
}
