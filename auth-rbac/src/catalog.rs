//! The clinic's permission catalog and default roles.

use crate::models::PermissionDefinition;

/// Permission codes, grouped by feature area.
pub mod codes {
    pub const DASHBOARD_VIEW: &str = "dashboard:view";

    pub const PATIENT_VIEW: &str = "patient:view";
    pub const PATIENT_CREATE: &str = "patient:create";
    pub const PATIENT_UPDATE: &str = "patient:update";
    pub const PATIENT_DELETE: &str = "patient:delete";
    pub const PATIENT_REGISTER_VISIT: &str = "patient:register_visit";

    pub const RESERVATION_VIEW_ALL: &str = "reservation:view_all";
    pub const RESERVATION_VIEW_DOCTOR_SPECIFIC: &str = "reservation:view_doctor_specific";
    pub const RESERVATION_CREATE: &str = "reservation:create";
    pub const RESERVATION_UPDATE: &str = "reservation:update";
    pub const RESERVATION_CANCEL: &str = "reservation:cancel";
    pub const RESERVATION_CONFIRM_ARRIVAL: &str = "reservation:confirm_arrival";

    pub const EMR_VIEW: &str = "emr:view";
    pub const EMR_CREATE: &str = "emr:create";
    pub const EMR_UPDATE: &str = "emr:update";
    pub const EMR_MANAGE_ODONTOGRAM: &str = "emr:manage_odontogram";
    pub const EMR_PRINT: &str = "emr:print";

    pub const MASTER_VIEW_TREATMENTS: &str = "master:view_treatments";
    pub const MASTER_MANAGE_TREATMENTS: &str = "master:manage_treatments";
    pub const MASTER_VIEW_MEDICATIONS: &str = "master:view_medications";
    pub const MASTER_MANAGE_MEDICATIONS: &str = "master:manage_medications";

    pub const SETTINGS_VIEW_USERS: &str = "settings:view_users";
    pub const SETTINGS_MANAGE_USERS: &str = "settings:manage_users";
    pub const SETTINGS_VIEW_ROLES: &str = "settings:view_roles";
    pub const SETTINGS_MANAGE_ROLES: &str = "settings:manage_roles";

    pub const BILLING_VIEW: &str = "billing:view";
    pub const BILLING_CREATE: &str = "billing:create";
    pub const BILLING_PROCESS_PAYMENT: &str = "billing:process_payment";
    pub const BILLING_PRINT_RECEIPT: &str = "billing:print_receipt";
}

/// Built-in role codes.
pub mod roles {
    pub const ADMIN: &str = "admin";
    pub const DOKTER: &str = "dokter";
    pub const RESEPSIONIS: &str = "resepsionis";
}

use codes::*;

const fn def(
    nama: &'static str,
    kode: &'static str,
    grup: &'static str,
    deskripsi: &'static str,
) -> PermissionDefinition {
    PermissionDefinition {
        nama,
        kode,
        grup,
        deskripsi,
    }
}

pub const PERMISSIONS: &[PermissionDefinition] = &[
    def("Lihat Dashboard Utama", DASHBOARD_VIEW, "Dashboard", "Akses untuk melihat halaman utama dashboard."),
    def("Lihat Data Pasien", PATIENT_VIEW, "Pasien", "Melihat daftar dan detail data pasien."),
    def("Tambah Pasien Baru", PATIENT_CREATE, "Pasien", "Mendaftarkan pasien baru ke sistem."),
    def("Ubah Data Pasien", PATIENT_UPDATE, "Pasien", "Mengubah informasi detail pasien."),
    def("Hapus Data Pasien", PATIENT_DELETE, "Pasien", "Menghapus data pasien dari sistem."),
    def("Registrasi Kunjungan Pasien", PATIENT_REGISTER_VISIT, "Pasien", "Mendaftarkan pasien untuk kunjungan/antrian."),
    def("Lihat Semua Reservasi", RESERVATION_VIEW_ALL, "Reservasi", "Melihat semua jadwal reservasi."),
    def(
        "Lihat Reservasi Dokter Tertentu",
        RESERVATION_VIEW_DOCTOR_SPECIFIC,
        "Reservasi",
        "Melihat jadwal reservasi hanya untuk dokter tertentu.",
    ),
    def("Buat Reservasi Baru", RESERVATION_CREATE, "Reservasi", "Membuat jadwal reservasi baru."),
    def("Ubah Data Reservasi", RESERVATION_UPDATE, "Reservasi", "Mengubah detail reservasi."),
    def("Batalkan Reservasi", RESERVATION_CANCEL, "Reservasi", "Membatalkan reservasi."),
    def(
        "Konfirmasi Kehadiran Reservasi",
        RESERVATION_CONFIRM_ARRIVAL,
        "Reservasi",
        "Menandai pasien reservasi telah hadir.",
    ),
    def("Lihat EMR (Semua/Ditugaskan)", EMR_VIEW, "EMR", "Melihat EMR pasien (cakupan tergantung role)."),
    def("Buat EMR Baru", EMR_CREATE, "EMR", "Membuat entri rekam medis baru."),
    def("Ubah EMR", EMR_UPDATE, "EMR", "Mengubah data pada EMR yang sudah ada."),
    def("Kelola Odontogram", EMR_MANAGE_ODONTOGRAM, "EMR", "Mengisi dan mengubah data odontogram."),
    def("Cetak EMR", EMR_PRINT, "EMR", "Mencetak detail EMR."),
    def("Lihat Master Tindakan", MASTER_VIEW_TREATMENTS, "Master Data", "Melihat daftar master tindakan."),
    def("Kelola Master Tindakan", MASTER_MANAGE_TREATMENTS, "Master Data", "CRUD master tindakan."),
    def("Lihat Master Obat", MASTER_VIEW_MEDICATIONS, "Master Data", "Melihat daftar master obat."),
    def("Kelola Master Obat", MASTER_MANAGE_MEDICATIONS, "Master Data", "CRUD master obat."),
    def("Lihat Daftar Pengguna", SETTINGS_VIEW_USERS, "Pengaturan", "Melihat daftar pengguna sistem."),
    def("Kelola Pengguna (CRUD)", SETTINGS_MANAGE_USERS, "Pengaturan", "CRUD data pengguna."),
    def("Lihat Daftar Role", SETTINGS_VIEW_ROLES, "Pengaturan", "Melihat daftar role."),
    def("Kelola Role & Hak Akses", SETTINGS_MANAGE_ROLES, "Pengaturan", "CRUD role dan mengatur hak aksesnya."),
    def("Lihat Tagihan", BILLING_VIEW, "Billing", "Melihat data tagihan pasien."),
    def("Buat Tagihan Baru", BILLING_CREATE, "Billing", "Membuat tagihan baru."),
    def("Proses Pembayaran", BILLING_PROCESS_PAYMENT, "Billing", "Memproses pembayaran pasien."),
    def("Cetak Kwitansi", BILLING_PRINT_RECEIPT, "Billing", "Mencetak kwitansi pembayaran."),
];

/// A role created at startup. `permissions: None` grants the whole catalog.
#[derive(Debug, Clone, Copy)]
pub struct DefaultRole {
    pub nama: &'static str,
    pub kode: &'static str,
    pub deskripsi: &'static str,
    pub permissions: Option<&'static [&'static str]>,
}

impl DefaultRole {
    pub fn permission_codes(&self) -> Vec<String> {
        match self.permissions {
            Some(codes) => codes.iter().map(|c| c.to_string()).collect(),
            None => PERMISSIONS.iter().map(|p| p.kode.to_string()).collect(),
        }
    }
}

pub const DEFAULT_ROLES: &[DefaultRole] = &[
    DefaultRole {
        nama: "Administrator",
        kode: roles::ADMIN,
        deskripsi: "Akses penuh ke sistem",
        permissions: None,
    },
    DefaultRole {
        nama: "Dokter Gigi",
        kode: roles::DOKTER,
        deskripsi: "Akses terkait medis dan pasien",
        permissions: Some(&[
            DASHBOARD_VIEW,
            PATIENT_VIEW,
            RESERVATION_VIEW_DOCTOR_SPECIFIC,
            EMR_VIEW,
            EMR_CREATE,
            EMR_UPDATE,
            EMR_MANAGE_ODONTOGRAM,
            EMR_PRINT,
        ]),
    },
    DefaultRole {
        nama: "Resepsionis",
        kode: roles::RESEPSIONIS,
        deskripsi: "Akses terkait pendaftaran dan jadwal",
        permissions: Some(&[
            DASHBOARD_VIEW,
            PATIENT_VIEW,
            PATIENT_CREATE,
            PATIENT_UPDATE,
            PATIENT_REGISTER_VISIT,
            RESERVATION_VIEW_ALL,
            RESERVATION_CREATE,
            RESERVATION_UPDATE,
            RESERVATION_CANCEL,
            RESERVATION_CONFIRM_ARRIVAL,
            BILLING_VIEW,
            BILLING_PRINT_RECEIPT,
        ]),
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_codes_are_unique() {
        let unique: HashSet<&str> = PERMISSIONS.iter().map(|p| p.kode).collect();
        assert_eq!(unique.len(), PERMISSIONS.len());
        assert_eq!(PERMISSIONS.len(), 29);
    }

    #[test]
    fn test_default_roles_only_reference_catalog_codes() {
        let known: HashSet<&str> = PERMISSIONS.iter().map(|p| p.kode).collect();
        for role in DEFAULT_ROLES {
            for code in role.permission_codes() {
                assert!(known.contains(code.as_str()), "{} grants unknown {}", role.kode, code);
            }
        }
        let admin = DEFAULT_ROLES.iter().find(|r| r.kode == roles::ADMIN).map(|r| r.permission_codes().len());
        assert_eq!(admin, Some(PERMISSIONS.len()));
    }
}
