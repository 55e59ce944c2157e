//! Access policies of the HTTP operations
//!
//! Each policy pairs the roles allowed to call an operation with the
//! permission codes that satisfy it. The role lists are the clinic's
//! established allow-lists; the permission check runs after them.

use auth_rbac::catalog::{codes, roles::*};
use auth_rbac::AccessPolicy;

const ADMIN_ONLY: &[&str] = &[ADMIN];
const FRONT_DESK: &[&str] = &[ADMIN, RESEPSIONIS];
const CLINICIANS: &[&str] = &[ADMIN, DOKTER];
const ALL_STAFF: &[&str] = &[ADMIN, RESEPSIONIS, DOKTER];

pub const VIEW_USERS: AccessPolicy = AccessPolicy::new(ADMIN_ONLY, &[codes::SETTINGS_VIEW_USERS]);
pub const MANAGE_USERS: AccessPolicy = AccessPolicy::new(ADMIN_ONLY, &[codes::SETTINGS_MANAGE_USERS]);
pub const VIEW_ROLES: AccessPolicy = AccessPolicy::new(ADMIN_ONLY, &[codes::SETTINGS_VIEW_ROLES]);
pub const MANAGE_ROLES: AccessPolicy = AccessPolicy::new(ADMIN_ONLY, &[codes::SETTINGS_MANAGE_ROLES]);

pub const CREATE_PATIENT: AccessPolicy = AccessPolicy::new(FRONT_DESK, &[codes::PATIENT_CREATE]);
pub const VIEW_PATIENT: AccessPolicy = AccessPolicy::new(ALL_STAFF, &[codes::PATIENT_VIEW]);
pub const UPDATE_PATIENT: AccessPolicy = AccessPolicy::new(FRONT_DESK, &[codes::PATIENT_UPDATE]);
pub const DELETE_PATIENT: AccessPolicy = AccessPolicy::new(FRONT_DESK, &[codes::PATIENT_DELETE]);

pub const CREATE_EMR: AccessPolicy = AccessPolicy::new(CLINICIANS, &[codes::EMR_CREATE]);
pub const VIEW_EMR: AccessPolicy = AccessPolicy::new(CLINICIANS, &[codes::EMR_VIEW]);
pub const UPDATE_EMR: AccessPolicy = AccessPolicy::new(CLINICIANS, &[codes::EMR_UPDATE]);

pub const CREATE_RESERVATION: AccessPolicy = AccessPolicy::new(FRONT_DESK, &[codes::RESERVATION_CREATE]);
pub const VIEW_RESERVATION: AccessPolicy = AccessPolicy::new(
    ALL_STAFF,
    &[codes::RESERVATION_VIEW_ALL, codes::RESERVATION_VIEW_DOCTOR_SPECIFIC],
);
pub const UPDATE_RESERVATION: AccessPolicy = AccessPolicy::new(FRONT_DESK, &[codes::RESERVATION_UPDATE]);
pub const CONFIRM_RESERVATION: AccessPolicy = AccessPolicy::new(FRONT_DESK, &[codes::RESERVATION_CONFIRM_ARRIVAL]);
pub const CANCEL_RESERVATION: AccessPolicy = AccessPolicy::new(FRONT_DESK, &[codes::RESERVATION_CANCEL]);

pub const VIEW_TREATMENTS: AccessPolicy = AccessPolicy::new(ALL_STAFF, &[codes::MASTER_VIEW_TREATMENTS]);
pub const MANAGE_TREATMENTS: AccessPolicy = AccessPolicy::new(ADMIN_ONLY, &[codes::MASTER_MANAGE_TREATMENTS]);
pub const VIEW_MEDICATIONS: AccessPolicy = AccessPolicy::new(ALL_STAFF, &[codes::MASTER_VIEW_MEDICATIONS]);
pub const MANAGE_MEDICATIONS: AccessPolicy = AccessPolicy::new(ADMIN_ONLY, &[codes::MASTER_MANAGE_MEDICATIONS]);

#[cfg(test)]
mod tests {
    use super::*;
    use auth_rbac::catalog::DEFAULT_ROLES;
    use auth_rbac::AccessDecision;

    fn default_grants(role: &str) -> Vec<String> {
        DEFAULT_ROLES
            .iter()
            .find(|r| r.kode == role)
            .map(|r| r.permission_codes())
            .unwrap_or_default()
    }

    #[test]
    fn test_admin_passes_every_policy() {
        let grants = default_grants(ADMIN);
        for policy in [
            VIEW_USERS,
            MANAGE_ROLES,
            CREATE_PATIENT,
            CREATE_EMR,
            VIEW_RESERVATION,
            CANCEL_RESERVATION,
            MANAGE_TREATMENTS,
            MANAGE_MEDICATIONS,
        ] {
            assert!(policy.evaluate(ADMIN, &grants).is_allowed());
        }
    }

    #[test]
    fn test_default_doctor_and_receptionist_duties() {
        let dokter = default_grants(DOKTER);
        assert!(CREATE_EMR.evaluate(DOKTER, &dokter).is_allowed());
        assert!(VIEW_RESERVATION.evaluate(DOKTER, &dokter).is_allowed());
        assert_eq!(CREATE_PATIENT.evaluate(DOKTER, &dokter), AccessDecision::DenyRole);
        assert_eq!(VIEW_USERS.evaluate(DOKTER, &dokter), AccessDecision::DenyRole);

        let resepsionis = default_grants(RESEPSIONIS);
        assert!(CREATE_PATIENT.evaluate(RESEPSIONIS, &resepsionis).is_allowed());
        assert_eq!(CREATE_EMR.evaluate(RESEPSIONIS, &resepsionis), AccessDecision::DenyRole);
        // Allowed by role, but the default grant set lacks patient deletion.
        assert_eq!(
            DELETE_PATIENT.evaluate(RESEPSIONIS, &resepsionis),
            AccessDecision::DenyPermission
        );
    }
}
