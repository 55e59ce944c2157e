//! Per-operation access policies.
//!
//! A policy names the role codes allowed to call an operation and the
//! permission codes that satisfy it. The role check runs first; a caller
//! with an allowed role must additionally hold at least one of the listed
//! permissions.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    DenyRole,
    DenyPermission,
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    /// Allowed role codes; empty means any authenticated role.
    pub roles: &'static [&'static str],
    /// Any one of these permission codes satisfies the policy; empty means none required.
    pub any_permission: &'static [&'static str],
}

impl AccessPolicy {
    pub const fn new(roles: &'static [&'static str], any_permission: &'static [&'static str]) -> Self {
        Self { roles, any_permission }
    }

    /// Any authenticated caller.
    pub const fn authenticated() -> Self {
        Self::new(&[], &[])
    }

    pub fn allows_role(&self, role: &str) -> bool {
        self.roles.is_empty() || self.roles.iter().any(|r| *r == role)
    }

    pub fn allows_permissions(&self, granted: &[String]) -> bool {
        self.any_permission.is_empty() || self.any_permission.iter().any(|p| granted.iter().any(|g| g == p))
    }

    pub fn evaluate(&self, role: &str, granted: &[String]) -> AccessDecision {
        if !self.allows_role(role) {
            AccessDecision::DenyRole
        } else if !self.allows_permissions(granted) {
            AccessDecision::DenyPermission
        } else {
            AccessDecision::Allow
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{codes, roles};

    const CREATE_PATIENT: AccessPolicy =
        AccessPolicy::new(&[roles::ADMIN, roles::RESEPSIONIS], &[codes::PATIENT_CREATE]);

    fn granted(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_role_outside_allow_list_is_denied_first() {
        let decision = CREATE_PATIENT.evaluate(roles::DOKTER, &granted(&[codes::PATIENT_CREATE]));
        assert_eq!(decision, AccessDecision::DenyRole);
    }

    #[test]
    fn test_allowed_role_without_permission_is_denied() {
        let decision = CREATE_PATIENT.evaluate(roles::RESEPSIONIS, &granted(&[codes::PATIENT_VIEW]));
        assert_eq!(decision, AccessDecision::DenyPermission);
    }

    #[test]
    fn test_allowed_role_with_permission_passes() {
        assert!(CREATE_PATIENT
            .evaluate(roles::ADMIN, &granted(&[codes::PATIENT_CREATE]))
            .is_allowed());
        assert!(AccessPolicy::authenticated().evaluate("anything", &[]).is_allowed());
    }

    #[test]
    fn test_any_of_several_permissions_is_enough() {
        let view = AccessPolicy::new(
            &[],
            &[codes::RESERVATION_VIEW_ALL, codes::RESERVATION_VIEW_DOCTOR_SPECIFIC],
        );
        assert!(view
            .evaluate(roles::DOKTER, &granted(&[codes::RESERVATION_VIEW_DOCTOR_SPECIFIC]))
            .is_allowed());
    }
}
