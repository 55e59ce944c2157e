//! Authentication context extraction
//!
//! Handlers take an [`AuthContext`] argument to require a valid bearer
//! token. The extractor verifies signature and expiry and exposes the
//! token's identity claims; access checks against a route's
//! [`AccessPolicy`] run through [`AuthContext::require`].

use crate::error::ApiError;
use crate::server::ClinicServer;
use async_trait::async_trait;
use auth_identity::TokenClaims;
use auth_rbac::{AccessDecision, AccessPolicy};
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap};
use tracing::{debug, warn};

/// Identity of the caller, taken from a verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
    pub role: String,
}

impl From<TokenClaims> for AuthContext {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
            role: claims.role,
        }
    }
}

impl AuthContext {
    /// Reject the caller unless their role is on the policy's allow-list and
    /// the role grants one of the policy's permissions.
    pub async fn require(&self, server: &ClinicServer, policy: &AccessPolicy) -> Result<(), ApiError> {
        match server.rbac.authorize(&self.role, policy).await? {
            AccessDecision::Allow => Ok(()),
            AccessDecision::DenyRole => {
                warn!(user_id = self.user_id, role = %self.role, "Access denied: role not allowed");
                Err(ApiError::authorization(format!(
                    "Role '{}' is not allowed to perform this operation",
                    self.role
                )))
            }
            AccessDecision::DenyPermission => {
                warn!(
                    user_id = self.user_id,
                    role = %self.role,
                    required = ?policy.any_permission,
                    "Access denied: missing permission"
                );
                Err(ApiError::authorization("Permission denied for this operation"))
            }
        }
    }

    /// Permission codes granted to the caller's role.
    pub async fn permissions(&self, server: &ClinicServer) -> Result<Vec<String>, ApiError> {
        Ok(server.rbac.permission_codes(&self.role).await?)
    }
}

/// Extract the bearer token from the Authorization header
fn extract_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::authentication("Missing Authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::authentication("Invalid Authorization header format. Expected: Bearer <token>"))
}

#[async_trait]
impl FromRequestParts<ClinicServer> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, server: &ClinicServer) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)?;
        let claims = server.identity.verify_token(token).map_err(|e| {
            debug!(error = %e, "Token rejected");
            ApiError::authentication("Invalid or expired token")
        })?;
        Ok(AuthContext::from(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_token_strips_bearer_prefix() {
        assert_eq!(extract_token(&headers("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_extract_token_rejects_other_schemes() {
        assert!(matches!(
            extract_token(&headers("Basic dXNlcjpwYXNz")),
            Err(ApiError::Authentication { .. })
        ));
        assert!(matches!(extract_token(&headers("Bearer ")), Err(ApiError::Authentication { .. })));
        assert!(matches!(extract_token(&HeaderMap::new()), Err(ApiError::Authentication { .. })));
    }

    #[test]
    fn test_context_from_claims() {
        let ctx = AuthContext::from(TokenClaims {
            user_id: 4,
            username: "sari".to_string(),
            role: "dokter".to_string(),
            iat: 0,
            exp: 1,
        });
        assert_eq!(ctx.user_id, 4);
        assert_eq!(ctx.role, "dokter");
    }
}
