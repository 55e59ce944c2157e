use crate::error::{IdentityError, Result};
use crate::models::{TokenClaims, User};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// HS256 token codec.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, user: &User) -> Result<IssuedToken> {
        self.issue_at(user, Utc::now())
    }

    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<IssuedToken> {
        let expires_at = now + self.ttl;
        let claims = TokenClaims {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = self.encode_claims(&claims)?;
        Ok(IssuedToken { token, expires_at })
    }

    pub fn encode_claims(&self, claims: &TokenClaims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| IdentityError::JwtError(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<TokenClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => IdentityError::TokenExpired,
                _ => IdentityError::InvalidToken,
            })
    }

    /// Expiry instant of `claims`, if representable.
    pub fn expires_at(claims: &TokenClaims) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(claims.exp, 0).single()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserStatus;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: 3,
            nama_lengkap: "Rina Resepsionis".to_string(),
            username: "rina".to_string(),
            email: "rina@klinik.test".to_string(),
            password_hash: String::new(),
            role: "resepsionis".to_string(),
            status: UserStatus::Aktif,
            last_login: None,
            phone_number: None,
            profile_pic_url: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_issue_then_verify_carries_identity() {
        let tokens = TokenService::new("unit-test-secret-unit-test-secret", 72);
        let issued = tokens.issue(&user()).unwrap();
        let claims = tokens.verify(&issued.token).unwrap();

        assert_eq!(claims.user_id, 3);
        assert_eq!(claims.username, "rina");
        assert_eq!(claims.role, "resepsionis");
        assert_eq!(claims.exp - claims.iat, 72 * 3600);
        assert_eq!(TokenService::expires_at(&claims).map(|t| t.timestamp()), Some(issued.expires_at.timestamp()));
    }

    #[test]
    fn test_expired_token_is_reported_as_expired() {
        let tokens = TokenService::new("unit-test-secret-unit-test-secret", 1);
        let issued = tokens.issue_at(&user(), Utc::now() - Duration::hours(3)).unwrap();

        assert!(matches!(tokens.verify(&issued.token), Err(IdentityError::TokenExpired)));
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let ours = TokenService::new("unit-test-secret-unit-test-secret", 1);
        let theirs = TokenService::new("another-secret-another-secret-xx", 1);
        let issued = theirs.issue(&user()).unwrap();

        assert!(matches!(ours.verify(&issued.token), Err(IdentityError::InvalidToken)));
        assert!(matches!(ours.verify("not.a.token"), Err(IdentityError::InvalidToken)));
    }
}
