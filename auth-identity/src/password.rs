use crate::error::{IdentityError, Result};
use tracing::warn;

pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;

/// bcrypt hashing with a configurable work factor.
///
/// Hashing at the production cost takes hundreds of milliseconds, so both
/// operations run on the blocking thread pool.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(IdentityError::HashingError(format!(
                "bcrypt cost must be between {} and {}, got {}",
                MIN_COST,
                MAX_COST,
                cost
            )));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub async fn hash(&self, plain: &str) -> Result<String> {
        let plain = plain.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
            .await
            .map_err(|e| IdentityError::HashingError(e.to_string()))?
            .map_err(|e| IdentityError::HashingError(e.to_string()))
    }

    /// A malformed stored hash verifies as `false`.
    pub async fn verify(&self, plain: &str, digest: &str) -> Result<bool> {
        let plain = plain.to_owned();
        let digest = digest.to_owned();
        let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(plain, &digest))
            .await
            .map_err(|e| IdentityError::HashingError(e.to_string()))?;

        match outcome {
            Ok(matches) => Ok(matches),
            Err(e) => {
                warn!(error = %e, "Stored password hash could not be parsed");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = PasswordHasher::new(MIN_COST).unwrap();
        let digest = hasher.hash("rahasia123").await.unwrap();

        assert_ne!(digest, "rahasia123");
        assert!(hasher.verify("rahasia123", &digest).await.unwrap());
        assert!(!hasher.verify("salah", &digest).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_digest_does_not_verify() {
        let hasher = PasswordHasher::new(MIN_COST).unwrap();
        assert!(!hasher.verify("anything", "not-a-bcrypt-hash").await.unwrap());
    }

    #[test]
    fn test_cost_bounds() {
        assert!(PasswordHasher::new(3).is_err());
        assert!(PasswordHasher::new(32).is_err());
        assert_eq!(PasswordHasher::new(14).unwrap().cost(), 14);
    }
}
