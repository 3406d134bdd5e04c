// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! bcrypt password hashing.
//!
//! Hashing is deliberately slow (tens to hundreds of milliseconds at the
//! default cost), so both hashing and verification run on tokio's blocking
//! pool instead of the async workers.

use crate::error::AppError;
use crate::models::PasswordHash;

/// bcrypt only reads this many bytes of input; anything beyond is ignored.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Password hasher with a configurable bcrypt cost.
///
/// The cost only affects new hashes. Every stored hash records the cost it
/// was produced with, and verification reads it from there.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password.
    ///
    /// Passwords longer than `MAX_PASSWORD_BYTES` are refused rather than
    /// silently truncated.
    pub async fn hash(&self, plaintext: &str) -> Result<PasswordHash, AppError> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Err(AppError::BadRequest(format!(
                "password must be at most {} bytes",
                MAX_PASSWORD_BYTES
            )));
        }

        let cost = self.cost;
        let plaintext = plaintext.to_owned();

        let encoded = tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, cost))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Hashing task failed: {}", e)))?
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))?;

        Ok(PasswordHash::from_encoded(encoded))
    }

    /// Check a candidate against a stored hash.
    ///
    /// A mismatch is `Ok(false)`. Only a corrupt stored hash is an error.
    /// A candidate over `MAX_PASSWORD_BYTES` never matches, since no stored
    /// hash can have come from it; the hash is still checked so the reply
    /// takes the usual time.
    pub async fn verify(&self, candidate: &str, hash: &PasswordHash) -> Result<bool, AppError> {
        let too_long = candidate.len() > MAX_PASSWORD_BYTES;
        let candidate = candidate.to_owned();
        let encoded = hash.as_str().to_owned();

        let matched = tokio::task::spawn_blocking(move || bcrypt::verify(candidate, &encoded))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Verification task failed: {}", e)))?
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Stored password hash unreadable: {}", e))
            })?;

        Ok(matched && !too_long)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = PasswordHasher::new(4);
        let hash = hasher.hash("abc123").await.unwrap();

        assert!(hasher.verify("abc123", &hash).await.unwrap());
        assert!(!hasher.verify("abc124", &hash).await.unwrap());
        assert!(!hasher.verify("", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_hash_is_salted_and_self_describing() {
        let hasher = PasswordHasher::new(5);
        let first = hasher.hash("same").await.unwrap();
        let second = hasher.hash("same").await.unwrap();

        assert_ne!(first, second);
        assert!(first.as_str().starts_with("$2b$05$"));
        assert_ne!(first.as_str(), "same");
    }

    #[tokio::test]
    async fn test_verify_uses_cost_embedded_in_hash() {
        let old = PasswordHasher::new(4).hash("pw").await.unwrap();
        let retuned = PasswordHasher::new(6);
        assert!(retuned.verify("pw", &old).await.unwrap());
    }

    #[tokio::test]
    async fn test_passwords_past_72_bytes_are_not_truncated() {
        let hasher = PasswordHasher::new(4);
        let prefix = "a".repeat(72);
        let first = format!("{}X", prefix);
        let second = format!("{}Y", prefix);
        assert_eq!(first.len(), 73);

        // Neither 73-byte password can be stored
        for long in [&first, &second] {
            let err = hasher.hash(long).await.unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));
        }

        // A 72-byte password is fine, but longer candidates sharing its
        // prefix do not match it
        let hash = hasher.hash(&prefix).await.unwrap();
        assert!(hasher.verify(&prefix, &hash).await.unwrap());
        assert!(!hasher.verify(&first, &hash).await.unwrap());
        assert!(!hasher.verify(&second, &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_limit_counts_bytes_not_chars() {
        let hasher = PasswordHasher::new(4);
        // 36 two-byte chars = 72 bytes
        assert!(hasher.hash(&"é".repeat(36)).await.is_ok());
        // 37 chars = 74 bytes
        assert!(hasher.hash(&"é".repeat(37)).await.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_hash_is_an_error() {
        let hasher = PasswordHasher::new(4);
        let corrupt = PasswordHash::from_encoded("not-a-bcrypt-hash".to_string());
        assert!(hasher.verify("pw", &corrupt).await.is_err());
    }
}
