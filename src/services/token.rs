// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed bearer tokens (HS256 JWT).
//!
//! The issuer and verifier are built from the same `Config`, so a token is
//! accepted only if it was signed with this deployment's key and carries its
//! issuer claim.

use crate::config::Config;
use crate::error::AppError;
use crate::models::User;
use crate::time_utils::unix_now;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Issuer
    pub iss: String,
    /// Subject (user ID)
    pub sub: String,
    pub first_name: String,
    pub last_name: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp). Absent when no lifetime is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// Signs tokens for authenticated users.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    issuer: String,
    ttl_secs: Option<u64>,
}

impl TokenIssuer {
    pub fn new(config: &Config) -> Self {
        Self {
            key: EncodingKey::from_secret(&config.jwt_signing_key),
            issuer: config.jwt_issuer.clone(),
            ttl_secs: config.jwt_ttl_secs,
        }
    }

    /// Issue a token whose subject is the user's ID.
    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        let now = unix_now();
        let claims = Claims {
            iss: self.issuer.clone(),
            sub: user.id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            iat: now,
            exp: self.ttl_secs.map(|ttl| now + ttl),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign token: {}", e)))
    }
}

/// Checks signature, issuer and (when present) expiry of presented tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(config: &Config) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.jwt_issuer.as_str()]);
        // exp is still checked whenever the token carries one
        validation.set_required_spec_claims(&["iss", "sub"]);

        Self {
            key: DecodingKey::from_secret(&config.jwt_signing_key),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                AppError::InvalidToken
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Theme;

    fn user() -> User {
        User {
            id: "user-1".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email_address: "test@test.com".to_string(),
            phone_number: None,
            profile_image_url: None,
            theme: Theme::default(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let config = Config::test_default();
        let token = TokenIssuer::new(&config).issue(&user()).unwrap();
        let claims = TokenVerifier::new(&config).verify(&token).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.iss, "PhoenixRising Web Design");
        assert_eq!(claims.first_name, "Test");
        assert_eq!(claims.last_name, "User");
        assert_eq!(claims.exp, None);
        assert!(claims.iat > 0);
    }

    #[test]
    fn test_claims_wire_names() {
        let config = Config::test_default();
        let token = TokenIssuer::new(&config).issue(&user()).unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        let raw = decode::<serde_json::Value>(
            &token,
            &DecodingKey::from_secret(&config.jwt_signing_key),
            &validation,
        )
        .unwrap()
        .claims;

        assert_eq!(raw["firstName"], "Test");
        assert_eq!(raw["lastName"], "User");
        assert!(raw.get("exp").is_none());
        assert!(raw.get("password").is_none());
        assert!(raw.get("emailAddress").is_none());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let config = Config::test_default();
        let token = TokenIssuer::new(&config).issue(&user()).unwrap();

        let mut other = Config::test_default();
        other.jwt_signing_key = b"a_completely_different_signing_key".to_vec();
        let err = TokenVerifier::new(&other).verify(&token).unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let mut config = Config::test_default();
        config.jwt_issuer = "Someone Else".to_string();
        let token = TokenIssuer::new(&config).issue(&user()).unwrap();

        let err = TokenVerifier::new(&Config::test_default())
            .verify(&token)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let config = Config::test_default();
        let token = TokenIssuer::new(&config).issue(&user()).unwrap();

        // Swap the payload for one naming a different subject
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_claims = Claims {
            iss: config.jwt_issuer.clone(),
            sub: "someone-else".to_string(),
            first_name: "X".to_string(),
            last_name: "Y".to_string(),
            iat: unix_now(),
            exp: None,
        };
        let forged = encode(
            &Header::new(Algorithm::HS256),
            &forged_claims,
            &EncodingKey::from_secret(b"attacker key"),
        )
        .unwrap();
        let forged_payload = forged.split('.').nth(1).unwrap().to_string();
        parts[1] = &forged_payload;
        let spliced = parts.join(".");

        let verifier = TokenVerifier::new(&config);
        assert!(verifier.verify(&spliced).is_err());
        assert!(verifier.verify("not.a.token").is_err());
        assert!(verifier.verify("").is_err());
    }

    #[test]
    fn test_ttl_sets_exp() {
        let mut config = Config::test_default();
        config.jwt_ttl_secs = Some(3600);
        let token = TokenIssuer::new(&config).issue(&user()).unwrap();
        let claims = TokenVerifier::new(&config).verify(&token).unwrap();

        assert_eq!(claims.exp, Some(claims.iat + 3600));
    }

    #[test]
    fn test_expired_token_rejected() {
        let config = Config::test_default();
        let now = unix_now();
        let claims = Claims {
            iss: config.jwt_issuer.clone(),
            sub: "user-1".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            iat: now - 7200,
            exp: Some(now - 3600),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&config.jwt_signing_key),
        )
        .unwrap();

        let err = TokenVerifier::new(&config).verify(&token).unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }
}
