// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup. The resulting `Config` is immutable and
//! handed by value to the components that need it (token issuer, verifier,
//! credential store), so there is no process-global state.

use std::env;

/// Issuer claim used when `JWT_ISSUER` is not set.
pub const DEFAULT_ISSUER: &str = "PhoenixRising Web Design";

/// bcrypt work factor used when `BCRYPT_COST` is not set.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Which document store backs the credential store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local store, lost on restart. Local development and tests.
    Memory,
    /// Google Cloud Firestore (or its emulator).
    Firestore,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "firestore" => Ok(Self::Firestore),
            _ => Err(ConfigError::Invalid("STORE_BACKEND", s.to_string())),
        }
    }
}

/// Cloudinary credentials for profile image hosting.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore backend only)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Document store backend
    pub store_backend: StoreBackend,
    /// `iss` claim written into and required from every token
    pub jwt_issuer: String,
    /// Optional token lifetime in seconds. `None` issues tokens without `exp`.
    pub jwt_ttl_secs: Option<u64>,
    /// bcrypt work factor for newly hashed passwords
    pub bcrypt_cost: u32,

    // --- Secrets ---
    /// JWT signing key (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Image host credentials. `None` runs the image host in mock mode.
    pub cloudinary: Option<CloudinaryConfig>,
}

impl Config {
    /// Config for tests: in-memory store, minimum bcrypt cost, mock image host.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            jwt_issuer: DEFAULT_ISSUER.to_string(),
            jwt_ttl_secs: None,
            bcrypt_cost: 4,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            cloudinary: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let jwt_signing_key = env::var("JWT_KEY")
            .map_err(|_| ConfigError::Missing("JWT_KEY"))?
            .into_bytes();
        if jwt_signing_key.is_empty() {
            return Err(ConfigError::Invalid("JWT_KEY", "empty".to_string()));
        }

        let bcrypt_cost = match env::var("BCRYPT_COST") {
            Ok(raw) => parse_bcrypt_cost(&raw)?,
            Err(_) => DEFAULT_BCRYPT_COST,
        };

        let jwt_ttl_secs = match env::var("JWT_TTL_SECS") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::Invalid("JWT_TTL_SECS", raw.clone()))?,
            ),
            _ => None,
        };

        let store_backend = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .parse()?;

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            store_backend,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string()),
            jwt_ttl_secs,
            bcrypt_cost,
            jwt_signing_key,
            cloudinary: cloudinary_from_env(),
        })
    }
}

/// Parse and range-check a bcrypt cost.
fn parse_bcrypt_cost(raw: &str) -> Result<u32, ConfigError> {
    let cost: u32 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid("BCRYPT_COST", raw.to_string()))?;
    if !(4..=31).contains(&cost) {
        return Err(ConfigError::Invalid("BCRYPT_COST", raw.to_string()));
    }
    Ok(cost)
}

/// Cloudinary is enabled only when all three variables are present.
fn cloudinary_from_env() -> Option<CloudinaryConfig> {
    let cloud_name = env::var("CLOUDINARY_CLOUD").ok()?;
    let api_key = env::var("CLOUDINARY_APIKEY").ok()?;
    let api_secret = env::var("CLOUDINARY_APISECRET").ok()?;
    Some(CloudinaryConfig {
        cloud_name: cloud_name.trim().to_string(),
        api_key: api_key.trim().to_string(),
        api_secret: api_secret.trim().to_string(),
    })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("JWT_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("BCRYPT_COST", "10");
        env::remove_var("JWT_TTL_SECS");
        env::remove_var("STORE_BACKEND");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.jwt_signing_key, b"test_jwt_key_32_bytes_minimum!!");
        assert_eq!(config.bcrypt_cost, 10);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.jwt_ttl_secs, None);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_bcrypt_cost_bounds() {
        assert_eq!(parse_bcrypt_cost("12").unwrap(), 12);
        assert_eq!(parse_bcrypt_cost(" 4 ").unwrap(), 4);
        assert!(parse_bcrypt_cost("3").is_err());
        assert!(parse_bcrypt_cost("32").is_err());
        assert!(parse_bcrypt_cost("twelve").is_err());
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!(
            "Firestore".parse::<StoreBackend>().unwrap(),
            StoreBackend::Firestore
        );
        assert!("postgres".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_default_issuer() {
        assert_eq!(Config::test_default().jwt_issuer, DEFAULT_ISSUER);
    }
}
