// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile image hosting (Cloudinary).
//!
//! Without credentials the service runs in mock mode and hands back a
//! content-addressed placeholder URL, so local runs and tests stay offline.

use crate::config::CloudinaryConfig;
use crate::error::AppError;
use crate::time_utils::unix_now;
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Images are scaled down to fit in a 150x150 box, never up.
pub const PROFILE_TRANSFORMATION: &str = "c_limit,h_150,w_150";

/// Content types accepted for profile images.
pub const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/png", "image/jpg", "image/jpeg", "image/gif"];

const MOCK_BASE_URL: &str = "https://images.invalid";

/// Whether a content type may be uploaded as a profile image.
pub fn is_allowed_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    ALLOWED_CONTENT_TYPES.contains(&essence.as_str())
}

/// Cloudinary upload response (fields we use).
#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Cloudinary error response.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

/// Image host client.
#[derive(Clone)]
pub struct ImageHostService {
    http: reqwest::Client,
    base_url: String,
    cloudinary: Option<CloudinaryConfig>,
}

impl ImageHostService {
    pub fn new(cloudinary: Option<CloudinaryConfig>) -> Self {
        if cloudinary.is_none() {
            tracing::warn!("Cloudinary not configured; profile images use placeholder URLs");
        }
        Self {
            http: reqwest::Client::new(),
            base_url: "https://api.cloudinary.com/v1_1".to_string(),
            cloudinary,
        }
    }

    /// Offline image host for tests.
    pub fn new_mock() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: String::new(),
            cloudinary: None,
        }
    }

    pub fn is_mock(&self) -> bool {
        self.cloudinary.is_none()
    }

    /// Upload an image and return its public URL.
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        content_type: &str,
    ) -> Result<String, AppError> {
        let Some(cloudinary) = &self.cloudinary else {
            let url = mock_url(&bytes);
            tracing::debug!(url = %url, "Mock image upload");
            return Ok(url);
        };

        let timestamp = unix_now().to_string();
        let signed = [
            ("timestamp", timestamp.as_str()),
            ("transformation", PROFILE_TRANSFORMATION),
        ];
        let signature = sign_params(&signed, &cloudinary.api_secret);

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| AppError::BadRequest(format!("Invalid content type: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", cloudinary.api_key.clone())
            .text("timestamp", timestamp.clone())
            .text("transformation", PROFILE_TRANSFORMATION)
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        let url = format!("{}/{}/image/upload", self.base_url, cloudinary.cloud_name);
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::ImageHost(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.error.message,
                Err(_) => status.to_string(),
            };
            return Err(AppError::ImageHost(format!(
                "Upload failed ({}): {}",
                status, message
            )));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::ImageHost(format!("Malformed upload response: {}", e)))?;

        tracing::info!(url = %uploaded.secure_url, "Image uploaded");
        Ok(uploaded.secure_url)
    }
}

/// Cloudinary request signature: `k1=v1&k2=v2...` sorted by key, followed by
/// the API secret, SHA-256, hex.
fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn mock_url(bytes: &[u8]) -> String {
    format!("{}/{}", MOCK_BASE_URL, hex::encode(Sha256::digest(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_content_types() {
        assert!(is_allowed_content_type("image/png"));
        assert!(is_allowed_content_type("image/JPEG"));
        assert!(is_allowed_content_type("image/gif; charset=binary"));
        assert!(is_allowed_content_type("image/jpg"));
        assert!(!is_allowed_content_type("image/webp"));
        assert!(!is_allowed_content_type("text/plain"));
        assert!(!is_allowed_content_type(""));
    }

    #[test]
    fn test_signature_sorts_params() {
        let a = sign_params(&[("timestamp", "1"), ("transformation", "x")], "secret");
        let b = sign_params(&[("transformation", "x"), ("timestamp", "1")], "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let expected = hex::encode(Sha256::digest(b"timestamp=1&transformation=xsecret"));
        assert_eq!(a, expected);

        assert_ne!(a, sign_params(&[("timestamp", "1"), ("transformation", "x")], "other"));
    }

    #[tokio::test]
    async fn test_mock_upload_is_content_addressed() {
        let host = ImageHostService::new_mock();
        assert!(host.is_mock());

        let first = host
            .upload(b"png bytes".to_vec(), "a.png", "image/png")
            .await
            .unwrap();
        let again = host
            .upload(b"png bytes".to_vec(), "b.png", "image/png")
            .await
            .unwrap();
        let other = host
            .upload(b"other bytes".to_vec(), "a.png", "image/png")
            .await
            .unwrap();

        assert!(first.starts_with("https://images.invalid/"));
        assert_eq!(first, again);
        assert_ne!(first, other);
    }
}
