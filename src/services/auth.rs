// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signup and login.

use crate::error::AppError;
use crate::models::{NewUser, User};
use crate::services::credentials::CredentialStore;
use crate::services::token::TokenIssuer;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Login credentials. No `Debug`, see `NewUser`.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email_address: Option<String>,
    pub password: Option<String>,
}

/// Token plus the public view of the user it was issued for.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Orchestrates the credential store and token issuer.
#[derive(Clone)]
pub struct AuthService {
    credentials: CredentialStore,
    issuer: TokenIssuer,
}

impl AuthService {
    pub fn new(credentials: CredentialStore, issuer: TokenIssuer) -> Self {
        Self {
            credentials,
            issuer,
        }
    }

    /// Create an account and return a token for it.
    pub async fn signup(&self, candidate: NewUser) -> Result<AuthResponse, AppError> {
        let user = self.credentials.create(candidate).await?;
        let token = self.issuer.issue(&user)?;
        Ok(AuthResponse { token, user })
    }

    /// Exchange email and password for a token.
    ///
    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AppError> {
        let (Some(email), Some(password)) = (request.email_address, request.password) else {
            return Err(AppError::BadRequest("Required attributes missing".to_string()));
        };
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::BadRequest("Required attributes missing".to_string()));
        }

        let Some(user) = self.credentials.find_by_email(&email).await? else {
            self.credentials.compare_password_unknown_user(&password).await?;
            tracing::info!("Login rejected: unknown email");
            return Err(AppError::AuthenticationFailed);
        };

        if !self.credentials.compare_password(&user, &password).await? {
            tracing::info!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AppError::AuthenticationFailed);
        }

        let token = self.issuer.issue(&user)?;
        tracing::info!(user_id = %user.id, "Login succeeded");
        Ok(AuthResponse { token, user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::Database;
    use crate::services::password::PasswordHasher;
    use crate::services::token::TokenVerifier;

    fn service() -> (AuthService, TokenVerifier) {
        let config = Config::test_default();
        let credentials = CredentialStore::new(Database::in_memory(), PasswordHasher::new(4));
        (
            AuthService::new(credentials, TokenIssuer::new(&config)),
            TokenVerifier::new(&config),
        )
    }

    fn signup_request() -> NewUser {
        NewUser {
            first_name: Some("Test".to_string()),
            last_name: Some("Test".to_string()),
            email_address: Some("Test@Test.com".to_string()),
            password: Some("abc123".to_string()),
            phone_number: None,
        }
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email_address: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let (auth, verifier) = service();

        let signed_up = auth.signup(signup_request()).await.unwrap();
        assert_eq!(signed_up.user.email_address, "test@test.com");
        let claims = verifier.verify(&signed_up.token).unwrap();
        assert_eq!(claims.sub, signed_up.user.id);

        let logged_in = auth.login(login("TEST@test.com", "abc123")).await.unwrap();
        assert_eq!(logged_in.user.id, signed_up.user.id);
        assert_eq!(verifier.verify(&logged_in.token).unwrap().sub, signed_up.user.id);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (auth, _) = service();
        auth.signup(signup_request()).await.unwrap();

        let wrong_password = auth.login(login("test@test.com", "abc1234")).await.unwrap_err();
        let unknown_email = auth.login(login("nobody@test.com", "abc123")).await.unwrap_err();

        assert!(matches!(wrong_password, AppError::AuthenticationFailed));
        assert!(matches!(unknown_email, AppError::AuthenticationFailed));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_login_requires_both_fields() {
        let (auth, _) = service();

        let err = auth
            .login(LoginRequest {
                email_address: Some("test@test.com".to_string()),
                password: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Required attributes missing"));

        let err = auth.login(login("  ", "abc123")).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_duplicate_signup() {
        let (auth, _) = service();
        auth.signup(signup_request()).await.unwrap();

        let err = auth.signup(signup_request()).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateIdentity));
    }
}
