// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer token authentication middleware.

use crate::error::AppError;
use crate::models::User;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authenticated caller, resolved from the token subject.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    /// Record as loaded when the request was authenticated.
    pub user: User,
}

impl AuthUser {
    /// Fail with `Forbidden(message)` unless the caller is `target_id`.
    pub fn ensure_self(&self, target_id: &str, message: &str) -> Result<(), AppError> {
        if self.user_id == target_id {
            Ok(())
        } else {
            tracing::warn!(user_id = %self.user_id, target = target_id, "Cross-user write denied");
            Err(AppError::Forbidden(message.to_string()))
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(value: Option<&HeaderValue>) -> Result<&str, AppError> {
    let value = value
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let (scheme, token) = value.split_once(' ').ok_or(AppError::Unauthorized)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::Unauthorized);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::Unauthorized);
    }
    Ok(token)
}

/// Resolve the caller from a raw `Authorization` header.
pub async fn authenticate(
    state: &AppState,
    authorization: Option<&HeaderValue>,
) -> Result<AuthUser, AppError> {
    let token = bearer_token(authorization)?;
    let claims = state.token_verifier.verify(token)?;

    // A valid signature is not enough: the subject must still exist
    let user = state
        .credentials
        .find_by_id(&claims.sub)
        .await?
        .ok_or_else(|| {
            tracing::debug!(user_id = %claims.sub, "Token subject no longer exists");
            AppError::InvalidToken
        })?;

    Ok(AuthUser {
        user_id: claims.sub,
        user,
    })
}

/// Middleware that requires a valid bearer token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_user = authenticate(&state, request.headers().get(header::AUTHORIZATION)).await?;
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}
