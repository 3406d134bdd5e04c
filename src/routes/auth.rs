// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signup and login routes (public).

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use std::sync::Arc;

use crate::error::Result;
use crate::models::NewUser;
use crate::routes::extract::JsonOrForm;
use crate::services::{AuthResponse, LoginRequest};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
}

/// Create an account. Responds 201 with a token and the new user.
async fn signup(
    State(state): State<Arc<AppState>>,
    JsonOrForm(candidate): JsonOrForm<NewUser>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let response = state.auth.signup(candidate).await?;
    tracing::info!(user_id = %response.user.id, "Signup complete");
    Ok((StatusCode::CREATED, Json(response)))
}

async fn login(
    State(state): State<Arc<AppState>>,
    JsonOrForm(request): JsonOrForm<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    Ok(Json(state.auth.login(request).await?))
}
