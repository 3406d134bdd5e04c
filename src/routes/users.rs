// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User management routes (require authentication).

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ProfileUpdate, User, UserFilter};
use crate::routes::extract::JsonOrForm;
use crate::services::image_host::is_allowed_content_type;
use crate::AppState;
use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Multipart field carrying the profile image.
const AVATAR_FIELD: &str = "avatar";

/// User routes. The auth middleware is applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users", get(list_users))
        .route(
            "/api/users/{id}",
            get(get_user).patch(update_user).delete(remove_user),
        )
        .route("/api/users/{id}/changePassword", post(change_password))
        .route("/api/users/{id}/profileImage", post(update_profile_image))
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

// ─── Reads ───────────────────────────────────────────────────

/// User list response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserListResponse {
    /// Number of users returned
    pub items: usize,
    pub users: Vec<User>,
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    filter: std::result::Result<Query<UserFilter>, QueryRejection>,
) -> Result<Json<UserListResponse>> {
    let Query(filter) = filter.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let users = state.credentials.list(filter).await?;

    Ok(Json(UserListResponse {
        items: users.len(),
        users,
    }))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<User>> {
    let user = state
        .credentials
        .find_by_id(&id)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(Json(user))
}

// ─── Writes (caller's own account only) ──────────────────────

async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
    body: std::result::Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<User>> {
    caller.ensure_self(&id, "Access Denied - Unable to update another user")?;
    let Json(update) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let user = state
        .credentials
        .update(&id, update)
        .await?
        .ok_or_else(user_not_found)?;

    tracing::info!(user_id = %user.id, "Profile updated");
    Ok(Json(user))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    original_password: Option<String>,
    password: Option<String>,
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
    body: std::result::Result<JsonOrForm<ChangePasswordRequest>, AppError>,
) -> Result<Json<User>> {
    caller.ensure_self(&id, "Access Denied - Unable to change another user's password")?;

    let invalid_body = || AppError::BadRequest("Invalid message body".to_string());
    let JsonOrForm(request) = body.map_err(|_| invalid_body())?;
    let (Some(original), Some(password)) = (request.original_password, request.password) else {
        return Err(invalid_body());
    };
    if original.is_empty() || password.is_empty() {
        return Err(invalid_body());
    }

    if original == password {
        return Err(AppError::BadRequest(
            "Original password cannot match new password".to_string(),
        ));
    }

    // ensure_self above means the caller is the target
    let user = &caller.user;
    if !state.credentials.compare_password(user, &original).await? {
        return Err(AppError::BadRequest("Invalid original password".to_string()));
    }

    let user = state
        .credentials
        .set_password(user, &password)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(Json(user))
}

async fn remove_user(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    caller.ensure_self(&id, "Access Denied - Unable to remove another user")?;

    if !state.credentials.remove(&id).await? {
        return Err(user_not_found());
    }
    Ok(StatusCode::OK)
}

/// An uploaded image held in memory.
struct Upload {
    bytes: Vec<u8>,
    file_name: String,
    content_type: String,
}

/// Pull the `avatar` field out of the form, skipping any others.
async fn read_avatar(mut multipart: Multipart) -> Result<Option<Upload>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        if bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some(Upload {
            bytes: bytes.to_vec(),
            file_name,
            content_type,
        }));
    }
    Ok(None)
}

async fn update_profile_image(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<User>> {
    let file_missing = || AppError::BadRequest("File not found for upload".to_string());

    let multipart = multipart.map_err(|_| file_missing())?;
    let upload = read_avatar(multipart).await?.ok_or_else(file_missing)?;

    if !is_allowed_content_type(&upload.content_type) {
        return Err(AppError::BadRequest(
            "Invalid file type for upload".to_string(),
        ));
    }

    caller.ensure_self(&id, "Access Denied - Unable to update user profile image")?;

    let url = state
        .image_host
        .upload(upload.bytes, &upload.file_name, &upload.content_type)
        .await?;

    let user = state
        .credentials
        .set_profile_image(&caller.user_id, &url)
        .await?
        .ok_or_else(user_not_found)?;

    tracing::info!(user_id = %user.id, "Profile image updated");
    Ok(Json(user))
}
