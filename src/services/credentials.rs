// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential store: the only component that touches password hashes.
//!
//! Everything returned from here is a `User`, which has no password field.
//! Plaintext passwords enter through `create`, `set_password` and
//! `compare_password`, and are hashed in `prepare_patch` only when a password
//! is actually part of the write set.

use crate::db::Database;
use crate::error::AppError;
use crate::models::{
    normalize_email, NewUser, PasswordHash, ProfileUpdate, StoredUser, Theme, ThemePatch, User,
    UserFilter, UserPatch,
};
use crate::services::password::PasswordHasher;
use crate::time_utils::now_rfc3339;
use std::sync::Arc;
use tokio::sync::OnceCell;
use validator::{Validate, ValidateEmail, ValidationErrors};

/// User persistence plus password hashing.
#[derive(Clone)]
pub struct CredentialStore {
    db: Database,
    hasher: PasswordHasher,
    /// Hash checked against when a login names an unknown email, so that
    /// unknown and known addresses take the same time to reject.
    decoy_hash: Arc<OnceCell<PasswordHash>>,
}

impl CredentialStore {
    pub fn new(db: Database, hasher: PasswordHasher) -> Self {
        Self {
            db,
            hasher,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Create a user from a signup candidate.
    ///
    /// Fails with `BadRequest` for missing or malformed fields and with
    /// `DuplicateIdentity` if the (lowercased) email is already registered.
    pub async fn create(&self, candidate: NewUser) -> Result<User, AppError> {
        let candidate = candidate.normalized();
        candidate.validate().map_err(validation_error)?;

        let NewUser {
            first_name: Some(first_name),
            last_name: Some(last_name),
            email_address: Some(email_address),
            password: Some(password),
            phone_number,
        } = candidate
        else {
            return Err(AppError::BadRequest("Required attributes missing".to_string()));
        };

        let password_hash = self.hasher.hash(&password).await?;
        let now = now_rfc3339();

        let record = StoredUser {
            id: uuid::Uuid::new_v4().to_string(),
            first_name,
            last_name,
            email_address,
            phone_number,
            profile_image_url: None,
            theme: Theme::default(),
            password_hash,
            created_at: now.clone(),
            updated_at: now,
        };

        self.db.insert_user(&record).await?;
        tracing::info!(user_id = %record.id, "User created");

        Ok(record.into())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.db.get_user(id).await?.map(User::from))
    }

    /// Case-insensitive lookup by email.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Ok(None);
        }
        Ok(self.db.find_user_by_email(&email).await?.map(User::from))
    }

    pub async fn list(&self, filter: UserFilter) -> Result<Vec<User>, AppError> {
        let filter = filter.normalized();
        let users = self.db.list_users(&filter).await?;
        Ok(users.into_iter().map(User::from).collect())
    }

    /// Compare a candidate password with the user's stored hash.
    ///
    /// `Ok(false)` on mismatch, and also if the user has vanished since it
    /// was loaded.
    pub async fn compare_password(&self, user: &User, candidate: &str) -> Result<bool, AppError> {
        match self.db.get_user(&user.id).await? {
            Some(record) => self.hasher.verify(candidate, &record.password_hash).await,
            None => Ok(false),
        }
    }

    /// Spend the same hashing work as `compare_password` for a login that
    /// named no known user. Always reports a mismatch.
    pub async fn compare_password_unknown_user(&self, candidate: &str) -> Result<bool, AppError> {
        let decoy = self
            .decoy_hash
            .get_or_try_init(|| async {
                let filler = uuid::Uuid::new_v4().to_string();
                self.hasher.hash(&filler).await
            })
            .await?;
        self.hasher.verify(candidate, decoy).await?;
        Ok(false)
    }

    /// Replace the user's password. `Ok(None)` if the user no longer exists.
    pub async fn set_password(&self, user: &User, new_password: &str) -> Result<Option<User>, AppError> {
        let patch = self
            .prepare_patch(ProfileUpdate::default(), Some(new_password))
            .await?;
        let updated = self.apply(&user.id, patch).await?;
        if updated.is_some() {
            tracing::info!(user_id = %user.id, "Password changed");
        }
        Ok(updated)
    }

    /// Apply a whitelisted profile update. `Ok(None)` if the user does not exist.
    pub async fn update(&self, id: &str, update: ProfileUpdate) -> Result<Option<User>, AppError> {
        let patch = self.prepare_patch(update, None).await?;
        if patch.is_empty() {
            return self.find_by_id(id).await;
        }
        self.apply(id, patch).await
    }

    pub async fn set_profile_image(&self, id: &str, url: &str) -> Result<Option<User>, AppError> {
        let patch = UserPatch {
            profile_image_url: Some(url.to_string()),
            ..Default::default()
        };
        self.apply(id, patch).await
    }

    /// Permanently delete a user. `Ok(false)` if it did not exist.
    pub async fn remove(&self, id: &str) -> Result<bool, AppError> {
        let removed = self.db.delete_user(id).await?;
        if removed {
            tracing::info!(user_id = id, "User removed");
        }
        Ok(removed)
    }

    /// Turn a caller-supplied write set into a store patch.
    ///
    /// Validates and normalizes profile fields. The password is hashed here,
    /// once, and only when one is supplied; a patch without a password never
    /// touches the stored hash.
    pub async fn prepare_patch(
        &self,
        update: ProfileUpdate,
        password: Option<&str>,
    ) -> Result<UserPatch, AppError> {
        let first_name = required_if_present(update.first_name, "firstName")?;
        let last_name = required_if_present(update.last_name, "lastName")?;

        let email_address = match update.email_address {
            Some(email) => {
                let email = normalize_email(&email);
                if !email.validate_email() {
                    return Err(AppError::BadRequest(
                        "emailAddress is not a valid email address".to_string(),
                    ));
                }
                Some(email)
            }
            None => None,
        };

        let phone_number = update.phone_number.map(|p| {
            let p = p.trim().to_string();
            (!p.is_empty()).then_some(p)
        });

        let theme = ThemePatch {
            primary_color: required_if_present(update.theme.primary_color, "theme.primaryColor")?,
            secondary_color: required_if_present(
                update.theme.secondary_color,
                "theme.secondaryColor",
            )?,
            light_dark: required_if_present(update.theme.light_dark, "theme.lightDark")?,
        };

        let password_hash = match password {
            Some(p) if p.is_empty() => {
                return Err(AppError::BadRequest("password is required".to_string()))
            }
            Some(p) => Some(self.hasher.hash(p).await?),
            None => None,
        };

        Ok(UserPatch {
            first_name,
            last_name,
            email_address,
            phone_number,
            profile_image_url: None,
            theme,
            password_hash,
        })
    }

    async fn apply(&self, id: &str, patch: UserPatch) -> Result<Option<User>, AppError> {
        let now = now_rfc3339();
        Ok(self.db.update_user(id, patch, &now).await?.map(User::from))
    }
}

/// A field that may be omitted but, if present, must not be blank.
fn required_if_present(value: Option<String>, field: &str) -> Result<Option<String>, AppError> {
    match value {
        Some(v) => {
            let v = v.trim().to_string();
            if v.is_empty() {
                Err(AppError::BadRequest(format!("{} cannot be empty", field)))
            } else {
                Ok(Some(v))
            }
        }
        None => Ok(None),
    }
}

/// Collapse validator errors into one user-safe message.
fn validation_error(errors: ValidationErrors) -> AppError {
    let mut messages: Vec<String> = errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .map(|e| {
            e.message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| e.code.to_string())
        })
        .collect();
    messages.sort();
    messages.dedup();
    AppError::BadRequest(messages.join("; "))
}
