// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.
//!
//! `User` is the only shape that leaves the store: it has no password field,
//! so responses and log lines built from it cannot carry the secret.
//! `StoredUser` is the persisted document and is only handled by the store
//! layer.

use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

fn default_primary_color() -> String {
    "blue".to_string()
}

fn default_secondary_color() -> String {
    "blue".to_string()
}

fn default_light_dark() -> String {
    "light".to_string()
}

/// Lowercase and trim an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// UI theme preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    #[serde(default = "default_primary_color")]
    pub primary_color: String,
    #[serde(default = "default_secondary_color")]
    pub secondary_color: String,
    #[serde(default = "default_light_dark")]
    pub light_dark: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_color: default_primary_color(),
            secondary_color: default_secondary_color(),
            light_dark: default_light_dark(),
        }
    }
}

/// User profile as exposed to API clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque user ID (also used as document ID)
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// Always lowercase
    pub email_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(
        rename = "profileImageURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub theme: Theme,
    /// RFC 3339 creation time
    pub created_at: String,
    /// RFC 3339 time of the last write
    pub updated_at: String,
}

/// Encoded bcrypt hash (`$2b$<cost>$<salt+digest>`).
///
/// Only `PasswordHasher` creates these, so a plaintext can never be stored
/// in this slot and a hash can never be hashed a second time.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub(crate) fn from_encoded(encoded: String) -> Self {
        Self(encoded)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

/// User document stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email_address: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(rename = "profileImageURL", default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub theme: Theme,
    #[serde(rename = "password")]
    pub password_hash: PasswordHash,
    pub created_at: String,
    pub updated_at: String,
}

impl From<StoredUser> for User {
    fn from(stored: StoredUser) -> Self {
        Self {
            id: stored.id,
            first_name: stored.first_name,
            last_name: stored.last_name,
            email_address: stored.email_address,
            phone_number: stored.phone_number,
            profile_image_url: stored.profile_image_url,
            theme: stored.theme,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        }
    }
}

/// Theme fields in a write set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemePatch {
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub light_dark: Option<String>,
}

/// Validated, normalized write set for one stored user.
///
/// Produced by the credential store; the database applies it in a single
/// read-modify-write keyed by user ID.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_address: Option<String>,
    /// `Some(None)` clears the phone number.
    pub phone_number: Option<Option<String>>,
    pub profile_image_url: Option<String>,
    pub theme: ThemePatch,
    pub password_hash: Option<PasswordHash>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email_address.is_none()
            && self.phone_number.is_none()
            && self.profile_image_url.is_none()
            && self.theme == ThemePatch::default()
            && self.password_hash.is_none()
    }

    /// Stored document paths this patch writes, for a partial update.
    /// `updatedAt` is always written.
    pub fn field_paths(&self) -> Vec<&'static str> {
        let fields = [
            ("firstName", self.first_name.is_some()),
            ("lastName", self.last_name.is_some()),
            ("emailAddress", self.email_address.is_some()),
            ("phoneNumber", self.phone_number.is_some()),
            ("profileImageURL", self.profile_image_url.is_some()),
            ("theme.primaryColor", self.theme.primary_color.is_some()),
            ("theme.secondaryColor", self.theme.secondary_color.is_some()),
            ("theme.lightDark", self.theme.light_dark.is_some()),
            ("password", self.password_hash.is_some()),
        ];
        fields
            .into_iter()
            .filter_map(|(path, set)| set.then_some(path))
            .chain(std::iter::once("updatedAt"))
            .collect()
    }
}

impl StoredUser {
    /// Apply a write set and bump `updated_at`.
    pub fn apply(&mut self, patch: UserPatch, now: &str) {
        if let Some(first_name) = patch.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            self.last_name = last_name;
        }
        if let Some(email) = patch.email_address {
            self.email_address = normalize_email(&email);
        }
        if let Some(phone_number) = patch.phone_number {
            self.phone_number = phone_number;
        }
        if let Some(url) = patch.profile_image_url {
            self.profile_image_url = Some(url);
        }
        if let Some(color) = patch.theme.primary_color {
            self.theme.primary_color = color;
        }
        if let Some(color) = patch.theme.secondary_color {
            self.theme.secondary_color = color;
        }
        if let Some(mode) = patch.theme.light_dark {
            self.theme.light_dark = mode;
        }
        if let Some(hash) = patch.password_hash {
            self.password_hash = hash;
        }
        self.updated_at = now.to_string();
    }
}

/// Signup candidate. Every field is optional at the wire level so that
/// missing fields surface as validation errors rather than parse errors.
/// No `Debug`: the plaintext password must not end up in logs.
#[derive(Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[validate(
        required(message = "firstName is required"),
        length(min = 1, message = "firstName is required")
    )]
    pub first_name: Option<String>,
    #[validate(
        required(message = "lastName is required"),
        length(min = 1, message = "lastName is required")
    )]
    pub last_name: Option<String>,
    #[validate(
        required(message = "emailAddress is required"),
        email(message = "emailAddress is not a valid email address")
    )]
    pub email_address: Option<String>,
    #[validate(
        required(message = "password is required"),
        length(min = 1, message = "password is required")
    )]
    pub password: Option<String>,
    pub phone_number: Option<String>,
}

impl NewUser {
    /// Trim names, lowercase the email, and turn blank strings into `None`.
    /// The password is kept byte-for-byte.
    pub fn normalized(self) -> Self {
        Self {
            first_name: non_blank(self.first_name),
            last_name: non_blank(self.last_name),
            email_address: non_blank(self.email_address).map(|e| normalize_email(&e)),
            password: self.password.filter(|p| !p.is_empty()),
            phone_number: non_blank(self.phone_number),
        }
    }
}

/// Theme fields a caller may change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ThemeUpdate {
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub light_dark: Option<String>,
}

/// Whitelisted profile fields a caller may change. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_address: Option<String>,
    /// An empty string clears the phone number.
    pub phone_number: Option<String>,
    #[serde(default)]
    pub theme: ThemeUpdate,
}

/// Exact-match filters for listing users.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserFilter {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_address: Option<String>,
}

impl UserFilter {
    /// Lowercase the email filter so it matches stored addresses.
    pub fn normalized(self) -> Self {
        Self {
            email_address: self.email_address.map(|e| normalize_email(&e)),
            ..self
        }
    }

    pub fn matches(&self, user: &StoredUser) -> bool {
        let eq = |want: &Option<String>, have: &str| want.as_deref().map_or(true, |w| w == have);
        eq(&self.first_name, &user.first_name)
            && eq(&self.last_name, &user.last_name)
            && eq(&self.email_address, &user.email_address)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
