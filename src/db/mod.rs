// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: Firestore in production, an in-process store otherwise.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::config::{Config, StoreBackend};
use crate::error::AppError;
use crate::models::{StoredUser, UserFilter, UserPatch};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Email uniqueness index (keyed by URL-encoded normalized email)
    pub const USER_EMAILS: &str = "user_emails";
}

/// User document store. Cloning is cheap and shares the connection.
///
/// Emails passed in are expected to be normalized already.
#[derive(Clone)]
pub enum Database {
    Firestore(FirestoreDb),
    Memory(MemoryDb),
}

impl Database {
    /// Connect to the backend selected by configuration.
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        match config.store_backend {
            StoreBackend::Firestore => Ok(Self::Firestore(
                FirestoreDb::new(&config.gcp_project_id).await?,
            )),
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory user store; data is lost on restart");
                Ok(Self::in_memory())
            }
        }
    }

    /// Fresh, empty in-memory store.
    pub fn in_memory() -> Self {
        Self::Memory(MemoryDb::new())
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<StoredUser>, AppError> {
        match self {
            Self::Firestore(db) => db.get_user(id).await,
            Self::Memory(db) => db.get_user(id),
        }
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<StoredUser>, AppError> {
        match self {
            Self::Firestore(db) => db.find_user_by_email(email).await,
            Self::Memory(db) => db.find_user_by_email(email),
        }
    }

    pub async fn list_users(&self, filter: &UserFilter) -> Result<Vec<StoredUser>, AppError> {
        match self {
            Self::Firestore(db) => db.list_users(filter).await,
            Self::Memory(db) => db.list_users(filter),
        }
    }

    /// Insert a new user. Fails with `DuplicateIdentity` if the email is taken.
    pub async fn insert_user(&self, user: &StoredUser) -> Result<(), AppError> {
        match self {
            Self::Firestore(db) => db.insert_user(user).await,
            Self::Memory(db) => db.insert_user(user),
        }
    }

    /// Apply a write set to one user. `Ok(None)` if the user does not exist.
    pub async fn update_user(
        &self,
        id: &str,
        patch: UserPatch,
        now: &str,
    ) -> Result<Option<StoredUser>, AppError> {
        match self {
            Self::Firestore(db) => db.update_user(id, patch, now).await,
            Self::Memory(db) => db.update_user(id, patch, now),
        }
    }

    /// Permanently delete a user. `Ok(false)` if it did not exist.
    pub async fn delete_user(&self, id: &str) -> Result<bool, AppError> {
        match self {
            Self::Firestore(db) => db.delete_user(id).await,
            Self::Memory(db) => db.delete_user(id),
        }
    }
}
