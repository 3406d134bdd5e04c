// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Collections:
//! - `users`: user documents keyed by user ID
//! - `user_emails`: email uniqueness index keyed by the URL-encoded
//!   normalized address, pointing at the owning user ID
//!
//! Firestore has no unique indexes, so every write that creates or moves an
//! email address writes the index document in the same transaction as the
//! user document, conditional on the index document not existing yet.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{StoredUser, UserFilter, UserPatch};
use firestore::FirestoreWritePrecondition;
use serde::{Deserialize, Serialize};

/// Email index document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmailIndex {
    user_id: String,
}

/// Document ID for an email index entry.
fn email_doc_id(email: &str) -> String {
    urlencoding::encode(email).into_owned()
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a disconnected client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Reads ──────────────────────────────────────────────

    /// Get a user document by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<StoredUser>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Look up the user ID that owns a normalized email address.
    async fn get_email_owner(&self, email: &str) -> Result<Option<String>, AppError> {
        let index: Option<EmailIndex> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_EMAILS)
            .obj()
            .one(&email_doc_id(email))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(index.map(|i| i.user_id))
    }

    /// Find a user by normalized email address.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<StoredUser>, AppError> {
        let Some(user_id) = self.get_email_owner(email).await? else {
            return Ok(None);
        };
        // Skip an index entry left behind by a delete racing an email change
        Ok(self
            .get_user(&user_id)
            .await?
            .filter(|user| user.email_address == email))
    }

    /// List users matching all provided filters, oldest first.
    pub async fn list_users(&self, filter: &UserFilter) -> Result<Vec<StoredUser>, AppError> {
        let first_name = filter.first_name.clone();
        let last_name = filter.last_name.clone();
        let email_address = filter.email_address.clone();

        let mut users: Vec<StoredUser> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| {
                q.for_all([
                    first_name.clone().and_then(|v| q.field("firstName").eq(v)),
                    last_name.clone().and_then(|v| q.field("lastName").eq(v)),
                    email_address.clone().and_then(|v| q.field("emailAddress").eq(v)),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Sorted client-side so that filtered queries need no composite index
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    // ─── User Writes ─────────────────────────────────────────────

    /// Insert a new user and claim its email address.
    ///
    /// The index write is conditional on the index document not existing,
    /// so two concurrent signups for one address cannot both commit.
    pub async fn insert_user(&self, user: &StoredUser) -> Result<(), AppError> {
        if self.get_email_owner(&user.email_address).await?.is_some() {
            return Err(AppError::DuplicateIdentity);
        }

        let client = self.get_client()?;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let index = EmailIndex {
            user_id: user.id.clone(),
        };
        client
            .fluent()
            .update()
            .in_col(collections::USER_EMAILS)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(email_doc_id(&user.email_address))
            .object(&index)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add email index to transaction: {}", e))
            })?;

        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(&user.id)
            .object(user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add user to transaction: {}", e)))?;

        if let Err(e) = transaction.commit().await {
            return Err(self.classify_email_conflict(&user.email_address, &user.id, e).await);
        }

        tracing::debug!(user_id = %user.id, "User document created");
        Ok(())
    }

    /// Apply a write set to one user document.
    ///
    /// Only the fields named by the patch are written, so concurrent patches
    /// touching different fields both survive. Returns `None` when the user
    /// does not exist, including when it is deleted before the write commits.
    pub async fn update_user(
        &self,
        id: &str,
        patch: UserPatch,
        now: &str,
    ) -> Result<Option<StoredUser>, AppError> {
        let Some(current) = self.get_user(id).await? else {
            return Ok(None);
        };

        let fields = patch.field_paths();
        let mut updated = current.clone();
        updated.apply(patch, now);

        let email_changed = updated.email_address != current.email_address;
        if email_changed {
            if let Some(owner) = self.get_email_owner(&updated.email_address).await? {
                if owner != id {
                    return Err(AppError::DuplicateIdentity);
                }
            }
        }

        let client = self.get_client()?;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        if email_changed {
            let index = EmailIndex {
                user_id: id.to_string(),
            };
            client
                .fluent()
                .update()
                .in_col(collections::USER_EMAILS)
                .precondition(FirestoreWritePrecondition::Exists(false))
                .document_id(email_doc_id(&updated.email_address))
                .object(&index)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add email index to transaction: {}", e))
                })?;

            client
                .fluent()
                .delete()
                .from(collections::USER_EMAILS)
                .document_id(email_doc_id(&current.email_address))
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!(
                        "Failed to add email index removal to transaction: {}",
                        e
                    ))
                })?;
        }

        client
            .fluent()
            .update()
            .fields(fields)
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(id)
            .object(&updated)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add user to transaction: {}", e)))?;

        if let Err(e) = transaction.commit().await {
            if self.get_user(id).await?.is_none() {
                return Ok(None);
            }
            if email_changed {
                return Err(self.classify_email_conflict(&updated.email_address, id, e).await);
            }
            return Err(AppError::Database(format!("Transaction commit failed: {}", e)));
        }

        // Other fields may have moved concurrently; return what is stored
        Ok(Some(self.get_user(id).await?.unwrap_or(updated)))
    }

    /// Map a failed commit that claimed `email` for `user_id`.
    ///
    /// A failed precondition surfaces as a commit error; whether it was the
    /// email index is decided by reading the index back.
    async fn classify_email_conflict(
        &self,
        email: &str,
        user_id: &str,
        err: firestore::errors::FirestoreError,
    ) -> AppError {
        match self.get_email_owner(email).await {
            Ok(Some(owner)) if owner != user_id => {
                tracing::debug!(user_id, "Email claimed concurrently by another user");
                AppError::DuplicateIdentity
            }
            _ => AppError::Database(format!("Transaction commit failed: {}", err)),
        }
    }

    /// Permanently delete a user and release its email address.
    ///
    /// Returns `false` when the user did not exist.
    pub async fn delete_user(&self, id: &str) -> Result<bool, AppError> {
        let Some(user) = self.get_user(id).await? else {
            return Ok(false);
        };

        let client = self.get_client()?;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .delete()
            .from(collections::USERS)
            .document_id(id)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add user deletion to transaction: {}", e))
            })?;

        client
            .fluent()
            .delete()
            .from(collections::USER_EMAILS)
            .document_id(email_doc_id(&user.email_address))
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!(
                    "Failed to add email index removal to transaction: {}",
                    e
                ))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit user deletion: {}", e)))?;

        tracing::info!(user_id = id, "User document deleted");
        Ok(true)
    }
}
