// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store for local development and tests.
//!
//! Users and the email index live behind one lock so that the uniqueness
//! check and the write it guards happen atomically.

use crate::error::AppError;
use crate::models::{StoredUser, UserFilter, UserPatch};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Inner {
    /// user id -> document
    users: HashMap<String, StoredUser>,
    /// normalized email -> user id
    emails: HashMap<String, String>,
}

/// In-memory user store. Cloning shares the underlying data.
#[derive(Clone, Default)]
pub struct MemoryDb {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, AppError> {
        self.inner
            .read()
            .map_err(|_| AppError::Database("In-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, AppError> {
        self.inner
            .write()
            .map_err(|_| AppError::Database("In-memory store lock poisoned".to_string()))
    }

    pub fn get_user(&self, id: &str) -> Result<Option<StoredUser>, AppError> {
        Ok(self.read()?.users.get(id).cloned())
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<StoredUser>, AppError> {
        let inner = self.read()?;
        Ok(inner
            .emails
            .get(email)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    pub fn list_users(&self, filter: &UserFilter) -> Result<Vec<StoredUser>, AppError> {
        let inner = self.read()?;
        let mut users: Vec<StoredUser> = inner
            .users
            .values()
            .filter(|user| filter.matches(user))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    pub fn insert_user(&self, user: &StoredUser) -> Result<(), AppError> {
        let mut inner = self.write()?;
        if inner.emails.contains_key(&user.email_address) {
            return Err(AppError::DuplicateIdentity);
        }
        if inner.users.contains_key(&user.id) {
            return Err(AppError::Database(format!("User id {} already in use", user.id)));
        }
        inner
            .emails
            .insert(user.email_address.clone(), user.id.clone());
        inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    pub fn update_user(
        &self,
        id: &str,
        patch: UserPatch,
        now: &str,
    ) -> Result<Option<StoredUser>, AppError> {
        let mut guard = self.write()?;
        let Inner { users, emails } = &mut *guard;

        let Some(current) = users.get_mut(id) else {
            return Ok(None);
        };

        let mut updated = current.clone();
        updated.apply(patch, now);

        if updated.email_address != current.email_address {
            if let Some(owner) = emails.get(&updated.email_address) {
                if owner != id {
                    return Err(AppError::DuplicateIdentity);
                }
            }
            emails.remove(&current.email_address);
            emails.insert(updated.email_address.clone(), id.to_string());
        }

        *current = updated.clone();
        Ok(Some(updated))
    }

    pub fn delete_user(&self, id: &str) -> Result<bool, AppError> {
        let mut inner = self.write()?;
        match inner.users.remove(id) {
            Some(user) => {
                inner.emails.remove(&user.email_address);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
