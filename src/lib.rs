// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Phoenix Users: account API for the PhoenixRising site.
//!
//! Signup and login with bcrypt-hashed passwords, HS256 bearer tokens, and
//! authenticated profile management backed by Firestore.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use services::{
    AuthService, CredentialStore, ImageHostService, PasswordHasher, TokenIssuer, TokenVerifier,
};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub credentials: CredentialStore,
    pub auth: AuthService,
    pub token_verifier: TokenVerifier,
    pub image_host: ImageHostService,
}

impl AppState {
    /// Wire the services together from configuration and a store handle.
    pub fn new(config: Config, db: Database, image_host: ImageHostService) -> Self {
        let credentials = CredentialStore::new(db, PasswordHasher::new(config.bcrypt_cost));
        let auth = AuthService::new(credentials.clone(), TokenIssuer::new(&config));
        let token_verifier = TokenVerifier::new(&config);

        Self {
            config,
            credentials,
            auth,
            token_verifier,
            image_host,
        }
    }
}
