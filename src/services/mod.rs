// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod credentials;
pub mod image_host;
pub mod password;
pub mod token;

pub use auth::{AuthResponse, AuthService, LoginRequest};
pub use credentials::CredentialStore;
pub use image_host::ImageHostService;
pub use password::PasswordHasher;
pub use token::{Claims, TokenIssuer, TokenVerifier};
