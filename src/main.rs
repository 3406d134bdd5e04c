// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Phoenix Users API Server
//!
//! Account signup, login and profile management for the PhoenixRising site.

use phoenix_users::{
    config::Config, db::Database, services::ImageHostService, AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        backend = ?config.store_backend,
        bcrypt_cost = config.bcrypt_cost,
        "Starting Phoenix Users API"
    );

    if config.jwt_ttl_secs.is_none() {
        tracing::warn!("JWT_TTL_SECS not set; issued tokens never expire");
    }

    let db = Database::connect(&config).await?;
    let image_host = ImageHostService::new(config.cloudinary.clone());

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db, image_host));

    // Build router
    let app = phoenix_users::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
///
/// `RUST_LOG` overrides the default filter.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("phoenix_users=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
