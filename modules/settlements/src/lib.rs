pub mod config;
pub mod contracts;
pub mod db;
pub mod health;
pub mod lifecycle;
pub mod locks;
pub mod repos;
pub mod routes;
pub mod services;
pub mod validation;

use sqlx::PgPool;

/// Shared application state for route handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: config::Config,
}
