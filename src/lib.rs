//! Labstock Lab Equipment Lending Server
//!
//! A Rust server managing a shared pool of physical lab equipment: a
//! per-item quantity ledger, window availability over overlapping
//! reservations, a borrow lifecycle state machine, and reversible
//! return/fee settlement.

use sqlx::{Pool, Postgres};
use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    pub pool: Pool<Postgres>,
}
