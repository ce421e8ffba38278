//! Shelftrack - Perishable Stock Tracker Backend
//!
//! The stock ledger and expiry-estimation engine: an append-only movement
//! ledger, an incrementally maintained stock aggregate, deduplicated
//! snapshot ingestion with a reversal engine, monthly sales reconciliation
//! and a read-only expiry classifier. Desktop forms and spreadsheet parsing
//! live in thin adapters on top of this crate.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod config;
pub mod db;
pub mod error;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};

/// Initialize the tracing subscriber. Safe to call more than once; later
/// calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shelftrack_backend=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
