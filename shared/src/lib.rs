//! Shared types and models for the Shelftrack perishable stock tracker
//!
//! This crate contains the domain types shared between the storage backend
//! and the thin import adapters (spreadsheet readers, desktop forms) that
//! sit on top of it.

pub mod hashing;
pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
