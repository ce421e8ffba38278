//! Stock aggregate models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::validation::normalize_key;

/// Normalized key of one stock aggregate row:
/// (item, location, lot-or-absent, expiry-or-absent).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockKey {
    pub item_id: i64,
    pub location_id: i64,
    pub lot: Option<String>,
    pub expires_on: Option<NaiveDate>,
}

impl StockKey {
    /// Build a key, normalizing the lot so every "absent" spelling maps to
    /// the same canonical `None`.
    pub fn new(
        item_id: i64,
        location_id: i64,
        lot: Option<&str>,
        expires_on: Option<NaiveDate>,
    ) -> Self {
        Self {
            item_id,
            location_id,
            lot: normalize_key(lot),
            expires_on,
        }
    }
}

/// Current signed quantity for one aggregate key.
///
/// This is a cached value, not independent state: it must always equal the
/// sum of the matching ledger deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLevel {
    pub id: i64,
    pub item_id: i64,
    pub location_id: i64,
    pub lot: Option<String>,
    pub expires_on: Option<NaiveDate>,
    pub quantity: f64,
}

/// One aggregate key whose cached quantity drifted from the ledger sum
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMismatch {
    pub key: StockKey,
    pub ledger_total: f64,
    pub stock_quantity: f64,
}
