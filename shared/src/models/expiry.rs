//! Expiry classification view models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ExpiryState;

/// Filters for the expiry view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiryFilter {
    /// Restrict to one branch; `None` means all
    pub location_id: Option<i64>,
    /// Free-text match over item code, EAN and description
    pub query: Option<String>,
    /// When false, lots whose expiry date already passed are hidden
    pub include_expired: bool,
}

impl Default for ExpiryFilter {
    fn default() -> Self {
        Self {
            location_id: None,
            query: None,
            include_expired: true,
        }
    }
}

/// One risk-annotated stock row.
///
/// `estimated_remaining` approximates per-lot depletion from sales velocity
/// and is deliberately independent of the live `quantity`; the two can
/// diverge after adjustments or reversals that bypassed sales.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiryRow {
    pub stock_id: i64,
    pub item_id: i64,
    pub code: Option<String>,
    pub description: String,
    pub ean: Option<String>,
    pub location_id: i64,
    pub lot: Option<String>,
    pub expires_on: Option<NaiveDate>,
    pub days_left: Option<i64>,
    pub state: ExpiryState,
    /// Live aggregate quantity for this key
    pub quantity: f64,
    /// Earliest import/receipt movement for this key
    pub received_at: Option<DateTime<Utc>>,
    /// Latest import/receipt movement for this key
    pub last_load_at: Option<DateTime<Utc>>,
    /// Sum of import/receipt deltas for this key
    pub received_total: f64,
    /// Sales for this (item, location) since the receipt date
    pub sold_since_receipt: f64,
    /// max(0, received_total - sold_since_receipt), rounded
    pub estimated_remaining: f64,
}
