//! Validation and normalization utilities for the Shelftrack platform
//!
//! Import adapters canonicalize column headers and parse cells before the
//! core ever sees them; what lives here is the normalization the core itself
//! relies on for identity and key matching.

use chrono::NaiveDate;

/// Decimal places kept when reporting estimated quantities.
const QUANTITY_PRECISION: f64 = 100.0;

// ============================================================================
// Key Normalization
// ============================================================================

/// Normalize an optional identity field (item code, EAN, lot).
///
/// Trims whitespace and collapses the empty string to `None`, so every
/// "absent" representation compares equal and never matches an actual value.
pub fn normalize_key(value: Option<&str>) -> Option<String> {
    match value {
        None => None,
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
    }
}

// ============================================================================
// Sales Source Validations
// ============================================================================

/// Parse a location identifier from a sales source.
///
/// Branch ids must be numeric so they line up with the external ERP.
pub fn parse_location_id(raw: &str) -> Result<i64, String> {
    let trimmed = raw.trim();
    trimmed
        .parse::<i64>()
        .map_err(|_| format!("location id must be numeric, got '{trimmed}'"))
}

// ============================================================================
// Quantity Math
// ============================================================================

/// Total quantity of a snapshot row: cases times units-per-case, plus the
/// loose remainder.
pub fn total_quantity(units_per_case: f64, cases: f64, loose: f64) -> f64 {
    cases * units_per_case + loose
}

/// Round a quantity to the fixed reporting precision (two decimals).
pub fn round_quantity(quantity: f64) -> f64 {
    (quantity * QUANTITY_PRECISION).round() / QUANTITY_PRECISION
}

// ============================================================================
// Dates
// ============================================================================

/// Days remaining until `expiry`, counted from `as_of`; `None` when the lot
/// has no expiry date. Negative for already-expired lots.
pub fn days_left(expiry: Option<NaiveDate>, as_of: NaiveDate) -> Option<i64> {
    expiry.map(|d| (d - as_of).num_days())
}
