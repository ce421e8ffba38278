//! Sales ledger models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::MonthKey;

/// Dedup record for one processed sales source, keyed by content hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesImport {
    pub id: i64,
    pub name: String,
    pub source_hash: String,
    pub imported_at: DateTime<Utc>,
}

/// Daily sold quantity per item and location.
///
/// Stored per (location, item, day) after pre-summing; the write unit is a
/// whole month, replaced rather than merged on reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesRecord {
    pub id: i64,
    pub import_id: i64,
    pub location_id: i64,
    pub item_id: i64,
    pub sold_on: NaiveDate,
    pub quantity: f64,
}

/// A parsed sales source handed to the monthly reconciler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesBatch {
    pub source_name: String,
    pub source_hash: String,
    /// Accept sources spanning more than one calendar month
    pub allow_multi_month: bool,
    pub lines: Vec<SalesLine>,
}

/// One raw line of a sales source.
///
/// The location is still text here: the reconciler validates that it is a
/// numeric branch id. Lines with no date, no code or a non-positive quantity
/// are skipped, mirroring the tolerant-parsing contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesLine {
    pub location: String,
    pub item_code: String,
    pub sold_on: Option<NaiveDate>,
    pub quantity: f64,
}

/// Outcome status of a sales reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesImportStatus {
    Imported,
    /// The source hash was already processed; nothing was written
    Skipped,
}

/// Result of reconciling one sales source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesReconcileReport {
    pub status: SalesImportStatus,
    pub import_id: Option<i64>,
    pub inserted: usize,
    pub months: Vec<MonthKey>,
}

impl SalesReconcileReport {
    pub fn skipped() -> Self {
        Self {
            status: SalesImportStatus::Skipped,
            import_id: None,
            inserted: 0,
            months: vec![],
        }
    }
}
