//! Inventory import models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::LocationRef;
use crate::validation::total_quantity;

/// Header of one ingested inventory snapshot.
///
/// Identity for deduplication is the (name, created_on, exported_on) triple;
/// the source hash is kept for diagnostics only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    pub id: i64,
    pub name: String,
    pub note: Option<String>,
    pub created_on: NaiveDate,
    pub exported_on: NaiveDate,
    pub kind: String,
    pub declared_rows: i64,
    pub location_id: i64,
    pub responsible_id: i64,
    pub source_hash: String,
}

/// One snapshot line as persisted. Immutable once the import commits;
/// deleted only by reversing the whole header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRow {
    pub id: i64,
    pub inventory_id: i64,
    pub item_id: i64,
    pub units_per_case: f64,
    pub cases: f64,
    pub loose_quantity: f64,
    pub total_quantity: f64,
    pub expires_on: Option<NaiveDate>,
    pub received_on: Option<NaiveDate>,
}

/// Recent-inventories listing entry with resolved registry names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySummary {
    pub id: i64,
    pub name: String,
    pub created_on: NaiveDate,
    pub exported_on: NaiveDate,
    pub kind: String,
    pub declared_rows: i64,
    pub location_name: Option<String>,
    pub responsible_name: Option<String>,
}

/// A validated inventory snapshot handed to the ingestion engine.
///
/// The adapter has already canonicalized column headers and parsed dates
/// and numbers; the engine only resolves identities and writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSnapshot {
    pub name: String,
    pub note: Option<String>,
    pub created_on: NaiveDate,
    pub exported_on: NaiveDate,
    pub kind: String,
    pub declared_rows: i64,
    pub source_hash: String,
    pub location: LocationRef,
    pub responsible: String,
    pub rows: Vec<SnapshotRow>,
}

impl ImportSnapshot {
    /// Check the required header fields before anything is written.
    pub fn validate(&self) -> Result<(), (&'static str, &'static str)> {
        if self.name.trim().is_empty() {
            return Err(("name", "snapshot name is required"));
        }
        if self.kind.trim().is_empty() {
            return Err(("kind", "snapshot type is required"));
        }
        if self.declared_rows < 0 {
            return Err(("declared_rows", "declared row count cannot be negative"));
        }
        if self.source_hash.trim().is_empty() {
            return Err(("source_hash", "source content hash is required"));
        }
        if let LocationRef::Name(name) = &self.location {
            if name.trim().is_empty() {
                return Err(("location", "location name is required"));
            }
        }
        if self.responsible.trim().is_empty() {
            return Err(("responsible", "responsible name is required"));
        }
        Ok(())
    }
}

/// One line of an inventory snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub code: Option<String>,
    pub ean: Option<String>,
    pub description: String,
    pub units_per_case: f64,
    pub cases: f64,
    pub loose_quantity: f64,
    pub expires_on: Option<NaiveDate>,
    pub received_on: Option<NaiveDate>,
}

impl SnapshotRow {
    /// Computed total: cases x units-per-case, plus the loose quantity.
    pub fn total_quantity(&self) -> f64 {
        total_quantity(self.units_per_case, self.cases, self.loose_quantity)
    }
}
