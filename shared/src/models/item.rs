//! Item master records

use serde::{Deserialize, Serialize};

/// A tracked item.
///
/// Identity is the normalized (code, EAN) pair; either half may be absent,
/// but the combination is unique. The description is informational only and
/// may be rewritten when the item is re-encountered during ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub code: Option<String>,
    pub ean: Option<String>,
    pub description: String,
}
