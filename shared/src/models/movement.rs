//! Movement ledger models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::MovementKind;

/// One signed quantity change in the append-only ledger.
///
/// Movements are never updated; an import's movements are only ever removed
/// as a whole batch by the reversal engine, which leaves compensating
/// `Reversal` entries behind as the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    pub id: i64,
    pub kind: MovementKind,
    pub item_id: i64,
    pub location_id: i64,
    pub delta: f64,
    pub lot: Option<String>,
    pub expires_on: Option<NaiveDate>,
    /// Free-text tag identifying the source, e.g. `import:42`
    pub origin: String,
    pub recorded_at: DateTime<Utc>,
}
