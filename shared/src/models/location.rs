//! Location and responsible registries

use serde::{Deserialize, Serialize};

/// A stock-holding location (branch).
///
/// The id may be assigned explicitly so it lines up with the external ERP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub kind: String,
}

/// A person responsible for an inventory load
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Responsible {
    pub id: i64,
    pub name: String,
    pub contact: String,
}
