//! Administrative maintenance operations
//!
//! Not part of the hot path: bulk cleanup for development and recovery.
//! Reversing a single inventory lives in the reversal engine.

use sqlx::SqlitePool;

use crate::db;
use crate::error::AppResult;

/// Maintenance service
#[derive(Clone)]
pub struct MaintenanceService {
    db: SqlitePool,
}

impl MaintenanceService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Delete every inventory, row, movement and stock aggregate while
    /// preserving the registries and the sales ledger.
    pub async fn wipe_inventory_data(&self) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        for table in ["inventory_rows", "movements", "inventories", "stock"] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        tracing::warn!("inventories, movements and stock wiped; registries preserved");
        Ok(())
    }

    /// Empty every table and reseed the default branch and responsible.
    pub async fn reset_all(&self) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        // Children before parents, so foreign keys stay satisfied.
        for table in [
            "sales",
            "sales_imports",
            "inventory_rows",
            "movements",
            "inventories",
            "stock",
            "items",
            "responsibles",
            "locations",
        ] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        db::seed_defaults(&self.db).await?;
        tracing::warn!("database reset to empty and reseeded");
        Ok(())
    }
}
