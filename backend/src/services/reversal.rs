//! Reversal engine
//!
//! Undoes one prior import: applies the exact negation of every row's total
//! to the aggregate, records compensating `reversal` movements, then deletes
//! the import's movements, rows and header. The compensating movements stay
//! behind as the audit trail.

use chrono::NaiveDate;
use sqlx::{FromRow, SqlitePool};

use shared::MovementKind;

use crate::error::{AppError, AppResult};
use crate::services::{ledger, stock};

#[derive(Debug, FromRow)]
struct ReversalRow {
    item_id: i64,
    total_quantity: f64,
    expires_on: Option<NaiveDate>,
}

/// Inventory reversal service
#[derive(Clone)]
pub struct ReversalService {
    db: SqlitePool,
}

impl ReversalService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Reverse one inventory by id; returns the number of rows undone.
    ///
    /// Net effect on the aggregate is zero relative to the state before the
    /// original import. Reversing an unknown id reports not-found and
    /// writes nothing.
    pub async fn reverse(&self, inventory_id: i64) -> AppResult<usize> {
        let mut tx = self.db.begin().await?;

        let location_id =
            sqlx::query_scalar::<_, i64>("SELECT location_id FROM inventories WHERE id = ?")
                .bind(inventory_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Inventory {inventory_id}")))?;

        let rows = sqlx::query_as::<_, ReversalRow>(
            "SELECT item_id, total_quantity, expires_on
             FROM inventory_rows WHERE inventory_id = ?",
        )
        .bind(inventory_id)
        .fetch_all(&mut *tx)
        .await?;

        let origin = format!("reversal:{inventory_id}");
        for row in &rows {
            stock::apply_delta(
                &mut tx,
                row.item_id,
                location_id,
                None,
                row.expires_on,
                -row.total_quantity,
            )
            .await?;
            ledger::record_movement(
                &mut tx,
                MovementKind::Reversal,
                row.item_id,
                location_id,
                -row.total_quantity,
                None,
                row.expires_on,
                &origin,
            )
            .await?;
        }

        sqlx::query("DELETE FROM movements WHERE origin = ?")
            .bind(format!("import:{inventory_id}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM inventory_rows WHERE inventory_id = ?")
            .bind(inventory_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM inventories WHERE id = ?")
            .bind(inventory_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(inventory_id, rows = rows.len(), "inventory reversed");
        Ok(rows.len())
    }
}
