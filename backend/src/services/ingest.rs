//! Inventory snapshot ingestion
//!
//! Turns a validated snapshot into an inventory header, its rows, and a
//! paired aggregate update + ledger entry per row, all inside one
//! transaction. A header with the same (name, created, exported) triple is
//! refused before anything is written.

use chrono::NaiveDate;
use sqlx::{FromRow, SqlitePool};

use shared::{ImportSnapshot, Inventory, InventoryRow, InventorySummary, LocationRef, MovementKind};

use crate::error::{AppError, AppResult};
use crate::services::{ledger, registry, stock};

#[derive(Debug, FromRow)]
struct InventoryHeaderRow {
    id: i64,
    name: String,
    note: Option<String>,
    created_on: NaiveDate,
    exported_on: NaiveDate,
    kind: String,
    declared_rows: i64,
    location_id: i64,
    responsible_id: i64,
    source_hash: String,
}

#[derive(Debug, FromRow)]
struct InventoryLineRow {
    id: i64,
    inventory_id: i64,
    item_id: i64,
    units_per_case: f64,
    cases: f64,
    loose_quantity: f64,
    total_quantity: f64,
    expires_on: Option<NaiveDate>,
    received_on: Option<NaiveDate>,
}

#[derive(Debug, FromRow)]
struct InventorySummaryRow {
    id: i64,
    name: String,
    created_on: NaiveDate,
    exported_on: NaiveDate,
    kind: String,
    declared_rows: i64,
    location_name: Option<String>,
    responsible_name: Option<String>,
}

/// Inventory ingestion service
#[derive(Clone)]
pub struct ImportService {
    db: SqlitePool,
}

impl ImportService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Ingest one snapshot and return the new header id.
    ///
    /// All writes happen in a single transaction: on any failure the
    /// database is left exactly as before the call. Rows whose computed
    /// total is zero still get their inventory row and a zero-delta
    /// movement, which the aggregate ignores.
    pub async fn ingest(&self, snapshot: &ImportSnapshot) -> AppResult<i64> {
        snapshot
            .validate()
            .map_err(|(field, message)| AppError::Validation {
                field: field.to_string(),
                message: message.to_string(),
            })?;

        let mut tx = self.db.begin().await?;

        let duplicate = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM inventories WHERE name = ? AND created_on = ? AND exported_on = ?",
        )
        .bind(snapshot.name.trim())
        .bind(snapshot.created_on)
        .bind(snapshot.exported_on)
        .fetch_optional(&mut *tx)
        .await?;
        if duplicate.is_some() {
            return Err(AppError::DuplicateEntry(format!(
                "inventory '{}' ({} / {}) was already loaded",
                snapshot.name.trim(),
                snapshot.created_on,
                snapshot.exported_on
            )));
        }

        let location_id = match &snapshot.location {
            LocationRef::Id(id) => {
                registry::ensure_location_with_id(&mut tx, *id, &format!("Branch {id}"), "branch")
                    .await?
            }
            LocationRef::Name(name) => {
                registry::ensure_location(&mut tx, name.trim(), "branch").await?
            }
        };
        let responsible_id =
            registry::ensure_responsible(&mut tx, snapshot.responsible.trim(), "").await?;

        let header = sqlx::query(
            "INSERT INTO inventories
             (name, note, created_on, exported_on, kind, declared_rows,
              location_id, responsible_id, source_hash)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(snapshot.name.trim())
        .bind(&snapshot.note)
        .bind(snapshot.created_on)
        .bind(snapshot.exported_on)
        .bind(snapshot.kind.trim())
        .bind(snapshot.declared_rows)
        .bind(location_id)
        .bind(responsible_id)
        .bind(snapshot.source_hash.trim())
        .execute(&mut *tx)
        .await?;
        let inventory_id = header.last_insert_rowid();
        let origin = format!("import:{inventory_id}");

        for row in &snapshot.rows {
            let item_id = registry::get_or_create_item(
                &mut tx,
                row.code.as_deref(),
                &row.description,
                row.ean.as_deref(),
            )
            .await?;
            let total = row.total_quantity();

            sqlx::query(
                "INSERT INTO inventory_rows
                 (inventory_id, item_id, units_per_case, cases, loose_quantity,
                  total_quantity, expires_on, received_on)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(inventory_id)
            .bind(item_id)
            .bind(row.units_per_case)
            .bind(row.cases)
            .bind(row.loose_quantity)
            .bind(total)
            .bind(row.expires_on)
            .bind(row.received_on)
            .execute(&mut *tx)
            .await?;

            stock::apply_delta(&mut tx, item_id, location_id, None, row.expires_on, total).await?;
            ledger::record_movement(
                &mut tx,
                MovementKind::Import,
                item_id,
                location_id,
                total,
                None,
                row.expires_on,
                &origin,
            )
            .await?;
        }

        tx.commit().await?;
        tracing::info!(
            inventory_id,
            rows = snapshot.rows.len(),
            name = %snapshot.name.trim(),
            "inventory snapshot ingested"
        );
        Ok(inventory_id)
    }

    /// Fetch one header.
    pub async fn get(&self, id: i64) -> AppResult<Inventory> {
        let row = sqlx::query_as::<_, InventoryHeaderRow>(
            "SELECT id, name, note, created_on, exported_on, kind, declared_rows,
                    location_id, responsible_id, source_hash
             FROM inventories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Inventory {id}")))?;
        Ok(Inventory {
            id: row.id,
            name: row.name,
            note: row.note,
            created_on: row.created_on,
            exported_on: row.exported_on,
            kind: row.kind,
            declared_rows: row.declared_rows,
            location_id: row.location_id,
            responsible_id: row.responsible_id,
            source_hash: row.source_hash,
        })
    }

    /// Rows owned by one header.
    pub async fn rows(&self, inventory_id: i64) -> AppResult<Vec<InventoryRow>> {
        let rows = sqlx::query_as::<_, InventoryLineRow>(
            "SELECT id, inventory_id, item_id, units_per_case, cases, loose_quantity,
                    total_quantity, expires_on, received_on
             FROM inventory_rows WHERE inventory_id = ? ORDER BY id",
        )
        .bind(inventory_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| InventoryRow {
                id: row.id,
                inventory_id: row.inventory_id,
                item_id: row.item_id,
                units_per_case: row.units_per_case,
                cases: row.cases,
                loose_quantity: row.loose_quantity,
                total_quantity: row.total_quantity,
                expires_on: row.expires_on,
                received_on: row.received_on,
            })
            .collect())
    }

    /// Latest headers with resolved location and responsible names.
    pub async fn list_recent(&self, limit: i64) -> AppResult<Vec<InventorySummary>> {
        let rows = sqlx::query_as::<_, InventorySummaryRow>(
            "SELECT i.id, i.name, i.created_on, i.exported_on, i.kind, i.declared_rows,
                    l.name AS location_name, r.name AS responsible_name
             FROM inventories i
             LEFT JOIN locations l ON l.id = i.location_id
             LEFT JOIN responsibles r ON r.id = i.responsible_id
             ORDER BY i.id DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| InventorySummary {
                id: row.id,
                name: row.name,
                created_on: row.created_on,
                exported_on: row.exported_on,
                kind: row.kind,
                declared_rows: row.declared_rows,
                location_name: row.location_name,
                responsible_name: row.responsible_name,
            })
            .collect())
    }
}
