//! Sales ledger and monthly reconciler
//!
//! A sales source replaces whole months: for every month it covers, the
//! stored records in that date range (restricted to the branches the source
//! mentions) are deleted and the freshly aggregated rows inserted. The
//! source's content hash is the dedup token, so re-feeding the same file is
//! a clean skip and re-feeding a corrected file is an idempotent replace.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use shared::{
    parse_location_id, MonthKey, SalesBatch, SalesImport, SalesImportStatus, SalesRecord,
    SalesReconcileReport,
};

use crate::error::{AppError, AppResult};
use crate::services::registry;

type DailyKey = (i64, String, NaiveDate);

#[derive(Debug, FromRow)]
struct SalesImportRow {
    id: i64,
    name: String,
    source_hash: String,
    imported_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct SalesRecordRow {
    id: i64,
    import_id: i64,
    location_id: i64,
    item_id: i64,
    sold_on: NaiveDate,
    quantity: f64,
}

/// Sales reconciliation service
#[derive(Clone)]
pub struct SalesService {
    db: SqlitePool,
}

impl SalesService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Reconcile one sales source into month-level replaced records.
    pub async fn reconcile(&self, batch: &SalesBatch) -> AppResult<SalesReconcileReport> {
        let mut tx = self.db.begin().await?;

        let duplicate =
            sqlx::query_scalar::<_, i64>("SELECT id FROM sales_imports WHERE source_hash = ?")
                .bind(batch.source_hash.trim())
                .fetch_optional(&mut *tx)
                .await?;
        if duplicate.is_some() {
            tracing::info!(source = %batch.source_name, "sales source already imported, skipping");
            return Ok(SalesReconcileReport::skipped());
        }

        // Pre-sum per (location, item code, day); skip undated, uncoded or
        // non-positive lines per the tolerant-parsing contract.
        let mut totals: BTreeMap<DailyKey, f64> = BTreeMap::new();
        for line in &batch.lines {
            let code = line.item_code.trim();
            if code.is_empty() {
                continue;
            }
            let Some(sold_on) = line.sold_on else {
                continue;
            };
            if line.quantity <= 0.0 {
                continue;
            }
            let raw_location = line.location.trim();
            if raw_location.is_empty() {
                continue;
            }
            let location_id =
                parse_location_id(raw_location).map_err(AppError::ValidationError)?;
            *totals
                .entry((location_id, code.to_string(), sold_on))
                .or_insert(0.0) += line.quantity;
        }

        let months: BTreeSet<MonthKey> = totals
            .keys()
            .map(|(_, _, sold_on)| MonthKey::from_date(*sold_on))
            .collect();
        if months.is_empty() {
            return Err(AppError::ValidationError(
                "sales source contains no valid dated rows".to_string(),
            ));
        }
        if months.len() > 1 && !batch.allow_multi_month {
            let listed: Vec<String> = months.iter().map(|m| m.to_string()).collect();
            return Err(AppError::ValidationError(format!(
                "sales source spans multiple months ({}) and multi-month import was not permitted",
                listed.join(", ")
            )));
        }

        let import = sqlx::query(
            "INSERT INTO sales_imports (name, source_hash, imported_at) VALUES (?, ?, ?)",
        )
        .bind(batch.source_name.trim())
        .bind(batch.source_hash.trim())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        let import_id = import.last_insert_rowid();

        let location_ids: BTreeSet<i64> = totals.keys().map(|(loc, _, _)| *loc).collect();
        for month in &months {
            delete_month(&mut tx, *month, &location_ids).await?;
        }

        for ((location_id, code, sold_on), quantity) in &totals {
            registry::ensure_location_with_id(
                &mut tx,
                *location_id,
                &format!("Branch {location_id}"),
                "branch",
            )
            .await?;
            let item_id = registry::get_or_create_item(&mut tx, Some(code), "", None).await?;
            sqlx::query(
                "INSERT INTO sales (import_id, location_id, item_id, sold_on, quantity)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(import_id)
            .bind(location_id)
            .bind(item_id)
            .bind(sold_on)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        let months: Vec<MonthKey> = months.into_iter().collect();
        tracing::info!(
            import_id,
            inserted = totals.len(),
            months = months.len(),
            source = %batch.source_name,
            "sales source reconciled"
        );
        Ok(SalesReconcileReport {
            status: SalesImportStatus::Imported,
            import_id: Some(import_id),
            inserted: totals.len(),
            months,
        })
    }

    /// Latest processed sources, newest first (sales history screen feed).
    pub async fn list_imports(&self, limit: i64) -> AppResult<Vec<SalesImport>> {
        let rows = sqlx::query_as::<_, SalesImportRow>(
            "SELECT id, name, source_hash, imported_at
             FROM sales_imports ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| SalesImport {
                id: row.id,
                name: row.name,
                source_hash: row.source_hash,
                imported_at: row.imported_at,
            })
            .collect())
    }

    /// Pre-summed daily records written by one source.
    ///
    /// Records deleted by a later month replacement no longer appear here;
    /// the import row itself stays as the dedup token.
    pub async fn records_for_import(&self, import_id: i64) -> AppResult<Vec<SalesRecord>> {
        let rows = sqlx::query_as::<_, SalesRecordRow>(
            "SELECT id, import_id, location_id, item_id, sold_on, quantity
             FROM sales WHERE import_id = ? ORDER BY sold_on, location_id, item_id",
        )
        .bind(import_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| SalesRecord {
                id: row.id,
                import_id: row.import_id,
                location_id: row.location_id,
                item_id: row.item_id,
                sold_on: row.sold_on,
                quantity: row.quantity,
            })
            .collect())
    }

    /// Total sold for one (location, item) between two dates, inclusive.
    pub async fn sold_between(
        &self,
        location_id: i64,
        item_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<f64> {
        let total: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0.0) FROM sales
             WHERE location_id = ? AND item_id = ? AND sold_on BETWEEN ? AND ?",
        )
        .bind(location_id)
        .bind(item_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.db)
        .await?;
        Ok(total)
    }
}

/// Delete one month's records for the given branches, or for every branch
/// when the source named none.
async fn delete_month(
    conn: &mut SqliteConnection,
    month: MonthKey,
    location_ids: &BTreeSet<i64>,
) -> AppResult<()> {
    let first = month.first_day();
    let last = month.last_day();
    if location_ids.is_empty() {
        sqlx::query("DELETE FROM sales WHERE sold_on BETWEEN ? AND ?")
            .bind(first)
            .bind(last)
            .execute(&mut *conn)
            .await?;
        return Ok(());
    }
    for location_id in location_ids {
        sqlx::query("DELETE FROM sales WHERE sold_on BETWEEN ? AND ? AND location_id = ?")
            .bind(first)
            .bind(last)
            .bind(location_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}
