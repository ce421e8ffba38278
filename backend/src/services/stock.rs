//! Stock aggregate maintainer
//!
//! One row per normalized (item, location, lot, expiry) key holding the
//! running sum of ledger deltas for that key. Rows are mutated in place by
//! `apply_delta`; the ledger stays the source of truth and `audit` checks
//! the two never drift apart.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use shared::{normalize_key, StockKey, StockLevel, StockMismatch};

use crate::error::AppResult;

/// Tolerance when comparing REAL sums during the ledger audit.
const DRIFT_EPSILON: f64 = 1e-6;

/// Increment the matching aggregate row, or create it when the key is new.
///
/// A zero delta is a successful no-op: no row is created or touched. Key
/// matching uses SQLite's IS operator, so an absent lot or expiry always
/// matches the stored NULL.
pub(crate) async fn apply_delta(
    conn: &mut SqliteConnection,
    item_id: i64,
    location_id: i64,
    lot: Option<&str>,
    expires_on: Option<NaiveDate>,
    delta: f64,
) -> AppResult<()> {
    if delta == 0.0 {
        return Ok(());
    }
    let lot = normalize_key(lot);

    let updated = sqlx::query(
        "UPDATE stock SET quantity = quantity + ?
         WHERE item_id = ? AND location_id = ? AND lot IS ? AND expires_on IS ?",
    )
    .bind(delta)
    .bind(item_id)
    .bind(location_id)
    .bind(&lot)
    .bind(expires_on)
    .execute(&mut *conn)
    .await?;

    if updated.rows_affected() == 0 {
        sqlx::query(
            "INSERT INTO stock (item_id, location_id, lot, expires_on, quantity)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(item_id)
        .bind(location_id)
        .bind(&lot)
        .bind(expires_on)
        .bind(delta)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

#[derive(Debug, FromRow)]
struct StockRow {
    id: i64,
    item_id: i64,
    location_id: i64,
    lot: Option<String>,
    expires_on: Option<NaiveDate>,
    quantity: f64,
}

#[derive(Debug, FromRow)]
struct KeyedSumRow {
    item_id: i64,
    location_id: i64,
    lot: Option<String>,
    expires_on: Option<NaiveDate>,
    total: f64,
}

type KeyTuple = (i64, i64, Option<String>, Option<NaiveDate>);

/// Stock aggregate service
#[derive(Clone)]
pub struct StockService {
    db: SqlitePool,
}

impl StockService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Apply one signed delta to the aggregate.
    pub async fn apply_delta(&self, key: &StockKey, delta: f64) -> AppResult<()> {
        let mut conn = self.db.acquire().await?;
        apply_delta(
            &mut conn,
            key.item_id,
            key.location_id,
            key.lot.as_deref(),
            key.expires_on,
            delta,
        )
        .await
    }

    /// Current quantity for one key; zero when no row exists.
    pub async fn quantity(&self, key: &StockKey) -> AppResult<f64> {
        let quantity: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0.0) FROM stock
             WHERE item_id = ? AND location_id = ? AND lot IS ? AND expires_on IS ?",
        )
        .bind(key.item_id)
        .bind(key.location_id)
        .bind(&key.lot)
        .bind(key.expires_on)
        .fetch_one(&self.db)
        .await?;
        Ok(quantity)
    }

    /// Number of aggregate rows stored for one key (0 or 1 when healthy).
    pub async fn row_count(&self, key: &StockKey) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM stock
             WHERE item_id = ? AND location_id = ? AND lot IS ? AND expires_on IS ?",
        )
        .bind(key.item_id)
        .bind(key.location_id)
        .bind(&key.lot)
        .bind(key.expires_on)
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }

    /// All rows with nonzero quantity, soonest expiry first, no-date last.
    pub async fn list_nonzero(&self) -> AppResult<Vec<StockLevel>> {
        let rows = sqlx::query_as::<_, StockRow>(
            "SELECT id, item_id, location_id, lot, expires_on, quantity
             FROM stock WHERE quantity <> 0
             ORDER BY expires_on IS NULL, expires_on ASC",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| StockLevel {
                id: row.id,
                item_id: row.item_id,
                location_id: row.location_id,
                lot: row.lot,
                expires_on: row.expires_on,
                quantity: row.quantity,
            })
            .collect())
    }

    /// Replay the ledger and report every aggregate key whose cached
    /// quantity drifted from the per-key sum of deltas.
    ///
    /// Reversal movements are excluded from the replay: a reversal deletes
    /// the import batch it compensates, so its entries remain in the ledger
    /// as audit trail only.
    pub async fn audit(&self) -> AppResult<Vec<StockMismatch>> {
        let ledger = sqlx::query_as::<_, KeyedSumRow>(
            "SELECT item_id, location_id, lot, expires_on, SUM(delta) AS total
             FROM movements WHERE kind <> 'reversal'
             GROUP BY item_id, location_id, lot, expires_on",
        )
        .fetch_all(&self.db)
        .await?;

        let stock = sqlx::query_as::<_, KeyedSumRow>(
            "SELECT item_id, location_id, lot, expires_on, SUM(quantity) AS total
             FROM stock GROUP BY item_id, location_id, lot, expires_on",
        )
        .fetch_all(&self.db)
        .await?;

        let mut ledger_totals: BTreeMap<KeyTuple, f64> = BTreeMap::new();
        for row in ledger {
            ledger_totals.insert(
                (row.item_id, row.location_id, row.lot, row.expires_on),
                row.total,
            );
        }
        let mut stock_totals: BTreeMap<KeyTuple, f64> = BTreeMap::new();
        for row in stock {
            stock_totals.insert(
                (row.item_id, row.location_id, row.lot, row.expires_on),
                row.total,
            );
        }

        let mut keys: Vec<KeyTuple> = ledger_totals.keys().cloned().collect();
        for key in stock_totals.keys() {
            if !ledger_totals.contains_key(key) {
                keys.push(key.clone());
            }
        }

        let mut mismatches = Vec::new();
        for key in keys {
            let ledger_total = ledger_totals.get(&key).copied().unwrap_or(0.0);
            let stock_quantity = stock_totals.get(&key).copied().unwrap_or(0.0);
            if (ledger_total - stock_quantity).abs() > DRIFT_EPSILON {
                let (item_id, location_id, lot, expires_on) = key;
                mismatches.push(StockMismatch {
                    key: StockKey {
                        item_id,
                        location_id,
                        lot,
                        expires_on,
                    },
                    ledger_total,
                    stock_quantity,
                });
            }
        }
        Ok(mismatches)
    }
}
