//! Movement ledger service
//!
//! The append-only source of truth for stock history. Recording a movement
//! does not touch the stock aggregate; callers pair every ledger write with
//! a `stock::apply_delta` when the change should be visible in current
//! stock.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use shared::{Movement, MovementKind};

use crate::error::{AppError, AppResult};

/// Append one movement inside the caller's transaction.
pub(crate) async fn record_movement(
    conn: &mut SqliteConnection,
    kind: MovementKind,
    item_id: i64,
    location_id: i64,
    delta: f64,
    lot: Option<&str>,
    expires_on: Option<NaiveDate>,
    origin: &str,
) -> AppResult<i64> {
    let lot = shared::normalize_key(lot);
    let result = sqlx::query(
        "INSERT INTO movements (kind, item_id, location_id, delta, lot, expires_on, origin, recorded_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(kind.as_str())
    .bind(item_id)
    .bind(location_id)
    .bind(delta)
    .bind(&lot)
    .bind(expires_on)
    .bind(origin)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

#[derive(Debug, FromRow)]
struct MovementRow {
    id: i64,
    kind: String,
    item_id: i64,
    location_id: i64,
    delta: f64,
    lot: Option<String>,
    expires_on: Option<NaiveDate>,
    origin: String,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for Movement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let kind = MovementKind::parse(&row.kind).ok_or_else(|| {
            AppError::ValidationError(format!("unknown movement kind '{}'", row.kind))
        })?;
        Ok(Movement {
            id: row.id,
            kind,
            item_id: row.item_id,
            location_id: row.location_id,
            delta: row.delta,
            lot: row.lot,
            expires_on: row.expires_on,
            origin: row.origin,
            recorded_at: row.recorded_at,
        })
    }
}

/// Movement ledger service
#[derive(Clone)]
pub struct MovementService {
    db: SqlitePool,
}

impl MovementService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Record one movement. No validation beyond the required fields: the
    /// delta may be any signed value, including zero (legal history that
    /// contributes nothing to aggregates).
    #[allow(clippy::too_many_arguments)]
    pub async fn record(
        &self,
        kind: MovementKind,
        item_id: i64,
        location_id: i64,
        delta: f64,
        lot: Option<&str>,
        expires_on: Option<NaiveDate>,
        origin: &str,
    ) -> AppResult<i64> {
        let mut conn = self.db.acquire().await?;
        record_movement(
            &mut conn,
            kind,
            item_id,
            location_id,
            delta,
            lot,
            expires_on,
            origin,
        )
        .await
    }

    /// Latest movements, newest first (movements screen feed).
    pub async fn list_recent(&self, limit: i64) -> AppResult<Vec<Movement>> {
        let rows = sqlx::query_as::<_, MovementRow>(
            "SELECT id, kind, item_id, location_id, delta, lot, expires_on, origin, recorded_at
             FROM movements ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(Movement::try_from).collect()
    }

    /// All movements tagged with one origin, e.g. a specific import.
    pub async fn list_by_origin(&self, origin: &str) -> AppResult<Vec<Movement>> {
        let rows = sqlx::query_as::<_, MovementRow>(
            "SELECT id, kind, item_id, location_id, delta, lot, expires_on, origin, recorded_at
             FROM movements WHERE origin = ? ORDER BY id",
        )
        .bind(origin)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(Movement::try_from).collect()
    }
}
