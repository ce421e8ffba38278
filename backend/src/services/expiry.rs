//! Expiry classifier and consumption estimator
//!
//! Read-only pass over the stock aggregate joined with ledger history and
//! sales. Classification depends only on the configured thresholds and the
//! caller-supplied reference date, which keeps it deterministic.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqlitePool};

use shared::{days_left, round_quantity, ExpiryFilter, ExpiryRow, ExpiryThresholds};

use crate::error::AppResult;

#[derive(Debug, FromRow)]
struct CandidateRow {
    stock_id: i64,
    item_id: i64,
    code: Option<String>,
    description: String,
    ean: Option<String>,
    location_id: i64,
    lot: Option<String>,
    expires_on: Option<NaiveDate>,
    quantity: f64,
}

#[derive(Debug, FromRow)]
struct ReceiptStats {
    first_load: Option<DateTime<Utc>>,
    last_load: Option<DateTime<Utc>>,
    received_total: f64,
}

/// Expiry classification service
#[derive(Clone)]
pub struct ExpiryService {
    db: SqlitePool,
    thresholds: ExpiryThresholds,
}

impl ExpiryService {
    pub fn new(db: SqlitePool, thresholds: ExpiryThresholds) -> Self {
        Self {
            db,
            thresholds: thresholds.normalized(),
        }
    }

    /// Risk-annotated view of all nonzero stock as of `as_of`, soonest
    /// expiry first and dateless lots last.
    pub async fn classify(
        &self,
        filter: &ExpiryFilter,
        as_of: NaiveDate,
    ) -> AppResult<Vec<ExpiryRow>> {
        let mut sql = String::from(
            "SELECT s.id AS stock_id, s.item_id, i.code, i.description, i.ean,
                    s.location_id, s.lot, s.expires_on, s.quantity
             FROM stock s
             JOIN items i ON i.id = s.item_id
             WHERE s.quantity <> 0",
        );
        if filter.location_id.is_some() {
            sql.push_str(" AND s.location_id = ?");
        }
        if filter.query.is_some() {
            sql.push_str(" AND (i.code LIKE ? OR i.ean LIKE ? OR i.description LIKE ?)");
        }
        sql.push_str(" ORDER BY s.expires_on IS NULL, s.expires_on ASC");

        let mut query = sqlx::query_as::<_, CandidateRow>(&sql);
        if let Some(location_id) = filter.location_id {
            query = query.bind(location_id);
        }
        let like = filter.query.as_ref().map(|q| format!("%{}%", q.trim()));
        if let Some(like) = &like {
            query = query.bind(like).bind(like).bind(like);
        }
        let candidates = query.fetch_all(&self.db).await?;

        let mut rows = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let remaining_days = days_left(candidate.expires_on, as_of);
            if !filter.include_expired && matches!(remaining_days, Some(d) if d < 0) {
                continue;
            }

            let stats = self.receipt_stats(&candidate).await?;
            let sold_since_receipt = match stats.first_load {
                Some(received_at) => {
                    self.sold_between(
                        candidate.location_id,
                        candidate.item_id,
                        received_at.date_naive(),
                        as_of,
                    )
                    .await?
                }
                None => 0.0,
            };
            let estimated_remaining =
                round_quantity((stats.received_total - sold_since_receipt).max(0.0));

            rows.push(ExpiryRow {
                stock_id: candidate.stock_id,
                item_id: candidate.item_id,
                code: candidate.code,
                description: candidate.description,
                ean: candidate.ean,
                location_id: candidate.location_id,
                lot: candidate.lot,
                expires_on: candidate.expires_on,
                days_left: remaining_days,
                state: self.thresholds.classify(remaining_days),
                quantity: candidate.quantity,
                received_at: stats.first_load,
                last_load_at: stats.last_load,
                received_total: stats.received_total,
                sold_since_receipt,
                estimated_remaining,
            });
        }
        Ok(rows)
    }

    /// Earliest/latest import-or-receipt movement and their summed deltas
    /// for one aggregate key.
    async fn receipt_stats(&self, candidate: &CandidateRow) -> AppResult<ReceiptStats> {
        let stats = sqlx::query_as::<_, ReceiptStats>(
            "SELECT MIN(recorded_at) AS first_load,
                    MAX(recorded_at) AS last_load,
                    COALESCE(SUM(delta), 0.0) AS received_total
             FROM movements
             WHERE item_id = ? AND location_id = ? AND expires_on IS ?
               AND kind IN ('import', 'receipt')",
        )
        .bind(candidate.item_id)
        .bind(candidate.location_id)
        .bind(candidate.expires_on)
        .fetch_one(&self.db)
        .await?;
        Ok(stats)
    }

    async fn sold_between(
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
