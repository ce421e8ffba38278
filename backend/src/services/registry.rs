//! Identity registries: items, locations and responsibles
//!
//! Everything here is get-or-create by natural key. The connection-level
//! helpers exist so ingestion and reconciliation can resolve identities
//! inside their own transaction.

use sqlx::{FromRow, SqliteConnection, SqlitePool};

use shared::{normalize_key, Item, Location, Responsible};

use crate::error::{AppError, AppResult};

/// Resolve an item by its normalized (code, EAN) pair, creating it on first
/// encounter. A non-empty description overwrites the stored one; identity
/// never depends on it.
pub(crate) async fn get_or_create_item(
    conn: &mut SqliteConnection,
    code: Option<&str>,
    description: &str,
    ean: Option<&str>,
) -> AppResult<i64> {
    let code = normalize_key(code);
    let ean = normalize_key(ean);
    let description = description.trim();

    let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM items WHERE code IS ? AND ean IS ?")
        .bind(&code)
        .bind(&ean)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(id) = existing {
        if !description.is_empty() {
            sqlx::query("UPDATE items SET description = ? WHERE id = ?")
                .bind(description)
                .bind(id)
                .execute(&mut *conn)
                .await?;
        }
        return Ok(id);
    }

    let result = sqlx::query("INSERT INTO items (code, ean, description) VALUES (?, ?, ?)")
        .bind(&code)
        .bind(&ean)
        .bind(description)
        .execute(&mut *conn)
        .await?;
    Ok(result.last_insert_rowid())
}

/// Resolve a location by name, creating it if needed.
pub(crate) async fn ensure_location(
    conn: &mut SqliteConnection,
    name: &str,
    kind: &str,
) -> AppResult<i64> {
    sqlx::query("INSERT OR IGNORE INTO locations (name, kind) VALUES (?, ?)")
        .bind(name)
        .bind(kind)
        .execute(&mut *conn)
        .await?;
    let id = sqlx::query_scalar::<_, i64>("SELECT id FROM locations WHERE name = ?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(id)
}

/// Create a location under an explicit id (to mirror the external ERP).
/// Existing rows are left untouched.
pub(crate) async fn ensure_location_with_id(
    conn: &mut SqliteConnection,
    id: i64,
    name: &str,
    kind: &str,
) -> AppResult<i64> {
    sqlx::query("INSERT OR IGNORE INTO locations (id, name, kind) VALUES (?, ?, ?)")
        .bind(id)
        .bind(name)
        .bind(kind)
        .execute(&mut *conn)
        .await?;
    Ok(id)
}

/// Resolve a responsible by name, creating it if needed.
pub(crate) async fn ensure_responsible(
    conn: &mut SqliteConnection,
    name: &str,
    contact: &str,
) -> AppResult<i64> {
    sqlx::query("INSERT OR IGNORE INTO responsibles (name, contact) VALUES (?, ?)")
        .bind(name)
        .bind(contact)
        .execute(&mut *conn)
        .await?;
    let id = sqlx::query_scalar::<_, i64>("SELECT id FROM responsibles WHERE name = ?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(id)
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: i64,
    code: Option<String>,
    ean: Option<String>,
    description: String,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            id: row.id,
            code: row.code,
            ean: row.ean,
            description: row.description,
        }
    }
}

/// Item registry service
#[derive(Clone)]
pub struct ItemService {
    db: SqlitePool,
}

impl ItemService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn get_or_create(
        &self,
        code: Option<&str>,
        description: &str,
        ean: Option<&str>,
    ) -> AppResult<i64> {
        let mut conn = self.db.acquire().await?;
        get_or_create_item(&mut conn, code, description, ean).await
    }

    pub async fn get(&self, id: i64) -> AppResult<Item> {
        let row = sqlx::query_as::<_, ItemRow>(
            "SELECT id, code, ean, description FROM items WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item {id}")))?;
        Ok(row.into())
    }

    /// Look an item up by its normalized natural key.
    pub async fn find(&self, code: Option<&str>, ean: Option<&str>) -> AppResult<Option<Item>> {
        let code = normalize_key(code);
        let ean = normalize_key(ean);
        let row = sqlx::query_as::<_, ItemRow>(
            "SELECT id, code, ean, description FROM items WHERE code IS ? AND ean IS ?",
        )
        .bind(&code)
        .bind(&ean)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }
}

#[derive(Debug, FromRow)]
struct LocationRow {
    id: i64,
    name: String,
    kind: String,
}

/// Location registry service
#[derive(Clone)]
pub struct LocationService {
    db: SqlitePool,
}

impl LocationService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn ensure(&self, name: &str, kind: &str) -> AppResult<i64> {
        let mut conn = self.db.acquire().await?;
        ensure_location(&mut conn, name.trim(), kind).await
    }

    pub async fn create_with_id(&self, id: i64, name: &str, kind: &str) -> AppResult<i64> {
        let mut conn = self.db.acquire().await?;
        ensure_location_with_id(&mut conn, id, name.trim(), kind).await
    }

    pub async fn get(&self, id: i64) -> AppResult<Location> {
        let row =
            sqlx::query_as::<_, LocationRow>("SELECT id, name, kind FROM locations WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Location {id}")))?;
        Ok(Location {
            id: row.id,
            name: row.name,
            kind: row.kind,
        })
    }

    pub async fn list(&self) -> AppResult<Vec<Location>> {
        let rows =
            sqlx::query_as::<_, LocationRow>("SELECT id, name, kind FROM locations ORDER BY name")
                .fetch_all(&self.db)
                .await?;
        Ok(rows
            .into_iter()
            .map(|row| Location {
                id: row.id,
                name: row.name,
                kind: row.kind,
            })
            .collect())
    }

    /// Delete a location. Refused while it still owns stock or inventory
    /// headers.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let stock: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(ABS(quantity)), 0.0) FROM stock WHERE location_id = ?",
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        if stock > 0.0 {
            return Err(AppError::Constraint(format!(
                "location {id} still owns stock"
            )));
        }

        let headers: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM inventories WHERE location_id = ?")
                .bind(id)
                .fetch_one(&self.db)
                .await?;
        if headers > 0 {
            return Err(AppError::Constraint(format!(
                "location {id} still owns inventories"
            )));
        }

        let result = sqlx::query("DELETE FROM locations WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Location {id}")));
        }
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct ResponsibleRow {
    id: i64,
    name: String,
    contact: String,
}

/// Responsible registry service
#[derive(Clone)]
pub struct ResponsibleService {
    db: SqlitePool,
}

impl ResponsibleService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn ensure(&self, name: &str, contact: &str) -> AppResult<i64> {
        let mut conn = self.db.acquire().await?;
        ensure_responsible(&mut conn, name.trim(), contact).await
    }

    pub async fn list(&self) -> AppResult<Vec<Responsible>> {
        let rows = sqlx::query_as::<_, ResponsibleRow>(
            "SELECT id, name, contact FROM responsibles ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| Responsible {
                id: row.id,
                name: row.name,
                contact: row.contact,
            })
            .collect())
    }
}
