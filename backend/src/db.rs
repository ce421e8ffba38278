//! Database setup: connection pool, schema bootstrap and seed data

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::DatabaseConfig;
use crate::error::AppResult;

/// Table definitions, executed one statement at a time.
///
/// Quantities are REAL, dates are ISO-8601 TEXT so BETWEEN and ORDER BY
/// compare chronologically. Optional lot/expiry columns store real NULLs;
/// key matching uses the null-safe IS operator.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        code TEXT,
        ean TEXT,
        description TEXT NOT NULL DEFAULT ''
    )",
    "CREATE TABLE IF NOT EXISTS locations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        kind TEXT NOT NULL DEFAULT 'branch'
    )",
    "CREATE TABLE IF NOT EXISTS responsibles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        contact TEXT NOT NULL DEFAULT ''
    )",
    "CREATE TABLE IF NOT EXISTS inventories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        note TEXT,
        created_on TEXT NOT NULL,
        exported_on TEXT NOT NULL,
        kind TEXT NOT NULL,
        declared_rows INTEGER NOT NULL DEFAULT 0,
        location_id INTEGER NOT NULL REFERENCES locations(id),
        responsible_id INTEGER NOT NULL REFERENCES responsibles(id),
        source_hash TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS inventory_rows (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        inventory_id INTEGER NOT NULL REFERENCES inventories(id),
        item_id INTEGER NOT NULL REFERENCES items(id),
        units_per_case REAL NOT NULL DEFAULT 0,
        cases REAL NOT NULL DEFAULT 0,
        loose_quantity REAL NOT NULL DEFAULT 0,
        total_quantity REAL NOT NULL DEFAULT 0,
        expires_on TEXT,
        received_on TEXT
    )",
    "CREATE TABLE IF NOT EXISTS movements (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL,
        item_id INTEGER NOT NULL REFERENCES items(id),
        location_id INTEGER NOT NULL REFERENCES locations(id),
        delta REAL NOT NULL,
        lot TEXT,
        expires_on TEXT,
        origin TEXT NOT NULL,
        recorded_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS stock (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        item_id INTEGER NOT NULL REFERENCES items(id),
        location_id INTEGER NOT NULL REFERENCES locations(id),
        lot TEXT,
        expires_on TEXT,
        quantity REAL NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS sales_imports (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        source_hash TEXT NOT NULL UNIQUE,
        imported_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS sales (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        import_id INTEGER NOT NULL REFERENCES sales_imports(id),
        location_id INTEGER NOT NULL,
        item_id INTEGER NOT NULL REFERENCES items(id),
        sold_on TEXT NOT NULL,
        quantity REAL NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_stock_key
        ON stock (item_id, location_id, lot, expires_on)",
    "CREATE INDEX IF NOT EXISTS idx_movements_key
        ON movements (item_id, location_id, expires_on, kind)",
    "CREATE INDEX IF NOT EXISTS idx_movements_origin ON movements (origin)",
    "CREATE INDEX IF NOT EXISTS idx_sales_lookup
        ON sales (location_id, item_id, sold_on)",
    "CREATE INDEX IF NOT EXISTS idx_inventories_natural
        ON inventories (name, created_on, exported_on)",
];

/// Open (creating if missing) the configured database and make sure the
/// schema and seed rows exist.
pub async fn connect(config: &DatabaseConfig) -> AppResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;
    Ok(pool)
}

/// In-memory database for tests and throwaway sessions.
///
/// Limited to one connection: every pooled connection would otherwise get
/// its own private memory database.
pub async fn connect_in_memory() -> AppResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables and indexes, then seed the defaults.
pub async fn init_schema(pool: &SqlitePool) -> AppResult<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    seed_defaults(pool).await?;
    Ok(())
}

/// Non-intrusive seed: only when a registry is empty, create the default
/// branch (id 1) and the default responsible.
pub async fn seed_defaults(pool: &SqlitePool) -> AppResult<()> {
    let locations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM locations")
        .fetch_one(pool)
        .await?;
    if locations == 0 {
        sqlx::query("INSERT OR IGNORE INTO locations (id, name, kind) VALUES (?, ?, ?)")
            .bind(1i64)
            .bind("Main branch")
            .bind("branch")
            .execute(pool)
            .await?;
    }

    let responsibles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM responsibles")
        .fetch_one(pool)
        .await?;
    if responsibles == 0 {
        sqlx::query("INSERT OR IGNORE INTO responsibles (name, contact) VALUES (?, ?)")
            .bind("System")
            .bind("")
            .execute(pool)
            .await?;
    }

    Ok(())
}
