//! Snapshot ingestion and reversal tests
//!
//! Covers the atomic import path: header dedup on the (name, created,
//! exported) triple, paired aggregate/ledger writes per row, and the
//! reversal engine restoring the pre-import state while keeping its
//! compensating movements as audit trail.

use chrono::NaiveDate;
use sqlx::SqlitePool;

use shared::{ImportSnapshot, LocationRef, MovementKind, SnapshotRow, StockKey};
use shelftrack_backend::db;
use shelftrack_backend::services::{
    ImportService, ItemService, MovementService, ReversalService, StockService,
};
use shelftrack_backend::AppError;

async fn test_pool() -> SqlitePool {
    db::connect_in_memory().await.unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn row(code: &str, cases: f64, loose: f64, expires_on: Option<NaiveDate>) -> SnapshotRow {
    SnapshotRow {
        code: Some(code.to_string()),
        ean: None,
        description: format!("Item {code}"),
        units_per_case: 6.0,
        cases,
        loose_quantity: loose,
        expires_on,
        received_on: None,
    }
}

fn snapshot(name: &str, rows: Vec<SnapshotRow>) -> ImportSnapshot {
    ImportSnapshot {
        name: name.to_string(),
        note: None,
        created_on: date(2024, 5, 10),
        exported_on: date(2024, 5, 11),
        kind: "full".to_string(),
        declared_rows: rows.len() as i64,
        source_hash: format!("hash-{name}"),
        location: LocationRef::Name("Main branch".to_string()),
        responsible: "System".to_string(),
        rows,
    }
}

async fn table_count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

// ============================================================================
// Ingestion
// ============================================================================

#[tokio::test]
async fn ingest_writes_header_rows_movements_and_stock() {
    let pool = test_pool().await;
    let imports = ImportService::new(pool.clone());
    let expiry = Some(date(2024, 8, 1));

    let id = imports
        .ingest(&snapshot(
            "May count",
            vec![row("A1", 2.0, 3.0, expiry), row("B2", 0.0, 4.5, None)],
        ))
        .await
        .unwrap();

    let header = imports.get(id).await.unwrap();
    assert_eq!(header.name, "May count");
    assert_eq!(header.declared_rows, 2);

    let rows = imports.rows(id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].total_quantity, 15.0);
    assert_eq!(rows[1].total_quantity, 4.5);

    let movements = MovementService::new(pool.clone())
        .list_by_origin(&format!("import:{id}"))
        .await
        .unwrap();
    assert_eq!(movements.len(), 2);
    assert!(movements.iter().all(|m| m.kind == MovementKind::Import));

    let stock = StockService::new(pool.clone());
    let items = ItemService::new(pool.clone());
    let a1 = items.find(Some("A1"), None).await.unwrap().unwrap();
    assert_eq!(
        stock
            .quantity(&StockKey::new(a1.id, 1, None, expiry))
            .await
            .unwrap(),
        15.0
    );
}

#[tokio::test]
async fn duplicate_header_triple_is_refused_without_writing() {
    let pool = test_pool().await;
    let imports = ImportService::new(pool.clone());

    imports
        .ingest(&snapshot("May count", vec![row("A1", 1.0, 0.0, None)]))
        .await
        .unwrap();
    let movements_before = table_count(&pool, "movements").await;

    let mut retry = snapshot("May count", vec![row("A1", 5.0, 5.0, None)]);
    retry.source_hash = "different-content".to_string();
    let err = imports.ingest(&retry).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateEntry(_)));

    assert_eq!(table_count(&pool, "inventories").await, 1);
    assert_eq!(table_count(&pool, "movements").await, movements_before);
}

#[tokio::test]
async fn same_name_with_different_dates_is_a_new_inventory() {
    let pool = test_pool().await;
    let imports = ImportService::new(pool.clone());

    imports
        .ingest(&snapshot("Count", vec![row("A1", 1.0, 0.0, None)]))
        .await
        .unwrap();
    let mut second = snapshot("Count", vec![row("A1", 1.0, 0.0, None)]);
    second.created_on = date(2024, 6, 10);
    second.exported_on = date(2024, 6, 11);
    imports.ingest(&second).await.unwrap();

    assert_eq!(table_count(&pool, "inventories").await, 2);
}

#[tokio::test]
async fn zero_total_row_keeps_its_movement_but_no_stock_row() {
    let pool = test_pool().await;
    let imports = ImportService::new(pool.clone());

    let id = imports
        .ingest(&snapshot("Empty line", vec![row("A1", 0.0, 0.0, None)]))
        .await
        .unwrap();

    let movements = MovementService::new(pool.clone())
        .list_by_origin(&format!("import:{id}"))
        .await
        .unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].delta, 0.0);
    assert_eq!(table_count(&pool, "stock").await, 0);
}

#[tokio::test]
async fn repeated_code_resolves_to_one_item_and_refreshes_description() {
    let pool = test_pool().await;
    let imports = ImportService::new(pool.clone());

    imports
        .ingest(&snapshot("First", vec![row("A1", 1.0, 0.0, None)]))
        .await
        .unwrap();
    let mut second = snapshot("Second", vec![row("A1", 1.0, 0.0, None)]);
    second.rows[0].description = "Renamed item".to_string();
    imports.ingest(&second).await.unwrap();

    assert_eq!(table_count(&pool, "items").await, 1);
    let item = ItemService::new(pool.clone())
        .find(Some("A1"), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.description, "Renamed item");
}

#[tokio::test]
async fn blank_name_fails_validation_before_any_write() {
    let pool = test_pool().await;
    let imports = ImportService::new(pool.clone());

    let mut bad = snapshot("  ", vec![row("A1", 1.0, 0.0, None)]);
    bad.name = "  ".to_string();
    let err = imports.ingest(&bad).await.unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "name"));
    assert_eq!(table_count(&pool, "inventories").await, 0);
}

#[tokio::test]
async fn explicit_location_id_is_created_on_demand() {
    let pool = test_pool().await;
    let imports = ImportService::new(pool.clone());

    let mut snap = snapshot("Branch 7 count", vec![row("A1", 1.0, 0.0, None)]);
    snap.location = LocationRef::Id(7);
    let id = imports.ingest(&snap).await.unwrap();

    assert_eq!(imports.get(id).await.unwrap().location_id, 7);
    let name: String = sqlx::query_scalar("SELECT name FROM locations WHERE id = 7")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(name, "Branch 7");
}

#[tokio::test]
async fn snapshot_deserialized_from_an_adapter_payload_ingests() {
    let pool = test_pool().await;
    let payload = r#"{
        "name": "May count",
        "note": "from spreadsheet adapter",
        "created_on": "2024-05-10",
        "exported_on": "2024-05-11",
        "kind": "full",
        "declared_rows": 1,
        "source_hash": "abc123",
        "location": { "name": "Main branch" },
        "responsible": "System",
        "rows": [
            {
                "code": "A1",
                "ean": null,
                "description": "Yogurt",
                "units_per_case": 6.0,
                "cases": 2.0,
                "loose_quantity": 1.0,
                "expires_on": "2024-08-01",
                "received_on": null
            }
        ]
    }"#;
    let snap: ImportSnapshot = serde_json::from_str(payload).unwrap();

    let id = ImportService::new(pool.clone()).ingest(&snap).await.unwrap();
    let rows = ImportService::new(pool.clone()).rows(id).await.unwrap();
    assert_eq!(rows[0].total_quantity, 13.0);
    assert_eq!(rows[0].expires_on, Some(date(2024, 8, 1)));
}

#[tokio::test]
async fn recent_listing_resolves_registry_names() {
    let pool = test_pool().await;
    let imports = ImportService::new(pool.clone());

    imports
        .ingest(&snapshot("May count", vec![row("A1", 1.0, 0.0, None)]))
        .await
        .unwrap();

    let recent = imports.list_recent(10).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].location_name.as_deref(), Some("Main branch"));
    assert_eq!(recent[0].responsible_name.as_deref(), Some("System"));
}

// ============================================================================
// Reversal
// ============================================================================

#[tokio::test]
async fn reversal_restores_the_pre_import_aggregate() {
    let pool = test_pool().await;
    let imports = ImportService::new(pool.clone());
    let stock = StockService::new(pool.clone());
    let expiry = Some(date(2024, 8, 1));

    let base = imports
        .ingest(&snapshot("Base", vec![row("A1", 2.0, 0.0, expiry)]))
        .await
        .unwrap();
    let extra = imports
        .ingest(&snapshot("Extra", vec![row("A1", 1.0, 0.5, expiry)]))
        .await
        .unwrap();

    let item = ItemService::new(pool.clone())
        .find(Some("A1"), None)
        .await
        .unwrap()
        .unwrap();
    let key = StockKey::new(item.id, 1, None, expiry);
    assert_eq!(stock.quantity(&key).await.unwrap(), 18.5);

    let undone = ReversalService::new(pool.clone()).reverse(extra).await.unwrap();
    assert_eq!(undone, 1);
    assert_eq!(stock.quantity(&key).await.unwrap(), 12.0);

    // The base import is untouched.
    assert!(imports.get(base).await.is_ok());
    assert!(matches!(
        imports.get(extra).await.unwrap_err(),
        AppError::NotFound(_)
    ));
}

#[tokio::test]
async fn reversal_deletes_import_movements_and_keeps_its_own() {
    let pool = test_pool().await;
    let imports = ImportService::new(pool.clone());
    let movements = MovementService::new(pool.clone());

    let id = imports
        .ingest(&snapshot("Count", vec![row("A1", 2.0, 0.0, None)]))
        .await
        .unwrap();
    ReversalService::new(pool.clone()).reverse(id).await.unwrap();

    assert!(movements
        .list_by_origin(&format!("import:{id}"))
        .await
        .unwrap()
        .is_empty());
    let trail = movements
        .list_by_origin(&format!("reversal:{id}"))
        .await
        .unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].kind, MovementKind::Reversal);
    assert_eq!(trail[0].delta, -12.0);

    assert_eq!(table_count(&pool, "inventory_rows").await, 0);
    assert_eq!(table_count(&pool, "inventories").await, 0);
}

#[tokio::test]
async fn audit_stays_clean_after_a_reversal() {
    let pool = test_pool().await;
    let imports = ImportService::new(pool.clone());
    let stock = StockService::new(pool.clone());

    let keep = imports
        .ingest(&snapshot("Keep", vec![row("A1", 3.0, 0.0, None)]))
        .await
        .unwrap();
    let undo = imports
        .ingest(&snapshot("Undo", vec![row("A1", 1.0, 0.0, None)]))
        .await
        .unwrap();
    ReversalService::new(pool.clone()).reverse(undo).await.unwrap();

    assert!(imports.get(keep).await.is_ok());
    assert!(stock.audit().await.unwrap().is_empty());
}

#[tokio::test]
async fn reversing_an_unknown_inventory_reports_not_found() {
    let pool = test_pool().await;
    let err = ReversalService::new(pool.clone())
        .reverse(999)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(table_count(&pool, "movements").await, 0);
}
