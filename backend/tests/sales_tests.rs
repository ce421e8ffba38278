//! Sales reconciliation tests
//!
//! Covers the monthly reconciler: content-hash dedup as a clean skip,
//! whole-month replacement scoped to the branches a source mentions, the
//! multi-month opt-in gate, and tolerant line parsing.

use chrono::NaiveDate;
use proptest::prelude::*;
use sqlx::SqlitePool;

use shared::{MonthKey, SalesBatch, SalesImportStatus, SalesLine};
use shelftrack_backend::db;
use shelftrack_backend::services::{ItemService, SalesService};
use shelftrack_backend::AppError;

async fn test_pool() -> SqlitePool {
    db::connect_in_memory().await.unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn line(location: &str, code: &str, sold_on: Option<NaiveDate>, quantity: f64) -> SalesLine {
    SalesLine {
        location: location.to_string(),
        item_code: code.to_string(),
        sold_on,
        quantity,
    }
}

fn batch(name: &str, hash: &str, lines: Vec<SalesLine>) -> SalesBatch {
    SalesBatch {
        source_name: name.to_string(),
        source_hash: hash.to_string(),
        allow_multi_month: false,
        lines,
    }
}

async fn sales_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM sales")
        .fetch_one(pool)
        .await
        .unwrap()
}

// ============================================================================
// Reconciliation
// ============================================================================

#[tokio::test]
async fn reconcile_pre_sums_lines_per_day() {
    let pool = test_pool().await;
    let sales = SalesService::new(pool.clone());

    let report = sales
        .reconcile(&batch(
            "june.xls",
            "h1",
            vec![
                line("1", "A1", Some(date(2024, 6, 3)), 2.0),
                line("1", "A1", Some(date(2024, 6, 3)), 3.5),
                line("1", "A1", Some(date(2024, 6, 4)), 1.0),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(report.status, SalesImportStatus::Imported);
    assert_eq!(report.inserted, 2);
    assert_eq!(report.months, vec![MonthKey { year: 2024, month: 6 }]);

    let item = ItemService::new(pool.clone())
        .find(Some("A1"), None)
        .await
        .unwrap()
        .unwrap();
    let total = sales
        .sold_between(1, item.id, date(2024, 6, 1), date(2024, 6, 30))
        .await
        .unwrap();
    assert_eq!(total, 6.5);
}

#[tokio::test]
async fn duplicate_hash_is_a_clean_skip() {
    let pool = test_pool().await;
    let sales = SalesService::new(pool.clone());
    let source = batch(
        "june.xls",
        "h1",
        vec![line("1", "A1", Some(date(2024, 6, 3)), 2.0)],
    );

    sales.reconcile(&source).await.unwrap();
    let before = sales_count(&pool).await;

    let report = sales.reconcile(&source).await.unwrap();
    assert_eq!(report.status, SalesImportStatus::Skipped);
    assert_eq!(report.import_id, None);
    assert_eq!(report.inserted, 0);
    assert_eq!(sales_count(&pool).await, before);
}

#[tokio::test]
async fn corrected_source_replaces_the_month() {
    let pool = test_pool().await;
    let sales = SalesService::new(pool.clone());

    sales
        .reconcile(&batch(
            "june.xls",
            "h1",
            vec![
                line("1", "A1", Some(date(2024, 6, 3)), 2.0),
                line("1", "A1", Some(date(2024, 6, 4)), 9.0),
            ],
        ))
        .await
        .unwrap();

    // Same month, corrected figures, different content hash.
    sales
        .reconcile(&batch(
            "june-fixed.xls",
            "h2",
            vec![line("1", "A1", Some(date(2024, 6, 3)), 5.0)],
        ))
        .await
        .unwrap();

    let item = ItemService::new(pool.clone())
        .find(Some("A1"), None)
        .await
        .unwrap()
        .unwrap();
    let total = sales
        .sold_between(1, item.id, date(2024, 6, 1), date(2024, 6, 30))
        .await
        .unwrap();
    assert_eq!(total, 5.0);
    assert_eq!(sales_count(&pool).await, 1);
}

#[tokio::test]
async fn month_replacement_spares_unmentioned_branches() {
    let pool = test_pool().await;
    let sales = SalesService::new(pool.clone());

    sales
        .reconcile(&batch(
            "branch2.xls",
            "h1",
            vec![line("2", "A1", Some(date(2024, 6, 3)), 4.0)],
        ))
        .await
        .unwrap();
    sales
        .reconcile(&batch(
            "branch1.xls",
            "h2",
            vec![line("1", "A1", Some(date(2024, 6, 10)), 7.0)],
        ))
        .await
        .unwrap();

    let item = ItemService::new(pool.clone())
        .find(Some("A1"), None)
        .await
        .unwrap()
        .unwrap();
    let branch2 = sales
        .sold_between(2, item.id, date(2024, 6, 1), date(2024, 6, 30))
        .await
        .unwrap();
    assert_eq!(branch2, 4.0);
}

#[tokio::test]
async fn multi_month_source_requires_the_opt_in() {
    let pool = test_pool().await;
    let sales = SalesService::new(pool.clone());
    let lines = vec![
        line("1", "A1", Some(date(2024, 6, 30)), 1.0),
        line("1", "A1", Some(date(2024, 7, 1)), 2.0),
    ];

    let err = sales
        .reconcile(&batch("span.xls", "h1", lines.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
    assert_eq!(sales_count(&pool).await, 0);

    let mut allowed = batch("span.xls", "h1", lines);
    allowed.allow_multi_month = true;
    let report = sales.reconcile(&allowed).await.unwrap();
    assert_eq!(report.months.len(), 2);
    assert_eq!(report.inserted, 2);
}

#[tokio::test]
async fn unusable_lines_are_skipped_silently() {
    let pool = test_pool().await;
    let sales = SalesService::new(pool.clone());

    let report = sales
        .reconcile(&batch(
            "messy.xls",
            "h1",
            vec![
                line("1", "A1", Some(date(2024, 6, 3)), 2.0),
                line("1", "", Some(date(2024, 6, 3)), 5.0),
                line("1", "A1", None, 5.0),
                line("1", "A1", Some(date(2024, 6, 3)), 0.0),
                line("1", "A1", Some(date(2024, 6, 3)), -3.0),
                line("", "A1", Some(date(2024, 6, 3)), 5.0),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(report.inserted, 1);
    let item = ItemService::new(pool.clone())
        .find(Some("A1"), None)
        .await
        .unwrap()
        .unwrap();
    let total = sales
        .sold_between(1, item.id, date(2024, 6, 1), date(2024, 6, 30))
        .await
        .unwrap();
    assert_eq!(total, 2.0);
}

#[tokio::test]
async fn non_numeric_branch_fails_the_whole_source() {
    let pool = test_pool().await;
    let sales = SalesService::new(pool.clone());

    let err = sales
        .reconcile(&batch(
            "bad.xls",
            "h1",
            vec![line("north", "A1", Some(date(2024, 6, 3)), 2.0)],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
    assert_eq!(sales_count(&pool).await, 0);
}

#[tokio::test]
async fn import_history_lists_sources_and_their_records() {
    let pool = test_pool().await;
    let sales = SalesService::new(pool.clone());

    let report = sales
        .reconcile(&batch(
            "june.xls",
            "h1",
            vec![
                line("1", "A1", Some(date(2024, 6, 3)), 2.0),
                line("1", "A1", Some(date(2024, 6, 3)), 3.0),
            ],
        ))
        .await
        .unwrap();
    let import_id = report.import_id.unwrap();

    // A skipped re-feed leaves the history unchanged.
    sales
        .reconcile(&batch(
            "june.xls",
            "h1",
            vec![line("1", "A1", Some(date(2024, 6, 3)), 2.0)],
        ))
        .await
        .unwrap();

    let imports = sales.list_imports(10).await.unwrap();
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0].id, import_id);
    assert_eq!(imports[0].name, "june.xls");
    assert_eq!(imports[0].source_hash, "h1");

    let records = sales.records_for_import(import_id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].import_id, import_id);
    assert_eq!(records[0].sold_on, date(2024, 6, 3));
    assert_eq!(records[0].quantity, 5.0);
}

#[tokio::test]
async fn source_without_usable_rows_is_rejected() {
    let pool = test_pool().await;
    let sales = SalesService::new(pool.clone());

    let err = sales
        .reconcile(&batch(
            "empty.xls",
            "h1",
            vec![line("1", "A1", None, 2.0)],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod property_tests {
    use super::*;

    fn any_date() -> impl Strategy<Value = NaiveDate> {
        (2000i32..2100, 1u32..=12, 1u32..=28)
            .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Every date falls inside the bounds of its own month key.
        #[test]
        fn month_key_bounds_contain_the_date(d in any_date()) {
            let key = MonthKey::from_date(d);
            prop_assert!(key.first_day() <= d);
            prop_assert!(d <= key.last_day());
            prop_assert_eq!(MonthKey::from_date(key.first_day()), key);
            prop_assert_eq!(MonthKey::from_date(key.last_day()), key);
        }

        /// Month keys order the same way their first days do.
        #[test]
        fn month_key_order_matches_date_order(a in any_date(), b in any_date()) {
            let (ka, kb) = (MonthKey::from_date(a), MonthKey::from_date(b));
            prop_assert_eq!(ka.cmp(&kb), ka.first_day().cmp(&kb.first_day()));
        }
    }
}
