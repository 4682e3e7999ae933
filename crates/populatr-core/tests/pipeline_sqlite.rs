//! End-to-end runs against in-memory SQLite.

use std::time::Duration;

use populatr_core::connect::DatabasePool;
use populatr_core::pipeline::{self, RunOptions, TableStatus};
use populatr_core::schema::types::{DataType, Reference};
use populatr_core::PopulatrError;
use populatr_testutil::{sqlite_pool, AUTHORS_BOOKS_DDL, CYCLIC_DDL, UNSUPPORTED_DDL};

fn options(rows: usize) -> RunOptions {
    RunOptions {
        row_count: rows,
        seed: Some(42),
        ..RunOptions::default()
    }
}

async fn count(pool: &DatabasePool, sql: &str) -> i64 {
    let DatabasePool::Sqlite(p) = pool else {
        panic!("expected a sqlite pool");
    };
    sqlx::query_scalar::<_, i64>(sql).fetch_one(p).await.unwrap()
}

#[tokio::test]
async fn test_sqlite_introspect_authors_books() {
    let pool = sqlite_pool(AUTHORS_BOOKS_DDL).await;
    let schema = pool.introspect(None).await.unwrap();

    assert_eq!(schema.table_count(), 2);
    assert_eq!(schema.reference_count(), 1);

    let books = &schema.tables["books"];
    let author_id = &books.columns["author_id"];
    assert_eq!(author_id.reference, Some(Reference::new("authors", "id")));
    assert!(!author_id.nullable);

    let title = &books.columns["title"];
    assert_eq!(title.data_type, DataType::VarChar);
    assert_eq!(title.max_length, Some(80));

    let price = &books.columns["price"];
    assert_eq!(price.numeric_precision, Some(5));
    assert_eq!(price.numeric_scale, Some(2));

    let names: Vec<&str> = books.columns.keys().map(String::as_str).collect();
    assert_eq!(names, ["id", "author_id", "title", "price", "in_print"]);
}

#[tokio::test]
async fn test_sqlite_populate_authors_books() {
    let pool = sqlite_pool(AUTHORS_BOOKS_DDL).await;
    let summary = pipeline::run(&pool, &options(5), None).await.unwrap();

    assert!(summary.aborted.is_none());
    assert_eq!(summary.seed, 42);
    let order: Vec<&str> = summary.tables.iter().map(|t| t.table.as_str()).collect();
    assert_eq!(order, ["authors", "books"]);
    for table in &summary.tables {
        assert_eq!(table.status, TableStatus::Completed, "{}", table.table);
        assert_eq!(table.inserted, 5, "{}", table.table);
        assert_eq!(table.unresolved, 0);
    }
    assert_eq!(summary.total_inserted(), 10);

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM authors").await, 5);
    assert_eq!(
        count(
            &pool,
            "SELECT COUNT(*) FROM books b JOIN authors a ON a.id = b.author_id"
        )
        .await,
        5
    );
}

#[tokio::test]
async fn test_sqlite_unsupported_not_null_aborts_only_its_table() {
    let pool = sqlite_pool(UNSUPPORTED_DDL).await;
    let summary = pipeline::run(&pool, &options(3), None).await.unwrap();

    assert!(summary.aborted.is_none());
    let places = summary.table("places").unwrap();
    assert_eq!(places.status, TableStatus::MappingAborted);
    assert_eq!(places.inserted, 0);
    assert!(places.error.as_deref().unwrap().contains("geometry"));

    let tags = summary.table("tags").unwrap();
    assert_eq!(tags.status, TableStatus::Completed);
    assert_eq!(tags.inserted, 3);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM places").await, 0);
}

#[tokio::test]
async fn test_sqlite_zero_timeout_fails_run() {
    let pool = sqlite_pool(AUTHORS_BOOKS_DDL).await;
    let opts = RunOptions {
        timeout: Some(Duration::ZERO),
        ..options(5)
    };
    let err = pipeline::run(&pool, &opts, None).await.unwrap_err();
    assert!(matches!(err, PopulatrError::DeadlineExceeded { .. }));
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM authors").await, 0);
}

#[tokio::test]
async fn test_sqlite_cycle_is_rejected_by_default() {
    let pool = sqlite_pool(CYCLIC_DDL).await;
    let err = pipeline::run(&pool, &options(2), None).await.unwrap_err();
    match err {
        PopulatrError::CircularDependency { tables } => assert_eq!(tables, "players, teams"),
        other => panic!("expected CircularDependency, got {other:?}"),
    }
}

#[tokio::test]
async fn test_sqlite_cycle_allowed_inserts_with_nulls() {
    let pool = sqlite_pool(CYCLIC_DDL).await;
    let opts = RunOptions {
        allow_cycles: true,
        ..options(2)
    };
    let summary = pipeline::run(&pool, &opts, None).await.unwrap();

    assert!(summary.aborted.is_none());
    assert_eq!(summary.total_inserted(), 4);
    let unresolved: usize = summary.tables.iter().map(|t| t.unresolved).sum();
    assert_eq!(unresolved, 2);
}

#[tokio::test]
async fn test_sqlite_same_seed_same_rows() {
    let first = sqlite_pool(AUTHORS_BOOKS_DDL).await;
    let second = sqlite_pool(AUTHORS_BOOKS_DDL).await;
    pipeline::run(&first, &options(4), None).await.unwrap();
    pipeline::run(&second, &options(4), None).await.unwrap();

    let DatabasePool::Sqlite(a) = &first else { unreachable!() };
    let DatabasePool::Sqlite(b) = &second else { unreachable!() };
    let sql = "SELECT id, name FROM authors ORDER BY id";
    let rows_a: Vec<(i64, String)> = sqlx::query_as(sql).fetch_all(a).await.unwrap();
    let rows_b: Vec<(i64, String)> = sqlx::query_as(sql).fetch_all(b).await.unwrap();
    assert_eq!(rows_a, rows_b);
}

#[tokio::test]
async fn test_sqlite_on_table_callback_sees_insert_order() {
    let pool = sqlite_pool(AUTHORS_BOOKS_DDL).await;
    let seen = std::sync::Mutex::new(Vec::new());
    let cb = |table: &str| seen.lock().unwrap().push(table.to_string());
    pipeline::run(&pool, &options(1), Some(&cb)).await.unwrap();
    assert_eq!(*seen.lock().unwrap(), ["authors", "books"]);
}
