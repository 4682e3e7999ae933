//! # Row Insertion
//!
//! Executes a table's generated rows one at a time with bounded retry.
//! Insertion is best-effort and non-transactional: a failed row is logged
//! and skipped, a statement that fails to prepare aborts only its table.

pub mod bind;
pub mod retry;
pub mod statement;

use tracing::{debug, info, warn};

use crate::connect::DatabasePool;
use crate::deadline::Deadline;
use crate::error::{PopulatrError, Result};
use crate::generate::mapper::InsertableRowSet;
use crate::insert::retry::{with_retry, RetryPolicy};
use crate::insert::statement::{build_insert_statement, truncate_sql};

const SQL_PREVIEW_LEN: usize = 200;

/// Outcome of inserting one table's rows.
#[derive(Debug)]
pub struct TableInsertReport {
    pub table: String,
    pub attempted: usize,
    pub inserted: usize,
    /// One `InsertFailed` per row that exhausted its retries.
    pub failures: Vec<PopulatrError>,
    /// Set when the run deadline passed partway through the table.
    pub interrupted: Option<PopulatrError>,
}

impl TableInsertReport {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            attempted: 0,
            inserted: 0,
            failures: Vec::new(),
            interrupted: None,
        }
    }
}

/// Insert every row of `row_set`, in order.
///
/// Returns `StatementBuild` if the INSERT cannot be built or prepared.
/// Per-row failures and a mid-table deadline are recorded on the report.
pub async fn insert_row_set(
    pool: &DatabasePool,
    row_set: &InsertableRowSet,
    retry: &RetryPolicy,
    deadline: &Deadline,
) -> Result<TableInsertReport> {
    let table = row_set.table_name.as_str();
    let stage = format!("insert into {}", table);
    deadline.check(&stage)?;

    let sql = build_insert_statement(pool.dialect(), row_set)?;
    debug!("Preparing: {}", sql);

    deadline
        .run(&stage, pool.prepare(&sql))
        .await?
        .map_err(|e| PopulatrError::StatementBuild {
            table: table.to_string(),
            message: format!("prepare failed for `{}`", truncate_sql(&sql, SQL_PREVIEW_LEN)),
            source: Some(e),
        })?;

    let mut report = TableInsertReport::new(table);
    for row_index in 0..row_set.row_count() {
        let Some(values) = row_set.row_values(row_index) else {
            continue;
        };
        report.attempted += 1;

        let label = format!("insert into {} row {}", table, row_index);
        let sql_ref = sql.as_str();
        let values_ref = values.as_slice();
        let outcome = deadline
            .run(&stage, with_retry(retry, &label, move || pool.execute_row(sql_ref, values_ref)))
            .await;

        match outcome {
            Ok(Ok(_)) => report.inserted += 1,
            Ok(Err(exhausted)) => {
                let err = PopulatrError::InsertFailed {
                    table: table.to_string(),
                    row_index,
                    attempts: exhausted.attempts,
                    sql_preview: truncate_sql(&sql, SQL_PREVIEW_LEN),
                    source: exhausted.source,
                };
                warn!("{}", err);
                report.failures.push(err);
            }
            Err(deadline_err) => {
                warn!(
                    "Deadline reached while inserting into {} ({} of {} rows inserted)",
                    table,
                    report.inserted,
                    row_set.row_count()
                );
                report.interrupted = Some(deadline_err);
                return Ok(report);
            }
        }
    }

    info!(
        "{}: inserted {}/{} rows",
        table, report.inserted, report.attempted
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::generate::value::Value;
    use indexmap::IndexMap;
    use std::time::Duration;

    async fn sqlite_pool(ddl: &str) -> DatabasePool {
        let pool = DatabasePool::connect("sqlite::memory:").await.unwrap();
        if let DatabasePool::Sqlite(p) = &pool {
            sqlx::raw_sql(ddl).execute(p).await.unwrap();
        }
        pool
    }

    fn users(ids: &[i64]) -> InsertableRowSet {
        InsertableRowSet {
            table_name: "users".to_string(),
            schema: None,
            parameters: vec!["id".to_string(), "name".to_string()],
            rows: ids
                .iter()
                .map(|&id| {
                    let mut row = IndexMap::new();
                    row.insert("id".to_string(), Value::Int(id));
                    row.insert("name".to_string(), Value::String(format!("user{id}")));
                    row
                })
                .collect(),
            placeholder_template: Dialect::SQLite.placeholder_group(2),
            unresolved: Vec::new(),
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(2, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_failed_row_does_not_stop_table() {
        let pool = sqlite_pool("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)").await;
        let report = insert_row_set(&pool, &users(&[1, 2, 2, 3]), &fast_retry(), &Deadline::none())
            .await
            .unwrap();

        assert_eq!(report.attempted, 4);
        assert_eq!(report.inserted, 3);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0],
            PopulatrError::InsertFailed { row_index: 2, attempts: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_missing_table_is_statement_build_error() {
        let pool = sqlite_pool("CREATE TABLE other (id INTEGER)").await;
        let err = insert_row_set(&pool, &users(&[1]), &fast_retry(), &Deadline::none())
            .await
            .unwrap_err();
        assert!(matches!(err, PopulatrError::StatementBuild { source: Some(_), .. }));
    }

    #[tokio::test]
    async fn test_expired_deadline_rejects_table() {
        let pool = sqlite_pool("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)").await;
        let deadline = Deadline::after(Duration::ZERO);
        let err = insert_row_set(&pool, &users(&[1]), &fast_retry(), &deadline)
            .await
            .unwrap_err();
        assert!(matches!(err, PopulatrError::DeadlineExceeded { .. }));
    }
}
