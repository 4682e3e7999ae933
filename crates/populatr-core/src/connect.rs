//! # Database Connections
//!
//! `DatabasePool` wraps one sqlx pool per supported engine. It is the only
//! place that names a concrete driver: everything else works through
//! `Dialect` and the methods here.

use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Executor;
use tracing::debug;

use crate::dialect::Dialect;
use crate::error::{PopulatrError, Result};
use crate::generate::value::Value;
use crate::insert::bind::{bind_mysql, bind_postgres, bind_sqlite};
use crate::schema::introspect::SchemaIntrospector;
use crate::schema::mysql::MySqlIntrospector;
use crate::schema::postgres::PostgresIntrospector;
use crate::schema::sqlite::SqliteIntrospector;
use crate::schema::types::DatabaseSchema;

const MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub enum DatabasePool {
    Postgres(PgPool),
    MySql(MySqlPool),
    Sqlite(SqlitePool),
}

impl DatabasePool {
    /// Connect to the database named by `db_url`, choosing the driver from
    /// its scheme.
    pub async fn connect(db_url: &str) -> Result<Self> {
        let dialect = Dialect::from_url(db_url)?;
        let connection_error = |e| PopulatrError::Connection {
            message: format!("Failed to connect to {}", dialect),
            connection_hint: sanitize_url(db_url),
            source: e,
        };

        let pool = match dialect {
            Dialect::PostgreSQL => DatabasePool::Postgres(
                PgPoolOptions::new()
                    .max_connections(MAX_CONNECTIONS)
                    .connect(db_url)
                    .await
                    .map_err(connection_error)?,
            ),
            Dialect::MySQL => DatabasePool::MySql(
                MySqlPoolOptions::new()
                    .max_connections(MAX_CONNECTIONS)
                    .connect(db_url)
                    .await
                    .map_err(connection_error)?,
            ),
            // A single connection keeps `sqlite::memory:` on one database.
            Dialect::SQLite => DatabasePool::Sqlite(
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .connect(db_url)
                    .await
                    .map_err(connection_error)?,
            ),
        };
        debug!("Connected to {}", sanitize_url(db_url));
        Ok(pool)
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            DatabasePool::Postgres(_) => Dialect::PostgreSQL,
            DatabasePool::MySql(_) => Dialect::MySQL,
            DatabasePool::Sqlite(_) => Dialect::SQLite,
        }
    }

    /// Introspect the connected database. `schema_name` picks the PostgreSQL
    /// schema (default `current_schema()`); MySQL uses the URL's database
    /// and SQLite has one schema.
    pub async fn introspect(&self, schema_name: Option<&str>) -> Result<DatabaseSchema> {
        match self {
            DatabasePool::Postgres(pool) => {
                let introspector = match schema_name {
                    Some(name) => PostgresIntrospector::with_schema(pool.clone(), name.to_string()),
                    None => PostgresIntrospector::new(pool.clone()),
                };
                introspector.introspect().await
            }
            DatabasePool::MySql(pool) => MySqlIntrospector::new(pool.clone()).introspect().await,
            DatabasePool::Sqlite(pool) => SqliteIntrospector::new(pool.clone()).introspect().await,
        }
    }

    /// Prepare `sql` on the server without executing it.
    pub async fn prepare(&self, sql: &str) -> std::result::Result<(), sqlx::Error> {
        match self {
            DatabasePool::Postgres(pool) => pool.prepare(sql).await.map(|_| ()),
            DatabasePool::MySql(pool) => pool.prepare(sql).await.map(|_| ()),
            DatabasePool::Sqlite(pool) => pool.prepare(sql).await.map(|_| ()),
        }
    }

    /// Execute `sql` once with `values` bound positionally; returns rows affected.
    pub async fn execute_row(&self, sql: &str, values: &[&Value]) -> std::result::Result<u64, sqlx::Error> {
        let result = match self {
            DatabasePool::Postgres(pool) => bind_postgres(sqlx::query(sql).persistent(false), values)
                .execute(pool)
                .await?
                .rows_affected(),
            DatabasePool::MySql(pool) => bind_mysql(sqlx::query(sql), values)
                .execute(pool)
                .await?
                .rows_affected(),
            DatabasePool::Sqlite(pool) => bind_sqlite(sqlx::query(sql), values)
                .execute(pool)
                .await?
                .rows_affected(),
        };
        Ok(result)
    }

    pub async fn close(&self) {
        match self {
            DatabasePool::Postgres(pool) => pool.close().await,
            DatabasePool::MySql(pool) => pool.close().await,
            DatabasePool::Sqlite(pool) => pool.close().await,
        }
    }
}

impl From<SqlitePool> for DatabasePool {
    fn from(pool: SqlitePool) -> Self {
        DatabasePool::Sqlite(pool)
    }
}

impl From<PgPool> for DatabasePool {
    fn from(pool: PgPool) -> Self {
        DatabasePool::Postgres(pool)
    }
}

impl From<MySqlPool> for DatabasePool {
    fn from(pool: MySqlPool) -> Self {
        DatabasePool::MySql(pool)
    }
}

/// Sanitize a database URL for error messages (hide password).
pub fn sanitize_url(db_url: &str) -> String {
    if let Ok(mut parsed) = url::Url::parse(db_url) {
        if parsed.password().is_some() {
            let _ = parsed.set_password(Some("****"));
        }
        return parsed.to_string();
    }
    // SQLite paths and other non-URL strings are returned unchanged.
    db_url.to_string()
}
