//! # Error Types
//!
//! Defines `PopulatrError`, the unified error enum for every failure mode in
//! the populate pipeline. Variants carry the table, column, and row index
//! involved so a log line is enough to locate the problem.
//!
//! Scope of each variant:
//!
//! - run-fatal: `Connection`, `Introspection`, `CircularDependency`,
//!   `DeadlineExceeded`
//! - table-scoped: `UnsupportedType`, `StatementBuild`
//! - cell/row-scoped: `ReferenceResolution`, `InsertFailed`

use thiserror::Error;

/// All errors that can occur in populatr operations.
#[derive(Error, Debug)]
pub enum PopulatrError {
    #[error("Database connection failed: {message}\n  Connection string: {connection_hint}\n  Cause: {source}")]
    Connection {
        message: String,
        connection_hint: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Schema introspection failed on query '{query}': {source}")]
    Introspection {
        query: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("No database URL provided. populatr looks for a connection in this order:\n  1. --db flag\n  2. DATABASE_URL environment variable\n  3. .env file with DATABASE_URL\n  4. populatr.toml [database] section\n\nExample: populatr populate --db postgres://localhost/myapp --rows 10")]
    NoDatabaseUrl,

    #[error("Unsupported database scheme '{scheme}'. Supported: postgres://, mysql://, sqlite:")]
    UnsupportedDatabase { scheme: String },

    #[error("No generator for type '{type_name}' on non-nullable column {table}.{column}")]
    UnsupportedType {
        type_name: String,
        table: String,
        column: String,
    },

    #[error("Foreign key resolution failed at row {row_index}: {table}.{column} references {ref_table}.{ref_column}, which has no generated value for that row")]
    ReferenceResolution {
        table: String,
        column: String,
        ref_table: String,
        ref_column: String,
        row_index: usize,
    },

    #[error("Circular dependency detected involving tables: {tables}\n  Rows cannot be ordered so that every parent precedes its children.\n  Set [graph] allow_cycles = true in populatr.toml to insert in best-effort order.")]
    CircularDependency { tables: String },

    #[error("Could not build INSERT statement for {table}: {message}")]
    StatementBuild {
        table: String,
        message: String,
        #[source]
        source: Option<sqlx::Error>,
    },

    #[error("Insert failed on {table} row {row_index} after {attempts} attempt(s)\n  SQL: {sql_preview}\n  DB error: {source}")]
    InsertFailed {
        table: String,
        row_index: usize,
        attempts: u32,
        sql_preview: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Deadline of {timeout_secs}s exceeded during {stage}")]
    DeadlineExceeded { stage: String, timeout_secs: u64 },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Other(String),
}

impl PopulatrError {
    /// True for errors after which no further table can be processed.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            PopulatrError::Connection { .. }
                | PopulatrError::Introspection { .. }
                | PopulatrError::CircularDependency { .. }
                | PopulatrError::DeadlineExceeded { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PopulatrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_type_message_names_column() {
        let err = PopulatrError::UnsupportedType {
            type_name: "geometry".to_string(),
            table: "places".to_string(),
            column: "shape".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("geometry"));
        assert!(msg.contains("places.shape"));
        assert!(!err.is_run_fatal());
    }

    #[test]
    fn test_deadline_is_run_fatal() {
        let err = PopulatrError::DeadlineExceeded {
            stage: "insert books".to_string(),
            timeout_secs: 15,
        };
        assert!(err.is_run_fatal());
        assert!(err.to_string().contains("15s"));
    }
}
