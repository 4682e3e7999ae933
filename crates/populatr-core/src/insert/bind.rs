//! Per-backend parameter binding for generated values.
//!
//! - PostgreSQL: NULLs carry no parameter type (OID 0) so the server infers
//!   the column type. Statements must be unnamed, otherwise the first row's
//!   inferred types stick to later rows.
//! - MySQL: UUIDs are sent as text.
//! - SQLite: UUIDs and decimals are sent as text.

use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::mysql::{MySql, MySqlArguments};
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgArgumentBuffer, PgArguments, PgTypeInfo, Postgres};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};

use crate::generate::value::Value;

/// A NULL parameter with no declared type.
#[derive(Debug, Clone, Copy)]
pub struct UntypedNull;

impl sqlx::Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_oid(Oid(0))
    }
}

impl<'q> sqlx::Encode<'q, Postgres> for UntypedNull {
    fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        Ok(IsNull::Yes)
    }
}

pub fn bind_postgres<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    values: &[&Value],
) -> Query<'q, Postgres, PgArguments> {
    for value in values {
        query = match value {
            Value::Null | Value::Blob(_) => query.bind(UntypedNull),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Decimal(d) => query.bind(*d),
            Value::String(s) => query.bind(s.clone()),
            Value::Timestamp(ts) => query.bind(*ts),
            Value::Date(d) => query.bind(*d),
            Value::Uuid(u) => query.bind(*u),
        };
    }
    query
}

pub fn bind_mysql<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    values: &[&Value],
) -> Query<'q, MySql, MySqlArguments> {
    for value in values {
        query = match value {
            Value::Null | Value::Blob(_) => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Decimal(d) => query.bind(*d),
            Value::String(s) => query.bind(s.clone()),
            Value::Timestamp(ts) => query.bind(*ts),
            Value::Date(d) => query.bind(*d),
            Value::Uuid(u) => query.bind(u.to_string()),
        };
    }
    query
}

pub fn bind_sqlite<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    values: &[&Value],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            Value::Null | Value::Blob(_) => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Decimal(d) => query.bind(d.to_string()),
            Value::String(s) => query.bind(s.clone()),
            Value::Timestamp(ts) => query.bind(*ts),
            Value::Date(d) => query.bind(*d),
            Value::Uuid(u) => query.bind(u.to_string()),
        };
    }
    query
}
