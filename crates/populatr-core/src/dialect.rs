//! # SQL Dialects
//!
//! The syntax rules that differ between the supported engines: positional
//! parameter style, identifier quoting, and the timestamp range each engine
//! accepts. A `Dialect` is a plain `Copy` value handed to every component
//! that renders SQL or bounds generated values.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{PopulatrError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dialect {
    PostgreSQL,
    MySQL,
    SQLite,
}

/// Inclusive range of instants a dialect's timestamp columns accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampBounds {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimestampBounds {
    fn years(start_year: i32, end_year: i32) -> Self {
        let start = NaiveDate::from_ymd_opt(start_year, 1, 1).unwrap_or(NaiveDate::MIN);
        let end = NaiveDate::from_ymd_opt(end_year, 12, 31).unwrap_or(NaiveDate::MAX);
        Self {
            start: start.and_time(NaiveTime::MIN),
            end: end.and_hms_opt(23, 59, 59).unwrap_or(NaiveDateTime::MAX),
        }
    }
}

/// Upper year of PostgreSQL's timestamp range. chrono stops earlier
/// (year 262142), so the effective bound is whichever is smaller.
const POSTGRES_MAX_YEAR: i32 = 294_275;

impl Dialect {
    /// Determine the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> Result<Self> {
        let scheme = url.split(':').next().unwrap_or("");
        match scheme {
            "postgres" | "postgresql" => Ok(Dialect::PostgreSQL),
            "mysql" | "mariadb" => Ok(Dialect::MySQL),
            "sqlite" | "file" => Ok(Dialect::SQLite),
            other => Err(PopulatrError::UnsupportedDatabase {
                scheme: other.to_string(),
            }),
        }
    }

    /// Positional parameter for the 1-based `position`.
    pub fn placeholder(&self, position: usize) -> String {
        match self {
            Dialect::PostgreSQL => format!("${}", position),
            Dialect::MySQL | Dialect::SQLite => "?".to_string(),
        }
    }

    /// Quote an identifier, doubling any embedded quote character.
    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            Dialect::MySQL => format!("`{}`", name.replace('`', "``")),
            Dialect::PostgreSQL | Dialect::SQLite => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Quote a table name, prefixed by its schema when one is known.
    pub fn qualified_name(&self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(schema) => format!(
                "{}.{}",
                self.quote_identifier(schema),
                self.quote_identifier(table)
            ),
            None => self.quote_identifier(table),
        }
    }

    /// Placeholder group for one row of `column_count` values, e.g. `($1, $2)`.
    pub fn placeholder_group(&self, column_count: usize) -> String {
        let placeholders: Vec<String> = (1..=column_count).map(|i| self.placeholder(i)).collect();
        format!("({})", placeholders.join(", "))
    }

    pub fn timestamp_bounds(&self) -> TimestampBounds {
        match self {
            Dialect::PostgreSQL => TimestampBounds::years(1, POSTGRES_MAX_YEAR),
            Dialect::MySQL => TimestampBounds::years(1000, 9999),
            Dialect::SQLite => TimestampBounds::years(1, 9999),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::PostgreSQL => write!(f, "PostgreSQL"),
            Dialect::MySQL => write!(f, "MySQL"),
            Dialect::SQLite => write!(f, "SQLite"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_from_url() {
        assert_eq!(
            Dialect::from_url("postgres://u:p@localhost/db").unwrap(),
            Dialect::PostgreSQL
        );
        assert_eq!(
            Dialect::from_url("mysql://root@localhost/db").unwrap(),
            Dialect::MySQL
        );
        assert_eq!(Dialect::from_url("sqlite::memory:").unwrap(), Dialect::SQLite);
        assert!(Dialect::from_url("oracle://x").is_err());
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(Dialect::PostgreSQL.placeholder_group(3), "($1, $2, $3)");
        assert_eq!(Dialect::MySQL.placeholder_group(2), "(?, ?)");
    }

    #[test]
    fn test_quote_identifier_escapes() {
        assert_eq!(Dialect::PostgreSQL.quote_identifier("users"), "\"users\"");
        assert_eq!(Dialect::PostgreSQL.quote_identifier("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(Dialect::MySQL.quote_identifier("users"), "`users`");
    }

    #[test]
    fn test_qualified_name() {
        assert_eq!(
            Dialect::PostgreSQL.qualified_name(Some("sales"), "orders"),
            "\"sales\".\"orders\""
        );
        assert_eq!(Dialect::SQLite.qualified_name(None, "orders"), "\"orders\"");
        assert_eq!(
            Dialect::PostgreSQL.qualified_name(Some("we\"ird"), "t"),
            "\"we\"\"ird\".\"t\""
        );
    }

    #[test]
    fn test_postgres_bounds_capped_by_chrono() {
        let bounds = Dialect::PostgreSQL.timestamp_bounds();
        assert_eq!(bounds.start.year(), 1);
        assert_eq!(bounds.end.date(), NaiveDate::MAX);
        let mysql = Dialect::MySQL.timestamp_bounds();
        assert_eq!(mysql.start.year(), 1000);
        assert_eq!(mysql.end.year(), 9999);
    }
}
