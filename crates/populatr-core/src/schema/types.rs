use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dialect::Dialect;

/// Top-level representation of an introspected database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub dialect: Dialect,
    pub tables: IndexMap<String, TableMetadata>,
    /// Multi-column foreign keys seen in the catalog but not modelled.
    pub skipped_foreign_keys: usize,
}

impl DatabaseSchema {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            tables: IndexMap::new(),
            skipped_foreign_keys: 0,
        }
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn reference_count(&self) -> usize {
        self.tables.values().map(|t| t.references().count()).sum()
    }

    pub fn column_count(&self) -> usize {
        self.tables.values().map(|t| t.columns.len()).sum()
    }

    /// Attach a single-column reference discovered in the catalog.
    ///
    /// Returns `false` if the table or column is not part of the schema
    /// (e.g. the FK lives in a schema that was filtered out).
    pub fn attach_reference(&mut self, table: &str, column: &str, reference: Reference) -> bool {
        self.tables
            .get_mut(table)
            .map(|t| t.set_reference(column, reference))
            .unwrap_or(false)
    }
}

/// A table and its columns in ordinal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub name: String,
    /// Owning schema, when the engine has more than one per database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub columns: IndexMap<String, ColumnMetadata>,
}

impl TableMetadata {
    pub fn new(name: String) -> Self {
        Self {
            name,
            schema: None,
            columns: IndexMap::new(),
        }
    }

    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Add a column, replacing any previous column of the same name.
    pub fn push_column(&mut self, column: ColumnMetadata) {
        self.columns.insert(column.name.clone(), column);
    }

    pub fn set_reference(&mut self, column: &str, reference: Reference) -> bool {
        match self.columns.get_mut(column) {
            Some(col) => {
                col.reference = Some(reference);
                true
            }
            None => false,
        }
    }

    /// Columns that reference another column, paired with their reference.
    pub fn references(&self) -> impl Iterator<Item = (&ColumnMetadata, &Reference)> {
        self.columns
            .values()
            .filter_map(|c| c.reference.as_ref().map(|r| (c, r)))
    }
}

/// A non-owning link from a column to the parent column it references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub table: String,
    pub column: String,
}

impl Reference {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Represents a single column in a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub data_type: DataType,
    pub raw_type: String,
    pub nullable: bool,
    pub max_length: Option<u32>,
    pub numeric_precision: Option<u32>,
    pub numeric_scale: Option<u32>,
    pub ordinal_position: u32,
    pub reference: Option<Reference>,
}

impl ColumnMetadata {
    pub fn new(name: String, data_type: DataType, raw_type: String) -> Self {
        Self {
            name,
            data_type,
            raw_type,
            nullable: true,
            max_length: None,
            numeric_precision: None,
            numeric_scale: None,
            ordinal_position: 0,
            reference: None,
        }
    }

    /// Build a column straight from a raw catalog type string.
    pub fn from_raw(name: &str, raw_type: &str) -> Self {
        Self::new(
            name.to_string(),
            DataType::from_raw(raw_type),
            raw_type.to_string(),
        )
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_max_length(mut self, length: u32) -> Self {
        self.max_length = Some(length);
        self
    }

    pub fn with_precision(mut self, precision: u32, scale: u32) -> Self {
        self.numeric_precision = Some(precision);
        self.numeric_scale = Some(scale);
        self
    }

    pub fn references(mut self, table: &str, column: &str) -> Self {
        self.reference = Some(Reference::new(table, column));
        self
    }
}

/// Normalized data type classes the synthesizer knows how to fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    /// Fixed-length string (char, bpchar)
    Char,
    /// Variable-length string (varchar, character varying)
    VarChar,
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    /// Exact numeric with precision/scale (numeric, decimal)
    Numeric,
    Date,
    /// Timestamp with or without time zone, MySQL datetime
    Timestamp,
    Uuid,
    /// Binary/blob data (bytea, blob)
    Binary,
    /// Anything else; kept verbatim for diagnostics
    Unknown(String),
}

impl DataType {
    /// Parse a raw SQL type string into a normalized DataType.
    ///
    /// Accepts catalog spellings from all three engines, with or without a
    /// length/precision suffix (`VARCHAR(40)`, `numeric(5,2)`).
    pub fn from_raw(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        let base = normalized
            .split('(')
            .next()
            .unwrap_or("")
            .trim()
            .trim_end_matches(" unsigned");

        match base {
            "character varying" | "varchar" | "nvarchar" | "varying character" => {
                DataType::VarChar
            }
            "character" | "char" | "bpchar" | "nchar" => DataType::Char,
            "boolean" | "bool" => DataType::Boolean,
            "smallint" | "int2" | "tinyint" => DataType::SmallInt,
            "integer" | "int" | "int4" | "mediumint" => DataType::Integer,
            "bigint" | "int8" => DataType::BigInt,
            "numeric" | "decimal" => DataType::Numeric,
            "date" => DataType::Date,
            "timestamp"
            | "timestamp without time zone"
            | "timestamp with time zone"
            | "timestamptz"
            | "datetime" => DataType::Timestamp,
            "uuid" => DataType::Uuid,
            "bytea" | "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary"
            | "varbinary" => DataType::Binary,
            other => DataType::Unknown(other.to_string()),
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::SmallInt | DataType::Integer | DataType::BigInt
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Char => write!(f, "char"),
            DataType::VarChar => write!(f, "varchar"),
            DataType::Boolean => write!(f, "boolean"),
            DataType::SmallInt => write!(f, "smallint"),
            DataType::Integer => write!(f, "integer"),
            DataType::BigInt => write!(f, "bigint"),
            DataType::Numeric => write!(f, "numeric"),
            DataType::Date => write!(f, "date"),
            DataType::Timestamp => write!(f, "timestamp"),
            DataType::Uuid => write!(f, "uuid"),
            DataType::Binary => write!(f, "bytea"),
            DataType::Unknown(s) => write!(f, "{}", s),
        }
    }
}

/// Parse the `(n)` or `(p,s)` suffix of a declared type such as `VARCHAR(40)`.
pub fn parse_type_modifiers(raw: &str) -> (Option<u32>, Option<u32>) {
    let Some(open) = raw.find('(') else {
        return (None, None);
    };
    let Some(close) = raw[open..].find(')') else {
        return (None, None);
    };
    let mut parts = raw[open + 1..open + close]
        .split(',')
        .map(|p| p.trim().parse::<u32>().ok());
    let first = parts.next().flatten();
    let second = parts.next().flatten();
    (first, second)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_catalog_spellings() {
        assert_eq!(DataType::from_raw("character varying"), DataType::VarChar);
        assert_eq!(DataType::from_raw("VARCHAR(40)"), DataType::VarChar);
        assert_eq!(DataType::from_raw("bpchar"), DataType::Char);
        assert_eq!(DataType::from_raw("character"), DataType::Char);
        assert_eq!(
            DataType::from_raw("timestamp without time zone"),
            DataType::Timestamp
        );
        assert_eq!(DataType::from_raw("datetime"), DataType::Timestamp);
        assert_eq!(DataType::from_raw("NUMERIC(5,2)"), DataType::Numeric);
        assert_eq!(DataType::from_raw("int unsigned"), DataType::Integer);
        assert_eq!(DataType::from_raw("bytea"), DataType::Binary);
        assert_eq!(
            DataType::from_raw("geometry"),
            DataType::Unknown("geometry".to_string())
        );
    }

    #[test]
    fn test_parse_type_modifiers() {
        assert_eq!(parse_type_modifiers("VARCHAR(40)"), (Some(40), None));
        assert_eq!(parse_type_modifiers("numeric(5, 2)"), (Some(5), Some(2)));
        assert_eq!(parse_type_modifiers("INTEGER"), (None, None));
        assert_eq!(parse_type_modifiers("char(oops"), (None, None));
    }

    #[test]
    fn test_attach_reference_unknown_column() {
        let mut schema = DatabaseSchema::new(Dialect::PostgreSQL);
        let mut books = TableMetadata::new("books".to_string());
        books.push_column(ColumnMetadata::from_raw("author_id", "integer"));
        schema.tables.insert("books".to_string(), books);

        assert!(schema.attach_reference("books", "author_id", Reference::new("authors", "id")));
        assert!(!schema.attach_reference("books", "missing", Reference::new("authors", "id")));
        assert!(!schema.attach_reference("ghost", "id", Reference::new("authors", "id")));
        assert_eq!(schema.reference_count(), 1);
    }
}
