use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::Result;
use crate::schema::types::{DatabaseSchema, Reference};

/// Trait for database schema introspection.
/// Each database backend implements this to extract schema metadata.
pub trait SchemaIntrospector: Send + Sync {
    /// Introspect the database and return every base table with its columns
    /// and single-column foreign key references.
    fn introspect(&self) -> impl std::future::Future<Output = Result<DatabaseSchema>> + Send;
}

/// Binary precision for an integer type name, matching what PostgreSQL
/// reports in `information_schema.columns.numeric_precision`.
pub fn integer_bits(type_name: &str) -> Option<u32> {
    let lowered = type_name.trim().to_lowercase();
    let base = lowered.split('(').next().unwrap_or("").trim();
    let base = base.trim_end_matches(" unsigned");
    match base {
        "tinyint" => Some(8),
        "smallint" | "int2" => Some(16),
        "int" | "integer" | "int4" | "mediumint" => Some(32),
        "bigint" | "int8" => Some(64),
        _ => None,
    }
}

/// One column of a foreign key constraint, as read from the catalog.
#[derive(Debug, Clone)]
pub struct ForeignKeyColumn {
    pub table: String,
    pub constraint: String,
    pub column: String,
    /// Schema of the referenced table, when the catalog reports it.
    pub foreign_schema: Option<String>,
    pub reference: Reference,
}

/// Attach single-column foreign keys to `schema`.
///
/// Columns are grouped by (table, constraint); a group with more than one
/// column is a composite key and only counted. Keys whose parent lives
/// outside `home_schema` are dropped, since the parent is not introspected.
pub fn attach_foreign_keys(
    schema: &mut DatabaseSchema,
    home_schema: Option<&str>,
    columns: Vec<ForeignKeyColumn>,
) {
    let mut constraints: IndexMap<(String, String), Vec<ForeignKeyColumn>> = IndexMap::new();
    for column in columns {
        constraints
            .entry((column.table.clone(), column.constraint.clone()))
            .or_default()
            .push(column);
    }

    for ((table, constraint), mut group) in constraints {
        if group.len() != 1 {
            debug!(table = %table, constraint = %constraint, "Skipping composite foreign key");
            schema.skipped_foreign_keys += 1;
            continue;
        }
        let Some(fk) = group.pop() else {
            continue;
        };
        if let (Some(home), Some(foreign)) = (home_schema, fk.foreign_schema.as_deref()) {
            if home != foreign {
                warn!(
                    "Ignoring foreign key {}.{}: it references {}.{} outside schema '{}'",
                    table, fk.column, foreign, fk.reference, home
                );
                continue;
            }
        }
        if !schema.attach_reference(&table, &fk.column, fk.reference) {
            debug!(table = %table, column = %fk.column, "Foreign key column outside the introspected tables");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::dialect::Dialect;
    use crate::schema::types::{ColumnMetadata, DataType, TableMetadata};

    fn fk(table: &str, constraint: &str, column: &str, parent: (&str, &str, &str)) -> ForeignKeyColumn {
        ForeignKeyColumn {
            table: table.to_string(),
            constraint: constraint.to_string(),
            column: column.to_string(),
            foreign_schema: Some(parent.0.to_string()),
            reference: Reference::new(parent.1, parent.2),
        }
    }

    fn shop() -> DatabaseSchema {
        let mut schema = DatabaseSchema::new(Dialect::PostgreSQL);
        for (name, columns) in [
            ("parents", vec!["id", "a", "b"]),
            ("orders", vec!["id", "parent_id"]),
            ("invoices", vec!["id", "parent_id", "a", "b"]),
        ] {
            let mut table = TableMetadata::new(name.to_string()).in_schema("public");
            for column in columns {
                table.push_column(ColumnMetadata::new(column.to_string(), DataType::Integer, "integer".to_string()));
            }
            schema.tables.insert(name.to_string(), table);
        }
        schema
    }

    #[test]
    fn test_shared_constraint_name_across_tables() {
        let mut schema = shop();
        attach_foreign_keys(
            &mut schema,
            Some("public"),
            vec![
                fk("orders", "fk_parent", "parent_id", ("public", "parents", "id")),
                fk("invoices", "fk_parent", "parent_id", ("public", "parents", "id")),
            ],
        );
        assert_eq!(schema.skipped_foreign_keys, 0);
        assert_eq!(schema.reference_count(), 2);
        for table in ["orders", "invoices"] {
            assert_eq!(
                schema.tables[table].columns["parent_id"].reference,
                Some(Reference::new("parents", "id"))
            );
        }
    }

    #[test]
    fn test_composite_key_counted_not_attached() {
        let mut schema = shop();
        attach_foreign_keys(
            &mut schema,
            Some("public"),
            vec![
                fk("invoices", "fk_pair", "a", ("public", "parents", "a")),
                fk("invoices", "fk_pair", "b", ("public", "parents", "b")),
                fk("invoices", "fk_parent", "parent_id", ("public", "parents", "id")),
            ],
        );
        assert_eq!(schema.skipped_foreign_keys, 1);
        assert_eq!(schema.reference_count(), 1);
        assert!(schema.tables["invoices"].columns["a"].reference.is_none());
    }

    #[test]
    fn test_cross_schema_reference_dropped() {
        let mut schema = shop();
        attach_foreign_keys(
            &mut schema,
            Some("public"),
            vec![fk("orders", "fk_parent", "parent_id", ("archive", "parents", "id"))],
        );
        assert_eq!(schema.reference_count(), 0);
        assert_eq!(schema.skipped_foreign_keys, 0);

        let mut schema = shop();
        let mut unqualified = fk("orders", "fk_parent", "parent_id", ("x", "parents", "id"));
        unqualified.foreign_schema = None;
        attach_foreign_keys(&mut schema, Some("public"), vec![unqualified]);
        assert_eq!(schema.reference_count(), 1);
    }

    #[test]
    fn test_integer_bits() {
        assert_eq!(integer_bits("tinyint"), Some(8));
        assert_eq!(integer_bits("SMALLINT"), Some(16));
        assert_eq!(integer_bits("int unsigned"), Some(32));
        assert_eq!(integer_bits("bigint(20)"), Some(64));
        assert_eq!(integer_bits("varchar"), None);
    }
}
