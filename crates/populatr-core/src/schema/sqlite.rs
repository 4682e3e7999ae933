use indexmap::IndexMap;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use tracing::debug;

use crate::dialect::Dialect;
use crate::error::{PopulatrError, Result};
use crate::schema::introspect::{integer_bits, SchemaIntrospector};
use crate::schema::types::*;

pub struct SqliteIntrospector {
    pool: SqlitePool,
}

fn get<'r, T>(row: &'r SqliteRow, column: &str, query: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column)
        .map_err(|source| PopulatrError::Introspection {
            query: query.to_string(),
            source,
        })
}

/// Build column metadata from a declared SQLite type such as `VARCHAR(40)`.
///
/// SQLite only has type affinities, so widths and precision come from the
/// declaration text. `INTEGER` is 64-bit storage.
pub fn column_from_declared(name: String, declared: &str, notnull: bool) -> ColumnMetadata {
    let data_type = DataType::from_raw(declared);
    let (first, second) = parse_type_modifiers(declared);

    let mut column = ColumnMetadata::new(name, data_type, declared.to_string());
    column.nullable = !notnull;
    match &column.data_type {
        DataType::Char | DataType::VarChar => column.max_length = first,
        DataType::Numeric => {
            column.numeric_precision = first;
            column.numeric_scale = second.or(first.map(|_| 0));
        }
        DataType::Integer if declared.trim().eq_ignore_ascii_case("integer") => {
            column.numeric_precision = Some(64);
        }
        dt if dt.is_integer() => column.numeric_precision = integer_bits(declared),
        _ => {}
    }
    column
}

impl SqliteIntrospector {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, query: &str) -> Result<Vec<SqliteRow>> {
        sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| PopulatrError::Introspection {
                query: query.to_string(),
                source,
            })
    }

    async fn introspect_tables(&self) -> Result<IndexMap<String, TableMetadata>> {
        let query = "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";
        let rows = self.fetch(query).await?;

        let mut tables = IndexMap::new();
        for row in rows {
            let name: String = get(&row, "name", query)?;
            tables.insert(name.clone(), TableMetadata::new(name));
        }
        Ok(tables)
    }

    /// Returns the single-column primary key of each table, used to resolve
    /// `REFERENCES parent` clauses that omit the column list.
    async fn introspect_columns(
        &self,
        tables: &mut IndexMap<String, TableMetadata>,
    ) -> Result<IndexMap<String, String>> {
        let mut primary_keys = IndexMap::new();
        for table in tables.values_mut() {
            let query = format!("PRAGMA table_info(\"{}\")", table.name.replace('"', "\"\""));
            let rows = self.fetch(&query).await?;

            let mut pk_columns = Vec::new();
            for row in rows {
                let cid: i64 = get(&row, "cid", &query)?;
                let name: String = get(&row, "name", &query)?;
                let declared: String = get(&row, "type", &query)?;
                let notnull: i64 = get(&row, "notnull", &query)?;
                let pk: i64 = get(&row, "pk", &query)?;

                if pk > 0 {
                    pk_columns.push(name.clone());
                }
                let mut column = column_from_declared(name, &declared, notnull != 0);
                column.ordinal_position = u32::try_from(cid + 1).unwrap_or(0);
                table.push_column(column);
            }

            if let [pk] = pk_columns.as_slice() {
                primary_keys.insert(table.name.clone(), pk.clone());
            }
        }

        Ok(primary_keys)
    }

    async fn introspect_foreign_keys(
        &self,
        schema: &mut DatabaseSchema,
        primary_keys: &IndexMap<String, String>,
    ) -> Result<()> {
        let table_names: Vec<String> = schema.tables.keys().cloned().collect();
        for table_name in table_names {
            let query = format!("PRAGMA foreign_key_list(\"{}\")", table_name.replace('"', "\"\""));
            let rows = self.fetch(&query).await?;

            // Group by FK id; more than one row per id is a composite key.
            let mut fk_map: IndexMap<i64, Vec<(String, String, Option<String>)>> = IndexMap::new();
            for row in &rows {
                let id: i64 = get(row, "id", &query)?;
                let parent: String = get(row, "table", &query)?;
                let from: String = get(row, "from", &query)?;
                let to: Option<String> = get(row, "to", &query)?;
                fk_map.entry(id).or_default().push((from, parent, to));
            }

            for (_, mut pairs) in fk_map {
                if pairs.len() != 1 {
                    debug!(table = %table_name, "Skipping composite foreign key");
                    schema.skipped_foreign_keys += 1;
                    continue;
                }
                let Some((from, parent, to)) = pairs.pop() else {
                    continue;
                };
                let Some(to) = to.or_else(|| primary_keys.get(&parent).cloned()) else {
                    debug!(
                        table = %table_name,
                        column = %from,
                        parent = %parent,
                        "Foreign key target has no single-column primary key"
                    );
                    continue;
                };
                schema.attach_reference(&table_name, &from, Reference::new(parent, to));
            }
        }

        Ok(())
    }
}

impl SchemaIntrospector for SqliteIntrospector {
    async fn introspect(&self) -> Result<DatabaseSchema> {
        let mut schema = DatabaseSchema::new(Dialect::SQLite);

        schema.tables = self.introspect_tables().await?;
        let primary_keys = self.introspect_columns(&mut schema.tables).await?;
        self.introspect_foreign_keys(&mut schema, &primary_keys)
            .await?;

        Ok(schema)
    }
}
