use indexmap::IndexMap;
use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::Row;

use crate::dialect::Dialect;
use crate::error::{PopulatrError, Result};
use crate::schema::introspect::{attach_foreign_keys, integer_bits, ForeignKeyColumn, SchemaIntrospector};
use crate::schema::types::*;

/// Introspects the database selected by the connection URL (`DATABASE()`).
pub struct MySqlIntrospector {
    pool: MySqlPool,
}

fn get<'r, T>(row: &'r MySqlRow, column: &str, query: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::MySql> + sqlx::Type<sqlx::MySql>,
{
    row.try_get(column)
        .map_err(|source| PopulatrError::Introspection {
            query: query.to_string(),
            source,
        })
}

impl MySqlIntrospector {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, query: &str, label: &str) -> Result<Vec<MySqlRow>> {
        sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| PopulatrError::Introspection {
                query: label.to_string(),
                source,
            })
    }

    async fn introspect_tables(&self) -> Result<IndexMap<String, TableMetadata>> {
        let query = r#"
            SELECT CAST(table_name AS CHAR) AS table_name
            FROM information_schema.tables
            WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;
        let rows = self.fetch(query, "fetch tables").await?;

        let mut tables = IndexMap::new();
        for row in rows {
            let name: String = get(&row, "table_name", "fetch tables")?;
            tables.insert(name.clone(), TableMetadata::new(name));
        }
        Ok(tables)
    }

    async fn introspect_columns(&self, tables: &mut IndexMap<String, TableMetadata>) -> Result<()> {
        let query = r#"
            SELECT
                CAST(table_name AS CHAR) AS table_name,
                CAST(column_name AS CHAR) AS column_name,
                CAST(data_type AS CHAR) AS data_type,
                CAST(column_type AS CHAR) AS column_type,
                CAST(is_nullable AS CHAR) AS is_nullable,
                CAST(character_maximum_length AS SIGNED) AS character_maximum_length,
                CAST(numeric_precision AS SIGNED) AS numeric_precision,
                CAST(numeric_scale AS SIGNED) AS numeric_scale,
                CAST(ordinal_position AS SIGNED) AS ordinal_position
            FROM information_schema.columns
            WHERE table_schema = DATABASE()
            ORDER BY table_name, ordinal_position
        "#;
        let rows = self.fetch(query, "fetch columns").await?;

        for row in rows {
            let q = "fetch columns";
            let table_name: String = get(&row, "table_name", q)?;
            let column_name: String = get(&row, "column_name", q)?;
            let data_type_str: String = get(&row, "data_type", q)?;
            let column_type: String = get(&row, "column_type", q)?;
            let is_nullable: String = get(&row, "is_nullable", q)?;
            let max_length: Option<i64> = get(&row, "character_maximum_length", q)?;
            let numeric_precision: Option<i64> = get(&row, "numeric_precision", q)?;
            let numeric_scale: Option<i64> = get(&row, "numeric_scale", q)?;
            let ordinal_position: i64 = get(&row, "ordinal_position", q)?;

            let data_type = DataType::from_raw(&data_type_str);
            let mut column = ColumnMetadata::new(column_name, data_type, column_type.clone());
            column.nullable = is_nullable == "YES";
            column.max_length = max_length.and_then(|v| u32::try_from(v).ok());
            // MySQL reports decimal digits for integers; normalize to bits.
            column.numeric_precision = if column.data_type.is_integer() {
                integer_bits(&column_type)
            } else {
                numeric_precision.and_then(|v| u32::try_from(v).ok())
            };
            column.numeric_scale = numeric_scale.and_then(|v| u32::try_from(v).ok());
            column.ordinal_position = u32::try_from(ordinal_position).unwrap_or(0);

            if let Some(table) = tables.get_mut(&table_name) {
                table.push_column(column);
            }
        }

        Ok(())
    }

    async fn introspect_foreign_keys(&self, schema: &mut DatabaseSchema) -> Result<()> {
        let query = r#"
            SELECT
                CAST(table_name AS CHAR) AS table_name,
                CAST(constraint_name AS CHAR) AS constraint_name,
                CAST(column_name AS CHAR) AS column_name,
                CAST(referenced_table_name AS CHAR) AS foreign_table,
                CAST(referenced_column_name AS CHAR) AS foreign_column
            FROM information_schema.key_column_usage
            WHERE table_schema = DATABASE()
                AND referenced_table_name IS NOT NULL
                AND referenced_table_schema = DATABASE()
            ORDER BY table_name, constraint_name, ordinal_position
        "#;
        let rows = self.fetch(query, "fetch foreign keys").await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let q = "fetch foreign keys";
            let foreign_table: String = get(&row, "foreign_table", q)?;
            let foreign_column: String = get(&row, "foreign_column", q)?;
            columns.push(ForeignKeyColumn {
                table: get(&row, "table_name", q)?,
                constraint: get(&row, "constraint_name", q)?,
                column: get(&row, "column_name", q)?,
                foreign_schema: None,
                reference: Reference::new(foreign_table, foreign_column),
            });
        }

        attach_foreign_keys(schema, None, columns);
        Ok(())
    }
}

impl SchemaIntrospector for MySqlIntrospector {
    async fn introspect(&self) -> Result<DatabaseSchema> {
        let mut schema = DatabaseSchema::new(Dialect::MySQL);

        schema.tables = self.introspect_tables().await?;
        self.introspect_columns(&mut schema.tables).await?;
        self.introspect_foreign_keys(&mut schema).await?;

        Ok(schema)
    }
}
