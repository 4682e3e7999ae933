use indexmap::IndexMap;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tracing::debug;

use crate::dialect::Dialect;
use crate::error::{PopulatrError, Result};
use crate::schema::introspect::{attach_foreign_keys, ForeignKeyColumn, SchemaIntrospector};
use crate::schema::types::*;

pub struct PostgresIntrospector {
    pool: PgPool,
    schema_name: Option<String>,
}

fn introspection_error(query: &str) -> impl FnOnce(sqlx::Error) -> PopulatrError + '_ {
    move |source| PopulatrError::Introspection {
        query: query.to_string(),
        source,
    }
}

fn get<'r, T>(row: &'r PgRow, column: &str, query: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column).map_err(introspection_error(query))
}

impl PostgresIntrospector {
    /// Introspect the connection's `current_schema()`.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema_name: None,
        }
    }

    /// Introspect a named schema.
    pub fn with_schema(pool: PgPool, schema_name: String) -> Self {
        Self {
            pool,
            schema_name: Some(schema_name),
        }
    }

    /// The schema to read, falling back to the first existing entry on
    /// the search path.
    async fn resolve_schema(&self) -> Result<String> {
        let query = r#"
            SELECT schema_name FROM (
                SELECT COALESCE($1::text, current_schema()::text) AS schema_name
            ) s
            WHERE schema_name IS NOT NULL
        "#;
        let row = sqlx::query(query)
            .bind(self.schema_name.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(introspection_error("resolve schema"))?;
        get(&row, "schema_name", "resolve schema")
    }

    async fn introspect_tables(&self, schema_name: &str) -> Result<IndexMap<String, TableMetadata>> {
        let query = r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_type = 'BASE TABLE'
                AND table_schema::text = $1
            ORDER BY table_name
        "#;
        let rows = sqlx::query(query)
            .bind(schema_name)
            .fetch_all(&self.pool)
            .await
            .map_err(introspection_error("fetch tables"))?;

        let mut tables = IndexMap::new();
        for row in rows {
            let name: String = get(&row, "table_name", "fetch tables")?;
            tables.insert(name.clone(), TableMetadata::new(name).in_schema(schema_name));
        }
        Ok(tables)
    }

    async fn introspect_columns(
        &self,
        schema_name: &str,
        tables: &mut IndexMap<String, TableMetadata>,
    ) -> Result<()> {
        let query = r#"
            SELECT
                c.table_name::text AS table_name,
                c.column_name::text AS column_name,
                c.data_type::text AS data_type,
                c.is_nullable::text AS is_nullable,
                c.character_maximum_length::int AS character_maximum_length,
                c.numeric_precision::int AS numeric_precision,
                c.numeric_scale::int AS numeric_scale,
                c.ordinal_position::int AS ordinal_position
            FROM information_schema.columns c
            WHERE c.table_schema::text = $1
            ORDER BY c.table_name, c.ordinal_position
        "#;

        let rows = sqlx::query(query)
            .bind(schema_name)
            .fetch_all(&self.pool)
            .await
            .map_err(introspection_error("fetch columns"))?;

        for row in rows {
            let q = "fetch columns";
            let table_name: String = get(&row, "table_name", q)?;
            let column_name: String = get(&row, "column_name", q)?;
            let data_type_str: String = get(&row, "data_type", q)?;
            let is_nullable: String = get(&row, "is_nullable", q)?;
            let max_length: Option<i32> = get(&row, "character_maximum_length", q)?;
            let numeric_precision: Option<i32> = get(&row, "numeric_precision", q)?;
            let numeric_scale: Option<i32> = get(&row, "numeric_scale", q)?;
            let ordinal_position: i32 = get(&row, "ordinal_position", q)?;

            let data_type = DataType::from_raw(&data_type_str);
            let mut column = ColumnMetadata::new(column_name, data_type, data_type_str);
            column.nullable = is_nullable == "YES";
            column.max_length = max_length.and_then(|v| u32::try_from(v).ok());
            column.numeric_precision = numeric_precision.and_then(|v| u32::try_from(v).ok());
            column.numeric_scale = numeric_scale.and_then(|v| u32::try_from(v).ok());
            column.ordinal_position = u32::try_from(ordinal_position).unwrap_or(0);

            // Views and other relations also appear in information_schema.columns.
            if let Some(table) = tables.get_mut(&table_name) {
                table.push_column(column);
            }
        }

        Ok(())
    }

    /// One row per constraint column, read from `pg_constraint` so that
    /// constraint names are scoped to their owning table.
    async fn introspect_foreign_keys(&self, schema_name: &str, schema: &mut DatabaseSchema) -> Result<()> {
        let query = r#"
            SELECT
                child.relname::text AS table_name,
                con.conname::text AS constraint_name,
                child_att.attname::text AS column_name,
                parent_ns.nspname::text AS foreign_schema,
                parent.relname::text AS foreign_table,
                parent_att.attname::text AS foreign_column
            FROM pg_catalog.pg_constraint con
            JOIN pg_catalog.pg_class child ON child.oid = con.conrelid
            JOIN pg_catalog.pg_namespace child_ns ON child_ns.oid = child.relnamespace
            JOIN pg_catalog.pg_class parent ON parent.oid = con.confrelid
            JOIN pg_catalog.pg_namespace parent_ns ON parent_ns.oid = parent.relnamespace
            CROSS JOIN LATERAL unnest(con.conkey, con.confkey)
                WITH ORDINALITY AS k(child_attnum, parent_attnum, position)
            JOIN pg_catalog.pg_attribute child_att
                ON child_att.attrelid = con.conrelid AND child_att.attnum = k.child_attnum
            JOIN pg_catalog.pg_attribute parent_att
                ON parent_att.attrelid = con.confrelid AND parent_att.attnum = k.parent_attnum
            WHERE con.contype = 'f'
                AND child_ns.nspname::text = $1
            ORDER BY child.relname, con.conname, k.position
        "#;

        let rows = sqlx::query(query)
            .bind(schema_name)
            .fetch_all(&self.pool)
            .await
            .map_err(introspection_error("fetch foreign keys"))?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let q = "fetch foreign keys";
            let foreign_table: String = get(&row, "foreign_table", q)?;
            let foreign_column: String = get(&row, "foreign_column", q)?;
            columns.push(ForeignKeyColumn {
                table: get(&row, "table_name", q)?,
                constraint: get(&row, "constraint_name", q)?,
                column: get(&row, "column_name", q)?,
                foreign_schema: Some(get(&row, "foreign_schema", q)?),
                reference: Reference::new(foreign_table, foreign_column),
            });
        }

        attach_foreign_keys(schema, Some(schema_name), columns);
        Ok(())
    }
}

impl SchemaIntrospector for PostgresIntrospector {
    async fn introspect(&self) -> Result<DatabaseSchema> {
        let schema_name = self.resolve_schema().await?;
        debug!(schema = %schema_name, "Introspecting PostgreSQL schema");

        let mut schema = DatabaseSchema::new(Dialect::PostgreSQL);
        schema.tables = self.introspect_tables(&schema_name).await?;
        self.introspect_columns(&schema_name, &mut schema.tables).await?;
        self.introspect_foreign_keys(&schema_name, &mut schema).await?;

        Ok(schema)
    }
}
