use crate::dialect::Dialect;
use crate::error::{PopulatrError, Result};
use crate::generate::mapper::InsertableRowSet;

/// Build the single-row parameterized INSERT for a row set.
///
/// Fails if the row set has no columns or any row's key set differs from
/// `parameters`.
pub fn build_insert_statement(dialect: Dialect, row_set: &InsertableRowSet) -> Result<String> {
    if row_set.parameters.is_empty() {
        return Err(PopulatrError::StatementBuild {
            table: row_set.table_name.clone(),
            message: "table has no columns to insert".to_string(),
            source: None,
        });
    }

    for (row_index, row) in row_set.rows.iter().enumerate() {
        let conforms = row.len() == row_set.parameters.len()
            && row_set.parameters.iter().all(|p| row.contains_key(p));
        if !conforms {
            return Err(PopulatrError::StatementBuild {
                table: row_set.table_name.clone(),
                message: format!(
                    "row {} has columns [{}], expected [{}]",
                    row_index,
                    row.keys().cloned().collect::<Vec<_>>().join(", "),
                    row_set.parameters.join(", ")
                ),
                source: None,
            });
        }
    }

    let columns: Vec<String> = row_set
        .parameters
        .iter()
        .map(|c| dialect.quote_identifier(c))
        .collect();

    Ok(format!(
        "INSERT INTO {} ({}) VALUES {}",
        dialect.qualified_name(row_set.schema.as_deref(), &row_set.table_name),
        columns.join(", "),
        row_set.placeholder_template
    ))
}

/// Truncate a SQL string for error messages.
pub fn truncate_sql(sql: &str, max_len: usize) -> String {
    if sql.len() <= max_len {
        sql.to_string()
    } else {
        let mut end = max_len;
        while !sql.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &sql[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::value::Value;
    use indexmap::IndexMap;

    fn row_set(dialect: Dialect, rows: Vec<Vec<(&str, Value)>>) -> InsertableRowSet {
        let parameters = vec!["name".to_string(), "age".to_string()];
        InsertableRowSet {
            table_name: "users".to_string(),
            schema: None,
            placeholder_template: dialect.placeholder_group(parameters.len()),
            parameters,
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(|(k, v)| (k.to_string(), v)).collect::<IndexMap<_, _>>())
                .collect(),
            unresolved: Vec::new(),
        }
    }

    #[test]
    fn test_build_insert_postgres() {
        let set = row_set(
            Dialect::PostgreSQL,
            vec![vec![("name", Value::String("Alice".into())), ("age", Value::Int(30))]],
        );
        let sql = build_insert_statement(Dialect::PostgreSQL, &set).unwrap();
        assert_eq!(sql, "INSERT INTO \"users\" (\"name\", \"age\") VALUES ($1, $2)");
    }

    #[test]
    fn test_build_insert_mysql_quoting() {
        let set = row_set(Dialect::MySQL, vec![]);
        let sql = build_insert_statement(Dialect::MySQL, &set).unwrap();
        assert_eq!(sql, "INSERT INTO `users` (`name`, `age`) VALUES (?, ?)");
    }

    #[test]
    fn test_build_insert_schema_qualified() {
        let mut set = row_set(Dialect::PostgreSQL, vec![]);
        set.schema = Some("sales".to_string());
        let sql = build_insert_statement(Dialect::PostgreSQL, &set).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"sales\".\"users\" (\"name\", \"age\") VALUES ($1, $2)"
        );
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let set = row_set(
            Dialect::SQLite,
            vec![
                vec![("name", Value::String("Alice".into())), ("age", Value::Int(30))],
                vec![("name", Value::String("Bob".into()))],
            ],
        );
        let err = build_insert_statement(Dialect::SQLite, &set).unwrap_err();
        match err {
            PopulatrError::StatementBuild { table, message, .. } => {
                assert_eq!(table, "users");
                assert!(message.starts_with("row 1"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_no_columns_rejected() {
        let set = InsertableRowSet {
            table_name: "empty".to_string(),
            schema: None,
            parameters: Vec::new(),
            rows: Vec::new(),
            placeholder_template: "()".to_string(),
            unresolved: Vec::new(),
        };
        assert!(build_insert_statement(Dialect::PostgreSQL, &set).is_err());
    }

    #[test]
    fn test_truncate_sql() {
        assert_eq!(truncate_sql("SELECT 1", 200), "SELECT 1");
        let long = "A".repeat(300);
        let truncated = truncate_sql(&long, 200);
        assert_eq!(truncated.len(), 203);
        assert!(truncated.ends_with("..."));
    }
}
