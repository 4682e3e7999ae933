use indexmap::IndexMap;
use rand::Rng;
use tracing::{debug, warn};

use crate::dialect::Dialect;
use crate::error::{PopulatrError, Result};
use crate::generate::synthesize::ValueSynthesizer;
use crate::generate::value::Value;
use crate::schema::types::{ColumnMetadata, DatabaseSchema, Reference, TableMetadata};

/// Generated rows for one table, ready to be bound to an INSERT.
///
/// Every row has exactly the keys in `parameters`, in the same order.
#[derive(Debug, Clone)]
pub struct InsertableRowSet {
    pub table_name: String,
    /// Schema the table lives in; qualifies the INSERT target.
    pub schema: Option<String>,
    pub parameters: Vec<String>,
    pub rows: Vec<IndexMap<String, Value>>,
    /// One row's placeholder group, e.g. `($1, $2)` or `(?, ?)`
    pub placeholder_template: String,
    /// Cells whose reference could not be resolved; they hold `Value::Null`.
    pub unresolved: Vec<ReferenceFault>,
}

impl InsertableRowSet {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Values of one row in `parameters` order.
    pub fn row_values(&self, index: usize) -> Option<Vec<&Value>> {
        let row = self.rows.get(index)?;
        self.parameters.iter().map(|p| row.get(p)).collect()
    }

    pub fn value(&self, index: usize, column: &str) -> Option<&Value> {
        self.rows.get(index).and_then(|row| row.get(column))
    }
}

/// A reference cell with no parent value for its row index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceFault {
    pub table: String,
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
    pub row_index: usize,
}

impl ReferenceFault {
    pub fn to_error(&self) -> PopulatrError {
        PopulatrError::ReferenceResolution {
            table: self.table.clone(),
            column: self.column.clone(),
            ref_table: self.ref_table.clone(),
            ref_column: self.ref_column.clone(),
            row_index: self.row_index,
        }
    }
}

/// Generate `row_count` rows for `table`.
///
/// Reference columns copy the parent's value at the same row index from
/// `completed`, so child row `i` always belongs to parent row `i`. A
/// nullable self-reference is always NULL. An unresolvable reference is
/// recorded in `unresolved` and materialized as NULL.
///
/// Fails only if a non-nullable column has no generator.
pub fn map_table(
    table: &TableMetadata,
    row_count: usize,
    completed: &IndexMap<String, InsertableRowSet>,
    synthesizer: &ValueSynthesizer,
    dialect: Dialect,
    rng: &mut impl Rng,
) -> Result<InsertableRowSet> {
    for column in table.columns.values() {
        if !synthesizer.supports(column) && column.reference.is_none() && column.nullable {
            warn!(
                "Unsupported type '{}' for {}.{}; inserting NULL",
                column.raw_type, table.name, column.name
            );
        }
    }

    let parameters: Vec<String> = table.columns.keys().cloned().collect();
    let mut rows = Vec::with_capacity(row_count);
    let mut unresolved = Vec::new();

    for row_index in 0..row_count {
        let mut row = IndexMap::with_capacity(parameters.len());
        for column in table.columns.values() {
            let value = match &column.reference {
                None => synthesizer.synthesize(&table.name, column, rng)?,
                Some(reference) => {
                    match resolve_reference(table, column, reference, row_index, completed) {
                        Ok(value) => value,
                        Err(fault) => {
                            unresolved.push(fault);
                            Value::Null
                        }
                    }
                }
            };
            row.insert(column.name.clone(), value);
        }
        rows.push(row);
    }

    report_faults(row_count, &unresolved);
    debug!("Mapped {} rows for {}", rows.len(), table.name);

    Ok(InsertableRowSet {
        table_name: table.name.clone(),
        schema: table.schema.clone(),
        placeholder_template: dialect.placeholder_group(parameters.len()),
        parameters,
        rows,
        unresolved,
    })
}

fn resolve_reference(
    table: &TableMetadata,
    column: &ColumnMetadata,
    reference: &Reference,
    row_index: usize,
    completed: &IndexMap<String, InsertableRowSet>,
) -> std::result::Result<Value, ReferenceFault> {
    if reference.table == table.name && column.nullable {
        return Ok(Value::Null);
    }
    completed
        .get(&reference.table)
        .and_then(|parent| parent.value(row_index, &reference.column))
        .cloned()
        .ok_or_else(|| ReferenceFault {
            table: table.name.clone(),
            column: column.name.clone(),
            ref_table: reference.table.clone(),
            ref_column: reference.column.clone(),
            row_index,
        })
}

/// One warning per column, with the number of affected rows.
fn report_faults(row_count: usize, faults: &[ReferenceFault]) {
    let mut per_column: IndexMap<&str, (usize, &ReferenceFault)> = IndexMap::new();
    for fault in faults {
        per_column.entry(fault.column.as_str()).or_insert((0, fault)).0 += 1;
    }
    for (count, first) in per_column.into_values() {
        warn!(
            "{}; inserting NULL in {} of {} rows",
            first.to_error(),
            count,
            row_count
        );
    }
}

/// Map every table in `order`, feeding each successful row set to the
/// tables after it. A failed table is reported and its dependants see
/// unresolved references.
pub fn map_tables(
    order: &[String],
    schema: &DatabaseSchema,
    row_count: usize,
    synthesizer: &ValueSynthesizer,
    rng: &mut impl Rng,
) -> IndexMap<String, Result<InsertableRowSet>> {
    let mut completed: IndexMap<String, InsertableRowSet> = IndexMap::new();
    let mut failed: IndexMap<String, PopulatrError> = IndexMap::new();

    for table_name in order {
        let Some(table) = schema.tables.get(table_name) else {
            failed.insert(
                table_name.clone(),
                PopulatrError::Other(format!("table '{}' is not in the schema", table_name)),
            );
            continue;
        };
        match map_table(table, row_count, &completed, synthesizer, schema.dialect, rng) {
            Ok(row_set) => {
                completed.insert(table_name.clone(), row_set);
            }
            Err(e) => {
                warn!("Skipping {}: {}", table_name, e);
                failed.insert(table_name.clone(), e);
            }
        }
    }

    order
        .iter()
        .filter_map(|name| {
            let result = match completed.swap_remove(name) {
                Some(row_set) => Ok(row_set),
                None => Err(failed.swap_remove(name)?),
            };
            Some((name.clone(), result))
        })
        .collect()
}
