//! # Populate Pipeline
//!
//! Runs one populate pass end to end:
//!
//! 1. introspect the connected database
//! 2. order tables so parents precede children
//! 3. map every table's rows, propagating referenced values
//! 4. insert table by table in that order
//!
//! Introspection failures, reference cycles (unless allowed), and a deadline
//! that passes before insertion starts fail the whole run. After that,
//! failures are scoped to a table or a row and end up in the `RunSummary`.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{PopulatrConfig, DEFAULT_ROWS};
use crate::connect::DatabasePool;
use crate::deadline::Deadline;
use crate::error::{PopulatrError, Result};
use crate::generate::mapper::map_tables;
use crate::generate::synthesize::ValueSynthesizer;
use crate::graph::cycle::find_cycles;
use crate::graph::dag::DependencyGraph;
use crate::insert::insert_row_set;
use crate::insert::retry::RetryPolicy;
use crate::schema::types::DatabaseSchema;

/// Immutable settings for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub row_count: usize,
    /// Seed for the value generator; random when unset.
    pub seed: Option<u64>,
    /// PostgreSQL schema to restrict introspection to.
    pub schema: Option<String>,
    pub retry: RetryPolicy,
    pub timeout: Option<Duration>,
    pub allow_cycles: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            row_count: DEFAULT_ROWS,
            seed: None,
            schema: None,
            retry: RetryPolicy::default(),
            timeout: None,
            allow_cycles: false,
        }
    }
}

impl RunOptions {
    pub fn from_config(config: &PopulatrConfig) -> Self {
        Self {
            row_count: config.rows(),
            seed: config.generate.seed,
            schema: config.database.schema.clone(),
            retry: config.retry_policy(),
            timeout: config.timeout(),
            allow_cycles: config.graph.allow_cycles,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TableStatus {
    /// Every row was attempted; some may have failed.
    Completed,
    /// No rows generated (e.g. an unsupported NOT NULL column).
    MappingAborted,
    /// The INSERT could not be built or prepared.
    StatementFailed,
    /// The deadline passed partway through the table.
    Interrupted,
    /// Not attempted because the run was aborted earlier.
    Skipped,
}

impl std::fmt::Display for TableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TableStatus::Completed => "completed",
            TableStatus::MappingAborted => "mapping aborted",
            TableStatus::StatementFailed => "statement failed",
            TableStatus::Interrupted => "interrupted",
            TableStatus::Skipped => "skipped",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub table: String,
    pub attempted: usize,
    pub inserted: usize,
    /// Reference cells that were inserted as NULL.
    pub unresolved: usize,
    pub failed_rows: usize,
    pub status: TableStatus,
    pub error: Option<String>,
}

impl TableSummary {
    fn new(table: &str, status: TableStatus) -> Self {
        Self {
            table: table.to_string(),
            attempted: 0,
            inserted: 0,
            unresolved: 0,
            failed_rows: 0,
            status,
            error: None,
        }
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub seed: u64,
    pub tables: Vec<TableSummary>,
    /// Run-fatal error that stopped insertion early.
    pub aborted: Option<PopulatrError>,
}

impl RunSummary {
    pub fn total_inserted(&self) -> usize {
        self.tables.iter().map(|t| t.inserted).sum()
    }

    pub fn total_attempted(&self) -> usize {
        self.tables.iter().map(|t| t.attempted).sum()
    }

    pub fn table(&self, name: &str) -> Option<&TableSummary> {
        self.tables.iter().find(|t| t.table == name)
    }
}

/// Order tables for insertion, honouring the cycle policy.
pub fn insertion_order(schema: &DatabaseSchema, allow_cycles: bool) -> Result<Vec<String>> {
    let graph = DependencyGraph::from_schema(schema);
    if !allow_cycles {
        return graph.topological_order();
    }
    for cycle in find_cycles(&graph) {
        warn!(
            "Reference cycle between {}; some rows will reference missing parents",
            cycle.join(", ")
        );
    }
    Ok(graph.topological_order_lenient())
}

/// Populate every table of the connected database.
///
/// `on_table` is called with each table name just before it is inserted.
pub async fn run(
    pool: &DatabasePool,
    options: &RunOptions,
    on_table: Option<&(dyn Fn(&str) + Send + Sync)>,
) -> Result<RunSummary> {
    let deadline = Deadline::from_option(options.timeout);

    deadline.check("introspection")?;
    let schema = deadline
        .run("introspection", pool.introspect(options.schema.as_deref()))
        .await??;
    info!(
        "Introspected {} tables ({} references, {} composite foreign keys skipped)",
        schema.table_count(),
        schema.reference_count(),
        schema.skipped_foreign_keys
    );

    let order = insertion_order(&schema, options.allow_cycles)?;
    info!("Insertion order: {}", order.join(" -> "));

    let seed = options.seed.unwrap_or_else(rand::random);
    info!("Using seed {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);
    let synthesizer = ValueSynthesizer::new(schema.dialect);

    deadline.check("row generation")?;
    let mapped = map_tables(&order, &schema, options.row_count, &synthesizer, &mut rng);

    let mut summary = RunSummary {
        seed,
        tables: Vec::with_capacity(mapped.len()),
        aborted: None,
    };

    for (table, mapping) in mapped {
        if summary.aborted.is_some() {
            summary.tables.push(TableSummary::new(&table, TableStatus::Skipped));
            continue;
        }

        let row_set = match mapping {
            Ok(row_set) => row_set,
            Err(e) => {
                let mut entry = TableSummary::new(&table, TableStatus::MappingAborted);
                entry.error = Some(e.to_string());
                summary.tables.push(entry);
                continue;
            }
        };

        if let Some(cb) = on_table {
            cb(&table);
        }

        let mut entry = TableSummary::new(&table, TableStatus::Completed);
        entry.unresolved = row_set.unresolved.len();

        match insert_row_set(pool, &row_set, &options.retry, &deadline).await {
            Ok(report) => {
                entry.attempted = report.attempted;
                entry.inserted = report.inserted;
                entry.failed_rows = report.failures.len();
                if let Some(err) = report.interrupted {
                    entry.status = TableStatus::Interrupted;
                    entry.error = Some(err.to_string());
                    summary.aborted = Some(err);
                }
            }
            Err(e) if e.is_run_fatal() => {
                entry.status = TableStatus::Skipped;
                entry.error = Some(e.to_string());
                summary.aborted = Some(e);
            }
            Err(e) => {
                warn!("Skipping {}: {}", table, e);
                entry.status = TableStatus::StatementFailed;
                entry.error = Some(e.to_string());
            }
        }
        summary.tables.push(entry);
    }

    info!(
        "Inserted {}/{} rows across {} tables",
        summary.total_inserted(),
        summary.total_attempted(),
        summary.tables.len()
    );
    Ok(summary)
}
