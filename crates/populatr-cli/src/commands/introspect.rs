use anyhow::Result;
use comfy_table::{Cell, Table as ComfyTable};

use populatr_core::graph::cycle::find_cycles;
use populatr_core::graph::dag::DependencyGraph;

use crate::args::{IntrospectArgs, IntrospectFormat};

pub async fn run(args: &IntrospectArgs) -> Result<()> {
    let config = super::load_config()?;
    let pool = super::connect(args.db.as_deref(), config.as_ref()).await?;
    let schema = pool
        .introspect(super::schema_name(args.schema.as_deref(), config.as_ref()))
        .await;
    pool.close().await;
    let schema = schema?;

    match args.format {
        IntrospectFormat::Json => {
            let json = serde_json::to_string_pretty(&schema)?;
            println!("{}", json);
        }
        IntrospectFormat::Table => {
            println!(
                "Database: {}  Tables: {}  Columns: {}  References: {}",
                schema.dialect,
                schema.table_count(),
                schema.column_count(),
                schema.reference_count()
            );
            if schema.skipped_foreign_keys > 0 {
                println!(
                    "Composite foreign keys ignored: {}",
                    schema.skipped_foreign_keys
                );
            }

            let graph = DependencyGraph::from_schema(&schema);
            for cycle in find_cycles(&graph) {
                println!("Cycle: {}", cycle.join(" -> "));
            }
            println!();

            let mut t = ComfyTable::new();
            t.set_header(vec!["#", "Table", "Columns", "References"]);
            for (position, table_name) in graph.topological_order_lenient().iter().enumerate() {
                let Some(table) = schema.tables.get(table_name) else {
                    continue;
                };
                let references: Vec<String> = table
                    .references()
                    .map(|(column, reference)| format!("{} → {}", column.name, reference))
                    .collect();
                t.add_row(vec![
                    Cell::new(position + 1),
                    Cell::new(table_name),
                    Cell::new(table.columns.len()),
                    Cell::new(references.join("\n")),
                ]);
            }
            println!("{}", t);
        }
    }

    Ok(())
}
