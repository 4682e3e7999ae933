use std::time::Duration;

use anyhow::{ensure, Result};
use comfy_table::{Cell, Table as ComfyTable};
use indicatif::{ProgressBar, ProgressStyle};

use populatr_core::insert::retry::RetryPolicy;
use populatr_core::pipeline::{self, RunOptions, RunSummary};

use crate::args::PopulateArgs;

pub async fn run(args: &PopulateArgs) -> Result<()> {
    let config = super::load_config()?;
    let options = run_options(args, config.as_ref())?;

    let pool = super::connect(args.db.as_deref(), config.as_ref()).await?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    pb.set_message("Introspecting schema...");
    pb.enable_steady_tick(Duration::from_millis(100));

    let on_table = |table: &str| pb.set_message(format!("Inserting into {}...", table));
    let result = pipeline::run(&pool, &options, Some(&on_table)).await;
    pool.close().await;

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e.into());
        }
    };
    pb.finish_with_message(format!(
        "Inserted {}/{} rows into {} tables",
        summary.total_inserted(),
        summary.total_attempted(),
        summary.tables.len()
    ));

    print_summary(&summary);

    if let Some(err) = summary.aborted {
        return Err(anyhow::Error::new(err).context("Run aborted"));
    }
    Ok(())
}

/// Config file as the base, CLI flags on top.
fn run_options(
    args: &PopulateArgs,
    config: Option<&populatr_core::config::PopulatrConfig>,
) -> Result<RunOptions> {
    let mut options = config.map(RunOptions::from_config).unwrap_or_default();

    if let Some(rows) = args.rows {
        ensure!(rows > 0, "--rows must be at least 1");
        options.row_count = rows;
    }
    if let Some(seed) = args.seed {
        options.seed = Some(seed);
    }
    if let Some(secs) = args.timeout_secs {
        options.timeout = Some(Duration::from_secs(secs));
    }
    if let Some(retries) = args.retries {
        ensure!(retries > 0, "--retries must be at least 1");
        options.retry = RetryPolicy::new(retries, options.retry.base_delay);
    }
    if let Some(schema) = super::schema_name(args.schema.as_deref(), config) {
        options.schema = Some(schema.to_string());
    }
    options.allow_cycles |= args.allow_cycles;

    Ok(options)
}

fn print_summary(summary: &RunSummary) {
    let mut t = ComfyTable::new();
    t.set_header(vec![
        "Table",
        "Status",
        "Attempted",
        "Inserted",
        "Failed",
        "Unresolved",
    ]);
    for table in &summary.tables {
        t.add_row(vec![
            Cell::new(&table.table),
            Cell::new(table.status.to_string()),
            Cell::new(table.attempted),
            Cell::new(table.inserted),
            Cell::new(table.failed_rows),
            Cell::new(table.unresolved),
        ]);
    }
    println!("{}", t);

    for table in &summary.tables {
        if let Some(error) = &table.error {
            eprintln!("  {}: {}", table.table, error);
        }
    }
    println!("Seed: {} (pass --seed {} to reproduce)", summary.seed, summary.seed);
}
