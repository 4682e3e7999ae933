use anyhow::Result;
use tracing::warn;

use populatr_core::graph::cycle::find_cycles;
use populatr_core::graph::dag::DependencyGraph;
use populatr_core::graph::visualize::{self, GraphFormat as VizFormat};

use crate::args::GraphArgs;

pub async fn run(args: &GraphArgs) -> Result<()> {
    let config = super::load_config()?;
    let pool = super::connect(args.db.as_deref(), config.as_ref()).await?;
    let schema = pool
        .introspect(super::schema_name(args.schema.as_deref(), config.as_ref()))
        .await;
    pool.close().await;
    let schema = schema?;

    let dep_graph = DependencyGraph::from_schema(&schema);
    for cycle in find_cycles(&dep_graph) {
        warn!("Reference cycle: {}", cycle.join(" -> "));
    }

    let format = match args.format {
        crate::args::GraphFormat::Mermaid => VizFormat::Mermaid,
        crate::args::GraphFormat::Dot => VizFormat::Dot,
    };

    let output = visualize::visualize(&dep_graph, format);
    println!("{}", output);

    Ok(())
}
