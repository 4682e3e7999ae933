use petgraph::algo::tarjan_scc;

use crate::graph::dag::DependencyGraph;

/// Names of the tables in every strongly connected component with more
/// than one table, i.e. every multi-table reference cycle.
pub fn cycle_tables(graph: &DependencyGraph) -> Vec<String> {
    let mut tables: Vec<String> = tarjan_scc(&graph.graph)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .flat_map(|scc| {
            scc.into_iter()
                .map(|idx| graph.table_name(idx).to_string())
                .collect::<Vec<_>>()
        })
        .collect();
    tables.sort();
    tables
}

/// Groups of tables that reference each other cyclically.
pub fn find_cycles(graph: &DependencyGraph) -> Vec<Vec<String>> {
    tarjan_scc(&graph.graph)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .map(|scc| {
            let mut names: Vec<String> = scc
                .into_iter()
                .map(|idx| graph.table_name(idx).to_string())
                .collect();
            names.sort();
            names
        })
        .collect()
}
