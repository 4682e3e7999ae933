use crate::graph::dag::{DependencyGraph, EdgeInfo};
use petgraph::visit::EdgeRef;

/// Output format for graph visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Mermaid,
    Dot,
}

/// Render the dependency graph. Edges run parent → child and are labelled
/// with the referencing column(s).
pub fn visualize(graph: &DependencyGraph, format: GraphFormat) -> String {
    match format {
        GraphFormat::Mermaid => generate_mermaid(graph),
        GraphFormat::Dot => generate_dot(graph),
    }
}

fn edge_label(info: &EdgeInfo) -> String {
    info.columns
        .iter()
        .map(|(column, ref_column)| format!("{} = {}", column, ref_column))
        .collect::<Vec<_>>()
        .join(", ")
}

fn generate_mermaid(graph: &DependencyGraph) -> String {
    let mut output = String::from("graph TD\n");

    for node in graph.graph.node_indices() {
        let name = graph.table_name(node);
        output.push_str(&format!("    {}[{}]\n", name, name));
    }

    output.push('\n');

    for edge in graph.graph.edge_references() {
        let from = graph.table_name(edge.source());
        let to = graph.table_name(edge.target());
        let label = edge_label(edge.weight());
        if label.is_empty() {
            output.push_str(&format!("    {} --> {}\n", from, to));
        } else {
            output.push_str(&format!("    {} -->|{}| {}\n", from, label, to));
        }
    }

    output
}

fn generate_dot(graph: &DependencyGraph) -> String {
    let mut output = String::from("digraph dependencies {\n");
    output.push_str("    rankdir=TB;\n");
    output.push_str("    node [shape=box, style=rounded];\n\n");

    // Isolated tables would otherwise be missing from the output.
    for node in graph.graph.node_indices() {
        output.push_str(&format!("    \"{}\";\n", graph.table_name(node)));
    }

    for edge in graph.graph.edge_references() {
        let from = graph.table_name(edge.source());
        let to = graph.table_name(edge.target());
        output.push_str(&format!(
            "    \"{}\" -> \"{}\" [label=\"{}\"];\n",
            from,
            to,
            edge_label(edge.weight())
        ));
    }

    output.push_str("}\n");
    output
}
