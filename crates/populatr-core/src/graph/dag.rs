use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use tracing::warn;

use crate::schema::types::{ColumnMetadata, DatabaseSchema, Reference, TableMetadata};

/// A directed graph representing table dependencies via foreign keys.
/// Edges point from referenced table to dependent table (parent → child),
/// so every edge source must be inserted before its target.
pub struct DependencyGraph {
    pub graph: DiGraph<TableMetadata, EdgeInfo>,
    pub node_indices: HashMap<String, NodeIndex>,
}

/// Information about an edge (one or more FK columns between two tables).
#[derive(Debug, Clone, Default)]
pub struct EdgeInfo {
    /// `(child column, parent column)` pairs that produced this edge
    pub columns: Vec<(String, String)>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
        }
    }

    /// Build a dependency graph from a database schema.
    /// Each table becomes a node; each cross-table reference becomes an edge
    /// from the referenced table to the referencing one.
    pub fn from_schema(schema: &DatabaseSchema) -> Self {
        let mut graph = Self::new();

        for table in schema.tables.values() {
            graph.add_node(&table.name, table.columns.values().cloned().collect());
        }

        for table in schema.tables.values() {
            for (column, reference) in table.references() {
                // Self-references never create an edge.
                if reference.table == table.name {
                    continue;
                }
                graph.link(&reference.table, &table.name, Some((&column.name, &reference.column)));
            }
        }

        graph
    }

    /// Add a table node. Calling this again for the same table is a no-op.
    pub fn add_node(&mut self, table_name: &str, columns: Vec<ColumnMetadata>) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(table_name) {
            return idx;
        }
        let mut table = TableMetadata::new(table_name.to_string());
        for column in columns {
            table.push_column(column);
        }
        let idx = self.graph.add_node(table);
        self.node_indices.insert(table_name.to_string(), idx);
        idx
    }

    /// Record that `child` depends on `parent`. Duplicate edges collapse.
    pub fn add_edge(&mut self, parent: &str, child: &str) {
        self.link(parent, child, None);
    }

    fn link(&mut self, parent: &str, child: &str, columns: Option<(&str, &str)>) {
        if parent == child {
            warn!(table = %parent, "Ignoring self edge in dependency graph");
            return;
        }
        let (Some(&from), Some(&to)) = (self.node_indices.get(parent), self.node_indices.get(child))
        else {
            warn!(parent = %parent, child = %child, "Ignoring edge to a table not in the graph");
            return;
        };

        let edge = match self.graph.find_edge(from, to) {
            Some(edge) => edge,
            None => self.graph.add_edge(from, to, EdgeInfo::default()),
        };
        if let Some((column, ref_column)) = columns {
            let pair = (column.to_string(), ref_column.to_string());
            let info = &mut self.graph[edge];
            if !info.columns.contains(&pair) {
                info.columns.push(pair);
            }
        }
    }

    /// Attach a reference to an existing column.
    pub fn add_reference(&mut self, table_name: &str, column: &str, reference: Reference) {
        let Some(&idx) = self.node_indices.get(table_name) else {
            warn!(table = %table_name, column = %column, "Cannot attach reference: unknown table");
            return;
        };
        if !self.graph[idx].set_reference(column, reference) {
            warn!(table = %table_name, column = %column, "Cannot attach reference: unknown column");
        }
    }

    /// Get the table name for a node index.
    pub fn table_name(&self, idx: NodeIndex) -> &str {
        &self.graph[idx].name
    }

    pub fn table(&self, table_name: &str) -> Option<&TableMetadata> {
        self.node_index(table_name).map(|idx| &self.graph[idx])
    }

    /// Get node index for a table name.
    pub fn node_index(&self, table_name: &str) -> Option<NodeIndex> {
        self.node_indices.get(table_name).copied()
    }

    /// Get the number of tables.
    pub fn table_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the number of dependency edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    fn int(name: &str) -> ColumnMetadata {
        ColumnMetadata::from_raw(name, "integer").not_null()
    }

    fn make_test_schema() -> DatabaseSchema {
        let mut schema = DatabaseSchema::new(Dialect::PostgreSQL);

        let mut users = TableMetadata::new("users".to_string());
        users.push_column(int("id"));
        schema.tables.insert("users".to_string(), users);

        let mut orders = TableMetadata::new("orders".to_string());
        orders.push_column(int("id"));
        orders.push_column(int("user_id").references("users", "id"));
        orders.push_column(int("approver_id").references("users", "id"));
        schema.tables.insert("orders".to_string(), orders);

        let mut items = TableMetadata::new("order_items".to_string());
        items.push_column(int("id"));
        items.push_column(int("order_id").references("orders", "id"));
        schema.tables.insert("order_items".to_string(), items);

        schema
    }

    #[test]
    fn test_build_graph() {
        let schema = make_test_schema();
        let graph = DependencyGraph::from_schema(&schema);

        assert_eq!(graph.table_count(), 3);
        // Two FKs from orders to users collapse into one edge.
        assert_eq!(graph.edge_count(), 2);
        let users = graph.node_index("users").unwrap();
        let orders = graph.node_index("orders").unwrap();
        let edge = graph.graph.find_edge(users, orders).unwrap();
        assert_eq!(graph.graph[edge].columns.len(), 2);
    }

    #[test]
    fn test_add_node_is_idempotent() {
        let mut graph = DependencyGraph::new();
        let first = graph.add_node("users", vec![int("id")]);
        let second = graph.add_node("users", vec![int("id"), int("age")]);

        assert_eq!(first, second);
        assert_eq!(graph.table_count(), 1);
        assert_eq!(graph.table("users").unwrap().columns.len(), 1);
    }

    #[test]
    fn test_add_edge_ignores_self_and_unknown() {
        let mut graph = DependencyGraph::new();
        graph.add_node("a", vec![]);
        graph.add_node("b", vec![]);

        graph.add_edge("a", "a");
        graph.add_edge("a", "missing");
        assert_eq!(graph.edge_count(), 0);

        graph.add_edge("a", "b");
        graph.add_edge("a", "b");
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_self_reference_creates_no_edge() {
        let mut schema = DatabaseSchema::new(Dialect::PostgreSQL);
        let mut categories = TableMetadata::new("categories".to_string());
        categories.push_column(int("id"));
        categories.push_column(ColumnMetadata::from_raw("parent_id", "integer").references("categories", "id"));
        schema.tables.insert("categories".to_string(), categories);

        let graph = DependencyGraph::from_schema(&schema);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_add_reference() {
        let mut graph = DependencyGraph::new();
        graph.add_node("books", vec![int("id"), int("author_id")]);

        graph.add_reference("books", "author_id", Reference::new("authors", "id"));
        graph.add_reference("books", "missing", Reference::new("authors", "id"));
        graph.add_reference("ghost", "id", Reference::new("authors", "id"));

        let books = graph.table("books").unwrap();
        assert_eq!(
            books.columns["author_id"].reference,
            Some(Reference::new("authors", "id"))
        );
        assert_eq!(books.references().count(), 1);
    }
}
