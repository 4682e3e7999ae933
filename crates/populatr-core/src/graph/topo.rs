use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::error::{PopulatrError, Result};
use crate::graph::cycle::cycle_tables;
use crate::graph::dag::DependencyGraph;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// A back edge found during the DFS.
struct BackEdge;

impl DependencyGraph {
    /// Tables ordered so that every parent precedes each child referencing it.
    ///
    /// Fails with `CircularDependency` if two or more tables reference each
    /// other in a cycle.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        self.order(true)
            .map_err(|BackEdge| PopulatrError::CircularDependency {
                tables: cycle_tables(self).join(", "),
            })
    }

    /// Same traversal as [`topological_order`](Self::topological_order), but
    /// back edges are ignored. Always terminates; with cycles some edges
    /// will not be honoured.
    pub fn topological_order_lenient(&self) -> Vec<String> {
        self.order(false).unwrap_or_default()
    }

    /// DFS postorder, restarting from every unvisited node in insertion
    /// order, children taken in edge-insertion order, then reversed.
    fn order(&self, strict: bool) -> std::result::Result<Vec<String>, BackEdge> {
        let mut marks = vec![Mark::Unvisited; self.graph.node_count()];
        let mut postorder: Vec<NodeIndex> = Vec::with_capacity(self.graph.node_count());

        for start in self.graph.node_indices() {
            if marks[start.index()] != Mark::Unvisited {
                continue;
            }
            // Explicit stack of (node, remaining children) to avoid recursion depth limits.
            marks[start.index()] = Mark::InProgress;
            let mut stack = vec![(start, self.children(start).into_iter())];

            while let Some((node, children)) = stack.last_mut() {
                let node = *node;
                match children.next() {
                    Some(child) => match marks[child.index()] {
                        Mark::Unvisited => {
                            marks[child.index()] = Mark::InProgress;
                            stack.push((child, self.children(child).into_iter()));
                        }
                        Mark::InProgress if strict => return Err(BackEdge),
                        Mark::InProgress | Mark::Done => {}
                    },
                    None => {
                        marks[node.index()] = Mark::Done;
                        postorder.push(node);
                        stack.pop();
                    }
                }
            }
        }

        Ok(postorder
            .into_iter()
            .rev()
            .map(|idx| self.table_name(idx).to_string())
            .collect())
    }

    fn children(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| (e.id(), e.target()))
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, target)| target).collect()
    }
}
