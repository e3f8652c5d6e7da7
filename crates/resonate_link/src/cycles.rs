//! Feedback detection over a graph's processor instances.
//!
//! Delay-free connections between instances must form a DAG. A connection
//! with a positive delay buffers at least one frame, so it is left out of the
//! graph and may close a loop.

use crate::errors;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use resonate_diagnostics::Diagnostic;
use resonate_ir::{ConnectionId, InstanceId, ModuleId, Program};
use std::collections::HashMap;
use tracing::trace;

/// The instance graph of one graph module.
pub struct InstanceGraph {
    graph: DiGraph<InstanceId, ConnectionId>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

impl InstanceGraph {
    /// Builds the graph of delay-free connections between instances.
    pub fn build(program: &Program, graph: ModuleId) -> Self {
        let module = &program.modules[graph];
        let mut g = DiGraph::new();
        let nodes: HashMap<InstanceId, NodeIndex> =
            module.instances.ids().map(|id| (id, g.add_node(id))).collect();

        for (id, connection) in module.connections.iter() {
            if connection.is_delayed() {
                continue;
            }
            let (Some(from), Some(to)) = (connection.source.processor, connection.dest.processor)
            else {
                continue;
            };
            if let (Some(&a), Some(&b)) = (nodes.get(&from), nodes.get(&to)) {
                g.add_edge(a, b, id);
            }
        }
        Self { graph: g }
    }

    /// Finds the first feedback loop, in instance declaration order.
    ///
    /// Returns the instances along the loop with the first one repeated at
    /// the end, plus the connection that closes it.
    pub fn find_cycle(&self) -> Option<(Vec<InstanceId>, ConnectionId)> {
        let mut marks = vec![Mark::Unvisited; self.graph.node_count()];
        let mut stack = Vec::new();
        for node in self.graph.node_indices() {
            if marks[node.index()] == Mark::Unvisited {
                if let Some(found) = self.visit(node, &mut marks, &mut stack) {
                    return Some(found);
                }
            }
        }
        None
    }

    fn visit(
        &self,
        node: NodeIndex,
        marks: &mut [Mark],
        stack: &mut Vec<NodeIndex>,
    ) -> Option<(Vec<InstanceId>, ConnectionId)> {
        marks[node.index()] = Mark::OnStack;
        stack.push(node);

        let mut edges: Vec<(ConnectionId, NodeIndex)> = self
            .graph
            .edges(node)
            .map(|e| (*e.weight(), e.target()))
            .collect();
        edges.sort();

        for (connection, target) in edges {
            match marks[target.index()] {
                Mark::OnStack => {
                    let start = stack.iter().position(|n| *n == target).unwrap_or(0);
                    let mut cycle: Vec<InstanceId> =
                        stack[start..].iter().map(|n| self.graph[*n]).collect();
                    cycle.push(self.graph[target]);
                    return Some((cycle, connection));
                }
                Mark::Unvisited => {
                    if let Some(found) = self.visit(target, marks, stack) {
                        return Some(found);
                    }
                }
                Mark::Done => {}
            }
        }

        stack.pop();
        marks[node.index()] = Mark::Done;
        None
    }
}

/// Checks one graph for feedback loops between its instances.
///
/// Nested graphs are checked when they are visited as modules themselves.
pub fn check_graph_cycles(program: &Program, graph: ModuleId) -> Result<(), Diagnostic> {
    let module = &program.modules[graph];
    trace!(graph = %module.full_name, "checking for feedback");
    match InstanceGraph::build(program, graph).find_cycle() {
        None => Ok(()),
        Some((cycle, closing)) => {
            let names: Vec<String> = cycle
                .iter()
                .map(|id| module.instances[*id].name.clone())
                .collect();
            Err(errors::feedback_in_graph(&names, module.connections[closing].span))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resonate_heart::parse;

    fn graph(connections: &str) -> Result<(), Diagnostic> {
        let text = format!(
            "#HEART 1
processor P
{{
    input in stream float32;
    output out stream float32;
}}
graph G
{{
    output out stream float32;
    node a = P;
    node b = P;
    node c = P;
{connections}}}
"
        );
        let program = parse(&text).unwrap();
        check_graph_cycles(&program, program.find_module("G").unwrap())
    }

    #[test]
    fn chain_is_fine() {
        graph("    connection a.out -> b.in;\n    connection b.out -> c.in;\n    connection c.out -> out;\n")
            .unwrap();
    }

    #[test]
    fn three_node_loop() {
        let err = graph(
            "    connection a.out -> b.in;\n    connection b.out -> c.in;\n    connection c.out -> a.in;\n",
        )
        .unwrap_err();
        assert_eq!(err.code, errors::G201);
        assert_eq!(err.message, "Feedback cycle in graph: a -> b -> c -> a");
    }

    #[test]
    fn delay_breaks_the_loop() {
        graph(
            "    connection a.out -> b.in;\n    connection b.out -> c.in;\n    connection c.out -> [1] -> a.in;\n",
        )
        .unwrap();
    }

    #[test]
    fn zero_delay_does_not_break_the_loop() {
        assert!(graph(
            "    connection a.out -> b.in;\n    connection b.out -> [0] -> a.in;\n",
        )
        .is_err());
    }

    #[test]
    fn self_loop() {
        let err = graph("    connection b.out -> b.in;\n").unwrap_err();
        assert_eq!(err.message, "Feedback cycle in graph: b -> b");
    }

    #[test]
    fn loop_reached_from_a_later_start() {
        let err = graph("    connection c.out -> b.in;\n    connection b.out -> c.in;\n").unwrap_err();
        assert_eq!(err.message, "Feedback cycle in graph: b -> c -> b");
    }
}
