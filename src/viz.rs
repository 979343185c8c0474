//! Inspection of a computation graph: node/edge tracing and Graphviz output.

use std::collections::HashSet;
use std::io::{self, Write};

use crate::graph::NodeId;
use crate::scalar::Scalar;

/// Nodes reachable from a root and the `(operand, result)` edges between them.
#[derive(Debug, Clone)]
pub struct Trace<'g> {
    pub nodes: Vec<Scalar<'g>>,
    pub edges: Vec<(Scalar<'g>, Scalar<'g>)>,
}

/// Collects every node reachable from `root`, root first, each exactly once.
///
/// An operand used twice by the same node (as in `x * x`) gives one edge.
pub fn trace(root: Scalar<'_>) -> Trace<'_> {
    let mut seen = HashSet::new();
    let mut seen_edges: HashSet<(NodeId, NodeId)> = HashSet::new();
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if !seen.insert(node.id()) {
            continue;
        }
        nodes.push(node);
        for operand in node.operands() {
            if seen_edges.insert((operand.id(), node.id())) {
                edges.push((operand, node));
            }
            stack.push(operand);
        }
    }
    Trace { nodes, edges }
}

/// Writes the graph under `root` as a left-to-right Graphviz digraph.
///
/// Every node is a record showing its value and gradient; a non-leaf node
/// gets an extra node carrying its operation label, which its operands
/// point into.
pub fn write_dot<W: Write>(root: Scalar<'_>, out: &mut W) -> io::Result<()> {
    let Trace { nodes, edges } = trace(root);
    writeln!(out, "digraph {{")?;
    writeln!(out, "  rankdir=LR;")?;
    for node in &nodes {
        let name = node_name(node);
        writeln!(
            out,
            "  \"{name}\" [label=\"{{ data {:.4} | grad {:.4} }}\", shape=record];",
            node.value(),
            node.gradient()
        )?;
        if !node.is_leaf() {
            writeln!(out, "  \"{name}_op\" [label=\"{}\"];", node.label())?;
            writeln!(out, "  \"{name}_op\" -> \"{name}\";")?;
        }
    }
    for (operand, result) in &edges {
        writeln!(
            out,
            "  \"{}\" -> \"{}_op\";",
            node_name(operand),
            node_name(result)
        )?;
    }
    writeln!(out, "}}")
}

fn node_name(node: &Scalar<'_>) -> String {
    format!("n{}", node.id().index())
}
