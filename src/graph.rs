//! Node arena backing every [`Scalar`].
//!
//! Nodes live in a single growable vector owned by a [`Graph`] and refer to
//! their operands by [`NodeId`]. A node is always appended after its operands,
//! so every operand id is strictly smaller than the id of the node using it.
//! The reverse pass relies on that ordering only through debug assertions;
//! the actual order comes from a post-order walk of the reachable subgraph.

use std::cell::{Cell, RefCell};
use std::fmt;

use log::{debug, trace};

use crate::scalar::{IntoScalar, Scalar};

/// Stable index of a node inside its [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The operation that produced a node, together with its operands.
///
/// Subtraction, negation and division are not listed: they are built from
/// `Add`, `Mul` and `Pow` and carry those tags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Leaf,
    Add(NodeId, NodeId),
    Mul(NodeId, NodeId),
    /// Raise to a constant exponent. The exponent is not a graph node.
    Pow(NodeId, f64),
    Tanh(NodeId),
    Exp(NodeId),
}

impl Op {
    /// Direct inputs of the operation, left to right.
    pub fn operands(self) -> impl DoubleEndedIterator<Item = NodeId> {
        let (first, second) = match self {
            Op::Leaf => (None, None),
            Op::Add(a, b) | Op::Mul(a, b) => (Some(a), Some(b)),
            Op::Pow(a, _) | Op::Tanh(a) | Op::Exp(a) => (Some(a), None),
        };
        first.into_iter().chain(second)
    }

    pub fn is_leaf(self) -> bool {
        matches!(self, Op::Leaf)
    }
}

// Diagnostic label, empty for leaves
impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Leaf => Ok(()),
            Op::Add(..) => f.write_str("+"),
            Op::Mul(..) => f.write_str("*"),
            Op::Pow(_, exponent) => write!(f, "**{exponent}"),
            Op::Tanh(_) => f.write_str("tanh"),
            Op::Exp(_) => f.write_str("exp"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Node {
    pub(crate) value: f64,
    pub(crate) gradient: f64,
    pub(crate) op: Op,
    // Bumped by `Graph::rewind`; lets handles detect that their slot was reused.
    pub(crate) generation: u64,
}

/// Arena length captured by [`Graph::checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    len: usize,
}

/// Owner of all nodes of a computation graph.
///
/// Scalars borrow the graph they were created in, so the graph outlives every
/// handle into it. Interior mutability keeps the handles `Copy` and lets
/// arithmetic on them append nodes through a shared reference.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: RefCell<Vec<Node>>,
    generation: Cell<u64>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a node with no operands: an input feature, a constant or a
    /// trainable parameter.
    pub fn leaf(&self, value: f64) -> Scalar<'_> {
        self.append(value, Op::Leaf)
    }

    /// Appends a node with an explicit value, computed from `operands`.
    ///
    /// `op` receives the ids of `operands` in order and builds the producing
    /// operation from them, e.g. `|[a, b]| Op::Add(a, b)`. The value is taken
    /// as given; the arithmetic on [`Scalar`] is the usual way to get a value
    /// consistent with the operation.
    ///
    /// Panics if an operand belongs to another graph or was discarded by
    /// [`Graph::rewind`], or if `op` refers to anything but those ids.
    pub fn construct<'g, const N: usize>(
        &'g self,
        value: f64,
        operands: [Scalar<'g>; N],
        op: impl FnOnce([NodeId; N]) -> Op,
    ) -> Scalar<'g> {
        let ids = operands.map(|operand| {
            let operand = operand.into_scalar(self);
            self.assert_live(operand.id(), operand.generation());
            operand.id()
        });
        let op = op(ids);
        for operand in op.operands() {
            assert!(
                ids.contains(&operand),
                "operation {op:?} refers to {operand:?}, which is not one of its operands"
            );
        }
        self.append(value, op)
    }

    fn append(&self, value: f64, op: Op) -> Scalar<'_> {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId(nodes.len());
        for operand in op.operands() {
            assert!(
                operand < id,
                "operand {operand:?} does not exist in a graph of {} nodes",
                id.0
            );
        }
        let generation = self.generation.get();
        nodes.push(Node {
            value,
            gradient: 0.0,
            op,
            generation,
        });
        Scalar::from_parts(self, id, generation)
    }

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    /// Marks the current end of the arena.
    ///
    /// Typically taken right after the model parameters are created, so that
    /// [`Graph::rewind`] can discard each forward pass while keeping them.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint { len: self.len() }
    }

    /// Drops every node created after `checkpoint`.
    ///
    /// Handles to the dropped nodes become stale; using one panics instead of
    /// reading whatever node later takes its slot.
    pub fn rewind(&self, checkpoint: Checkpoint) {
        let mut nodes = self.nodes.borrow_mut();
        assert!(
            checkpoint.len <= nodes.len(),
            "checkpoint at {} is beyond the end of a graph of {} nodes",
            checkpoint.len,
            nodes.len()
        );
        let dropped = nodes.len() - checkpoint.len;
        nodes.truncate(checkpoint.len);
        self.generation.set(self.generation.get() + 1);
        trace!("rewound graph to {} nodes, dropped {dropped}", checkpoint.len);
    }

    pub(crate) fn node(&self, id: NodeId, generation: u64) -> Node {
        let nodes = self.nodes.borrow();
        *live_node(&nodes, id, generation)
    }

    /// Panics if the handle `(id, generation)` was discarded by [`Graph::rewind`].
    pub(crate) fn assert_live(&self, id: NodeId, generation: u64) {
        live_node(&self.nodes.borrow(), id, generation);
    }

    pub(crate) fn update(&self, id: NodeId, generation: u64, f: impl FnOnce(&mut Node)) {
        let mut nodes = self.nodes.borrow_mut();
        live_node(&nodes, id, generation);
        f(&mut nodes[id.0]);
    }

    /// Fresh handle to a node known to be live, e.g. an operand of a live node.
    pub(crate) fn handle(&self, id: NodeId) -> Scalar<'_> {
        let generation = self.nodes.borrow()[id.0].generation;
        Scalar::from_parts(self, id, generation)
    }

    /// Every node reachable from `root`, each operand placed before the nodes
    /// that consume it. `root` is last.
    pub(crate) fn topological_order(&self, root: NodeId) -> Vec<NodeId> {
        let nodes = self.nodes.borrow();
        if nodes[root.0].op.is_leaf() {
            return vec![root];
        }
        // Reachable ids never exceed the root's.
        let mut visited = vec![false; root.0 + 1];
        let mut order = Vec::new();
        let mut stack = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            if visited[id.0] {
                continue;
            }
            visited[id.0] = true;
            stack.push((id, true));
            for operand in nodes[id.0].op.operands().rev() {
                debug_assert!(operand < id);
                if !visited[operand.0] {
                    stack.push((operand, false));
                }
            }
        }
        order
    }

    /// Seeds `root` with gradient 1 and accumulates into every reachable node.
    pub(crate) fn backward(&self, root: NodeId) {
        let order = self.topological_order(root);
        let mut nodes = self.nodes.borrow_mut();
        nodes[root.0].gradient = 1.0;
        for &id in order.iter().rev() {
            propagate(&mut nodes, id);
        }
        debug!("backward pass from {root:?} over {} nodes", order.len());
    }

    /// Zeroes the gradient of `root` and of every node reachable from it.
    pub(crate) fn reset_gradients(&self, root: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        if nodes[root.0].op.is_leaf() {
            nodes[root.0].gradient = 0.0;
            return;
        }
        let mut visited = vec![false; root.0 + 1];
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut visited[id.0], true) {
                continue;
            }
            nodes[id.0].gradient = 0.0;
            stack.extend(nodes[id.0].op.operands());
        }
    }
}

fn live_node(nodes: &[Node], id: NodeId, generation: u64) -> &Node {
    match nodes.get(id.0) {
        Some(node) if node.generation == generation => node,
        _ => panic!("stale scalar handle {id:?}: the node was discarded by Graph::rewind"),
    }
}

// Local derivative of one node, applied to its operands.
fn propagate(nodes: &mut [Node], id: NodeId) {
    let Node {
        value,
        gradient,
        op,
        ..
    } = nodes[id.0];
    match op {
        Op::Leaf => {}
        Op::Add(a, b) => {
            nodes[a.0].gradient += gradient;
            nodes[b.0].gradient += gradient;
        }
        Op::Mul(a, b) => {
            let (lhs, rhs) = (nodes[a.0].value, nodes[b.0].value);
            nodes[a.0].gradient += rhs * gradient;
            nodes[b.0].gradient += lhs * gradient;
        }
        Op::Pow(a, exponent) => {
            let base = nodes[a.0].value;
            nodes[a.0].gradient += exponent * base.powf(exponent - 1.0) * gradient;
        }
        Op::Tanh(a) => nodes[a.0].gradient += (1.0 - value * value) * gradient,
        Op::Exp(a) => nodes[a.0].gradient += value * gradient,
    }
}
