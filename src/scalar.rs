//! The user-facing scalar handle and its differentiable operations.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::graph::{Graph, NodeId, Op};

/// A real-valued node in a [`Graph`].
///
/// `Scalar` is a cheap `Copy` handle; every operation on it appends a new
/// node to the graph it belongs to and returns a handle to that node.
///
/// ```
/// use scalargrad::Graph;
///
/// let graph = Graph::new();
/// let a = graph.leaf(2.0);
/// let b = graph.leaf(3.0);
/// let c = a * b + 1.0;
/// c.backward();
/// assert_eq!(c.value(), 7.0);
/// assert_eq!(a.gradient(), 3.0);
/// assert_eq!(b.gradient(), 2.0);
/// ```
#[derive(Clone, Copy)]
pub struct Scalar<'g> {
    graph: &'g Graph,
    id: NodeId,
    generation: u64,
}

impl<'g> Scalar<'g> {
    pub(crate) fn from_parts(graph: &'g Graph, id: NodeId, generation: u64) -> Self {
        Scalar {
            graph,
            id,
            generation,
        }
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub fn value(&self) -> f64 {
        self.graph.node(self.id, self.generation).value
    }

    /// Accumulated derivative of the last differentiated root with respect to
    /// this node. Zero until a reverse pass reaches it.
    pub fn gradient(&self) -> f64 {
        self.graph.node(self.id, self.generation).gradient
    }

    pub fn op(&self) -> Op {
        self.graph.node(self.id, self.generation).op
    }

    /// Label of the producing operation, e.g. `"+"` or `"tanh"`; empty for leaves.
    pub fn label(&self) -> String {
        self.op().to_string()
    }

    pub fn is_leaf(&self) -> bool {
        self.op().is_leaf()
    }

    pub fn operands(&self) -> Vec<Scalar<'g>> {
        self.op()
            .operands()
            .map(|id| self.graph.handle(id))
            .collect()
    }

    /// Overwrites the value outside of the graph machinery.
    ///
    /// This is the optimizer's update path. Nodes already computed from this
    /// one keep their old values until the graph is rebuilt.
    pub fn set_value(&self, value: f64) {
        self.graph
            .update(self.id, self.generation, |node| node.value = value);
    }

    /// `self^exponent`. A zero base with a negative exponent yields an
    /// infinite value rather than an error.
    pub fn pow(self, exponent: f64) -> Scalar<'g> {
        let value = self.value().powf(exponent);
        self.graph
            .construct(value, [self], |[a]| Op::Pow(a, exponent))
    }

    pub fn tanh(self) -> Scalar<'g> {
        let value = self.value().tanh();
        self.graph.construct(value, [self], |[a]| Op::Tanh(a))
    }

    pub fn exp(self) -> Scalar<'g> {
        let value = self.value().exp();
        self.graph.construct(value, [self], |[a]| Op::Exp(a))
    }

    /// Runs the reverse pass with this node as root.
    ///
    /// The root's gradient is set to 1; every other reachable node has the
    /// contributions of this pass added to whatever it already holds, so
    /// reset gradients between passes over shared nodes.
    pub fn backward(&self) {
        self.graph.assert_live(self.id, self.generation);
        self.graph.backward(self.id);
    }

    /// Zeroes the gradient of this node and of every node it was computed from.
    pub fn reset_gradients(&self) {
        self.graph.assert_live(self.id, self.generation);
        self.graph.reset_gradients(self.id);
    }
}

impl fmt::Debug for Scalar<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.graph.node(self.id, self.generation);
        f.debug_struct("Scalar")
            .field("id", &self.id.index())
            .field("value", &node.value)
            .field("gradient", &node.gradient)
            .field("op", &node.op.to_string())
            .finish()
    }
}

/// Conversion applied to the right-hand side of every binary operation.
///
/// Plain numbers become fresh leaf nodes in the left-hand side's graph.
pub trait IntoScalar<'g> {
    fn into_scalar(self, graph: &'g Graph) -> Scalar<'g>;
}

impl<'g> IntoScalar<'g> for Scalar<'g> {
    fn into_scalar(self, graph: &'g Graph) -> Scalar<'g> {
        assert!(
            std::ptr::eq(self.graph, graph),
            "cannot combine scalars from different graphs"
        );
        self
    }
}

impl<'g> IntoScalar<'g> for &Scalar<'g> {
    fn into_scalar(self, graph: &'g Graph) -> Scalar<'g> {
        (*self).into_scalar(graph)
    }
}

impl<'g> IntoScalar<'g> for f64 {
    fn into_scalar(self, graph: &'g Graph) -> Scalar<'g> {
        graph.leaf(self)
    }
}

impl<'g, R: IntoScalar<'g>> Add<R> for Scalar<'g> {
    type Output = Scalar<'g>;

    fn add(self, rhs: R) -> Scalar<'g> {
        let rhs = rhs.into_scalar(self.graph);
        self.graph
            .construct(self.value() + rhs.value(), [self, rhs], |[a, b]| Op::Add(a, b))
    }
}

impl<'g, R: IntoScalar<'g>> Mul<R> for Scalar<'g> {
    type Output = Scalar<'g>;

    fn mul(self, rhs: R) -> Scalar<'g> {
        let rhs = rhs.into_scalar(self.graph);
        self.graph
            .construct(self.value() * rhs.value(), [self, rhs], |[a, b]| Op::Mul(a, b))
    }
}

impl<'g> Neg for Scalar<'g> {
    type Output = Scalar<'g>;

    fn neg(self) -> Scalar<'g> {
        self * -1.0
    }
}

impl<'g, R: IntoScalar<'g>> Sub<R> for Scalar<'g> {
    type Output = Scalar<'g>;

    fn sub(self, rhs: R) -> Scalar<'g> {
        let rhs = rhs.into_scalar(self.graph);
        self + (-rhs)
    }
}

impl<'g, R: IntoScalar<'g>> Div<R> for Scalar<'g> {
    type Output = Scalar<'g>;

    fn div(self, rhs: R) -> Scalar<'g> {
        let rhs = rhs.into_scalar(self.graph);
        self * rhs.pow(-1.0)
    }
}

// `2.0 * x` and friends: coerce the number into x's graph first.
macro_rules! impl_f64_lhs {
    ($($op:ident :: $method:ident),* $(,)?) => {$(
        impl<'g> $op<Scalar<'g>> for f64 {
            type Output = Scalar<'g>;

            fn $method(self, rhs: Scalar<'g>) -> Scalar<'g> {
                self.into_scalar(rhs.graph).$method(rhs)
            }
        }
    )*};
}

impl_f64_lhs!(Add::add, Sub::sub, Mul::mul, Div::div);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_leaf_defaults() {
        let graph = Graph::new();
        let a = graph.leaf(4.5);
        assert_eq!(a.value(), 4.5);
        assert_eq!(a.gradient(), 0.0);
        assert!(a.is_leaf());
        assert_eq!(a.label(), "");
        assert!(a.operands().is_empty());
    }

    #[test]
    fn test_operands_and_labels_follow_primitives() {
        let graph = Graph::new();
        let a = graph.leaf(2.0);
        let b = graph.leaf(3.0);

        let sum = a + b;
        assert_eq!(sum.label(), "+");
        let operand_ids: Vec<_> = sum.operands().iter().map(Scalar::id).collect();
        assert_eq!(operand_ids, vec![a.id(), b.id()]);

        assert_eq!((-a).label(), "*");
        assert_eq!((a - b).label(), "+");
        assert_eq!((a / b).label(), "*");
        assert_eq!(a.pow(3.0).label(), "**3");
        assert_eq!(a.tanh().label(), "tanh");
        assert_eq!(a.exp().label(), "exp");
    }

    #[test]
    fn test_sub_backward() {
        let graph = Graph::new();
        let a = graph.leaf(5.0);
        let b = graph.leaf(2.0);
        let c = a - b;
        assert_eq!(c.value(), 3.0);
        c.backward();
        assert_eq!(a.gradient(), 1.0);
        assert_eq!(b.gradient(), -1.0);
    }

    #[test]
    fn test_div_backward() {
        let graph = Graph::new();
        let a = graph.leaf(6.0);
        let b = graph.leaf(2.0);
        let c = a / b;
        assert_eq!(c.value(), 3.0);
        c.backward();
        assert_relative_eq!(a.gradient(), 0.5);
        // d/db (a / b) = -a / b^2
        assert_relative_eq!(b.gradient(), -1.5);
    }

    #[test]
    fn test_pow_backward() {
        let graph = Graph::new();
        let a = graph.leaf(2.0);
        let b = a.pow(3.0);
        assert_relative_eq!(b.value(), 8.0);
        b.backward();
        assert_relative_eq!(a.gradient(), 12.0);
    }

    #[test]
    fn test_exp_backward() {
        let graph = Graph::new();
        let a = graph.leaf(1.0);
        let b = a.exp();
        assert_relative_eq!(b.value(), std::f64::consts::E, epsilon = 1e-12);
        b.backward();
        assert_relative_eq!(a.gradient(), std::f64::consts::E, epsilon = 1e-12);
    }

    #[test]
    fn test_tanh_backward_away_from_zero() {
        let graph = Graph::new();
        let a = graph.leaf(0.5);
        let t = a.tanh();
        t.backward();
        let expected = 1.0 - 0.5f64.tanh().powi(2);
        assert_relative_eq!(a.gradient(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_number_on_either_side() {
        let graph = Graph::new();
        let x = graph.leaf(4.0);
        assert_eq!((x + 1.0).value(), 5.0);
        assert_eq!((1.0 + x).value(), 5.0);
        assert_eq!((x - 1.0).value(), 3.0);
        assert_eq!((1.0 - x).value(), -3.0);
        assert_eq!((x * 2.0).value(), 8.0);
        assert_eq!((2.0 * x).value(), 8.0);
        assert_eq!((x / 2.0).value(), 2.0);
        assert_eq!((2.0 / x).value(), 0.5);

        let y = 2.0 / x;
        y.backward();
        // d/dx 2/x = -2 / x^2
        assert_relative_eq!(x.gradient(), -0.125);
    }

    #[test]
    fn test_wrapped_constant_is_a_disconnected_leaf() {
        let graph = Graph::new();
        let x = graph.leaf(3.0);
        let y = x * 2.0;
        let constant = y.operands()[1];
        assert!(constant.is_leaf());
        assert_eq!(constant.value(), 2.0);
        y.backward();
        assert_eq!(x.gradient(), 2.0);
        assert_eq!(constant.gradient(), 3.0);
    }

    #[test]
    fn test_division_by_zero_is_not_an_error() {
        let graph = Graph::new();
        let a = graph.leaf(1.0);
        let zero = graph.leaf(0.0);
        let c = a / zero;
        assert!(c.value().is_infinite());
        c.backward();
        assert!(!zero.gradient().is_finite());
    }

    #[test]
    fn test_fractional_power_of_negative_is_nan() {
        let graph = Graph::new();
        let a = graph.leaf(-4.0);
        let b = a.pow(0.5);
        assert!(b.value().is_nan());
        b.backward();
        assert!(a.gradient().is_nan());
    }

    #[test]
    fn test_set_value_only_touches_the_node() {
        let graph = Graph::new();
        let w = graph.leaf(1.0);
        let y = w * 3.0;
        w.set_value(2.0);
        assert_eq!(w.value(), 2.0);
        assert_eq!(y.value(), 3.0);
        assert_eq!((w * 3.0).value(), 6.0);
    }

    #[test]
    fn test_debug_shows_value_and_gradient() {
        let graph = Graph::new();
        let a = graph.leaf(1.5);
        let rendered = format!("{a:?}");
        assert!(rendered.contains("value: 1.5"));
        assert!(rendered.contains("gradient: 0.0"));
    }

    #[test]
    #[should_panic(expected = "different graphs")]
    fn test_mixing_graphs_panics() {
        let first = Graph::new();
        let second = Graph::new();
        let _ = first.leaf(1.0) + second.leaf(2.0);
    }

    #[test]
    #[should_panic(expected = "different graphs")]
    fn test_number_on_the_left_stays_in_one_graph() {
        let first = Graph::new();
        let second = Graph::new();
        let a = first.leaf(1.0);
        let _ = (2.0 * a) * second.leaf(3.0);
    }

    #[test]
    #[should_panic(expected = "stale scalar handle")]
    fn test_stale_operand_is_rejected() {
        let graph = Graph::new();
        let live = graph.leaf(1.0);
        let checkpoint = graph.checkpoint();
        let stale = live * 2.0;
        graph.rewind(checkpoint);
        // Takes the slot `stale` used to occupy.
        graph.leaf(99.0);
        let _ = live + stale;
    }

    #[test]
    #[should_panic(expected = "stale scalar handle")]
    fn test_unary_op_on_stale_handle_is_rejected() {
        let graph = Graph::new();
        let checkpoint = graph.checkpoint();
        let stale = graph.leaf(1.0);
        graph.rewind(checkpoint);
        graph.leaf(99.0);
        let _ = stale.exp();
    }

    #[test]
    #[should_panic(expected = "stale scalar handle")]
    fn test_backward_from_stale_handle_is_rejected() {
        let graph = Graph::new();
        let checkpoint = graph.checkpoint();
        let stale = graph.leaf(1.0).tanh();
        graph.rewind(checkpoint);
        graph.leaf(99.0);
        graph.leaf(5.0);
        stale.backward();
    }
}
