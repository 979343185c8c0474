use approx::assert_abs_diff_eq;
use scalargrad::viz::trace;
use scalargrad::{Graph, Scalar};

#[test]
fn test_add_gradients_are_one() {
    let graph = Graph::new();
    let a = graph.leaf(2.0);
    let b = graph.leaf(3.0);
    let c = a + b;
    assert_eq!(c.value(), 5.0);
    c.backward();
    assert_eq!(c.gradient(), 1.0);
    assert_eq!(a.gradient(), 1.0);
    assert_eq!(b.gradient(), 1.0);
}

#[test]
fn test_product_rule() {
    let graph = Graph::new();
    let a = graph.leaf(2.0);
    let b = graph.leaf(3.0);
    let c = a * b;
    c.backward();
    assert_eq!(a.gradient(), 3.0);
    assert_eq!(b.gradient(), 2.0);
}

#[test]
fn test_square_accumulates_both_paths() {
    let graph = Graph::new();
    let a = graph.leaf(3.0);
    let b = a * a;
    b.backward();
    assert_eq!(a.gradient(), 6.0);

    let graph = Graph::new();
    let a = graph.leaf(3.0);
    let b = a + a;
    b.backward();
    assert_eq!(a.gradient(), 2.0);
}

#[test]
fn test_diamond_node_runs_after_all_of_its_consumers() {
    // e = (a*b) + (a*b)^2 through the same intermediate c = a*b.
    let graph = Graph::new();
    let a = graph.leaf(2.0);
    let b = graph.leaf(-1.5);
    let c = a * b;
    let e = c + c.pow(2.0);
    e.backward();

    let dc = 1.0 + 2.0 * c.value();
    assert_abs_diff_eq!(c.gradient(), dc, epsilon = 1e-12);
    assert_abs_diff_eq!(a.gradient(), dc * b.value(), epsilon = 1e-12);
    assert_abs_diff_eq!(b.gradient(), dc * a.value(), epsilon = 1e-12);
}

#[test]
fn test_tanh_at_zero() {
    let graph = Graph::new();
    let a = graph.leaf(0.0);
    let t = a.tanh();
    assert_eq!(t.value(), 0.0);
    t.backward();
    assert_eq!(a.gradient(), 1.0);
}

#[test]
fn test_single_neuron_gradients() {
    let graph = Graph::new();
    let x1 = graph.leaf(2.0);
    let x2 = graph.leaf(0.0);
    let w1 = graph.leaf(-3.0);
    let w2 = graph.leaf(1.0);
    let b = graph.leaf(6.881_373_587_019_543);
    let o = (x1 * w1 + x2 * w2 + b).tanh();
    o.backward();

    assert_abs_diff_eq!(o.value(), 0.5f64.sqrt(), epsilon = 1e-9);
    assert_abs_diff_eq!(x1.gradient(), -1.5, epsilon = 1e-9);
    assert_abs_diff_eq!(w1.gradient(), 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(x2.gradient(), 0.5, epsilon = 1e-9);
    assert_abs_diff_eq!(w2.gradient(), 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(b.gradient(), 0.5, epsilon = 1e-9);
}

#[test]
fn test_tanh_written_with_exp_matches_tanh() {
    let graph = Graph::new();
    let x = graph.leaf(0.8);
    let e = (2.0 * x).exp();
    let t = (e - 1.0) / (e + 1.0);
    t.backward();
    let via_exp = x.gradient();

    let graph = Graph::new();
    let x = graph.leaf(0.8);
    let t2 = x.tanh();
    t2.backward();

    assert_abs_diff_eq!(t.value(), t2.value(), epsilon = 1e-12);
    assert_abs_diff_eq!(via_exp, x.gradient(), epsilon = 1e-12);
}

fn build_expression(graph: &Graph) -> (Vec<Scalar<'_>>, Scalar<'_>) {
    let a = graph.leaf(1.5);
    let b = graph.leaf(-0.5);
    let c = graph.leaf(2.0);
    let d = (a * b + c).tanh() * a.exp() - b.pow(3.0) / c;
    (vec![a, b, c], d)
}

#[test]
fn test_reset_then_backward_is_bit_for_bit() {
    let graph = Graph::new();
    let (leaves, root) = build_expression(&graph);
    root.backward();
    let nodes = trace(root).nodes;
    let first: Vec<f64> = nodes.iter().map(Scalar::gradient).collect();
    assert!(leaves.iter().all(|leaf| leaf.gradient() != 0.0));

    root.reset_gradients();
    assert!(nodes.iter().all(|node| node.gradient() == 0.0));

    root.backward();
    let second: Vec<f64> = nodes.iter().map(Scalar::gradient).collect();
    assert_eq!(first, second);
}

#[test]
fn test_backward_without_reset_accumulates() {
    let graph = Graph::new();
    let a = graph.leaf(2.0);
    let y = a * 5.0;
    y.backward();
    y.backward();
    assert_eq!(y.gradient(), 1.0);
    assert_eq!(a.gradient(), 10.0);
}

#[test]
fn test_independent_graphs_from_a_shared_leaf() {
    let graph = Graph::new();
    let shared = graph.leaf(3.0);

    let first = shared * 4.0;
    first.backward();
    assert_eq!(shared.gradient(), 4.0);
    first.reset_gradients();

    let second = shared.pow(2.0);
    second.backward();
    assert_eq!(shared.gradient(), 6.0);
}

#[test]
fn test_backward_from_an_intermediate_node() {
    let graph = Graph::new();
    let a = graph.leaf(2.0);
    let b = a * 3.0;
    let c = b + 1.0;
    b.backward();
    assert_eq!(a.gradient(), 3.0);
    assert_eq!(c.gradient(), 0.0);
}

#[test]
fn test_zero_to_negative_power_is_infinite() {
    let graph = Graph::new();
    let zero = graph.leaf(0.0);
    let inverse = zero.pow(-1.0);
    assert_eq!(inverse.value(), f64::INFINITY);
}
