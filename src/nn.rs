//! Neuron, layer and multi-layer perceptron built from [`Scalar`]s.

use std::iter;

use rand::Rng;

use crate::graph::Graph;
use crate::scalar::{IntoScalar, Scalar};

/// Anything that owns trainable scalars.
pub trait Module<'g> {
    /// Trainable scalars in a stable order: children first to last, and
    /// within a neuron its weights followed by its bias.
    fn parameters(&self) -> Vec<Scalar<'g>>;

    /// Zeroes the gradient of every parameter.
    ///
    /// Intermediate nodes of earlier forward passes are left alone; they are
    /// rebuilt on the next forward pass anyway.
    fn reset_gradients(&self) {
        for parameter in self.parameters() {
            parameter.reset_gradients();
        }
    }
}

/// `tanh(w · x + b)` over a fixed number of inputs.
#[derive(Debug, Clone)]
pub struct Neuron<'g> {
    weights: Vec<Scalar<'g>>,
    bias: Scalar<'g>,
}

impl<'g> Neuron<'g> {
    /// Creates `nin` weights and a bias, each drawn uniformly from `[-1, 1)`.
    pub fn new<R: Rng + ?Sized>(graph: &'g Graph, nin: usize, rng: &mut R) -> Self {
        let weights = (0..nin)
            .map(|_| graph.leaf(rng.gen_range(-1.0..1.0)))
            .collect();
        let bias = graph.leaf(rng.gen_range(-1.0..1.0));
        Neuron { weights, bias }
    }

    pub fn nin(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[Scalar<'g>] {
        &self.weights
    }

    pub fn bias(&self) -> Scalar<'g> {
        self.bias
    }

    /// Panics unless `inputs` has exactly one entry per weight.
    pub fn forward<X: IntoScalar<'g> + Copy>(&self, inputs: &[X]) -> Scalar<'g> {
        assert_eq!(
            inputs.len(),
            self.weights.len(),
            "neuron expects {} inputs, got {}",
            self.weights.len(),
            inputs.len()
        );
        self.weights
            .iter()
            .zip(inputs)
            .fold(self.bias, |acc, (&weight, &input)| acc + weight * input)
            .tanh()
    }
}

impl<'g> Module<'g> for Neuron<'g> {
    fn parameters(&self) -> Vec<Scalar<'g>> {
        let mut parameters = self.weights.clone();
        parameters.push(self.bias);
        parameters
    }
}

/// Independent neurons sharing the same inputs.
#[derive(Debug, Clone)]
pub struct Layer<'g> {
    neurons: Vec<Neuron<'g>>,
}

impl<'g> Layer<'g> {
    pub fn new<R: Rng + ?Sized>(graph: &'g Graph, nin: usize, nout: usize, rng: &mut R) -> Self {
        let neurons = (0..nout).map(|_| Neuron::new(graph, nin, &mut *rng)).collect();
        Layer { neurons }
    }

    pub fn neurons(&self) -> &[Neuron<'g>] {
        &self.neurons
    }

    pub fn nout(&self) -> usize {
        self.neurons.len()
    }

    /// One output per neuron, in neuron order.
    pub fn forward<X: IntoScalar<'g> + Copy>(&self, inputs: &[X]) -> Vec<Scalar<'g>> {
        self.neurons
            .iter()
            .map(|neuron| neuron.forward(inputs))
            .collect()
    }
}

impl<'g> Module<'g> for Layer<'g> {
    fn parameters(&self) -> Vec<Scalar<'g>> {
        self.neurons.iter().flat_map(Neuron::parameters).collect()
    }
}

/// Layers applied in sequence, each fed the previous layer's outputs.
#[derive(Debug, Clone)]
pub struct Mlp<'g> {
    graph: &'g Graph,
    layers: Vec<Layer<'g>>,
}

impl<'g> Mlp<'g> {
    /// `nouts[i]` is the width of layer `i`; the first layer takes `nin` inputs.
    pub fn new<R: Rng + ?Sized>(graph: &'g Graph, nin: usize, nouts: &[usize], rng: &mut R) -> Self {
        let sizes: Vec<usize> = iter::once(nin).chain(nouts.iter().copied()).collect();
        let layers = sizes
            .windows(2)
            .map(|pair| Layer::new(graph, pair[0], pair[1], &mut *rng))
            .collect();
        Mlp { graph, layers }
    }

    pub fn layers(&self) -> &[Layer<'g>] {
        &self.layers
    }

    pub fn forward<X: IntoScalar<'g> + Copy>(&self, inputs: &[X]) -> Vec<Scalar<'g>> {
        let inputs: Vec<Scalar<'g>> = inputs
            .iter()
            .map(|&input| input.into_scalar(self.graph))
            .collect();
        self.layers
            .iter()
            .fold(inputs, |activations, layer| layer.forward(&activations))
    }
}

impl<'g> Module<'g> for Mlp<'g> {
    fn parameters(&self) -> Vec<Scalar<'g>> {
        self.layers.iter().flat_map(Layer::parameters).collect()
    }
}

/// Sum of squared differences between predictions and targets.
///
/// Panics if the slices differ in length or are empty.
pub fn squared_error<'g>(predictions: &[Scalar<'g>], targets: &[f64]) -> Scalar<'g> {
    assert_eq!(
        predictions.len(),
        targets.len(),
        "got {} predictions for {} targets",
        predictions.len(),
        targets.len()
    );
    assert!(!predictions.is_empty(), "squared error of an empty batch");
    predictions
        .iter()
        .zip(targets)
        .fold(predictions[0].graph().leaf(0.0), |loss, (&prediction, &target)| {
            loss + (prediction - target).pow(2.0)
        })
}
