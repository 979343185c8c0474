use log::debug;

use crate::scalar::Scalar;

/// Plain stochastic gradient descent: `value <- value - lr * gradient`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sgd {
    learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Self {
        Sgd { learning_rate }
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Updates each parameter in place from its current gradient.
    pub fn step(&self, parameters: &[Scalar<'_>]) {
        for parameter in parameters {
            parameter.set_value(parameter.value() - self.learning_rate * parameter.gradient());
        }
        debug!(
            "Sgd: updated {} parameters with lr = {}",
            parameters.len(),
            self.learning_rate
        );
    }
}
